//! Core data model: assets, batch legs, per-call outcomes, operation ids.

use alloy_primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

/// Opaque 32-byte identifier for one logical operation (e.g. one cross-chain leg).
///
/// Uniqueness per logical operation is a caller responsibility; the engine never
/// checks for collisions.
pub type OperationId = alloy_primitives::B256;

/// An asset the router can hold, pull, or pay out: the chain-native asset or an
/// ERC-20 token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Asset {
    Native,
    Erc20(Address),
}

impl Asset {
    /// Wire convention of the dispatch ABI: the zero address denotes the native asset.
    pub fn from_address(addr: Address) -> Self {
        if addr == Address::ZERO {
            Self::Native
        } else {
            Self::Erc20(addr)
        }
    }

    pub fn as_address(&self) -> Address {
        match self {
            Self::Native => Address::ZERO,
            Self::Erc20(token) => *token,
        }
    }

    pub fn is_native(&self) -> bool {
        matches!(self, Self::Native)
    }
}

/// One leg of a multi-call batch handed to the external aggregator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchCall {
    pub target: Address,
    /// Failure tolerance. The router's own batch wrapper rejects any leg with
    /// this set; a caller cannot silently mask a partial failure.
    pub allow_failure: bool,
    pub value: U256,
    pub payload: Bytes,
}

/// Per-call `(success, returnData)` outcome reported by the aggregator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallResult {
    pub success: bool,
    pub return_data: Bytes,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_address_is_native() {
        assert_eq!(Asset::from_address(Address::ZERO), Asset::Native);
        assert_eq!(Asset::Native.as_address(), Address::ZERO);
    }

    #[test]
    fn nonzero_address_is_token() {
        let token = Address::new([0x11; 20]);
        assert_eq!(Asset::from_address(token), Asset::Erc20(token));
        assert!(!Asset::from_address(token).is_native());
    }
}
