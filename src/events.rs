//! Observability events emitted along the settlement path.

use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

use crate::types::Asset;

/// Events the engine emits through the host.
///
/// The balance-injection trail is emitted for successful and failed legs
/// alike, so off-chain monitors can reconstruct the full injection history
/// even when a leg reverted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouterEvent {
    /// Balance-injection trail: one entry per dispatched injection leg.
    BalanceInjected {
        asset: Asset,
        target: Address,
        offset: usize,
        placeholder: B256,
        amount: U256,
        success: bool,
        /// Raw return or revert data of the dispatched call.
        result: Bytes,
    },
    Swept {
        asset: Asset,
        recipient: Address,
        amount: U256,
    },
    Refunded {
        asset: Asset,
        recipient: Address,
        amount: U256,
    },
    /// The requested refund exceeded the held balance and was clamped.
    RefundClamped { requested: U256, available: U256 },
    /// Summary of a refund-and-sweep, emitted even when one leg is zero.
    RefundAndSwept {
        asset: Asset,
        refund_recipient: Address,
        refunded: U256,
        sweep_recipient: Address,
        swept: U256,
    },
}
