//! Error taxonomy for the router core.
//!
//! Downstream failures (`TargetCallFailed`, `RouterCallFailed`) always carry
//! the callee's raw revert payload verbatim so upstream tooling can decode the
//! real cause; nothing is summarized or retried here.

use alloy_primitives::{Address, Bytes, B256, U256};
use thiserror::Error;

use crate::types::OperationId;

/// A merged-frame entry point was invoked directly against the component's own
/// identity instead of a host frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("entry point invoked directly on {identity}; merged-frame execution required")]
pub struct DirectInvocation {
    pub identity: Address,
}

/// Shim construction with an unset downstream router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("downstream router address is zero")]
pub struct ZeroRouterAddress;

/// Failures reported by the host environment's funds primitives.
///
/// The "safe" transfer family never reports success on a failed move, so these
/// are the only shapes a silent no-op could hide behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("insufficient balance: have {available}, need {needed}")]
    InsufficientBalance { available: U256, needed: U256 },
    #[error("insufficient allowance: have {available}, need {needed}")]
    InsufficientAllowance { available: U256, needed: U256 },
}

/// Errors produced by [`crate::router::DelegatedRouter`] operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouterError {
    #[error(transparent)]
    DirectInvocation(#[from] DirectInvocation),

    /// The payload's leading selector is not the batch-with-value operation.
    #[error("selector 0x{} is not the batch-with-value operation", hex::encode(.0))]
    UnsupportedOperation([u8; 4]),

    /// `dispatch` saw a selector outside the closed operation set.
    #[error("unrecognized dispatch selector 0x{}", hex::encode(.0))]
    UnrecognizedOperation([u8; 4]),

    /// A recognized payload (or an aggregator return) failed to decode.
    #[error("undecodable payload for recognized operation")]
    MalformedPayload,

    /// A batch leg tolerates failure; the router only forwards strict batches.
    #[error("batch leg {0} tolerates failure; strict batches only")]
    PartialFailureNotAllowed(usize),

    #[error("no funds available")]
    NoFundsAvailable,

    #[error("insufficient native value supplied: required {required}, received {received}")]
    InsufficientValueSupplied { required: U256, received: U256 },

    /// Injection window would run past the end of the payload. Nothing was written.
    #[error("injection window [{offset}..{offset}+32) exceeds payload length {length}")]
    OutOfBounds { offset: usize, length: usize },

    /// Bytes at the injection window did not match the expected placeholder.
    #[error("placeholder mismatch at offset {offset}: expected {expected}, found {found}")]
    PlaceholderMismatch {
        offset: usize,
        expected: B256,
        found: B256,
    },

    /// The funds-move primitive refused the transfer.
    #[error("funds-move primitive failed: {0}")]
    FundsMove(#[from] HostError),

    /// A dispatched call (or the aggregator itself) reverted; the payload is
    /// the callee's revert data, unchanged.
    #[error("target call failed ({} bytes of revert data)", .0.len())]
    TargetCallFailed(Bytes),

    /// The sentinel for this operation id has not been set by a forward leg.
    #[error("sentinel not set for operation {0}")]
    SentinelNotSet(OperationId),
}

/// Errors produced by [`crate::shim::ExecutionShim::forward`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShimError {
    #[error(transparent)]
    DirectInvocation(#[from] DirectInvocation),

    /// The downstream router call reverted; the payload is the original revert
    /// data, unchanged. The sentinel stays unset.
    #[error("downstream router call failed ({} bytes of revert data)", .0.len())]
    RouterCallFailed(Bytes),
}
