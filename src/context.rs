//! Explicit execution context.
//!
//! The router and shim never run under their own identity in production: a host
//! wallet merges their logic into its own frame, so storage, balances and the
//! outbound caller identity all belong to the host. Instead of inferring that
//! from ambient state, every operation takes an [`ExecutionContext`] naming
//! whose frame is executing.

use alloy_primitives::{Address, U256};

/// The frame an operation runs in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExecutionContext {
    /// Identity whose storage and balances the current frame operates on.
    /// Under merged execution this is the host wallet, not the component.
    pub executing: Address,
    /// Original caller that entered the frame.
    pub caller: Address,
    /// Native value attached to the invocation.
    pub value: U256,
}

impl ExecutionContext {
    pub fn new(executing: Address, caller: Address, value: U256) -> Self {
        Self {
            executing,
            caller,
            value,
        }
    }
}
