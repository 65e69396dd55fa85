//! Direct-invocation guard.
//!
//! None of the router's or shim's logic is safe to run against the component's
//! own storage; it only makes sense inside a borrowed host frame. The guard
//! records the component's deployed identity at construction and rejects any
//! frame still executing under that identity.

use alloy_primitives::Address;

use crate::{context::ExecutionContext, errors::DirectInvocation};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InvocationGuard {
    self_identity: Address,
}

impl InvocationGuard {
    pub const fn new(self_identity: Address) -> Self {
        Self { self_identity }
    }

    pub fn self_identity(&self) -> Address {
        self.self_identity
    }

    /// Precondition for every mutating entry point. No side effects.
    pub fn require_merged(&self, ctx: &ExecutionContext) -> Result<(), DirectInvocation> {
        if ctx.executing == self.self_identity {
            return Err(DirectInvocation {
                identity: self.self_identity,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::U256;

    use super::*;

    const SELF: Address = Address::new([0x51; 20]);
    const HOST: Address = Address::new([0x40; 20]);

    #[test]
    fn direct_invocation_is_rejected() {
        let guard = InvocationGuard::new(SELF);
        let ctx = ExecutionContext::new(SELF, Address::new([2; 20]), U256::ZERO);
        assert_eq!(
            guard.require_merged(&ctx),
            Err(DirectInvocation { identity: SELF })
        );
    }

    #[test]
    fn merged_frame_passes() {
        let guard = InvocationGuard::new(SELF);
        let ctx = ExecutionContext::new(HOST, Address::new([2; 20]), U256::ZERO);
        assert_eq!(guard.require_merged(&ctx), Ok(()));
    }
}
