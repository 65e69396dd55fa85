//! Forwarding shim: one outbound call, sentinel on success.
//!
//! The shim wraps a single call to a fixed downstream router and records the
//! per-operation success flag the gated sweep consults later. It never
//! interprets the downstream result; failure data is re-raised unchanged so
//! callers can distinguish engine errors from downstream business errors.

use alloy_primitives::{Address, Bytes, U256};

use crate::{
    context::ExecutionContext,
    errors::{ShimError, ZeroRouterAddress},
    guard::InvocationGuard,
    host::Host,
    sentinel::OperationSentinelStore,
    types::OperationId,
};

#[derive(Debug)]
pub struct ExecutionShim {
    identity: Address,
    router: Address,
    guard: InvocationGuard,
    sentinels: OperationSentinelStore,
}

impl ExecutionShim {
    /// The downstream router identity is fixed for the shim's lifetime.
    pub fn new(identity: Address, router: Address) -> Result<Self, ZeroRouterAddress> {
        if router == Address::ZERO {
            return Err(ZeroRouterAddress);
        }
        Ok(Self {
            identity,
            router,
            guard: InvocationGuard::new(identity),
            sentinels: OperationSentinelStore::new(identity),
        })
    }

    pub fn identity(&self) -> Address {
        self.identity
    }

    pub fn router(&self) -> Address {
        self.router
    }

    /// Forward `inner_payload` (with `forwarded_value` attached) downstream.
    ///
    /// On success the sentinel for `operation_id` is set and the downstream
    /// result returned unchanged. On failure the sentinel stays unset and the
    /// original revert data is re-raised inside `RouterCallFailed`.
    pub fn forward(
        &self,
        host: &mut dyn Host,
        ctx: &ExecutionContext,
        operation_id: OperationId,
        inner_payload: &[u8],
        forwarded_value: U256,
    ) -> Result<Bytes, ShimError> {
        self.guard.require_merged(ctx)?;
        match host.call(ctx.executing, self.router, forwarded_value, inner_payload) {
            Ok(returned) => {
                self.sentinels.try_set(host, ctx, operation_id);
                tracing::debug!(%operation_id, router = %self.router, "forward succeeded; sentinel set");
                Ok(returned)
            }
            Err(revert_data) => {
                tracing::debug!(%operation_id, router = %self.router, "forward failed; sentinel untouched");
                Err(ShimError::RouterCallFailed(revert_data))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_rejects_zero_router() {
        let shim = ExecutionShim::new(Address::new([1; 20]), Address::ZERO);
        assert_eq!(shim.unwrap_err(), ZeroRouterAddress);
    }

    #[test]
    fn construction_records_router() {
        let router = Address::new([2; 20]);
        let shim = ExecutionShim::new(Address::new([1; 20]), router).unwrap();
        assert_eq!(shim.router(), router);
    }
}
