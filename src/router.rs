//! Delegated batch router: strict batch validation, balance injection, and
//! conditional sweep/refund settlement.
//!
//! Design notes:
//! - The router is meant to be merged into a host wallet's frame; the holding
//!   identity for every operation is `ctx.executing`, never the router itself.
//! - The holding balance is read fresh at the moment of use and never cached:
//!   successive legs of one logical batch are expected to observe the balance
//!   changes made by earlier legs.
//! - Amount arithmetic never silently truncates. The only clamp lives in
//!   `refund_and_sweep`, and it announces itself with a notice event.

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::SolCall;

use crate::{
    abi::IBatchAggregator,
    context::ExecutionContext,
    decoder::{decode_batch, decode_operation, RouterOp},
    errors::{HostError, RouterError},
    events::RouterEvent,
    guard::InvocationGuard,
    host::Host,
    sentinel::OperationSentinelStore,
    types::{Asset, CallResult, OperationId},
    utils::bytes::{read_window, write_window},
};

/// What a dispatched operation produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Per-call results from the aggregator path.
    Batch(Vec<CallResult>),
    /// Raw return data from a single dispatched call.
    Call(Bytes),
    /// Operation completed with no return payload.
    Unit,
}

pub struct DelegatedRouter {
    identity: Address,
    aggregator: Address,
    guard: InvocationGuard,
    sentinels: OperationSentinelStore,
}

impl DelegatedRouter {
    /// `identity` is the router's own deployed identity; `aggregator` the
    /// external batch aggregator every `execute` forwards to.
    pub fn new(identity: Address, aggregator: Address) -> Self {
        Self {
            identity,
            aggregator,
            guard: InvocationGuard::new(identity),
            sentinels: OperationSentinelStore::new(identity),
        }
    }

    pub fn identity(&self) -> Address {
        self.identity
    }

    pub fn aggregator(&self) -> Address {
        self.aggregator
    }

    /// The single merged-frame entry point a host invokes repeatedly for
    /// different logical sub-operations. Decodes the selector-routed payload
    /// into the closed operation set and routes, injecting `operation_id`
    /// where required.
    pub fn dispatch(
        &self,
        host: &mut dyn Host,
        ctx: &ExecutionContext,
        operation_id: OperationId,
        payload: &[u8],
    ) -> Result<DispatchOutcome, RouterError> {
        self.guard.require_merged(ctx)?;
        let op = decode_operation(payload)?;
        tracing::debug!(op = op.label(), %operation_id, executing = %ctx.executing, "dispatch");
        match op {
            RouterOp::Execute { payload } => {
                self.execute(host, ctx, &payload).map(DispatchOutcome::Batch)
            }
            RouterOp::PullAndExecute { asset, payload } => self
                .pull_and_execute(host, ctx, asset, &payload)
                .map(DispatchOutcome::Batch),
            RouterOp::PullAmountAndExecute {
                asset,
                amount,
                payload,
            } => self
                .pull_amount_and_execute(host, ctx, asset, amount, &payload)
                .map(DispatchOutcome::Batch),
            RouterOp::InjectAndCall {
                asset,
                target,
                payload,
                offset,
                placeholder,
            } => self
                .inject_and_call(host, ctx, asset, target, &payload, offset, placeholder)
                .map(DispatchOutcome::Call),
            RouterOp::InjectSweepAndCall {
                asset,
                target,
                payload,
                offset,
                placeholder,
            } => self
                .inject_sweep_and_call(host, ctx, asset, target, &payload, offset, placeholder)
                .map(DispatchOutcome::Call),
            RouterOp::Sweep { asset, recipient } => self
                .sweep(host, ctx, asset, recipient)
                .map(|()| DispatchOutcome::Unit),
            RouterOp::RefundAndSweep {
                asset,
                refund_recipient,
                refund_amount,
                sweep_recipient,
            } => self
                .refund_and_sweep(host, ctx, asset, refund_recipient, refund_amount, sweep_recipient)
                .map(|()| DispatchOutcome::Unit),
            RouterOp::SweepIfSentinelSet { asset, recipient } => self
                .sweep_if_sentinel_set(host, ctx, operation_id, asset, recipient)
                .map(|()| DispatchOutcome::Unit),
        }
    }

    /// Validate a batch payload and forward it, whole, to the aggregator.
    ///
    /// Every leg must have its failure tolerance off; the first offending leg
    /// is named. May run directly or merged.
    pub fn execute(
        &self,
        host: &mut dyn Host,
        ctx: &ExecutionContext,
        payload: &[u8],
    ) -> Result<Vec<CallResult>, RouterError> {
        let batch = decode_batch(payload)?;
        if let Some(index) = batch.iter().position(|leg| leg.allow_failure) {
            return Err(RouterError::PartialFailureNotAllowed(index));
        }
        let total = batch
            .iter()
            .try_fold(U256::ZERO, |acc, leg| acc.checked_add(leg.value))
            .ok_or(RouterError::MalformedPayload)?;

        tracing::debug!(legs = batch.len(), %total, aggregator = %self.aggregator, "forwarding batch");
        let returned = host
            .call(ctx.executing, self.aggregator, total, payload)
            .map_err(RouterError::TargetCallFailed)?;

        let decoded = IBatchAggregator::aggregate3ValueCall::abi_decode_returns(&returned, true)
            .map_err(|_| RouterError::MalformedPayload)?;
        Ok(decoded
            .returnData
            .into_iter()
            .map(|r| CallResult {
                success: r.success,
                return_data: r.returnData,
            })
            .collect())
    }

    /// Pull the caller's entire available balance of `asset` into the holding
    /// identity, then `execute`.
    pub fn pull_and_execute(
        &self,
        host: &mut dyn Host,
        ctx: &ExecutionContext,
        asset: Asset,
        payload: &[u8],
    ) -> Result<Vec<CallResult>, RouterError> {
        match asset {
            // The attached value is the native pull; it is already resident in
            // the holding identity when the frame runs.
            Asset::Native => {
                if ctx.value.is_zero() {
                    return Err(RouterError::NoFundsAvailable);
                }
            }
            Asset::Erc20(token) => {
                let available = host.token_balance(token, ctx.caller);
                if available.is_zero() {
                    return Err(RouterError::NoFundsAvailable);
                }
                host.token_transfer_from(token, ctx.executing, ctx.caller, ctx.executing, available)?;
            }
        }
        self.execute(host, ctx, payload)
    }

    /// Pull exactly `amount` of `asset` from the caller, then `execute`.
    pub fn pull_amount_and_execute(
        &self,
        host: &mut dyn Host,
        ctx: &ExecutionContext,
        asset: Asset,
        amount: U256,
        payload: &[u8],
    ) -> Result<Vec<CallResult>, RouterError> {
        if amount.is_zero() {
            return Err(RouterError::NoFundsAvailable);
        }
        match asset {
            Asset::Native => {
                if ctx.value < amount {
                    return Err(RouterError::InsufficientValueSupplied {
                        required: amount,
                        received: ctx.value,
                    });
                }
            }
            Asset::Erc20(token) => {
                host.token_transfer_from(token, ctx.executing, ctx.caller, ctx.executing, amount)?;
            }
        }
        self.execute(host, ctx, payload)
    }

    /// Rewrite the live holding balance into `payload` at `offset` (after the
    /// placeholder check), then dispatch the call to `target`.
    ///
    /// Native balances are forwarded as attached value; token balances are
    /// exposed through an unlimited approval, since the target's exact
    /// consumption is unknown in advance and per-call re-approval does not
    /// compose.
    #[allow(clippy::too_many_arguments)]
    pub fn inject_and_call(
        &self,
        host: &mut dyn Host,
        ctx: &ExecutionContext,
        asset: Asset,
        target: Address,
        payload: &[u8],
        offset: usize,
        placeholder: B256,
    ) -> Result<Bytes, RouterError> {
        self.guard.require_merged(ctx)?;
        let balance = self.holding_balance(host, ctx, asset);
        if balance.is_zero() {
            return Err(RouterError::NoFundsAvailable);
        }

        let mut payload = payload.to_vec();
        if offset != 0 || placeholder != B256::ZERO {
            inject_balance(&mut payload, offset, placeholder, balance)?;
        }

        let outcome = match asset {
            Asset::Native => host.call(ctx.executing, target, balance, &payload),
            Asset::Erc20(token) => {
                host.token_approve(token, ctx.executing, target, U256::MAX)?;
                host.call(ctx.executing, target, U256::ZERO, &payload)
            }
        };

        // Trail entry for successful and failed legs alike.
        let (success, raw) = match &outcome {
            Ok(data) => (true, data.clone()),
            Err(data) => (false, data.clone()),
        };
        host.emit(
            ctx.executing,
            RouterEvent::BalanceInjected {
                asset,
                target,
                offset,
                placeholder,
                amount: balance,
                success,
                result: raw,
            },
        );
        tracing::debug!(?asset, %target, offset, amount = %balance, success, "balance injection dispatched");

        outcome.map_err(RouterError::TargetCallFailed)
    }

    /// Pull the caller's full balance into holding first, then inject-and-call.
    #[allow(clippy::too_many_arguments)]
    pub fn inject_sweep_and_call(
        &self,
        host: &mut dyn Host,
        ctx: &ExecutionContext,
        asset: Asset,
        target: Address,
        payload: &[u8],
        offset: usize,
        placeholder: B256,
    ) -> Result<Bytes, RouterError> {
        self.guard.require_merged(ctx)?;
        if let Asset::Erc20(token) = asset {
            let available = host.token_balance(token, ctx.caller);
            if !available.is_zero() {
                host.token_transfer_from(token, ctx.executing, ctx.caller, ctx.executing, available)?;
            }
        }
        self.inject_and_call(host, ctx, asset, target, payload, offset, placeholder)
    }

    /// Transfer the entire current holding of `asset` to `recipient`.
    /// A zero balance is a quiet no-op: no event, no error.
    pub fn sweep(
        &self,
        host: &mut dyn Host,
        ctx: &ExecutionContext,
        asset: Asset,
        recipient: Address,
    ) -> Result<(), RouterError> {
        self.guard.require_merged(ctx)?;
        let balance = self.holding_balance(host, ctx, asset);
        if balance.is_zero() {
            return Ok(());
        }
        self.pay(host, ctx, asset, recipient, balance)?;
        host.emit(
            ctx.executing,
            RouterEvent::Swept {
                asset,
                recipient,
                amount: balance,
            },
        );
        tracing::debug!(?asset, %recipient, amount = %balance, "swept");
        Ok(())
    }

    /// Pay a refund clamped to the held balance, then sweep the remainder.
    /// Always emits one summary event carrying both amounts.
    pub fn refund_and_sweep(
        &self,
        host: &mut dyn Host,
        ctx: &ExecutionContext,
        asset: Asset,
        refund_recipient: Address,
        requested_refund: U256,
        sweep_recipient: Address,
    ) -> Result<(), RouterError> {
        self.guard.require_merged(ctx)?;
        let available = self.holding_balance(host, ctx, asset);

        let refunded = if requested_refund > available {
            host.emit(
                ctx.executing,
                RouterEvent::RefundClamped {
                    requested: requested_refund,
                    available,
                },
            );
            tracing::warn!(requested = %requested_refund, %available, "refund clamped to held balance");
            available
        } else {
            requested_refund
        };

        if !refunded.is_zero() {
            self.pay(host, ctx, asset, refund_recipient, refunded)?;
            host.emit(
                ctx.executing,
                RouterEvent::Refunded {
                    asset,
                    recipient: refund_recipient,
                    amount: refunded,
                },
            );
        }

        let remainder = available - refunded;
        if !remainder.is_zero() {
            self.pay(host, ctx, asset, sweep_recipient, remainder)?;
            host.emit(
                ctx.executing,
                RouterEvent::Swept {
                    asset,
                    recipient: sweep_recipient,
                    amount: remainder,
                },
            );
        }

        host.emit(
            ctx.executing,
            RouterEvent::RefundAndSwept {
                asset,
                refund_recipient,
                refunded,
                sweep_recipient,
                swept: remainder,
            },
        );
        Ok(())
    }

    /// Sweep gated on the operation's sentinel: aborts with `SentinelNotSet`
    /// unless a forward leg for `operation_id` has already succeeded.
    pub fn sweep_if_sentinel_set(
        &self,
        host: &mut dyn Host,
        ctx: &ExecutionContext,
        operation_id: OperationId,
        asset: Asset,
        recipient: Address,
    ) -> Result<(), RouterError> {
        self.guard.require_merged(ctx)?;
        if !self.sentinels.is_set(host, ctx, operation_id) {
            return Err(RouterError::SentinelNotSet(operation_id));
        }
        self.sweep(host, ctx, asset, recipient)
    }

    /// Live read of the holding balance; never cached across calls.
    fn holding_balance(&self, host: &dyn Host, ctx: &ExecutionContext, asset: Asset) -> U256 {
        match asset {
            Asset::Native => host.native_balance(ctx.executing),
            Asset::Erc20(token) => host.token_balance(token, ctx.executing),
        }
    }

    fn pay(
        &self,
        host: &mut dyn Host,
        ctx: &ExecutionContext,
        asset: Asset,
        to: Address,
        amount: U256,
    ) -> Result<(), HostError> {
        match asset {
            Asset::Native => host.native_transfer(ctx.executing, to, amount),
            Asset::Erc20(token) => host.token_transfer(token, ctx.executing, to, amount),
        }
    }
}

/// Overwrite the 32-byte window at `offset` with `amount`'s big-endian
/// encoding, after verifying bounds and that the window currently holds
/// `placeholder`. On any failure the payload is left completely unmodified.
pub fn inject_balance(
    payload: &mut [u8],
    offset: usize,
    placeholder: B256,
    amount: U256,
) -> Result<(), RouterError> {
    let window = read_window(payload, offset).ok_or(RouterError::OutOfBounds {
        offset,
        length: payload.len(),
    })?;
    if window != placeholder {
        return Err(RouterError::PlaceholderMismatch {
            offset,
            expected: placeholder,
            found: window,
        });
    }
    write_window(payload, offset, &amount.to_be_bytes::<32>());
    Ok(())
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn placeholder() -> B256 {
        B256::repeat_byte(0xfe)
    }

    #[test]
    fn injection_rewrites_exactly_one_window() {
        let mut payload = vec![0u8; 4];
        payload.extend_from_slice(placeholder().as_slice());
        payload.extend_from_slice(&[0x77; 8]);
        let before = payload.clone();

        inject_balance(&mut payload, 4, placeholder(), U256::from(500u64)).unwrap();

        assert_eq!(&payload[..4], &before[..4]);
        assert_eq!(&payload[36..], &before[36..]);
        assert_eq!(
            U256::from_be_slice(&payload[4..36]),
            U256::from(500u64)
        );
    }

    #[test]
    fn short_payload_is_rejected_untouched() {
        let mut payload = vec![0xab; 20];
        let before = payload.clone();
        let err = inject_balance(&mut payload, 0, B256::ZERO, U256::from(1)).unwrap_err();
        assert_eq!(
            err,
            RouterError::OutOfBounds {
                offset: 0,
                length: 20
            }
        );
        assert_eq!(payload, before);
    }

    #[test]
    fn offset_overflow_is_out_of_bounds() {
        let mut payload = vec![0u8; 64];
        let err = inject_balance(&mut payload, usize::MAX, placeholder(), U256::ZERO).unwrap_err();
        assert!(matches!(err, RouterError::OutOfBounds { .. }));
    }

    #[test]
    fn placeholder_mismatch_is_rejected_untouched() {
        let mut payload = vec![0x11; 40];
        let before = payload.clone();
        let err = inject_balance(&mut payload, 2, placeholder(), U256::from(9)).unwrap_err();
        assert!(matches!(err, RouterError::PlaceholderMismatch { offset: 2, .. }));
        assert_eq!(payload, before);
    }

    proptest! {
        /// For any payload holding the placeholder at `offset`, injection
        /// yields the identical payload except the window now encodes the
        /// amount, and re-reading the window recovers the amount exactly.
        #[test]
        fn placeholder_round_trip(
            prefix in proptest::collection::vec(any::<u8>(), 0..64),
            suffix in proptest::collection::vec(any::<u8>(), 0..64),
            amount_bytes in any::<[u8; 32]>(),
        ) {
            let amount = U256::from_be_bytes(amount_bytes);
            let offset = prefix.len();
            let mut payload = prefix.clone();
            payload.extend_from_slice(placeholder().as_slice());
            payload.extend_from_slice(&suffix);

            inject_balance(&mut payload, offset, placeholder(), amount).unwrap();

            prop_assert_eq!(&payload[..offset], &prefix[..]);
            prop_assert_eq!(&payload[offset + 32..], &suffix[..]);
            prop_assert_eq!(U256::from_be_slice(&payload[offset..offset + 32]), amount);
        }
    }
}
