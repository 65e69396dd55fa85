//! Decode dispatch payloads into the closed operation set.
//!
//! The dispatch surface is selector-routed on the wire, but decoding happens
//! up front into a tagged [`RouterOp`] that the router matches exhaustively.
//! Unknown selectors never construct a variant.

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::SolCall;

use crate::{
    abi::{IBatchAggregator, IDelegatedRouter},
    errors::RouterError,
    types::{Asset, BatchCall},
    utils::bytes::selector,
};

/// A fully-decoded router operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RouterOp {
    Execute {
        payload: Bytes,
    },
    PullAndExecute {
        asset: Asset,
        payload: Bytes,
    },
    PullAmountAndExecute {
        asset: Asset,
        amount: U256,
        payload: Bytes,
    },
    InjectAndCall {
        asset: Asset,
        target: Address,
        payload: Bytes,
        offset: usize,
        placeholder: B256,
    },
    InjectSweepAndCall {
        asset: Asset,
        target: Address,
        payload: Bytes,
        offset: usize,
        placeholder: B256,
    },
    Sweep {
        asset: Asset,
        recipient: Address,
    },
    RefundAndSweep {
        asset: Asset,
        refund_recipient: Address,
        refund_amount: U256,
        sweep_recipient: Address,
    },
    SweepIfSentinelSet {
        asset: Asset,
        recipient: Address,
    },
}

impl RouterOp {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Execute { .. } => "execute",
            Self::PullAndExecute { .. } => "pullAndExecute",
            Self::PullAmountAndExecute { .. } => "pullAmountAndExecute",
            Self::InjectAndCall { .. } => "injectAndCall",
            Self::InjectSweepAndCall { .. } => "injectSweepAndCall",
            Self::Sweep { .. } => "sweep",
            Self::RefundAndSweep { .. } => "refundAndSweep",
            Self::SweepIfSentinelSet { .. } => "sweepIfSentinelSet",
        }
    }
}

/// Decode a selector-routed dispatch payload.
///
/// Fails with `UnrecognizedOperation` for selectors outside the closed set and
/// `MalformedPayload` when a recognized selector's arguments do not decode.
pub fn decode_operation(payload: &[u8]) -> Result<RouterOp, RouterError> {
    use IDelegatedRouter::*;

    let sel = selector(payload).ok_or(RouterError::MalformedPayload)?;
    let op = if sel == executeCall::SELECTOR {
        let call = executeCall::abi_decode(payload, true).map_err(|_| RouterError::MalformedPayload)?;
        RouterOp::Execute {
            payload: call.payload,
        }
    } else if sel == pullAndExecuteCall::SELECTOR {
        let call =
            pullAndExecuteCall::abi_decode(payload, true).map_err(|_| RouterError::MalformedPayload)?;
        RouterOp::PullAndExecute {
            asset: Asset::from_address(call.asset),
            payload: call.payload,
        }
    } else if sel == pullAmountAndExecuteCall::SELECTOR {
        let call = pullAmountAndExecuteCall::abi_decode(payload, true)
            .map_err(|_| RouterError::MalformedPayload)?;
        RouterOp::PullAmountAndExecute {
            asset: Asset::from_address(call.asset),
            amount: call.amount,
            payload: call.payload,
        }
    } else if sel == injectAndCallCall::SELECTOR {
        let call =
            injectAndCallCall::abi_decode(payload, true).map_err(|_| RouterError::MalformedPayload)?;
        RouterOp::InjectAndCall {
            asset: Asset::from_address(call.asset),
            target: call.target,
            payload: call.payload,
            offset: decode_offset(call.offset)?,
            placeholder: call.placeholder,
        }
    } else if sel == injectSweepAndCallCall::SELECTOR {
        let call = injectSweepAndCallCall::abi_decode(payload, true)
            .map_err(|_| RouterError::MalformedPayload)?;
        RouterOp::InjectSweepAndCall {
            asset: Asset::from_address(call.asset),
            target: call.target,
            payload: call.payload,
            offset: decode_offset(call.offset)?,
            placeholder: call.placeholder,
        }
    } else if sel == sweepCall::SELECTOR {
        let call = sweepCall::abi_decode(payload, true).map_err(|_| RouterError::MalformedPayload)?;
        RouterOp::Sweep {
            asset: Asset::from_address(call.asset),
            recipient: call.recipient,
        }
    } else if sel == refundAndSweepCall::SELECTOR {
        let call =
            refundAndSweepCall::abi_decode(payload, true).map_err(|_| RouterError::MalformedPayload)?;
        RouterOp::RefundAndSweep {
            asset: Asset::from_address(call.asset),
            refund_recipient: call.refundRecipient,
            refund_amount: call.refundAmount,
            sweep_recipient: call.sweepRecipient,
        }
    } else if sel == sweepIfSentinelSetCall::SELECTOR {
        let call = sweepIfSentinelSetCall::abi_decode(payload, true)
            .map_err(|_| RouterError::MalformedPayload)?;
        RouterOp::SweepIfSentinelSet {
            asset: Asset::from_address(call.asset),
            recipient: call.recipient,
        }
    } else {
        return Err(RouterError::UnrecognizedOperation(sel));
    };
    Ok(op)
}

/// Decode an aggregator batch payload into its legs.
///
/// The leading selector must be the batch-with-value operation; anything else
/// is `UnsupportedOperation`.
pub fn decode_batch(payload: &[u8]) -> Result<Vec<BatchCall>, RouterError> {
    let sel = selector(payload).ok_or(RouterError::MalformedPayload)?;
    if sel != IBatchAggregator::aggregate3ValueCall::SELECTOR {
        return Err(RouterError::UnsupportedOperation(sel));
    }
    let call = IBatchAggregator::aggregate3ValueCall::abi_decode(payload, true)
        .map_err(|_| RouterError::MalformedPayload)?;
    Ok(call
        .calls
        .into_iter()
        .map(|leg| BatchCall {
            target: leg.target,
            allow_failure: leg.allowFailure,
            value: leg.value,
            payload: leg.callData,
        })
        .collect())
}

/// An offset that does not fit the address space cannot index any payload.
fn decode_offset(offset: U256) -> Result<usize, RouterError> {
    usize::try_from(offset).map_err(|_| RouterError::MalformedPayload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::Call3Value;

    #[test]
    fn unknown_selector_is_unrecognized() {
        let payload = [0xde, 0xad, 0xbe, 0xef, 0x00];
        assert_eq!(
            decode_operation(&payload),
            Err(RouterError::UnrecognizedOperation([0xde, 0xad, 0xbe, 0xef]))
        );
    }

    #[test]
    fn short_payload_is_malformed() {
        assert_eq!(decode_operation(&[0x01]), Err(RouterError::MalformedPayload));
    }

    #[test]
    fn sweep_round_trips() {
        let asset = Address::new([0x70; 20]);
        let recipient = Address::new([0x22; 20]);
        let payload = IDelegatedRouter::sweepCall { asset, recipient }.abi_encode();
        assert_eq!(
            decode_operation(&payload),
            Ok(RouterOp::Sweep {
                asset: Asset::Erc20(asset),
                recipient,
            })
        );
    }

    #[test]
    fn truncated_arguments_are_malformed() {
        let asset = Address::new([0x70; 20]);
        let recipient = Address::new([0x22; 20]);
        let mut payload = IDelegatedRouter::sweepCall { asset, recipient }.abi_encode();
        payload.truncate(payload.len() - 1);
        assert_eq!(decode_operation(&payload), Err(RouterError::MalformedPayload));
    }

    #[test]
    fn batch_decode_rejects_foreign_selector() {
        let payload = IDelegatedRouter::sweepCall {
            asset: Address::ZERO,
            recipient: Address::ZERO,
        }
        .abi_encode();
        assert_eq!(
            decode_batch(&payload),
            Err(RouterError::UnsupportedOperation(
                IDelegatedRouter::sweepCall::SELECTOR
            ))
        );
    }

    #[test]
    fn batch_decode_preserves_leg_order() {
        let legs = vec![
            Call3Value {
                target: Address::new([1; 20]),
                allowFailure: false,
                value: U256::from(1),
                callData: Bytes::new(),
            },
            Call3Value {
                target: Address::new([2; 20]),
                allowFailure: true,
                value: U256::from(2),
                callData: Bytes::from(vec![0xaa]),
            },
        ];
        let payload = IBatchAggregator::aggregate3ValueCall { calls: legs }.abi_encode();
        let batch = decode_batch(&payload).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].target, Address::new([1; 20]));
        assert!(batch[1].allow_failure);
        assert_eq!(batch[1].payload.as_ref(), &[0xaa]);
    }
}
