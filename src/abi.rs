//! Solidity ABI surface: the external batch aggregator and the
//! dispatch-routable router operations.
//!
//! Note: the engine itself works on decoded values; having these declarations
//! around keeps ABI expectations explicit and gives the dispatch decoder its
//! selectors.

use alloy_sol_types::sol;

sol! {
    /// One leg of an aggregator batch.
    #[derive(Debug, PartialEq, Eq)]
    struct Call3Value {
        address target;
        bool allowFailure;
        uint256 value;
        bytes callData;
    }

    /// Per-call outcome returned by the aggregator.
    #[derive(Debug, PartialEq, Eq)]
    struct AggregateResult {
        bool success;
        bytes returnData;
    }

    interface IBatchAggregator {
        function aggregate3Value(Call3Value[] calldata calls)
            external
            payable
            returns (AggregateResult[] memory returnData);
    }

    /// The closed set of operations reachable through `dispatch`. The asset
    /// argument uses the zero address for the native asset.
    interface IDelegatedRouter {
        function execute(bytes calldata payload) external payable;
        function pullAndExecute(address asset, bytes calldata payload) external payable;
        function pullAmountAndExecute(address asset, uint256 amount, bytes calldata payload)
            external
            payable;
        function injectAndCall(
            address asset,
            address target,
            bytes calldata payload,
            uint256 offset,
            bytes32 placeholder
        ) external payable;
        function injectSweepAndCall(
            address asset,
            address target,
            bytes calldata payload,
            uint256 offset,
            bytes32 placeholder
        ) external payable;
        function sweep(address asset, address recipient) external;
        function refundAndSweep(
            address asset,
            address refundRecipient,
            uint256 refundAmount,
            address sweepRecipient
        ) external;
        function sweepIfSentinelSet(address asset, address recipient) external;
    }
}
