//! Delegated execution and conditional-settlement engine for a
//! wallet-integrated routing layer.
//!
//! The crate is designed to be spliced into a host wallet's execution
//! identity rather than used standalone: a host merges the
//! [`shim::ExecutionShim`]'s logic into its own frame to forward a prepared
//! batch downstream, the shim marks a per-operation success sentinel, and a
//! later merged call into [`router::DelegatedRouter`]'s sentinel-gated sweep
//! releases fees only if that flag is set.
//!
//! Design notes:
//! - Merged-frame execution is explicit: every operation takes an
//!   [`context::ExecutionContext`] naming the identity whose storage and
//!   balances are in effect, and an [`guard::InvocationGuard`] rejects frames
//!   still running under the component's own identity.
//! - All environment effects go through the [`host::Host`] seam; the engine
//!   holds no state of its own beyond the sentinel store's backend cache.
//! - Downstream failure data is carried verbatim, never summarized, so
//!   upstream tooling can decode the real cause.

pub mod abi;
pub mod context;
pub mod decoder;
pub mod errors;
pub mod events;
pub mod guard;
pub mod host;
pub mod router;
pub mod sentinel;
pub mod shim;
pub mod types;
pub mod utils;


pub use context::ExecutionContext;
pub use errors::{DirectInvocation, HostError, RouterError, ShimError, ZeroRouterAddress};
pub use events::RouterEvent;
pub use guard::InvocationGuard;
pub use host::{Host, InMemoryHost};
pub use router::{inject_balance, DelegatedRouter, DispatchOutcome};
pub use sentinel::{
    OperationSentinelStore, PersistentBackend, SentinelStore, TransientBackend,
    SENTINEL_NAMESPACE, SENTINEL_WORD,
};
pub use shim::ExecutionShim;
pub use types::{Asset, BatchCall, CallResult, OperationId};
