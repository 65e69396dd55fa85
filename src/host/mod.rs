//! Host environment seam.
//!
//! The engine owns no balances and no storage of its own; every effect goes
//! through the host it is merged into. This trait is the boundary to the
//! collaborators the core consumes: the native/token funds primitives (the
//! "safe" family that never silently no-ops) and raw external calls whose
//! failure data is preserved verbatim. Storage is addressed per identity
//! space, which is what makes merged-frame execution expressible: a component
//! can read its own cached state while writing flags into the host's space.

mod memory;

pub use memory::{CallInput, InMemoryHost, Program};

use alloy_primitives::{Address, Bytes, B256, U256};

use crate::{errors::HostError, events::RouterEvent};

pub trait Host {
    fn native_balance(&self, owner: Address) -> U256;

    /// Move native funds. Must fail (never no-op) when `from` cannot cover `amount`.
    fn native_transfer(&mut self, from: Address, to: Address, amount: U256)
        -> Result<(), HostError>;

    fn token_balance(&self, token: Address, owner: Address) -> U256;

    /// Safe ERC-20 transfer out of `from`'s balance.
    fn token_transfer(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), HostError>;

    /// Safe ERC-20 transfer-from: `spender` draws down its allowance from `owner`.
    fn token_transfer_from(
        &mut self,
        token: Address,
        spender: Address,
        owner: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), HostError>;

    fn token_approve(
        &mut self,
        token: Address,
        owner: Address,
        spender: Address,
        amount: U256,
    ) -> Result<(), HostError>;

    /// Dispatch an external call from `from` with attached native `value`.
    ///
    /// `Err` carries the callee's raw revert payload, unchanged. A failed call
    /// leaves no state behind (the leg is rolled back by the host).
    fn call(
        &mut self,
        from: Address,
        target: Address,
        value: U256,
        payload: &[u8],
    ) -> Result<Bytes, Bytes>;

    fn storage_read(&self, space: Address, slot: B256) -> B256;
    fn storage_write(&mut self, space: Address, slot: B256, word: B256);

    /// Volatile (transaction-scoped) storage. Hosts without the capability
    /// must ignore writes and read zero; callers probe for support.
    fn transient_read(&self, space: Address, slot: B256) -> B256;
    fn transient_write(&mut self, space: Address, slot: B256, word: B256);

    fn emit(&mut self, source: Address, event: RouterEvent);
}
