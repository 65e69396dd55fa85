//! Per-operation success sentinel with volatile and persistent backends.
//!
//! A sentinel is one bit of information ("the forward leg for this operation
//! id succeeded") written into the borrowed (host) storage space at a
//! namespaced slot, and consulted before a conditional sweep is permitted.
//!
//! Two backends share one contract: a transaction-scoped volatile store
//! (preferred; flags die with the transaction, which is all a same-transaction
//! forward-then-sweep needs) and a persistent fallback for hosts without that
//! capability. A one-time round-trip probe picks the backend and caches the
//! choice in the store's own slot 0 of its *own* storage space, so the two
//! backends are never mixed over a deployment's lifetime.

use alloy_primitives::{keccak256, Address, B256};

use crate::{context::ExecutionContext, host::Host, types::OperationId};

/// Namespace mixed into every sentinel slot so flags cannot collide with
/// arbitrary host storage.
pub const SENTINEL_NAMESPACE: &[u8] = b"splice.router.sentinel.v1";

/// The single non-zero word a set sentinel stores. No other value is ever
/// written to a sentinel slot.
pub const SENTINEL_WORD: B256 = B256::with_last_byte(1);

/// Probe/cache slot in the store's own space.
const PROBE_SLOT: B256 = B256::ZERO;

const CACHE_VOLATILE: B256 = B256::with_last_byte(1);
const CACHE_PERSISTENT: B256 = B256::with_last_byte(2);

/// Identical set/is-set contract over either backing store.
pub trait SentinelStore {
    fn set(&self, host: &mut dyn Host, space: Address, slot: B256);
    fn is_set(&self, host: &dyn Host, space: Address, slot: B256) -> bool;
}

/// Transaction-scoped backend; flags vanish at the end of the enclosing
/// transaction.
pub struct TransientBackend;

impl SentinelStore for TransientBackend {
    fn set(&self, host: &mut dyn Host, space: Address, slot: B256) {
        host.transient_write(space, slot, SENTINEL_WORD);
    }

    fn is_set(&self, host: &dyn Host, space: Address, slot: B256) -> bool {
        host.transient_read(space, slot) == SENTINEL_WORD
    }
}

/// Durable backend; flags survive until overwritten. The engine never clears
/// them, since each operation id is meant to be used once.
pub struct PersistentBackend;

impl SentinelStore for PersistentBackend {
    fn set(&self, host: &mut dyn Host, space: Address, slot: B256) {
        host.storage_write(space, slot, SENTINEL_WORD);
    }

    fn is_set(&self, host: &dyn Host, space: Address, slot: B256) -> bool {
        host.storage_read(space, slot) == SENTINEL_WORD
    }
}

/// Facade over the two backends: probes once, caches the choice, and
/// addresses flags in the borrowed (host) storage space.
#[derive(Debug)]
pub struct OperationSentinelStore {
    identity: Address,
}

impl OperationSentinelStore {
    pub const fn new(identity: Address) -> Self {
        Self { identity }
    }

    /// Derived slot = keccak256(namespace || operation id).
    pub fn slot_for(operation_id: OperationId) -> B256 {
        let mut buf = Vec::with_capacity(SENTINEL_NAMESPACE.len() + 32);
        buf.extend_from_slice(SENTINEL_NAMESPACE);
        buf.extend_from_slice(operation_id.as_slice());
        keccak256(buf)
    }

    /// Mark `operation_id` successful in the borrowed (host) storage space.
    ///
    /// Idempotent: re-setting an already-set sentinel writes the same word again.
    pub fn try_set(&self, host: &mut dyn Host, ctx: &ExecutionContext, operation_id: OperationId) {
        let slot = Self::slot_for(operation_id);
        self.backend(host).set(host, ctx.executing, slot);
        tracing::trace!(%operation_id, space = %ctx.executing, "sentinel set");
    }

    /// True iff the sentinel for `operation_id` holds exactly the sentinel word.
    pub fn is_set(
        &self,
        host: &mut dyn Host,
        ctx: &ExecutionContext,
        operation_id: OperationId,
    ) -> bool {
        let slot = Self::slot_for(operation_id);
        self.backend(host).is_set(host, ctx.executing, slot)
    }

    /// Backend selection: cached result wins; otherwise probe once and cache
    /// in the store's own slot 0.
    fn backend(&self, host: &mut dyn Host) -> &'static dyn SentinelStore {
        let cached = host.storage_read(self.identity, PROBE_SLOT);
        if cached == CACHE_VOLATILE {
            return &TransientBackend;
        }
        if cached == CACHE_PERSISTENT {
            return &PersistentBackend;
        }
        let volatile = Self::probe(host, self.identity);
        let cache_word = if volatile {
            CACHE_VOLATILE
        } else {
            CACHE_PERSISTENT
        };
        host.storage_write(self.identity, PROBE_SLOT, cache_word);
        tracing::debug!(volatile, store = %self.identity, "sentinel backend probed");
        if volatile {
            &TransientBackend
        } else {
            &PersistentBackend
        }
    }

    /// Round-trip a word through the volatile store in our own space. Hosts
    /// without the capability read back zero.
    fn probe(host: &mut dyn Host, identity: Address) -> bool {
        host.transient_write(identity, PROBE_SLOT, SENTINEL_WORD);
        host.transient_read(identity, PROBE_SLOT) == SENTINEL_WORD
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::U256;

    use super::*;
    use crate::host::InMemoryHost;

    const STORE: Address = Address::new([0x5e; 20]);
    const HOST_WALLET: Address = Address::new([0xaa; 20]);

    fn ctx() -> ExecutionContext {
        ExecutionContext::new(HOST_WALLET, Address::new([0xcc; 20]), U256::ZERO)
    }

    fn op(n: u8) -> OperationId {
        OperationId::with_last_byte(n)
    }

    #[test]
    fn slots_are_namespaced_and_distinct() {
        let a = OperationSentinelStore::slot_for(op(1));
        let b = OperationSentinelStore::slot_for(op(2));
        assert_ne!(a, b);
        assert_ne!(a, op(1));
    }

    #[test]
    fn set_then_read_through_volatile_backend() {
        let store = OperationSentinelStore::new(STORE);
        let mut host = InMemoryHost::new();
        let ctx = ctx();

        assert!(!store.is_set(&mut host, &ctx, op(1)));
        store.try_set(&mut host, &ctx, op(1));
        assert!(store.is_set(&mut host, &ctx, op(1)));
        assert!(!store.is_set(&mut host, &ctx, op(2)));
    }

    #[test]
    fn persistent_fallback_when_volatile_unavailable() {
        let store = OperationSentinelStore::new(STORE);
        let mut host = InMemoryHost::new();
        host.set_transient_support(false);
        let ctx = ctx();

        store.try_set(&mut host, &ctx, op(7));
        assert!(store.is_set(&mut host, &ctx, op(7)));
        // The flag landed in persistent storage at the derived slot.
        let slot = OperationSentinelStore::slot_for(op(7));
        assert_eq!(host.storage_read(HOST_WALLET, slot), SENTINEL_WORD);
    }

    #[test]
    fn probe_result_is_cached_in_own_slot_zero() {
        let store = OperationSentinelStore::new(STORE);
        let mut host = InMemoryHost::new();
        host.set_transient_support(false);
        let ctx = ctx();

        store.try_set(&mut host, &ctx, op(1));
        assert_eq!(host.storage_read(STORE, B256::ZERO), CACHE_PERSISTENT);

        // Flipping the capability afterwards must not change the backend.
        host.set_transient_support(true);
        store.try_set(&mut host, &ctx, op(2));
        assert!(store.is_set(&mut host, &ctx, op(2)));
        let slot = OperationSentinelStore::slot_for(op(2));
        assert_eq!(host.storage_read(HOST_WALLET, slot), SENTINEL_WORD);
    }

    #[test]
    fn resetting_is_idempotent() {
        let store = OperationSentinelStore::new(STORE);
        let mut host = InMemoryHost::new();
        let ctx = ctx();

        store.try_set(&mut host, &ctx, op(3));
        store.try_set(&mut host, &ctx, op(3));
        assert!(store.is_set(&mut host, &ctx, op(3)));
    }
}
