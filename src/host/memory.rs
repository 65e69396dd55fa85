//! In-memory reference host.
//!
//! Models the environment the engine is spliced into: native and token
//! ledgers, per-space persistent and volatile storage, programmable call
//! targets, and a built-in strict batch aggregator implementing the external
//! aggregator contract. Invocations are transactional: `transact` snapshots
//! the world, commits on success, restores on failure, and clears the
//! volatile store either way.

use std::collections::HashMap;

use alloy_primitives::{address, Address, Bytes, B256, U256};
use alloy_sol_types::SolCall;

use crate::{
    abi::{AggregateResult, IBatchAggregator},
    context::ExecutionContext,
    decoder::decode_batch,
    errors::HostError,
    events::RouterEvent,
    host::Host,
};

/// A recorded external call, kept even when the call reverted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallInput {
    pub from: Address,
    pub target: Address,
    pub value: U256,
    pub payload: Bytes,
}

/// Handler installed at a target address. Returns the call's return data, or
/// the revert payload on `Err`.
pub type Program = Box<dyn FnMut(&CallInput) -> Result<Bytes, Bytes>>;

#[derive(Clone, Debug, Default)]
struct TokenLedger {
    balances: HashMap<Address, U256>,
    allowances: HashMap<(Address, Address), U256>,
}

#[derive(Clone, Debug, Default)]
struct WorldState {
    native: HashMap<Address, U256>,
    tokens: HashMap<Address, TokenLedger>,
    storage: HashMap<(Address, B256), B256>,
    transient: HashMap<(Address, B256), B256>,
    events: Vec<(Address, RouterEvent)>,
}

pub struct InMemoryHost {
    state: WorldState,
    programs: HashMap<Address, Program>,
    aggregator: Address,
    transient_enabled: bool,
    calls: Vec<CallInput>,
}

impl InMemoryHost {
    /// Stand-in for the canonical aggregator deployment.
    pub const DEFAULT_AGGREGATOR: Address = address!("cA11bde05977b3631167028862bE2a173976CA11");

    pub fn new() -> Self {
        Self::with_aggregator(Self::DEFAULT_AGGREGATOR)
    }

    pub fn with_aggregator(aggregator: Address) -> Self {
        Self {
            state: WorldState::default(),
            programs: HashMap::new(),
            aggregator,
            transient_enabled: true,
            calls: Vec::new(),
        }
    }

    pub fn aggregator(&self) -> Address {
        self.aggregator
    }

    /// Toggle the volatile-store capability. Real deployments fix this per
    /// runtime; the knob exists so both sentinel backends can be exercised.
    pub fn set_transient_support(&mut self, enabled: bool) {
        self.transient_enabled = enabled;
    }

    pub fn mint_native(&mut self, owner: Address, amount: U256) {
        let entry = self.state.native.entry(owner).or_default();
        *entry = entry.saturating_add(amount);
    }

    pub fn mint_token(&mut self, token: Address, owner: Address, amount: U256) {
        let ledger = self.state.tokens.entry(token).or_default();
        let entry = ledger.balances.entry(owner).or_default();
        *entry = entry.saturating_add(amount);
    }

    pub fn set_allowance(&mut self, token: Address, owner: Address, spender: Address, amount: U256) {
        let ledger = self.state.tokens.entry(token).or_default();
        ledger.allowances.insert((owner, spender), amount);
    }

    pub fn allowance(&self, token: Address, owner: Address, spender: Address) -> U256 {
        self.state
            .tokens
            .get(&token)
            .and_then(|ledger| ledger.allowances.get(&(owner, spender)).copied())
            .unwrap_or_default()
    }

    /// Install a call handler at `at`. Addresses without a program behave like
    /// plain accounts: they accept value and return empty data.
    pub fn install_program(&mut self, at: Address, program: Program) {
        self.programs.insert(at, program);
    }

    pub fn events(&self) -> &[(Address, RouterEvent)] {
        &self.state.events
    }

    pub fn calls(&self) -> &[CallInput] {
        &self.calls
    }

    /// Run `f` as one atomic invocation: the attached native value moves from
    /// caller to the executing identity up front, all effects commit on `Ok`
    /// and are fully discarded on `Err`, and the volatile store is cleared at
    /// the end of the transaction either way.
    pub fn transact<T, E>(
        &mut self,
        ctx: ExecutionContext,
        f: impl FnOnce(&mut Self, &ExecutionContext) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<HostError>,
    {
        let snapshot = self.state.clone();
        let result = self
            .native_transfer(ctx.caller, ctx.executing, ctx.value)
            .map_err(E::from)
            .and_then(|()| f(self, &ctx));
        if result.is_err() {
            self.state = snapshot;
        }
        self.state.transient.clear();
        result
    }

    /// Built-in aggregator: decode the batch, dispatch legs in array order,
    /// bubble a non-tolerant leg's revert data unchanged.
    fn run_aggregator(&mut self, payload: &[u8]) -> Result<Bytes, Bytes> {
        let batch =
            decode_batch(payload).map_err(|e| Bytes::from(format!("aggregator: {e}").into_bytes()))?;
        let mut results = Vec::with_capacity(batch.len());
        for leg in batch {
            match self.call(self.aggregator, leg.target, leg.value, &leg.payload) {
                Ok(return_data) => results.push(AggregateResult {
                    success: true,
                    returnData: return_data,
                }),
                Err(revert_data) => {
                    if leg.allow_failure {
                        results.push(AggregateResult {
                            success: false,
                            returnData: revert_data,
                        });
                    } else {
                        return Err(revert_data);
                    }
                }
            }
        }
        Ok(Bytes::from(
            IBatchAggregator::aggregate3ValueCall::abi_encode_returns(&(results,)),
        ))
    }
}

impl Default for InMemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl Host for InMemoryHost {
    fn native_balance(&self, owner: Address) -> U256 {
        self.state.native.get(&owner).copied().unwrap_or_default()
    }

    fn native_transfer(
        &mut self,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), HostError> {
        if amount.is_zero() {
            return Ok(());
        }
        let available = self.native_balance(from);
        if available < amount {
            return Err(HostError::InsufficientBalance {
                available,
                needed: amount,
            });
        }
        self.state.native.insert(from, available - amount);
        let entry = self.state.native.entry(to).or_default();
        *entry = entry.saturating_add(amount);
        Ok(())
    }

    fn token_balance(&self, token: Address, owner: Address) -> U256 {
        self.state
            .tokens
            .get(&token)
            .and_then(|ledger| ledger.balances.get(&owner).copied())
            .unwrap_or_default()
    }

    fn token_transfer(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), HostError> {
        if amount.is_zero() {
            return Ok(());
        }
        let available = self.token_balance(token, from);
        if available < amount {
            return Err(HostError::InsufficientBalance {
                available,
                needed: amount,
            });
        }
        let ledger = self.state.tokens.entry(token).or_default();
        ledger.balances.insert(from, available - amount);
        let entry = ledger.balances.entry(to).or_default();
        *entry = entry.saturating_add(amount);
        Ok(())
    }

    fn token_transfer_from(
        &mut self,
        token: Address,
        spender: Address,
        owner: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), HostError> {
        if amount.is_zero() {
            return Ok(());
        }
        let allowance = self.allowance(token, owner, spender);
        // U256::MAX is the conventional infinite approval and is not drawn down.
        if allowance != U256::MAX {
            if allowance < amount {
                return Err(HostError::InsufficientAllowance {
                    available: allowance,
                    needed: amount,
                });
            }
            self.set_allowance(token, owner, spender, allowance - amount);
        }
        self.token_transfer(token, owner, to, amount)
    }

    fn token_approve(
        &mut self,
        token: Address,
        owner: Address,
        spender: Address,
        amount: U256,
    ) -> Result<(), HostError> {
        self.set_allowance(token, owner, spender, amount);
        Ok(())
    }

    fn call(
        &mut self,
        from: Address,
        target: Address,
        value: U256,
        payload: &[u8],
    ) -> Result<Bytes, Bytes> {
        let input = CallInput {
            from,
            target,
            value,
            payload: Bytes::copy_from_slice(payload),
        };
        self.calls.push(input.clone());

        let snapshot = self.state.clone();
        if let Err(e) = self.native_transfer(from, target, value) {
            return Err(Bytes::from(format!("{e}").into_bytes()));
        }
        let outcome = if target == self.aggregator {
            self.run_aggregator(payload)
        } else if let Some(mut program) = self.programs.remove(&target) {
            let result = program(&input);
            self.programs.insert(target, program);
            result
        } else {
            // Plain account: value accepted, no code to run.
            Ok(Bytes::new())
        };
        if outcome.is_err() {
            self.state = snapshot;
        }
        outcome
    }

    fn storage_read(&self, space: Address, slot: B256) -> B256 {
        self.state
            .storage
            .get(&(space, slot))
            .copied()
            .unwrap_or_default()
    }

    fn storage_write(&mut self, space: Address, slot: B256, word: B256) {
        self.state.storage.insert((space, slot), word);
    }

    fn transient_read(&self, space: Address, slot: B256) -> B256 {
        if !self.transient_enabled {
            return B256::ZERO;
        }
        self.state
            .transient
            .get(&(space, slot))
            .copied()
            .unwrap_or_default()
    }

    fn transient_write(&mut self, space: Address, slot: B256, word: B256) {
        if !self.transient_enabled {
            return;
        }
        self.state.transient.insert((space, slot), word);
    }

    fn emit(&mut self, source: Address, event: RouterEvent) {
        tracing::trace!(source = %source, ?event, "event emitted");
        self.state.events.push((source, event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: Address = Address::new([0x0a; 20]);
    const B: Address = Address::new([0x0b; 20]);
    const TOKEN: Address = Address::new([0x70; 20]);

    #[test]
    fn native_transfer_checks_balance() {
        let mut host = InMemoryHost::new();
        host.mint_native(A, U256::from(5));
        assert!(host.native_transfer(A, B, U256::from(6)).is_err());
        host.native_transfer(A, B, U256::from(5)).unwrap();
        assert_eq!(host.native_balance(B), U256::from(5));
        assert_eq!(host.native_balance(A), U256::ZERO);
    }

    #[test]
    fn transfer_from_draws_down_finite_allowance_only() {
        let mut host = InMemoryHost::new();
        host.mint_token(TOKEN, A, U256::from(100));
        host.set_allowance(TOKEN, A, B, U256::from(60));
        host.token_transfer_from(TOKEN, B, A, B, U256::from(40)).unwrap();
        assert_eq!(host.allowance(TOKEN, A, B), U256::from(20));

        host.set_allowance(TOKEN, A, B, U256::MAX);
        host.token_transfer_from(TOKEN, B, A, B, U256::from(10)).unwrap();
        assert_eq!(host.allowance(TOKEN, A, B), U256::MAX);
    }

    #[test]
    fn failed_call_rolls_back_the_leg() {
        let mut host = InMemoryHost::new();
        host.mint_native(A, U256::from(10));
        host.install_program(B, Box::new(|_| Err(Bytes::from(vec![0xde, 0xad]))));

        let err = host.call(A, B, U256::from(10), &[]).unwrap_err();
        assert_eq!(err.as_ref(), &[0xde, 0xad]);
        // The attached value bounced back with the rollback.
        assert_eq!(host.native_balance(A), U256::from(10));
        assert_eq!(host.native_balance(B), U256::ZERO);
    }

    #[test]
    fn transact_restores_state_on_error_and_clears_transient() {
        let mut host = InMemoryHost::new();
        host.mint_native(A, U256::from(10));
        let ctx = ExecutionContext::new(B, A, U256::from(10));

        let out: Result<(), HostError> = host.transact(ctx, |host, ctx| {
            host.transient_write(ctx.executing, B256::ZERO, B256::with_last_byte(9));
            host.native_transfer(ctx.executing, Address::new([9; 20]), U256::from(1))?;
            Err(HostError::InsufficientBalance {
                available: U256::ZERO,
                needed: U256::from(1),
            })
        });
        assert!(out.is_err());
        assert_eq!(host.native_balance(A), U256::from(10));
        assert_eq!(host.transient_read(B, B256::ZERO), B256::ZERO);
    }

    #[test]
    fn transact_commits_on_success() {
        let mut host = InMemoryHost::new();
        host.mint_native(A, U256::from(10));
        let ctx = ExecutionContext::new(B, A, U256::from(4));

        let out: Result<(), HostError> = host.transact(ctx, |host, ctx| {
            host.transient_write(ctx.executing, B256::ZERO, B256::with_last_byte(9));
            Ok(())
        });
        assert!(out.is_ok());
        assert_eq!(host.native_balance(B), U256::from(4));
        // Volatile state dies with the transaction even on commit.
        assert_eq!(host.transient_read(B, B256::ZERO), B256::ZERO);
    }
}
