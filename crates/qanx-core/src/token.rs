//! Token facade
//!
//! [`Token`] ties the ledger, the signer registry and the replay guard to
//! one deployment (chain id and contract address). Every state-changing
//! call takes the calling address explicitly and is a single atomic
//! transition: it either returns its events or leaves the token untouched.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::cheque::{ChequeDomain, SignedCheque};
use crate::config::TokenConfig;
use crate::error::{Error, Result};
use crate::events::Event;
use crate::ledger::{Ledger, Movement};
use crate::lock::{Lock, LockTerms};
use crate::replay::ReplayGuard;
use crate::signer::SignerRegistry;
use crate::types::{Address, Amount, ChequeId, Timestamp, MAX_DECIMALS};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    name: String,
    symbol: String,
    decimals: u8,
    chain_id: u64,
    contract: Address,
    ledger: Ledger,
    signer: SignerRegistry,
    replay: ReplayGuard,
}

impl Token {
    /// Deploy a token: the whole supply is minted to the contract pool and
    /// the configured signer becomes the active cheque signer.
    pub fn genesis(config: &TokenConfig) -> Result<Self> {
        config.validate()?;
        let token = Self {
            name: config.name.clone(),
            symbol: config.symbol.clone(),
            decimals: config.decimals,
            chain_id: config.chain_id,
            contract: config.contract_address,
            ledger: Ledger::with_genesis(config.contract_address, config.total_supply),
            signer: SignerRegistry::new(config.cheque_signer)?,
            replay: ReplayGuard::new(),
        };
        info!(
            "Genesis {} ({}) on chain {}: {} minted to {}",
            token.name, token.symbol, token.chain_id, config.total_supply, token.contract
        );
        Ok(token)
    }

    /// Check metadata restored from a snapshot
    pub fn validate(&self) -> Result<()> {
        if self.decimals > MAX_DECIMALS {
            return Err(Error::Config(format!(
                "decimals must be at most {}, got {}",
                MAX_DECIMALS, self.decimals
            )));
        }
        Ok(())
    }

    // ---- metadata ----

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    pub fn total_supply(&self) -> Amount {
        self.ledger.total_supply()
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    /// Domain cheques for this token must be signed in
    pub fn domain(&self) -> ChequeDomain {
        ChequeDomain::new(self.chain_id, self.contract)
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    // ---- queries ----

    pub fn balance_of(&self, account: &Address) -> Amount {
        self.ledger.balance_of(account)
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.ledger.allowance(owner, spender)
    }

    pub fn lock_of(&self, account: &Address) -> Option<&Lock> {
        self.ledger.lock_of(account)
    }

    pub fn locked_balance_of(&self, account: &Address, now: Timestamp) -> Amount {
        self.ledger.locked_balance_of(account, now)
    }

    pub fn unlocked_balance_of(&self, account: &Address, now: Timestamp) -> Amount {
        self.ledger.unlocked_balance_of(account, now)
    }

    pub fn unlockable_balance_of(&self, account: &Address, now: Timestamp) -> Amount {
        self.ledger.unlockable_balance_of(account, now)
    }

    pub fn cheque_signer(&self) -> Address {
        self.signer.active()
    }

    pub fn is_encashed(&self, id: &ChequeId) -> bool {
        self.replay.contains(id)
    }

    pub fn encashed_count(&self) -> usize {
        self.replay.len()
    }

    // ---- transfers and allowances ----

    pub fn transfer(
        &mut self,
        caller: Address,
        to: Address,
        amount: Amount,
        now: Timestamp,
    ) -> Result<Vec<Event>> {
        self.ledger.transfer(caller, to, amount, now)
    }

    pub fn transfer_from(
        &mut self,
        caller: Address,
        from: Address,
        to: Address,
        amount: Amount,
        now: Timestamp,
    ) -> Result<Vec<Event>> {
        self.ledger.transfer_from(caller, from, to, amount, now)
    }

    pub fn approve(&mut self, caller: Address, spender: Address, amount: Amount) -> Result<Vec<Event>> {
        self.ledger.approve(caller, spender, amount)
    }

    pub fn increase_allowance(
        &mut self,
        caller: Address,
        spender: Address,
        delta: Amount,
    ) -> Result<Vec<Event>> {
        self.ledger.increase_allowance(caller, spender, delta)
    }

    pub fn decrease_allowance(
        &mut self,
        caller: Address,
        spender: Address,
        delta: Amount,
    ) -> Result<Vec<Event>> {
        self.ledger.decrease_allowance(caller, spender, delta)
    }

    // ---- locks ----

    pub fn transfer_locked(
        &mut self,
        caller: Address,
        to: Address,
        amount: Amount,
        terms: LockTerms,
        now: Timestamp,
    ) -> Result<Vec<Event>> {
        self.ledger.transfer_locked(caller, to, amount, terms, now)
    }

    pub fn transfer_from_locked(
        &mut self,
        caller: Address,
        from: Address,
        to: Address,
        amount: Amount,
        terms: LockTerms,
        now: Timestamp,
    ) -> Result<Vec<Event>> {
        self.ledger
            .transfer_from_locked(caller, from, to, amount, terms, now)
    }

    pub fn unlock(&mut self, caller: Address, now: Timestamp) -> Result<Vec<Event>> {
        self.ledger.unlock(caller, now)
    }

    // ---- cheques ----

    /// Honor a signed cheque, paying its beneficiary from the pool.
    ///
    /// The cheque is validated completely before its identity is recorded,
    /// so a cheque rejected for any reason can be presented again later.
    pub fn encash_cheque(&mut self, signed: &SignedCheque, now: Timestamp) -> Result<Vec<Event>> {
        let domain = self.domain();
        let id = signed.id(&domain);

        if let Err(e) = signed.verify(&domain, &self.signer.active()) {
            warn!("Rejected cheque {}: invalid signature", id.short());
            return Err(e);
        }

        let cheque = &signed.cheque;
        cheque.terms().check_shape()?;

        if let Err(e) = self.replay.check(&id) {
            warn!("Rejected cheque {}: already encashed", id.short());
            return Err(e);
        }

        let movement =
            self.check_cheque_payout(cheque.beneficiary, cheque.amount, cheque.lock_at(now), now)?;

        self.replay.record(id)?;
        let events = self.ledger.apply(movement, now);
        info!(
            "Encashed cheque {}: {} to {}",
            id.short(),
            cheque.amount,
            cheque.beneficiary
        );
        Ok(events)
    }

    fn check_cheque_payout(
        &self,
        beneficiary: Address,
        amount: Amount,
        lock: Option<LockTerms>,
        now: Timestamp,
    ) -> Result<Movement> {
        if beneficiary == self.contract {
            return Err(Error::InvalidRecipient(beneficiary));
        }
        let mut movement = self
            .ledger
            .check_transfer(self.contract, beneficiary, amount, now)?;
        if let Some(terms) = lock {
            self.ledger
                .check_lock_placement(&beneficiary, amount, &terms, now)?;
            movement.lock = Some(terms);
        }
        Ok(movement)
    }

    /// Hand cheque signing authority to `new_signer`
    pub fn set_cheque_signer(&mut self, caller: Address, new_signer: Address) -> Result<Vec<Event>> {
        Ok(vec![self.signer.delegate(caller, new_signer)?])
    }
}
