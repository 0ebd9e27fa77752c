//! Account ledger: balances, allowances and plain transfers
//!
//! Every account carries an optional inline [`Lock`]. The lock engine in
//! [`crate::lock`] extends this ledger with locked transfers and vesting;
//! both share the validate-then-apply discipline used here: a `check_*`
//! method inspects state and returns a [`Movement`], and only
//! [`Ledger::apply`] mutates.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::events::Event;
use crate::lock::{Lock, LockTerms};
use crate::types::{Address, Amount, Timestamp};
use crate::UNLIMITED_ALLOWANCE;

/// Per-address ledger entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Total balance in base units, locked portion included
    pub balance: Amount,

    /// Spender allowances granted by this account
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub allowances: BTreeMap<Address, Amount>,

    /// At most one lock per account
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock: Option<Lock>,
}

impl Account {
    /// Portion of the balance still held by an active lock
    pub fn locked_balance(&self, now: Timestamp) -> Amount {
        self.lock.as_ref().map_or(0, |lock| lock.locked_at(now))
    }

    /// Portion of the balance spendable by a plain transfer
    pub fn unlocked_balance(&self, now: Timestamp) -> Amount {
        self.balance.saturating_sub(self.locked_balance(now))
    }

    /// The lock, if it is still active at `now` and holds tokens
    pub fn active_lock(&self, now: Timestamp) -> Option<&Lock> {
        self.lock
            .as_ref()
            .filter(|lock| lock.is_active(now) && lock.token_amount > 0)
    }

    pub fn allowance(&self, spender: &Address) -> Amount {
        self.allowances.get(spender).copied().unwrap_or(0)
    }
}

/// A validated balance movement, ready to apply
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Movement {
    pub from: Address,
    pub to: Address,
    pub amount: Amount,
    /// Portion drawn from the sender's still-locked tokens
    pub forwarded: Amount,
    /// Lock to create or extend on the recipient
    pub lock: Option<LockTerms>,
    /// Allowance to write back for `(from, spender)` after a delegated move
    pub allowance_update: Option<(Address, Amount)>,
}

impl Movement {
    pub(crate) fn plain(from: Address, to: Address, amount: Amount) -> Self {
        Self {
            from,
            to,
            amount,
            forwarded: 0,
            lock: None,
            allowance_update: None,
        }
    }
}

/// Balance and allowance table keyed by address
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    accounts: BTreeMap<Address, Account>,
    total_supply: Amount,
}

impl Ledger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a ledger whose whole supply is held by `holder`
    pub fn with_genesis(holder: Address, supply: Amount) -> Self {
        let mut ledger = Self::new();
        ledger.accounts.insert(
            holder,
            Account {
                balance: supply,
                ..Account::default()
            },
        );
        ledger.total_supply = supply;
        ledger
    }

    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    pub fn account(&self, address: &Address) -> Option<&Account> {
        self.accounts.get(address)
    }

    pub(crate) fn account_mut(&mut self, address: Address) -> &mut Account {
        self.accounts.entry(address).or_default()
    }

    /// Iterate over all known accounts
    pub fn accounts(&self) -> impl Iterator<Item = (&Address, &Account)> {
        self.accounts.iter()
    }

    pub fn balance_of(&self, address: &Address) -> Amount {
        self.account(address).map_or(0, |a| a.balance)
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.account(owner).map_or(0, |a| a.allowance(spender))
    }

    pub fn locked_balance_of(&self, address: &Address, now: Timestamp) -> Amount {
        self.account(address).map_or(0, |a| a.locked_balance(now))
    }

    pub fn unlocked_balance_of(&self, address: &Address, now: Timestamp) -> Amount {
        self.account(address).map_or(0, |a| a.unlocked_balance(now))
    }

    /// Move `amount` of freely spendable tokens from `from` to `to`
    pub fn transfer(
        &mut self,
        from: Address,
        to: Address,
        amount: Amount,
        now: Timestamp,
    ) -> Result<Vec<Event>> {
        let movement = self.check_transfer(from, to, amount, now)?;
        Ok(self.apply(movement, now))
    }

    /// Move tokens on behalf of `from`, consuming `spender`'s allowance
    pub fn transfer_from(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        amount: Amount,
        now: Timestamp,
    ) -> Result<Vec<Event>> {
        let remaining = self.check_spend_allowance(&from, &spender, amount)?;
        let mut movement = self.check_transfer(from, to, amount, now)?;
        movement.allowance_update = remaining.map(|r| (spender, r));
        Ok(self.apply(movement, now))
    }

    /// Set the allowance of `spender` over `owner`'s tokens
    pub fn approve(&mut self, owner: Address, spender: Address, amount: Amount) -> Result<Vec<Event>> {
        self.check_approval_parties(&owner, &spender)?;
        Ok(vec![self.set_allowance(owner, spender, amount)])
    }

    pub fn increase_allowance(
        &mut self,
        owner: Address,
        spender: Address,
        delta: Amount,
    ) -> Result<Vec<Event>> {
        self.check_approval_parties(&owner, &spender)?;
        let current = self.allowance(&owner, &spender);
        let updated = current.checked_add(delta).ok_or_else(|| {
            Error::AmountOutOfRange(format!("allowance {} + {} overflows", current, delta))
        })?;
        Ok(vec![self.set_allowance(owner, spender, updated)])
    }

    pub fn decrease_allowance(
        &mut self,
        owner: Address,
        spender: Address,
        delta: Amount,
    ) -> Result<Vec<Event>> {
        self.check_approval_parties(&owner, &spender)?;
        let current = self.allowance(&owner, &spender);
        let updated = current
            .checked_sub(delta)
            .ok_or(Error::InsufficientAllowance {
                available: current,
                requested: delta,
            })?;
        Ok(vec![self.set_allowance(owner, spender, updated)])
    }

    fn check_approval_parties(&self, owner: &Address, spender: &Address) -> Result<()> {
        if owner.is_zero() {
            return Err(Error::InvalidSender(*owner));
        }
        if spender.is_zero() {
            return Err(Error::InvalidSpender(*spender));
        }
        Ok(())
    }

    fn set_allowance(&mut self, owner: Address, spender: Address, amount: Amount) -> Event {
        self.account_mut(owner).allowances.insert(spender, amount);
        Event::Approval {
            owner,
            spender,
            amount,
        }
    }

    /// Check that `spender` may move `amount` of `owner`'s tokens. Returns
    /// the allowance left afterwards, or `None` when it is unlimited.
    pub(crate) fn check_spend_allowance(
        &self,
        owner: &Address,
        spender: &Address,
        amount: Amount,
    ) -> Result<Option<Amount>> {
        let current = self.allowance(owner, spender);
        if current == UNLIMITED_ALLOWANCE {
            return Ok(None);
        }
        if amount > current {
            return Err(Error::InsufficientAllowance {
                available: current,
                requested: amount,
            });
        }
        Ok(Some(current - amount))
    }

    pub(crate) fn check_parties(&self, from: &Address, to: &Address) -> Result<()> {
        if from.is_zero() {
            return Err(Error::InvalidSender(*from));
        }
        if to.is_zero() {
            return Err(Error::InvalidRecipient(*to));
        }
        Ok(())
    }

    /// Ensure crediting `to` cannot overflow its balance
    pub(crate) fn check_credit(&self, from: &Address, to: &Address, amount: Amount) -> Result<()> {
        if from == to {
            return Ok(());
        }
        let balance = self.balance_of(to);
        balance.checked_add(amount).map(|_| ()).ok_or_else(|| {
            Error::AmountOutOfRange(format!("balance {} + {} overflows", balance, amount))
        })
    }

    pub(crate) fn check_transfer(
        &self,
        from: Address,
        to: Address,
        amount: Amount,
        now: Timestamp,
    ) -> Result<Movement> {
        self.check_parties(&from, &to)?;
        let available = self.unlocked_balance_of(&from, now);
        if amount > available {
            return Err(Error::InsufficientBalance {
                available,
                requested: amount,
            });
        }
        self.check_credit(&from, &to, amount)?;
        Ok(Movement::plain(from, to, amount))
    }

    /// Drop a lock that has fully vested or holds nothing, emitting
    /// `LockRemoved`
    pub(crate) fn settle_expired_lock(
        &mut self,
        address: Address,
        now: Timestamp,
        events: &mut Vec<Event>,
    ) {
        if let Some(account) = self.accounts.get_mut(&address) {
            if account.active_lock(now).is_none() && account.lock.is_some() {
                account.lock = None;
                events.push(Event::LockRemoved { account: address });
            }
        }
    }

    /// Apply a validated movement. Infallible: every precondition was
    /// established by the `check_*` call that produced `movement`.
    pub(crate) fn apply(&mut self, movement: Movement, now: Timestamp) -> Vec<Event> {
        let Movement {
            from,
            to,
            amount,
            forwarded,
            lock,
            allowance_update,
        } = movement;
        let mut events = Vec::new();

        if let Some((spender, remaining)) = allowance_update {
            self.account_mut(from).allowances.insert(spender, remaining);
        }

        self.settle_expired_lock(from, now, &mut events);

        let sender = self.account_mut(from);
        sender.balance -= amount;
        if forwarded > 0 {
            if let Some(inbound) = sender.lock.as_mut() {
                inbound.token_amount -= forwarded;
                if inbound.token_amount == 0 {
                    sender.lock = None;
                    events.push(Event::LockRemoved { account: from });
                }
            }
        }

        self.account_mut(to).balance += amount;
        events.push(Event::Transfer { from, to, amount });
        debug!("Moved {} from {} to {} ({} forwarded)", amount, from, to, forwarded);

        if let Some(terms) = lock {
            events.extend(self.place_lock(to, amount, terms, now));
        }

        events
    }
}
