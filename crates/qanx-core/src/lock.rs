//! Lock engine: linear vesting, hop-limited forwarding and lock placement
//!
//! A lock holds part of an account's balance between `hard_lock_until`
//! (nothing vests before it) and `soft_lock_until` (everything has vested at
//! it). Vested tokens become spendable only after [`Ledger::unlock`]. Locked
//! tokens may be forwarded to another account while `allowed_hops > 0`, and
//! each forward must carry one hop fewer under the same or stricter dates.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::events::Event;
use crate::ledger::{Ledger, Movement};
use crate::types::{check_hops, Address, Amount, Timestamp};

/// The `(hard, soft, hops)` triple that identifies a lock policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LockTerms {
    pub hard_lock_until: Timestamp,
    pub soft_lock_until: Timestamp,
    pub allowed_hops: u64,
}

impl LockTerms {
    pub fn new(hard_lock_until: Timestamp, soft_lock_until: Timestamp, allowed_hops: u64) -> Self {
        Self {
            hard_lock_until,
            soft_lock_until,
            allowed_hops,
        }
    }

    /// Range and ordering checks that hold for every lock
    pub fn check_shape(&self) -> Result<()> {
        check_hops(self.allowed_hops)?;
        if self.soft_lock_until < self.hard_lock_until {
            return Err(Error::InvalidLockOrder {
                hard_lock_until: self.hard_lock_until,
                soft_lock_until: self.soft_lock_until,
            });
        }
        Ok(())
    }

    /// Full validation for a new locked transfer at `now`
    pub fn check_at(&self, now: Timestamp) -> Result<()> {
        check_hops(self.allowed_hops)?;
        if self.hard_lock_until <= now {
            return Err(Error::InvalidHardLock {
                hard_lock_until: self.hard_lock_until,
                now,
            });
        }
        self.check_shape()
    }
}

/// Vesting lock attached to an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lock {
    /// Tokens still held by the lock
    pub token_amount: Amount,
    pub hard_lock_until: Timestamp,
    pub soft_lock_until: Timestamp,
    pub allowed_hops: u64,
    /// Tokens already released by [`Ledger::unlock`]
    #[serde(default)]
    pub released: Amount,
    /// Time of the last partial unlock, 0 if none
    #[serde(default)]
    pub last_unlock: Timestamp,
}

impl Lock {
    pub fn new(token_amount: Amount, terms: LockTerms) -> Self {
        Self {
            token_amount,
            hard_lock_until: terms.hard_lock_until,
            soft_lock_until: terms.soft_lock_until,
            allowed_hops: terms.allowed_hops,
            released: 0,
            last_unlock: 0,
        }
    }

    pub fn terms(&self) -> LockTerms {
        LockTerms::new(self.hard_lock_until, self.soft_lock_until, self.allowed_hops)
    }

    /// A lock is active until it has fully vested
    pub fn is_active(&self, now: Timestamp) -> bool {
        now < self.soft_lock_until
    }

    /// Tokens counted as locked at `now`
    pub fn locked_at(&self, now: Timestamp) -> Amount {
        if self.is_active(now) {
            self.token_amount
        } else {
            0
        }
    }

    /// Tokens vested but not yet released at `now`.
    ///
    /// Everything the lock ever held (`token_amount + released`) vests
    /// linearly over `[hard, soft]`; the result is that schedule minus what
    /// earlier unlocks already released, capped at what the lock still holds.
    /// Tokens merged in later vest from `hard` like the rest.
    pub fn unlockable_at(&self, now: Timestamp) -> Amount {
        if now < self.hard_lock_until {
            return 0;
        }
        if now >= self.soft_lock_until {
            return self.token_amount;
        }
        let total = self.token_amount.saturating_add(self.released);
        let vested = mul_div_floor(
            total,
            now - self.hard_lock_until,
            self.soft_lock_until - self.hard_lock_until,
        );
        vested.saturating_sub(self.released).min(self.token_amount)
    }

    /// Forward rules for sending still-locked tokens under `terms`
    fn check_forward(&self, owner: &Address, terms: &LockTerms) -> Result<()> {
        if self.allowed_hops == 0 {
            return Err(Error::NoHopsRemaining(*owner));
        }
        let expected_hops = self.allowed_hops - 1;
        if terms.allowed_hops != expected_hops {
            return Err(Error::InvalidHopTerms(format!(
                "expected {} hops, got {}",
                expected_hops, terms.allowed_hops
            )));
        }
        if terms.hard_lock_until < self.hard_lock_until {
            return Err(Error::InvalidHopTerms(format!(
                "hard lock {} is before inbound hard lock {}",
                terms.hard_lock_until, self.hard_lock_until
            )));
        }
        if terms.soft_lock_until < self.soft_lock_until {
            return Err(Error::InvalidHopTerms(format!(
                "soft lock {} is before inbound soft lock {}",
                terms.soft_lock_until, self.soft_lock_until
            )));
        }
        Ok(())
    }
}

/// `floor(amount * elapsed / window)` for `elapsed < window`, without
/// overflowing 128 bits.
fn mul_div_floor(amount: Amount, elapsed: u64, window: u64) -> Amount {
    let elapsed = elapsed as u128;
    let window = window as u128;
    (amount / window) * elapsed + (amount % window) * elapsed / window
}

impl Ledger {
    pub fn lock_of(&self, address: &Address) -> Option<&Lock> {
        self.account(address).and_then(|a| a.lock.as_ref())
    }

    pub fn unlockable_balance_of(&self, address: &Address, now: Timestamp) -> Amount {
        self.lock_of(address).map_or(0, |lock| lock.unlockable_at(now))
    }

    /// Release vested tokens of `address` into its spendable balance
    pub fn unlock(&mut self, address: Address, now: Timestamp) -> Result<Vec<Event>> {
        let unlockable = self.unlockable_balance_of(&address, now);
        if unlockable == 0 {
            return Err(Error::NoUnlockableTokens(address));
        }

        let account = self.account_mut(address);
        let mut events = Vec::new();
        if let Some(lock) = account.lock.as_mut() {
            lock.token_amount -= unlockable;
            lock.released = lock.released.saturating_add(unlockable);
            lock.last_unlock = now;
            if lock.token_amount == 0 {
                account.lock = None;
                events.push(Event::LockRemoved { account: address });
                info!("Lock of {} fully released", address);
            } else {
                debug!(
                    "Released {} from lock of {}, {} remaining",
                    unlockable, address, lock.token_amount
                );
            }
        }
        Ok(events)
    }

    /// Transfer `amount` to `to` under a lock with the given terms
    pub fn transfer_locked(
        &mut self,
        from: Address,
        to: Address,
        amount: Amount,
        terms: LockTerms,
        now: Timestamp,
    ) -> Result<Vec<Event>> {
        let movement = self.check_transfer_locked(from, to, amount, terms, now)?;
        Ok(self.apply(movement, now))
    }

    /// Locked transfer on behalf of `from`, consuming `spender`'s allowance
    pub fn transfer_from_locked(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        amount: Amount,
        terms: LockTerms,
        now: Timestamp,
    ) -> Result<Vec<Event>> {
        let remaining = self.check_spend_allowance(&from, &spender, amount)?;
        let mut movement = self.check_transfer_locked(from, to, amount, terms, now)?;
        movement.allowance_update = remaining.map(|r| (spender, r));
        Ok(self.apply(movement, now))
    }

    pub(crate) fn check_transfer_locked(
        &self,
        from: Address,
        to: Address,
        amount: Amount,
        terms: LockTerms,
        now: Timestamp,
    ) -> Result<Movement> {
        self.check_parties(&from, &to)?;
        terms.check_at(now)?;

        let forwarded = self.check_locked_debit(&from, amount, &terms, now)?;
        self.check_credit(&from, &to, amount)?;
        self.check_lock_placement(&to, amount, &terms, now)?;

        Ok(Movement {
            forwarded,
            lock: Some(terms),
            ..Movement::plain(from, to, amount)
        })
    }

    /// Decide how much of `amount` comes out of the sender's lock.
    ///
    /// Unlocked tokens are spent first. Anything beyond them is a forward of
    /// still-locked tokens and must satisfy the hop rules.
    fn check_locked_debit(
        &self,
        from: &Address,
        amount: Amount,
        terms: &LockTerms,
        now: Timestamp,
    ) -> Result<Amount> {
        let unlocked = self.unlocked_balance_of(from, now);
        if amount <= unlocked {
            return Ok(0);
        }

        let inbound = self.account(from).and_then(|a| a.active_lock(now));
        let locked = inbound.map_or(0, |lock| lock.token_amount);
        if amount > unlocked.saturating_add(locked) {
            return Err(Error::InsufficientBalance {
                available: unlocked.saturating_add(locked),
                requested: amount,
            });
        }

        match inbound {
            Some(lock) => {
                lock.check_forward(from, terms)?;
                Ok(amount - unlocked)
            }
            None => Err(Error::InsufficientBalance {
                available: unlocked,
                requested: amount,
            }),
        }
    }

    /// Check that `terms` can be placed on `to`: no active lock, or an
    /// active lock with the identical triple. Zero tokens never place a lock.
    pub(crate) fn check_lock_placement(
        &self,
        to: &Address,
        amount: Amount,
        terms: &LockTerms,
        now: Timestamp,
    ) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        match self.account(to).and_then(|a| a.active_lock(now)) {
            None => Ok(()),
            Some(existing) if existing.terms() == *terms => existing
                .token_amount
                .checked_add(amount)
                .map(|_| ())
                .ok_or_else(|| {
                    Error::AmountOutOfRange(format!(
                        "lock {} + {} overflows",
                        existing.token_amount, amount
                    ))
                }),
            Some(_) => Err(Error::ConflictingLockPolicy(*to)),
        }
    }

    /// Create or extend the lock of `to`. Must follow a successful
    /// [`Ledger::check_lock_placement`].
    pub(crate) fn place_lock(
        &mut self,
        to: Address,
        amount: Amount,
        terms: LockTerms,
        now: Timestamp,
    ) -> Vec<Event> {
        let mut events = Vec::new();
        if amount == 0 {
            return events;
        }
        self.settle_expired_lock(to, now, &mut events);

        let account = self.account_mut(to);
        let total = match account.lock.as_mut() {
            Some(existing) => {
                existing.token_amount += amount;
                existing.token_amount
            }
            None => {
                account.lock = Some(Lock::new(amount, terms));
                amount
            }
        };

        info!(
            "Lock applied to {}: {} locked until {}/{} with {} hops",
            to, total, terms.hard_lock_until, terms.soft_lock_until, terms.allowed_hops
        );
        events.push(Event::LockApplied {
            account: to,
            total_locked: total,
            hard_lock_until: terms.hard_lock_until,
            soft_lock_until: terms.soft_lock_until,
            allowed_hops: terms.allowed_hops,
        });
        events
    }
}
