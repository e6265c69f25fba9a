use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

use parking_lot::{Mutex, MutexGuard};
use rust_decimal::Decimal;

use crate::operation::Amount;

static NEXT_ACCOUNT_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity handed out once per [`Account`], in creation order.
///
/// It only decides which lock is taken first when two accounts are locked
/// together, so it never changes and never depends on where the account lives
/// in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AccountId(u64);

impl AccountId {
    fn next() -> Self {
        Self(NEXT_ACCOUNT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A balance that is only reachable through its lock.
#[derive(Debug)]
pub struct Account {
    id: AccountId,
    balance: Mutex<Decimal>,
}

impl Account {
    pub fn new(initial_balance: Amount) -> Self {
        Self {
            id: AccountId::next(),
            balance: Mutex::new(initial_balance.value()),
        }
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    /// Current balance. Another actor may change it as soon as this returns.
    pub fn balance(&self) -> Decimal {
        *self.balance.lock()
    }

    /// Adds `amount` to the balance.
    ///
    /// A deposit that would push the balance past [`Decimal::MAX`] is dropped
    /// and the balance stays as it was.
    pub fn deposit(&self, amount: Amount) {
        self.credit(amount);
    }

    /// Returns `false` and leaves the balance untouched when funds are insufficient.
    pub fn withdraw(&self, amount: Amount) -> bool {
        self.debit(amount).is_some()
    }

    /// Deposits and returns the balance seen while the lock was held, or
    /// `None` when the balance would overflow.
    pub(crate) fn credit(&self, amount: Amount) -> Option<Decimal> {
        let mut balance = self.lock();
        let Some(updated) = balance.checked_add(amount.value()) else {
            tracing::warn!(account = %self.id, %amount, balance = %*balance, "deposit refused, balance would overflow");
            return None;
        };
        *balance = updated;
        tracing::debug!(account = %self.id, %amount, balance = %updated, "deposit");
        Some(updated)
    }

    /// Check-then-act under a single lock acquisition.
    pub(crate) fn debit(&self, amount: Amount) -> Option<Decimal> {
        let mut balance = self.lock();
        if *balance < amount.value() {
            tracing::debug!(account = %self.id, %amount, balance = %*balance, "withdraw refused");
            return None;
        }
        *balance -= amount.value();
        let updated = *balance;
        tracing::debug!(account = %self.id, %amount, balance = %updated, "withdraw");
        Some(updated)
    }

    /// Callers holding more than one guard must acquire them in ascending
    /// [`AccountId`] order.
    pub(crate) fn lock(&self) -> MutexGuard<'_, Decimal> {
        self.balance.lock()
    }

    #[cfg(test)]
    pub(crate) fn is_locked(&self) -> bool {
        self.balance.is_locked()
    }
}
