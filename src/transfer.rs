use parking_lot::MutexGuard;
use rust_decimal::Decimal;

use crate::{account::Account, operation::Amount};

/// Moves `amount` from `source` to `destination` as one atomic step.
///
/// Returns `false` without touching either balance when both arguments are the
/// same account, when `source` cannot cover `amount`, or when crediting
/// `destination` would overflow its balance.
pub fn transfer(source: &Account, destination: &Account, amount: Amount) -> bool {
    settle(source, destination, amount).is_ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Refusal {
    SelfTransfer,
    InsufficientFunds,
    BalanceOverflow,
}

/// Same as [`transfer`], but on success returns `(source, destination)`
/// balances read before the locks were released.
pub(crate) fn settle(
    source: &Account,
    destination: &Account,
    amount: Amount,
) -> Result<(Decimal, Decimal), Refusal> {
    if source.id() == destination.id() {
        tracing::debug!(account = %source.id(), %amount, "self transfer refused");
        return Err(Refusal::SelfTransfer);
    }

    let (mut from, mut to) = lock_pair(source, destination);
    if *from < amount.value() {
        tracing::debug!(
            source = %source.id(),
            destination = %destination.id(),
            %amount,
            "transfer refused, insufficient funds"
        );
        return Err(Refusal::InsufficientFunds);
    }
    // both results are known before either balance changes
    let Some(credited) = to.checked_add(amount.value()) else {
        tracing::warn!(
            source = %source.id(),
            destination = %destination.id(),
            %amount,
            "transfer refused, destination balance would overflow"
        );
        return Err(Refusal::BalanceOverflow);
    };
    *from -= amount.value();
    *to = credited;
    tracing::debug!(
        source = %source.id(),
        destination = %destination.id(),
        %amount,
        "transfer"
    );
    Ok((*from, *to))
}

/// Locks both accounts, lower id first, and returns the guards as
/// `(source, destination)`.
fn lock_pair<'a>(
    source: &'a Account,
    destination: &'a Account,
) -> (MutexGuard<'a, Decimal>, MutexGuard<'a, Decimal>) {
    if source.id() < destination.id() {
        let from = source.lock();
        let to = destination.lock();
        (from, to)
    } else {
        let to = destination.lock();
        let from = source.lock();
        (from, to)
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread, time::Duration};

    use crossbeam::channel;

    use super::*;

    fn amount(value: u32) -> Amount {
        Amount::from(value)
    }

    #[test]
    fn transfer_between_accounts() {
        let a = Account::new(amount(200));
        let b = Account::new(amount(100));

        assert!(transfer(&a, &b, amount(50)));
        assert_eq!(a.balance(), Decimal::from(150));
        assert_eq!(b.balance(), Decimal::from(150));

        assert!(!transfer(&a, &b, amount(300)));
        assert_eq!(a.balance(), Decimal::from(150));
        assert_eq!(b.balance(), Decimal::from(150));
    }

    #[test]
    fn transfer_towards_lower_id() {
        let low = Account::new(amount(10));
        let high = Account::new(amount(10));
        assert!(low.id() < high.id());

        assert_eq!(settle(&high, &low, amount(4)), Ok((Decimal::from(6), Decimal::from(14))));
        assert_eq!(low.balance(), Decimal::from(14));
        assert_eq!(high.balance(), Decimal::from(6));
    }

    #[test]
    fn self_transfer_is_refused() {
        let a = Account::new(amount(100));
        assert!(!transfer(&a, &a, amount(10)));
        assert!(!transfer(&a, &a, Amount::ZERO));
        assert_eq!(settle(&a, &a, amount(1)), Err(Refusal::SelfTransfer));
        assert_eq!(a.balance(), Decimal::from(100));
    }

    #[test]
    fn self_transfer_does_not_lock() {
        let a = Account::new(amount(100));
        let _guard = a.lock();
        // would block forever if the lock was requested
        assert!(!transfer(&a, &a, amount(10)));
    }

    #[test]
    fn refused_transfer_leaves_no_lock_behind() {
        let a = Account::new(amount(5));
        let b = Account::new(amount(5));
        assert_eq!(settle(&a, &b, amount(6)), Err(Refusal::InsufficientFunds));
        assert!(!a.is_locked());
        assert!(!b.is_locked());
    }

    #[test]
    fn transfer_into_full_account_moves_nothing() {
        let source = Account::new(amount(10));
        let destination = Account::new(Amount::new(Decimal::MAX - Decimal::from(5)).unwrap());

        assert_eq!(
            settle(&source, &destination, amount(10)),
            Err(Refusal::BalanceOverflow)
        );
        assert!(!transfer(&source, &destination, amount(10)));
        assert_eq!(source.balance(), Decimal::from(10));
        assert_eq!(destination.balance(), Decimal::MAX - Decimal::from(5));
        assert!(!source.is_locked());
        assert!(!destination.is_locked());

        // an amount that still fits goes through
        assert!(transfer(&source, &destination, amount(5)));
        assert_eq!(source.balance(), Decimal::from(5));
        assert_eq!(destination.balance(), Decimal::MAX);
    }

    #[test]
    fn opposite_transfers_do_not_deadlock() {
        let a = Arc::new(Account::new(amount(1000)));
        let b = Arc::new(Account::new(amount(1000)));
        let (done_tx, done_rx) = channel::bounded(2);

        for (from, to) in [(Arc::clone(&a), Arc::clone(&b)), (Arc::clone(&b), Arc::clone(&a))] {
            let done_tx = done_tx.clone();
            thread::spawn(move || {
                for _ in 0..50 {
                    transfer(&from, &to, amount(10));
                }
                done_tx.send(()).unwrap();
            });
        }

        for _ in 0..2 {
            done_rx
                .recv_timeout(Duration::from_secs(10))
                .expect("transfers deadlocked");
        }
        assert_eq!(a.balance() + b.balance(), Decimal::from(2000));
    }
}
