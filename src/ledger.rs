use std::sync::Arc;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::{
    account::Account,
    operation::{AccountIndex, Amount, Operation, Outcome},
    transfer::{self, Refusal},
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Account {index} does not exist, ledger has {len} accounts")]
    UnknownAccount { index: AccountIndex, len: usize },
}

/// Fixed set of accounts, built once and shared by reference.
#[derive(Debug)]
pub struct Ledger {
    accounts: Vec<Arc<Account>>,
}

impl Ledger {
    pub fn new(opening_balances: impl IntoIterator<Item = Amount>) -> Self {
        Self {
            accounts: opening_balances
                .into_iter()
                .map(|balance| Arc::new(Account::new(balance)))
                .collect(),
        }
    }

    pub fn uniform(count: usize, opening_balance: Amount) -> Self {
        Self::new(std::iter::repeat_n(opening_balance, count))
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn get(&self, index: AccountIndex) -> Result<&Arc<Account>, LedgerError> {
        self.accounts.get(index).ok_or(LedgerError::UnknownAccount {
            index,
            len: self.accounts.len(),
        })
    }

    pub fn accounts(&self) -> &[Arc<Account>] {
        &self.accounts
    }

    /// Balances of every account, indexed like [`Ledger::accounts`], taken at a
    /// single point in time.
    ///
    /// All locks are held at once, acquired in ascending id order like any
    /// transfer would, so no operation can land half way through the read.
    pub fn snapshot(&self) -> Vec<Decimal> {
        let mut order: Vec<AccountIndex> = (0..self.accounts.len()).collect();
        order.sort_by_key(|&index| self.accounts[index].id());

        let guards: Vec<_> = order
            .into_iter()
            .map(|index| (index, self.accounts[index].lock()))
            .collect();

        let mut balances = vec![Decimal::ZERO; self.accounts.len()];
        for (index, guard) in &guards {
            balances[*index] = **guard;
        }
        balances
    }

    pub fn total_balance(&self) -> Decimal {
        self.snapshot().into_iter().sum()
    }

    pub fn process(&self, operation: &Operation) -> Result<Outcome, LedgerError> {
        let outcome = match *operation {
            Operation::Deposit { account, amount } => match self.get(account)?.credit(amount) {
                Some(balance) => Outcome::Deposited { balance },
                None => Outcome::BalanceOverflow,
            },
            Operation::Withdraw { account, amount } => match self.get(account)?.debit(amount) {
                Some(balance) => Outcome::Withdrawn { balance },
                None => Outcome::InsufficientFunds,
            },
            Operation::Transfer { from, to, amount } => {
                match transfer::settle(self.get(from)?, self.get(to)?, amount) {
                    Ok((source_balance, destination_balance)) => Outcome::Transferred {
                        source_balance,
                        destination_balance,
                    },
                    Err(Refusal::SelfTransfer) => Outcome::SelfTransfer,
                    Err(Refusal::InsufficientFunds) => Outcome::InsufficientFunds,
                    Err(Refusal::BalanceOverflow) => Outcome::BalanceOverflow,
                }
            }
        };
        Ok(outcome)
    }
}
