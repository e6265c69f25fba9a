use std::{sync::Arc, thread, time::Duration};

use rand::{Rng, rngs::StdRng};
use rust_decimal::Decimal;
use tracing::info;

use crate::{
    ledger::{Ledger, LedgerError},
    operation::{Amount, Operation, OperationKind, Outcome},
};

pub type ClientId = usize;

/// What a single client did during its run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientReport {
    pub client: ClientId,
    pub deposits: usize,
    pub withdrawals: usize,
    pub transfers: usize,
    pub refused: usize,
    /// Sum of successful deposits.
    pub deposited: Decimal,
    /// Sum of successful withdrawals.
    pub withdrawn: Decimal,
}

impl ClientReport {
    fn record(&mut self, operation: &Operation, outcome: &Outcome) {
        let amount = operation.amount().value();
        match (operation.kind(), outcome.succeeded()) {
            (_, false) => self.refused += 1,
            (OperationKind::Deposit, true) => {
                self.deposits += 1;
                self.deposited += amount;
            }
            (OperationKind::Withdraw, true) => {
                self.withdrawals += 1;
                self.withdrawn += amount;
            }
            (OperationKind::Transfer, true) => self.transfers += 1,
        }
    }
}

/// Simulated bank customer picking random operations against a shared ledger.
pub struct Client {
    id: ClientId,
    ledger: Arc<Ledger>,
    rng: StdRng,
    iterations: usize,
    max_amount: u32,
    pause: Duration,
}

impl Client {
    pub fn new(
        id: ClientId,
        ledger: Arc<Ledger>,
        rng: StdRng,
        iterations: usize,
        max_amount: u32,
        pause: Duration,
    ) -> Self {
        Self {
            id,
            ledger,
            rng,
            iterations,
            max_amount,
            pause,
        }
    }

    pub fn run(mut self) -> Result<ClientReport, LedgerError> {
        let mut report = ClientReport {
            client: self.id,
            ..Default::default()
        };
        for _ in 0..self.iterations {
            let operation = self.next_operation();
            let outcome = self.ledger.process(&operation)?;
            self.narrate(&operation, &outcome)?;
            report.record(&operation, &outcome);
            if !self.pause.is_zero() {
                thread::sleep(self.pause);
            }
        }
        Ok(report)
    }

    fn next_operation(&mut self) -> Operation {
        let accounts = self.ledger.len();
        let account = self.rng.gen_range(0..accounts);
        let amount = Amount::from(self.rng.gen_range(0..self.max_amount));
        match self.rng.gen_range(0..3) {
            0 => Operation::Deposit { account, amount },
            1 => Operation::Withdraw { account, amount },
            // the destination may be the source itself, which gets refused
            _ => Operation::Transfer {
                from: account,
                to: self.rng.gen_range(0..accounts),
                amount,
            },
        }
    }

    fn narrate(&self, operation: &Operation, outcome: &Outcome) -> Result<(), LedgerError> {
        let client = self.id;
        match (*operation, *outcome) {
            (Operation::Deposit { account, amount }, Outcome::Deposited { balance }) => {
                let account = self.ledger.get(account)?.id();
                info!(client, %account, %amount, %balance, "deposited");
            }
            (Operation::Withdraw { account, amount }, Outcome::Withdrawn { balance }) => {
                let account = self.ledger.get(account)?.id();
                info!(client, %account, %amount, %balance, "withdrew");
            }
            (Operation::Deposit { account, amount }, Outcome::BalanceOverflow) => {
                let account = self.ledger.get(account)?.id();
                info!(client, %account, %amount, "deposit refused, balance would overflow");
            }
            (Operation::Withdraw { account, amount }, Outcome::InsufficientFunds) => {
                let account = self.ledger.get(account)?.id();
                info!(client, %account, %amount, "withdrawal refused, insufficient funds");
            }
            (
                Operation::Transfer { from, to, amount },
                Outcome::Transferred {
                    source_balance,
                    destination_balance,
                },
            ) => {
                let source = self.ledger.get(from)?.id();
                let destination = self.ledger.get(to)?.id();
                info!(
                    client,
                    %source,
                    %destination,
                    %amount,
                    %source_balance,
                    %destination_balance,
                    "transferred"
                );
            }
            (Operation::Transfer { from, amount, .. }, Outcome::SelfTransfer) => {
                let account = self.ledger.get(from)?.id();
                info!(client, %account, %amount, "transfer refused, same account on both sides");
            }
            (Operation::Transfer { from, to, amount }, Outcome::InsufficientFunds) => {
                let source = self.ledger.get(from)?.id();
                let destination = self.ledger.get(to)?.id();
                info!(
                    client,
                    %source,
                    %destination,
                    %amount,
                    "transfer refused, insufficient funds"
                );
            }
            (Operation::Transfer { from, to, amount }, Outcome::BalanceOverflow) => {
                let source = self.ledger.get(from)?.id();
                let destination = self.ledger.get(to)?.id();
                info!(
                    client,
                    %source,
                    %destination,
                    %amount,
                    "transfer refused, destination balance would overflow"
                );
            }
            (operation, outcome) => {
                unreachable!("{outcome:?} is never produced for {operation:?}")
            }
        }
        Ok(())
    }
}
