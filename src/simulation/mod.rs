//! Drives the ledger the way a bank full of customers would: a number of
//! clients, each on its own thread, firing random operations at shared
//! accounts. Nothing in here synchronizes balances, that is entirely up to
//! [`crate::account`] and [`crate::transfer`].

use std::{sync::Arc, thread, time::Duration};

use crossbeam::{channel, sync::WaitGroup};
use rand::{RngCore, SeedableRng, rngs::StdRng};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    ledger::{Ledger, LedgerError},
    operation::{AccountIndex, Amount},
};
use client::{Client, ClientId, ClientReport};
use csv_printer::BalanceRow;

pub mod client;
pub mod csv_parser;
pub mod csv_printer;

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("Simulation needs at least one account")]
    NoAccounts,
    #[error("Maximum amount must be greater than zero")]
    ZeroMaxAmount,
    #[error("Failed to read CSV at line {line}: {source}")]
    Csv {
        line: u64,
        #[source]
        source: csv::Error,
    },
    #[error("Failed to write closing balances: {0}")]
    WriteBalances(#[source] csv::Error),
    #[error("Line {line}: expected account {expected}, found {found}")]
    UnexpectedAccount {
        line: u64,
        expected: AccountIndex,
        found: AccountIndex,
    },
    #[error("Failed to spawn client {client}: {source}")]
    Spawn {
        client: ClientId,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("Only {finished} of {expected} clients reported back")]
    ClientLost { expected: usize, finished: usize },
    #[error("Money was not conserved: expected a total of {expected}, found {found}")]
    ConservationViolated { expected: Decimal, found: Decimal },
}

#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Number of accounts when no explicit opening balances are given.
    pub accounts: usize,
    pub opening_balance: Amount,
    pub clients: usize,
    /// Operations performed by every client.
    pub iterations: usize,
    /// Amounts are drawn uniformly from `0..max_amount`.
    pub max_amount: u32,
    /// Pause between two operations of the same client.
    pub pause: Duration,
    /// Fixes the operations every client picks. Random when `None`.
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            accounts: 5,
            opening_balance: Amount::from(1000u32),
            clients: 10,
            iterations: 10,
            max_amount: 100,
            pause: Duration::from_millis(100),
            seed: None,
        }
    }
}

#[derive(Debug)]
pub struct SimulationReport {
    pub clients: Vec<ClientReport>,
    pub opening_total: Decimal,
    pub closing: Vec<BalanceRow>,
}

impl SimulationReport {
    pub fn deposited(&self) -> Decimal {
        self.clients.iter().map(|c| c.deposited).sum()
    }

    pub fn withdrawn(&self) -> Decimal {
        self.clients.iter().map(|c| c.withdrawn).sum()
    }

    pub fn closing_total(&self) -> Decimal {
        self.closing.iter().map(|row| row.balance).sum()
    }
}

pub struct Simulation {
    config: SimulationConfig,
    ledger: Arc<Ledger>,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> Result<Self, SimulationError> {
        let ledger = Ledger::uniform(config.accounts, config.opening_balance);
        Self::with_ledger(config, ledger)
    }

    /// Runs against the given accounts; `config.accounts` and
    /// `config.opening_balance` are ignored.
    pub fn with_ledger(config: SimulationConfig, ledger: Ledger) -> Result<Self, SimulationError> {
        if ledger.is_empty() {
            return Err(SimulationError::NoAccounts);
        }
        if config.max_amount == 0 {
            return Err(SimulationError::ZeroMaxAmount);
        }
        Ok(Self {
            config,
            ledger: Arc::new(ledger),
        })
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    /// Launches every client, waits for all of them and checks that the money
    /// in the ledger matches what clients deposited and withdrew.
    pub fn run(&self) -> Result<SimulationReport, SimulationError> {
        let opening_total = self.ledger.total_balance();
        let mut seeder = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        info!(
            accounts = self.ledger.len(),
            clients = self.config.clients,
            %opening_total,
            "starting simulation"
        );

        let wait_group = WaitGroup::new();
        let (reports_tx, reports_rx) = channel::unbounded();
        for id in 0..self.config.clients {
            let client = Client::new(
                id,
                Arc::clone(&self.ledger),
                StdRng::seed_from_u64(seeder.next_u64()),
                self.config.iterations,
                self.config.max_amount,
                self.config.pause,
            );
            let wait_group = wait_group.clone();
            let reports = reports_tx.clone();
            thread::Builder::new()
                .name(format!("client-{id}"))
                .spawn(move || {
                    let result = client.run();
                    if reports.send(result).is_err() {
                        warn!(client = id, "nobody is waiting for the client report");
                    }
                    info!(client = id, "client finished its work");
                    drop(wait_group);
                })
                .map_err(|source| SimulationError::Spawn { client: id, source })?;
        }
        drop(reports_tx);

        // every client sends its report before leaving the group
        wait_group.wait();
        let mut clients = reports_rx
            .try_iter()
            .collect::<Result<Vec<ClientReport>, LedgerError>>()?;
        if clients.len() != self.config.clients {
            return Err(SimulationError::ClientLost {
                expected: self.config.clients,
                finished: clients.len(),
            });
        }
        clients.sort_by_key(|report| report.client);

        let closing = self
            .ledger
            .snapshot()
            .into_iter()
            .zip(self.ledger.accounts())
            .enumerate()
            .map(|(account, (balance, acc))| BalanceRow {
                account,
                id: acc.id().get(),
                balance,
            })
            .collect();
        let report = SimulationReport {
            clients,
            opening_total,
            closing,
        };

        let expected = opening_total + report.deposited() - report.withdrawn();
        let found = report.closing_total();
        if expected != found {
            return Err(SimulationError::ConservationViolated { expected, found });
        }
        info!(
            deposited = %report.deposited(),
            withdrawn = %report.withdrawn(),
            closing_total = %found,
            "all clients finished"
        );
        Ok(report)
    }
}
