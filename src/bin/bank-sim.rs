use std::{fs::File, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use locked_ledger::{
    Amount, Ledger,
    simulation::{
        Simulation, SimulationConfig, csv_parser::read_opening_balances,
        csv_printer::print_balances,
    },
};
use tracing_subscriber::EnvFilter;

/// Simulates bank clients moving money between shared accounts concurrently.
///
/// Operations are narrated on stderr, final balances are printed as CSV on stdout.
#[derive(Parser, Debug)]
#[command(name = "bank-sim", version)]
struct Args {
    /// Number of accounts, each opened with `--opening-balance`
    #[arg(long, default_value_t = 5)]
    accounts: usize,

    /// Opening balance of every account
    #[arg(long, default_value = "1000")]
    opening_balance: Amount,

    /// CSV file with `account,balance` rows, overrides `--accounts` and `--opening-balance`
    #[arg(long)]
    balances: Option<PathBuf>,

    /// Number of concurrent clients
    #[arg(long, default_value_t = 10)]
    clients: usize,

    /// Operations performed by every client
    #[arg(long, default_value_t = 10)]
    iterations: usize,

    /// Amounts are drawn from `0..max-amount`
    #[arg(long, default_value_t = 100)]
    max_amount: u32,

    /// Pause between two operations of the same client, in milliseconds
    #[arg(long, default_value_t = 100)]
    pause_ms: u64,

    /// Seed for the operations clients pick
    #[arg(long)]
    seed: Option<u64>,
}

impl Args {
    fn config(&self) -> SimulationConfig {
        SimulationConfig {
            accounts: self.accounts,
            opening_balance: self.opening_balance,
            clients: self.clients,
            iterations: self.iterations,
            max_amount: self.max_amount,
            pause: Duration::from_millis(self.pause_ms),
            seed: self.seed,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = args.config();

    let simulation = match &args.balances {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open `{}`", path.display()))?;
            let balances = read_opening_balances(file)
                .with_context(|| format!("Failed to read opening balances from `{}`", path.display()))?;
            Simulation::with_ledger(config, Ledger::new(balances))?
        }
        None => Simulation::new(config)?,
    };

    let report = simulation.run().context("Simulation failed")?;
    print_balances(&mut std::io::stdout(), report.closing)?;
    Ok(())
}
