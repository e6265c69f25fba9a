use std::io::Write;

use csv::Writer;
use rust_decimal::Decimal;
use serde::Serialize;

use super::SimulationError;
use crate::operation::AccountIndex;

#[derive(Debug, Serialize)]
pub struct BalanceRow {
    pub account: AccountIndex,
    pub id: u64,
    pub balance: Decimal,
}

/// Writes closing balances as `account,id,balance` CSV rows, header first.
pub fn print_balances<W: Write>(
    output: &mut W,
    rows: impl IntoIterator<Item = BalanceRow>,
) -> Result<(), SimulationError> {
    let mut writer = Writer::from_writer(output);
    let mut written = 0usize;
    for row in rows {
        writer
            .serialize(&row)
            .map_err(SimulationError::WriteBalances)?;
        written += 1;
    }
    // rows sit in the csv buffer until here
    writer
        .flush()
        .map_err(|err| SimulationError::WriteBalances(err.into()))?;
    tracing::debug!(rows = written, "closing balances written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{io, str::from_utf8};

    use super::*;

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn print_some_balances() {
        let mut output = Vec::new();
        print_balances(
            &mut output,
            [
                BalanceRow {
                    account: 0,
                    id: 7,
                    balance: Decimal::from(1000),
                },
                BalanceRow {
                    account: 1,
                    id: 8,
                    balance: Decimal::new(125, 1),
                },
            ],
        )
        .unwrap();
        assert_eq!(
            from_utf8(&output).unwrap(),
            "account,id,balance\n0,7,1000\n1,8,12.5\n"
        );
    }

    #[test]
    fn write_to_closed_output() {
        let row = BalanceRow {
            account: 0,
            id: 1,
            balance: Decimal::ONE,
        };
        let err = print_balances(&mut ClosedPipe, [row]).unwrap_err();
        assert!(matches!(err, SimulationError::WriteBalances(_)));
        assert!(err.to_string().starts_with("Failed to write closing balances"));
    }
}
