use std::io::Read;

use csv::{DeserializeRecordsIntoIter, Trim};
use serde::Deserialize;

use crate::operation::{AccountIndex, Amount};

use super::SimulationError;

#[derive(Debug, Deserialize)]
pub struct OpeningBalance {
    pub account: AccountIndex,
    pub balance: Amount,
}

/// Parses opening balances in CSV format, with `account,balance` header.
///
/// Yields `(line, row)` pairs so errors can point at the offending line.
pub struct CsvOpeningBalanceParser<R> {
    iter: DeserializeRecordsIntoIter<R, OpeningBalance>,
}

impl<R> CsvOpeningBalanceParser<R>
where
    R: Read,
{
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(Trim::All)
            .from_reader(source);

        Self {
            iter: reader.into_deserialize(),
        }
    }
}

impl<R> Iterator for CsvOpeningBalanceParser<R>
where
    R: Read,
{
    type Item = (u64, csv::Result<OpeningBalance>);

    fn next(&mut self) -> Option<Self::Item> {
        let curr_line = self.iter.reader().position().line();
        self.iter.next().map(|row| (curr_line, row))
    }
}

/// Reads opening balances, which must list accounts `0, 1, 2, ...` in order.
pub fn read_opening_balances<R>(source: R) -> Result<Vec<Amount>, SimulationError>
where
    R: Read,
{
    let mut balances = Vec::new();
    for (line, row) in CsvOpeningBalanceParser::new(source) {
        let row = row.map_err(|source| SimulationError::Csv { line, source })?;
        if row.account != balances.len() {
            return Err(SimulationError::UnexpectedAccount {
                line,
                expected: balances.len(),
                found: row.account,
            });
        }
        balances.push(row.balance);
    }
    Ok(balances)
}
