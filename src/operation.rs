use std::{fmt, str::FromStr};

use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

/// Index of an account inside a [`Ledger`](crate::ledger::Ledger).
pub type AccountIndex = usize;

#[derive(Debug, Error)]
pub enum AmountError {
    #[error("Amount must not be negative, got {0}")]
    Negative(Decimal),
    #[error("Amount is not a valid decimal: {0}")]
    Invalid(#[from] rust_decimal::Error),
}

/// Money value that can be deposited, withdrawn or transferred.
///
/// Negative values are rejected at construction, so every operation that takes
/// an `Amount` can rely on it being `>= 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Deserialize)]
#[serde(try_from = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub const ZERO: Amount = Amount(Decimal::ZERO);

    pub fn new(value: Decimal) -> Result<Self, AmountError> {
        if value.is_zero() {
            return Ok(Self::ZERO);
        }
        if value.is_sign_negative() {
            return Err(AmountError::Negative(value));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = AmountError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<u32> for Amount {
    fn from(value: u32) -> Self {
        Self(Decimal::from(value))
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self(Decimal::from(value))
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(Decimal::from_str(s.trim())?)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Deposit,
    Withdraw,
    Transfer,
}

/// A single request against the ledger, addressed by account index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Deposit {
        account: AccountIndex,
        amount: Amount,
    },
    Withdraw {
        account: AccountIndex,
        amount: Amount,
    },
    Transfer {
        from: AccountIndex,
        to: AccountIndex,
        amount: Amount,
    },
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Deposit { .. } => OperationKind::Deposit,
            Operation::Withdraw { .. } => OperationKind::Withdraw,
            Operation::Transfer { .. } => OperationKind::Transfer,
        }
    }

    pub fn amount(&self) -> Amount {
        match *self {
            Operation::Deposit { amount, .. }
            | Operation::Withdraw { amount, .. }
            | Operation::Transfer { amount, .. } => amount,
        }
    }
}

/// What happened to an [`Operation`]. Balances are read while the locks
/// involved in the operation were still held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Deposited {
        balance: Decimal,
    },
    Withdrawn {
        balance: Decimal,
    },
    Transferred {
        source_balance: Decimal,
        destination_balance: Decimal,
    },
    InsufficientFunds,
    SelfTransfer,
    /// The credited balance would exceed [`Decimal::MAX`]; nothing changed.
    BalanceOverflow,
}

impl Outcome {
    pub fn succeeded(&self) -> bool {
        matches!(
            self,
            Outcome::Deposited { .. } | Outcome::Withdrawn { .. } | Outcome::Transferred { .. }
        )
    }
}
