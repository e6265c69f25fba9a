/// A single balance guarded by its own lock.
/// Every read and write of the balance happens while the lock is held.
pub mod account;

/// Validated amounts plus the operations that can be sent to a [`ledger::Ledger`].
pub mod operation;

/// Atomic two-account transfer. Locks are always taken in ascending
/// [`account::AccountId`] order, which is what keeps concurrent transfers
/// from deadlocking each other.
pub mod transfer;

/// Fixed collection of accounts shared between actors, dispatching
/// [`operation::Operation`] values by account index.
pub mod ledger;

/// Concurrent matrix product where every output cell is computed by its own
/// thread, all of them writing through one lock.
pub mod matrix;

/// Randomized clients hammering a shared ledger, plus CSV helpers used by the
/// `bank-sim` binary. Lives here rather than in the binary so integration
/// tests can drive it.
pub mod simulation;

pub use account::{Account, AccountId};
pub use ledger::Ledger;
pub use operation::Amount;
pub use transfer::transfer;
