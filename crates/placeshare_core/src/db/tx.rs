//! Write-transaction coordinator.
//!
//! # Responsibility
//! - Open the single kind of transaction used for multi-record mutations.
//! - Own the timing policy that bounds lock acquisition and commit.
//!
//! # Invariants
//! - Writes staged under a transaction become visible only on `commit()`.
//! - Dropping a transaction without committing rolls it back, so a failure
//!   after `begin` can never leave a partial write observable.
//! - `TransactionBehavior::Immediate` takes the database write lock up
//!   front. Two transactions mutating the same ownership rows serialize
//!   instead of interleaving, and the second observes the first's committed
//!   state or times out.
//! - Lock waits are bounded by [`WRITE_BUSY_TIMEOUT`]; `SQLITE_BUSY` after
//!   the timeout surfaces as a transaction failure, never as a hang.

use super::DbResult;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::time::Duration;

/// Upper bound for write-lock acquisition and commit, applied to every
/// connection at bootstrap.
pub const WRITE_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Begins an immediate-mode write transaction on the given connection.
///
/// The returned transaction rolls back on drop; callers resolve it by
/// calling `commit()` or by letting it fall out of scope on the error path.
pub fn begin_write_tx(conn: &Connection) -> DbResult<Transaction<'_>> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    Ok(tx)
}
