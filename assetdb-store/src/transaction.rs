// SPDX-FileCopyrightText: 2025 Asset Pipeline Maintainers
// SPDX-License-Identifier: MIT

//! Scoped write transactions.

use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::debug;

use crate::error::{Error, Result, StatementContext};

/// An open transaction on the database connection.
///
/// Dropping the guard without calling [`TransactionGuard::commit`] rolls the
/// transaction back, so an early `?` return never leaves a half-applied
/// mutation behind. Only one guard may be live per connection.
pub struct TransactionGuard<'conn> {
    tx: Transaction<'conn>,
}

impl<'conn> TransactionGuard<'conn> {
    pub(crate) fn begin(conn: &'conn Connection) -> Result<Self> {
        if !conn.is_autocommit() {
            return Err(Error::NestedTransaction);
        }
        let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)
            .statement("BeginTransaction")?;
        Ok(Self { tx })
    }

    pub fn commit(self) -> Result<()> {
        self.tx.commit().statement("CommitTransaction")
    }

    pub fn rollback(self) -> Result<()> {
        debug!("rolling back transaction");
        self.tx.rollback().statement("RollbackTransaction")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (v INTEGER);").unwrap();
        conn
    }

    fn count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM t", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_commit_persists() {
        let conn = connection();
        let guard = TransactionGuard::begin(&conn).unwrap();
        conn.execute("INSERT INTO t VALUES (1)", []).unwrap();
        guard.commit().unwrap();
        assert_eq!(count(&conn), 1);
        assert!(conn.is_autocommit());
    }

    #[test]
    fn test_drop_rolls_back() {
        let conn = connection();
        {
            let _guard = TransactionGuard::begin(&conn).unwrap();
            conn.execute("INSERT INTO t VALUES (1)", []).unwrap();
        }
        assert_eq!(count(&conn), 0);
        assert!(conn.is_autocommit());
    }

    #[test]
    fn test_nested_begin_fails_fast() {
        let conn = connection();
        let guard = TransactionGuard::begin(&conn).unwrap();
        let err = TransactionGuard::begin(&conn).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        guard.rollback().unwrap();

        // the connection is usable again afterwards
        TransactionGuard::begin(&conn).unwrap().commit().unwrap();
    }
}
