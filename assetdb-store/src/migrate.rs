// SPDX-FileCopyrightText: 2025 Asset Pipeline Maintainers
// SPDX-License-Identifier: MIT

//! Bringing a freshly opened database up to the current schema version.

use rusqlite::{Connection, OptionalExtension, named_params};
use tracing::{debug, info, warn};

use crate::error::{Error, Result, StatementContext};
use crate::schema::{
    CREATE_STATEMENTS, Ddl, HAS_SCHEMA_OBJECT, INDICES, QUERY_VERSION,
    SCHEMA_VERSION, SET_VERSION, SchemaVersion, TABLES, UPGRADE_STEPS,
};
use crate::transaction::TransactionGuard;

/// What opening a database did to its schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// The file held no version; the full schema was created.
    Created,
    /// The stored version already matched.
    Current,
    /// Incremental steps upgraded the database from `from`.
    Upgraded { from: SchemaVersion },
    /// The stored version had no upgrade path; the database was discarded
    /// and recreated empty.
    Recreated { found: i64 },
}

/// Result of inspecting and upgrading in place.
pub(crate) enum Plan {
    Done(MigrationOutcome),
    /// The backing file must be deleted and rebuilt from scratch.
    Recreate { found: i64 },
}

/// Read the stamped version; `None` for a new or foreign file.
pub(crate) fn query_stored_version(conn: &Connection) -> Result<Option<i64>> {
    if !has_object(conn, "table", "dbinfo")? {
        return Ok(None);
    }
    conn.query_row(QUERY_VERSION, [], |row| row.get(0))
        .optional()
        .statement("QueryDatabaseVersion")
}

pub(crate) fn stamp_version(conn: &Connection, version: i64) -> Result<()> {
    conn.execute(SET_VERSION, named_params! { ":version": version })
        .statement("SetDatabaseVersion")?;
    Ok(())
}

fn execute_ddl(conn: &Connection, statements: &[Ddl]) -> Result<()> {
    for ddl in statements {
        conn.execute_batch(ddl.sql).statement(ddl.name)?;
    }
    Ok(())
}

/// Run the full, idempotent DDL and stamp the current version.
pub(crate) fn create_schema(conn: &Connection) -> Result<()> {
    let tx = TransactionGuard::begin(conn)?;
    execute_ddl(conn, CREATE_STATEMENTS)?;
    stamp_version(conn, SCHEMA_VERSION)?;
    tx.commit()?;
    debug!("Created database schema");
    Ok(())
}

/// Compare the stored version with the current one and upgrade in place
/// where a chain of known steps exists.
pub(crate) fn migrate(conn: &Connection) -> Result<Plan> {
    let Some(found) = query_stored_version(conn)? else {
        create_schema(conn)?;
        return Ok(Plan::Done(MigrationOutcome::Created));
    };

    if found == SCHEMA_VERSION {
        // ensure objects from the declared schema exist even if dropped externally
        execute_ddl(conn, CREATE_STATEMENTS)?;
        return Ok(Plan::Done(MigrationOutcome::Current));
    }

    let Some(from) = SchemaVersion::from_stored(found) else {
        return Ok(Plan::Recreate { found });
    };

    let mut at = from;
    for step in UPGRADE_STEPS {
        if step.from != at {
            continue;
        }
        let tx = TransactionGuard::begin(conn)?;
        let applied = execute_ddl(conn, step.statements)
            .and_then(|()| stamp_version(conn, step.to as i64));
        if let Err(error) = applied {
            // a step that cannot run leaves no upgrade path from here
            tx.rollback()?;
            warn!(
                target: "assetdb::migration",
                from = ?step.from,
                to = ?step.to,
                %error,
                "asset database upgrade step failed"
            );
            break;
        }
        tx.commit()?;
        info!(from = ?step.from, to = ?step.to, "upgraded asset database schema");
        at = step.to;
    }

    if at != SchemaVersion::current() {
        return Ok(Plan::Recreate { found });
    }
    execute_ddl(conn, CREATE_STATEMENTS)?;
    Ok(Plan::Done(MigrationOutcome::Upgraded { from }))
}

fn has_object(conn: &Connection, kind: &str, name: &str) -> Result<bool> {
    let count: i64 = conn
        .query_row(
            HAS_SCHEMA_OBJECT,
            named_params! { ":type": kind, ":name": name },
            |row| row.get(0),
        )
        .statement("HasSchemaObject")?;
    Ok(count > 0)
}

/// Fail with a schema error unless every declared table and index exists.
pub(crate) fn verify_schema(conn: &Connection) -> Result<()> {
    for table in TABLES {
        if !has_object(conn, "table", table)? {
            return Err(Error::MissingSchema {
                kind: "table",
                name: table,
            });
        }
    }
    for index in INDICES {
        if !has_object(conn, "index", index)? {
            return Err(Error::MissingSchema {
                kind: "index",
                name: index,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        conn
    }

    #[test]
    fn test_new_database_is_created_and_stamped() {
        let conn = memory();
        assert_eq!(query_stored_version(&conn).unwrap(), None);

        assert!(matches!(
            migrate(&conn).unwrap(),
            Plan::Done(MigrationOutcome::Created)
        ));
        assert_eq!(query_stored_version(&conn).unwrap(), Some(SCHEMA_VERSION));
        verify_schema(&conn).unwrap();
    }

    #[test]
    fn test_current_database_is_left_alone() {
        let conn = memory();
        create_schema(&conn).unwrap();
        assert!(matches!(
            migrate(&conn).unwrap(),
            Plan::Done(MigrationOutcome::Current)
        ));
    }

    #[test]
    fn test_known_version_is_upgraded_in_place() {
        let conn = memory();
        create_schema(&conn).unwrap();
        conn.execute_batch(
            "DROP TABLE SourceDependency; DROP INDEX IndexJobsJobKey; \
             UPDATE dbinfo SET version = 2;",
        )
        .unwrap();

        match migrate(&conn).unwrap() {
            Plan::Done(MigrationOutcome::Upgraded { from }) => {
                assert_eq!(from, SchemaVersion::AddedOutputPrefixToScanFolders)
            }
            _ => panic!("expected an in-place upgrade"),
        }
        assert_eq!(query_stored_version(&conn).unwrap(), Some(SCHEMA_VERSION));
        verify_schema(&conn).unwrap();
    }

    #[test]
    fn test_unknown_versions_require_recreation() {
        for version in [SchemaVersion::Initial as i64, 0, -3, SCHEMA_VERSION + 1] {
            let conn = memory();
            create_schema(&conn).unwrap();
            stamp_version(&conn, version).unwrap();
            assert!(
                matches!(migrate(&conn).unwrap(), Plan::Recreate { found } if found == version),
                "version {version}"
            );
        }
    }

    #[test]
    fn test_failed_step_requires_recreation() {
        let conn = memory();
        create_schema(&conn).unwrap();
        conn.execute_batch(
            "DROP TABLE SourceDependency; DROP INDEX IndexJobsJobKey; \
             CREATE TABLE IndexJobsJobKey (x INTEGER); \
             UPDATE dbinfo SET version = 2;",
        )
        .unwrap();

        assert!(matches!(migrate(&conn).unwrap(), Plan::Recreate { found: 2 }));
        // the failed step was rolled back, not half applied
        assert_eq!(query_stored_version(&conn).unwrap(), Some(2));
        assert!(conn.is_autocommit());
    }

    #[test]
    fn test_missing_table_is_reported() {
        let conn = memory();
        create_schema(&conn).unwrap();
        conn.execute_batch("DROP TABLE Products;").unwrap();
        let err = verify_schema(&conn).unwrap_err();
        assert!(matches!(
            err,
            Error::MissingSchema {
                kind: "table",
                name: "Products"
            }
        ));
    }
}
