// SPDX-FileCopyrightText: 2025 Asset Pipeline Maintainers
// SPDX-License-Identifier: MIT

//! Database connection management.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{Connection, OpenFlags};
use tracing::{debug, info, warn};

use crate::error::{Error, Result, StatementContext};
use crate::migrate::{self, MigrationOutcome, Plan};
use crate::schema::SCHEMA_VERSION;
use crate::statements::StatementId;
use crate::transaction::TransactionGuard;
use crate::types::StoreStatistics;

/// Database open mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Read-only access; the schema must already be current
    ReadOnly,
    /// Read-write access to an existing database
    ReadWrite,
    /// Create new database if it doesn't exist
    Create,
}

/// Per-connection tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    /// How long a statement waits on a lock held by another connection.
    pub busy_timeout: Duration,
    /// Use write-ahead logging for file-backed, writable databases.
    pub wal: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_secs(5),
            wal: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Location {
    File(PathBuf),
    Memory,
}

/// Suffixes of the files SQLite keeps next to the main database file.
const COMPANION_SUFFIXES: [&str; 3] = ["-wal", "-shm", "-journal"];

/// The asset database: one backing file and the connection that owns it.
///
/// A handle starts closed when built with [`AssetDb::new`]; [`AssetDb::load`]
/// opens the file, brings the schema to the current version and prepares
/// every statement. All repository operations fail with
/// [`Error::NotOpen`] while the handle is closed.
#[derive(Debug)]
pub struct AssetDb {
    location: Location,
    mode: OpenMode,
    options: StoreOptions,
    conn: Option<Connection>,
    migration: Option<MigrationOutcome>,
}

impl AssetDb {
    /// A closed handle for the database at `path`.
    pub fn new<P: AsRef<Path>>(path: P, mode: OpenMode) -> Self {
        Self::with_options(path, mode, StoreOptions::default())
    }

    pub fn with_options<P: AsRef<Path>>(path: P, mode: OpenMode, options: StoreOptions) -> Self {
        Self {
            location: Location::File(path.as_ref().to_owned()),
            mode,
            options,
            conn: None,
            migration: None,
        }
    }

    /// Open (and if needed migrate) the database at `path`.
    pub fn open<P: AsRef<Path>>(path: P, mode: OpenMode) -> Result<Self> {
        Self::open_with(path, mode, StoreOptions::default())
    }

    pub fn open_with<P: AsRef<Path>>(path: P, mode: OpenMode, options: StoreOptions) -> Result<Self> {
        let mut db = Self::with_options(path, mode, options);
        db.load()?;
        Ok(db)
    }

    /// Create an in-memory database (for testing).
    ///
    /// The database is initialized with the full schema.
    pub fn open_memory() -> Result<Self> {
        let mut db = Self {
            location: Location::Memory,
            mode: OpenMode::Create,
            options: StoreOptions::default(),
            conn: None,
            migration: None,
        };
        db.load()?;
        Ok(db)
    }

    /// Open the database if it is not open already.
    pub fn load(&mut self) -> Result<()> {
        if self.conn.is_some() {
            return Ok(());
        }
        let conn = self.connect(self.mode)?;
        let (conn, outcome) = if self.mode == OpenMode::ReadOnly {
            check_read_only(&conn)?;
            (conn, MigrationOutcome::Current)
        } else {
            self.bring_current(conn)?
        };
        migrate::verify_schema(&conn)?;
        prepare_statements(&conn)?;

        info!(
            location = %self.describe(),
            mode = ?self.mode,
            outcome = ?outcome,
            "opened asset database"
        );
        self.conn = Some(conn);
        self.migration = Some(outcome);
        Ok(())
    }

    /// Close the connection. Closing a closed handle does nothing.
    pub fn close(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            conn.close()
                .map_err(|(_, source)| source)
                .statement("CloseConnection")?;
            debug!(location = %self.describe(), "closed asset database");
        }
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    /// Wipe the database and reopen it empty at the current version.
    pub fn clear(&mut self) -> Result<()> {
        if self.mode == OpenMode::ReadOnly {
            return Err(Error::InvalidArgument(
                "cannot clear a database opened read-only".into(),
            ));
        }
        self.close()?;
        self.migration = None;
        if let Location::File(path) = &self.location {
            remove_database_files(path)?;
        }
        // the file is gone, so reopening must be allowed to create it
        let conn = self.connect(OpenMode::Create)?;
        migrate::create_schema(&conn)?;
        prepare_statements(&conn)?;
        info!(location = %self.describe(), "cleared asset database");
        self.conn = Some(conn);
        self.migration = Some(MigrationOutcome::Created);
        Ok(())
    }

    /// Whether a backing store already exists at the configured location.
    pub fn data_exists(&self) -> bool {
        match &self.location {
            Location::File(path) => path.exists(),
            Location::Memory => self.conn.is_some(),
        }
    }

    /// Reclaim free pages and refresh the query planner statistics.
    pub fn vacuum_and_analyze(&self) -> Result<()> {
        let conn = self.connection()?;
        conn.execute_batch("VACUUM").statement("Vacuum")?;
        conn.execute_batch("ANALYZE").statement("Analyze")?;
        info!(location = %self.describe(), "vacuumed and analyzed asset database");
        Ok(())
    }

    /// The schema version this build reads and writes.
    pub fn current_version() -> i64 {
        SCHEMA_VERSION
    }

    /// The version stamped in the open database.
    pub fn stored_version(&self) -> Result<Option<i64>> {
        migrate::query_stored_version(self.connection()?)
    }

    /// What the most recent open did to the schema.
    pub fn migration_outcome(&self) -> Option<MigrationOutcome> {
        self.migration
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.location {
            Location::File(path) => Some(path),
            Location::Memory => None,
        }
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    /// Get raw connection (for advanced usage).
    pub fn connection(&self) -> Result<&Connection> {
        self.conn.as_ref().ok_or(Error::NotOpen)
    }

    /// Check if every declared table and index exists.
    pub fn has_schema(&self) -> Result<bool> {
        match migrate::verify_schema(self.connection()?) {
            Ok(()) => Ok(true),
            Err(Error::MissingSchema { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Start a write transaction. Fails if one is already active.
    pub fn transaction(&self) -> Result<TransactionGuard<'_>> {
        TransactionGuard::begin(self.connection()?)
    }

    /// Run `f` atomically.
    ///
    /// Joins the caller's transaction when one is already active, so
    /// repository operations compose inside [`AssetDb::transaction`].
    pub(crate) fn in_transaction<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let conn = self.connection()?;
        if !conn.is_autocommit() {
            return f();
        }
        let tx = TransactionGuard::begin(conn)?;
        let value = f()?;
        tx.commit()?;
        Ok(value)
    }

    /// Row counts of every entity table.
    pub fn statistics(&self) -> Result<StoreStatistics> {
        Ok(StoreStatistics {
            scan_folders: self.count_rows(StatementId::CountScanFolders)?,
            sources: self.count_rows(StatementId::CountSources)?,
            jobs: self.count_rows(StatementId::CountJobs)?,
            products: self.count_rows(StatementId::CountProducts)?,
            source_dependencies: self.count_rows(StatementId::CountSourceDependencies)?,
        })
    }

    fn describe(&self) -> String {
        match &self.location {
            Location::File(path) => path.display().to_string(),
            Location::Memory => ":memory:".to_owned(),
        }
    }

    fn connect(&self, mode: OpenMode) -> Result<Connection> {
        let conn = match &self.location {
            Location::Memory => Connection::open_in_memory().map_err(|source| {
                Error::DatabaseOpen {
                    path: PathBuf::from(":memory:"),
                    source,
                }
            })?,
            Location::File(path) => open_file(path, mode)?,
        };
        self.configure_pragmas(&conn, mode)?;
        Ok(conn)
    }

    /// Configure SQLite pragmas for the connection.
    fn configure_pragmas(&self, conn: &Connection, mode: OpenMode) -> Result<()> {
        conn.busy_timeout(self.options.busy_timeout)
            .statement("ConfigureBusyTimeout")?;
        conn.pragma_update(None, "foreign_keys", true)
            .statement("ConfigureForeignKeys")?;

        let writable_file = matches!(self.location, Location::File(_)) && mode != OpenMode::ReadOnly;
        if self.options.wal && writable_file {
            let journal: String = conn
                .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
                .statement("ConfigureJournalMode")?;
            debug!(journal_mode = %journal, "configured journal mode");
            conn.pragma_update(None, "synchronous", "NORMAL")
                .statement("ConfigureSynchronous")?;
        }
        Ok(())
    }

    /// Migrate in place, or fall back to discarding the database.
    fn bring_current(&self, conn: Connection) -> Result<(Connection, MigrationOutcome)> {
        match migrate::migrate(&conn)? {
            Plan::Done(outcome) => Ok((conn, outcome)),
            Plan::Recreate { found } => {
                warn!(
                    target: "assetdb::migration",
                    location = %self.describe(),
                    found,
                    expected = SCHEMA_VERSION,
                    "asset database has a schema version with no upgrade path; \
                     discarding all stored data and recreating it"
                );
                conn.close()
                    .map_err(|(_, source)| source)
                    .statement("CloseConnection")?;
                if let Location::File(path) = &self.location {
                    remove_database_files(path)?;
                }
                let conn = self.connect(OpenMode::Create)?;
                migrate::create_schema(&conn)?;
                Ok((conn, MigrationOutcome::Recreated { found }))
            }
        }
    }
}

fn open_file(path: &Path, mode: OpenMode) -> Result<Connection> {
    let flags = match mode {
        OpenMode::ReadOnly => {
            if !path.exists() {
                return Err(Error::DatabaseNotFound(path.to_owned()));
            }
            OpenFlags::SQLITE_OPEN_READ_ONLY
        }
        OpenMode::ReadWrite => {
            if !path.exists() {
                return Err(Error::DatabaseNotFound(path.to_owned()));
            }
            OpenFlags::SQLITE_OPEN_READ_WRITE
        }
        OpenMode::Create => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(|e| {
                    Error::io(format!("Failed to create directory {}", parent.display()), e)
                })?;
            }
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE
        }
    };
    let conn = Connection::open_with_flags(path, flags)
        .map_err(|source| Error::DatabaseOpen {
            path: path.to_owned(),
            source,
        })?;
    debug!("Opened database at {} ({:?})", path.display(), mode);
    Ok(conn)
}

/// A read-only handle may not migrate, so anything but the current version
/// is fatal.
fn check_read_only(conn: &Connection) -> Result<()> {
    match migrate::query_stored_version(conn)? {
        Some(SCHEMA_VERSION) => Ok(()),
        found => Err(Error::SchemaVersionMismatch {
            expected: SCHEMA_VERSION,
            found: found.unwrap_or(0),
        }),
    }
}

/// Prepare every registered statement once so a broken statement fails the
/// open rather than the first caller that needs it.
fn prepare_statements(conn: &Connection) -> Result<()> {
    conn.set_prepared_statement_cache_capacity(StatementId::ALL.len());
    for id in StatementId::ALL {
        conn.prepare_cached(id.sql()).statement(*id)?;
    }
    debug!(count = StatementId::ALL.len(), "prepared statements");
    Ok(())
}

fn remove_database_files(path: &Path) -> Result<()> {
    let mut targets = vec![path.to_owned()];
    for suffix in COMPANION_SUFFIXES {
        let mut name = path.as_os_str().to_owned();
        name.push(suffix);
        targets.push(PathBuf::from(name));
    }
    for target in targets {
        match fs::remove_file(&target) {
            Ok(()) => debug!("Deleted {}", target.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(Error::io(
                    format!("Failed to delete {}", target.display()),
                    e,
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::error::ErrorKind;
    use crate::types::ScanFolderEntry;

    #[test]
    fn test_memory_database_is_current() {
        let db = AssetDb::open_memory().unwrap();
        assert!(db.is_open());
        assert!(db.has_schema().unwrap());
        assert_eq!(db.stored_version().unwrap(), Some(AssetDb::current_version()));
        assert_eq!(db.migration_outcome(), Some(MigrationOutcome::Created));
        assert_eq!(db.statistics().unwrap(), StoreStatistics::default());
    }

    #[test]
    fn test_closed_handle_reports_not_open() {
        let dir = TempDir::new().unwrap();
        let db = AssetDb::new(dir.path().join("assets.db"), OpenMode::Create);
        assert!(!db.is_open());
        assert!(!db.data_exists());
        assert!(matches!(db.statistics(), Err(Error::NotOpen)));
    }

    #[test]
    fn test_load_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let mut db = AssetDb::new(dir.path().join("nested/assets.db"), OpenMode::Create);
        db.load().unwrap();
        db.load().unwrap();
        assert!(db.data_exists());
        assert_eq!(db.migration_outcome(), Some(MigrationOutcome::Created));
    }

    #[test]
    fn test_read_write_requires_existing_file() {
        let dir = TempDir::new().unwrap();
        let err = AssetDb::open(dir.path().join("missing.db"), OpenMode::ReadWrite).unwrap_err();
        assert!(matches!(err, Error::DatabaseNotFound(_)));
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_clear_discards_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("assets.db");
        let mut db = AssetDb::open(&path, OpenMode::Create).unwrap();
        let mut folder = ScanFolderEntry::new("/root", "root", "root", "", true);
        db.set_scan_folder(&mut folder).unwrap();
        assert_eq!(db.statistics().unwrap().scan_folders, 1);

        db.clear().unwrap();
        assert!(db.is_open());
        assert_eq!(db.statistics().unwrap().scan_folders, 0);
        assert_eq!(db.stored_version().unwrap(), Some(SCHEMA_VERSION));
    }

    #[test]
    fn test_read_only_refuses_clear_and_writes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("assets.db");
        drop(AssetDb::open(&path, OpenMode::Create).unwrap());

        let mut db = AssetDb::open(&path, OpenMode::ReadOnly).unwrap();
        assert_eq!(db.clear().unwrap_err().kind(), ErrorKind::InvalidArgument);

        let mut folder = ScanFolderEntry::new("/root", "root", "root", "", true);
        assert!(db.set_scan_folder(&mut folder).is_err());
    }

    #[test]
    fn test_vacuum_on_open_database() {
        let db = AssetDb::open_memory().unwrap();
        db.vacuum_and_analyze().unwrap();
    }

    #[test]
    fn test_closed_database_can_be_reloaded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("assets.db");
        let mut db = AssetDb::open(&path, OpenMode::Create).unwrap();
        let mut folder = ScanFolderEntry::new("/root", "root", "root", "", true);
        db.set_scan_folder(&mut folder).unwrap();
        db.close().unwrap();
        db.close().unwrap();
        assert!(db.data_exists());

        db.load().unwrap();
        assert_eq!(db.migration_outcome(), Some(MigrationOutcome::Current));
        assert_eq!(db.get_scan_folder_by_id(folder.id).unwrap(), Some(folder));
    }
}
