// SPDX-FileCopyrightText: 2025 Asset Pipeline Maintainers
// SPDX-License-Identifier: MIT

//! Opening databases stamped with older or unknown schema versions.

use std::io;
use std::sync::{Arc, Mutex};

use assetdb_store::{
    AssetDb, ErrorKind, JobFilter, MigrationOutcome, OpenMode, SCHEMA_VERSION, SchemaVersion,
    StoreStatistics,
};
use assetdb_utils_test::{TempStore, seed_chain};
use rstest::rstest;
use tracing::Level;

/// Rewind the on-disk schema of `store` to look like `version`, then close it.
fn stamp(store: &mut TempStore, version: i64) {
    let conn = store.connection().unwrap();
    conn.execute_batch("DROP TABLE IF EXISTS SourceDependency;").unwrap();
    if version <= SchemaVersion::AddedOutputPrefixToScanFolders as i64 {
        conn.execute_batch("DROP INDEX IF EXISTS IndexJobsJobKey;").unwrap();
    }
    conn.execute("UPDATE dbinfo SET version = ?1", [version]).unwrap();
    store.db_mut().close().unwrap();
}

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[rstest]
#[case::output_prefix(SchemaVersion::AddedOutputPrefixToScanFolders)]
#[case::job_key_index(SchemaVersion::AddedJobKeyIndex)]
#[case::source_guid_index(SchemaVersion::AddedSourceGuidIndex)]
#[test_log::test]
fn test_known_version_is_upgraded_keeping_rows(#[case] from: SchemaVersion) {
    let mut store = TempStore::new().unwrap();
    let chain = seed_chain(&store, "kept").unwrap();
    stamp(&mut store, from as i64);

    store.reopen(OpenMode::ReadWrite).unwrap();
    assert_eq!(store.migration_outcome(), Some(MigrationOutcome::Upgraded { from }));
    assert_eq!(store.stored_version().unwrap(), Some(SCHEMA_VERSION));
    assert!(store.has_schema().unwrap());

    assert_eq!(store.get_source_by_id(chain.source.id).unwrap(), Some(chain.source));
    assert_eq!(store.get_product_by_id(chain.product.id).unwrap(), Some(chain.product));
    // the table added by the upgrade is usable
    assert!(store.get_dependents("anything").unwrap().is_empty().unwrap());
}

#[rstest]
#[case::initial(SchemaVersion::Initial as i64)]
#[case::zero(0)]
#[case::negative(-7)]
#[case::newer(SCHEMA_VERSION + 1)]
#[case::far_future(99)]
fn test_unknown_version_recreates_empty_store(#[case] found: i64) {
    let mut store = TempStore::new().unwrap();
    seed_chain(&store, "lost").unwrap();
    stamp(&mut store, found);

    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(Level::WARN)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    tracing::subscriber::with_default(subscriber, || {
        store.reopen(OpenMode::ReadWrite).unwrap();
    });

    assert_eq!(store.migration_outcome(), Some(MigrationOutcome::Recreated { found }));
    assert_eq!(store.stored_version().unwrap(), Some(SCHEMA_VERSION));
    assert!(store.has_schema().unwrap());
    assert_eq!(store.statistics().unwrap(), StoreStatistics::default());
    assert!(store.get_jobs(&JobFilter::any()).unwrap().is_empty().unwrap());

    let logs = logs.contents();
    assert!(logs.contains("assetdb::migration"), "{logs}");
    assert!(logs.contains(&format!("found={found}")), "{logs}");
}

#[test_log::test]
fn test_failed_upgrade_step_recreates_store() {
    let mut store = TempStore::new().unwrap();
    seed_chain(&store, "blocked").unwrap();
    stamp(&mut store, SchemaVersion::AddedOutputPrefixToScanFolders as i64);
    {
        // occupy the name the 2 -> 3 step wants for its index
        let conn = rusqlite::Connection::open(store.path()).unwrap();
        conn.execute_batch("CREATE TABLE IndexJobsJobKey (x INTEGER);").unwrap();
    }

    store.reopen(OpenMode::ReadWrite).unwrap();
    assert_eq!(
        store.migration_outcome(),
        Some(MigrationOutcome::Recreated {
            found: SchemaVersion::AddedOutputPrefixToScanFolders as i64
        })
    );
    assert!(store.has_schema().unwrap());
    assert_eq!(store.statistics().unwrap(), StoreStatistics::default());

    // the rebuilt file opens cleanly from then on
    store.reopen(OpenMode::ReadWrite).unwrap();
    assert_eq!(store.migration_outcome(), Some(MigrationOutcome::Current));
}

#[test_log::test]
fn test_current_version_is_kept() {
    let mut store = TempStore::new().unwrap();
    let chain = seed_chain(&store, "same").unwrap();
    store.reopen(OpenMode::ReadWrite).unwrap();
    assert_eq!(store.migration_outcome(), Some(MigrationOutcome::Current));
    assert_eq!(store.get_job_by_id(chain.job.id).unwrap(), Some(chain.job));
}

#[test_log::test]
fn test_read_only_never_migrates() {
    let mut store = TempStore::new().unwrap();
    seed_chain(&store, "old").unwrap();
    stamp(&mut store, SchemaVersion::AddedJobKeyIndex as i64);

    let err = AssetDb::open(store.path(), OpenMode::ReadOnly).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Schema);

    // the file was left alone, so a writable open still upgrades it in place
    store.reopen(OpenMode::ReadWrite).unwrap();
    assert_eq!(
        store.migration_outcome(),
        Some(MigrationOutcome::Upgraded {
            from: SchemaVersion::AddedJobKeyIndex
        })
    );
    assert_eq!(store.statistics().unwrap().products, 1);
}

#[test_log::test]
fn test_read_only_open_of_current_store() {
    let mut store = TempStore::new().unwrap();
    let chain = seed_chain(&store, "ro").unwrap();
    store.reopen(OpenMode::ReadOnly).unwrap();
    assert_eq!(store.get_scan_folder_by_id(chain.scan_folder.id).unwrap(), Some(chain.scan_folder));
    assert!(store.db_mut().clear().is_err());
}

#[test_log::test]
fn test_data_exists_and_clear() {
    let mut store = TempStore::new().unwrap();
    assert!(store.data_exists());
    seed_chain(&store, "cleared").unwrap();

    store.db_mut().clear().unwrap();
    assert!(store.data_exists());
    assert_eq!(store.statistics().unwrap(), StoreStatistics::default());
    assert_eq!(store.migration_outcome(), Some(MigrationOutcome::Created));

    store.vacuum_and_analyze().unwrap();
}
