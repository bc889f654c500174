// SPDX-FileCopyrightText: 2025 Asset Pipeline Maintainers
// SPDX-License-Identifier: MIT

//! Test utilities for assetdb.
//!
//! This crate provides on-disk store fixtures, a seeded ownership chain and
//! proptest strategies for every entity.

use std::ops::Deref;
use std::path::{Path, PathBuf};

use assetdb_store::{
    AssetDb, JobEntry, JobStatus, OpenMode, ProductEntry, ScanFolderEntry, SourceEntry,
    SourceFileDependencyEntry,
};
use proptest::prelude::*;
use tempfile::TempDir;
use uuid::Uuid;

/// Builder identity used by fixtures that do not care about builders.
pub const TEST_BUILDER: Uuid = Uuid::from_u128(0x6275_696c_6465_7200_0000_0000_0000_0001);

/// Asset type used by fixture products.
pub const TEST_ASSET_TYPE: Uuid = Uuid::from_u128(0x7465_7874_7572_6500_0000_0000_0000_0001);

/// A file-backed store living in its own temporary directory.
///
/// The directory (and with it the database) is removed on drop.
pub struct TempStore {
    _dir: TempDir,
    path: PathBuf,
    db: AssetDb,
}

impl TempStore {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let path = dir.path().join("assetdb.sqlite");
        let db = AssetDb::open(&path, OpenMode::Create)?;
        Ok(Self {
            _dir: dir,
            path,
            db,
        })
    }

    /// Location of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn db_mut(&mut self) -> &mut AssetDb {
        &mut self.db
    }

    /// Close the current handle and open the file again with `mode`.
    pub fn reopen(&mut self, mode: OpenMode) -> assetdb_store::Result<()> {
        self.db.close()?;
        self.db = AssetDb::open(&self.path, mode)?;
        Ok(())
    }
}

impl Deref for TempStore {
    type Target = AssetDb;

    fn deref(&self) -> &AssetDb {
        &self.db
    }
}

/// One row of every owned entity, each the parent of the next.
#[derive(Debug, Clone)]
pub struct Chain {
    pub scan_folder: ScanFolderEntry,
    pub source: SourceEntry,
    pub job: JobEntry,
    pub product: ProductEntry,
}

/// Insert scan folder → source → job → product, keyed by `key` so several
/// chains can live in one store.
pub fn seed_chain(db: &AssetDb, key: &str) -> assetdb_store::Result<Chain> {
    let mut scan_folder =
        ScanFolderEntry::new(format!("/project/{key}"), key, format!("{key}-key"), "", false);
    db.set_scan_folder(&mut scan_folder)?;

    let mut source = SourceEntry::new(scan_folder.id, format!("{key}/mesh.fbx"), Uuid::new_v4());
    db.set_source(&mut source)?;

    let run_key = db.get_highest_job_run_key()? + 1;
    let mut job = JobEntry::new(source.id, "mesh", "pc", TEST_BUILDER, run_key);
    job.status = JobStatus::Completed;
    db.set_job(&mut job)?;

    let mut product = ProductEntry::new(job.id, 0, format!("pc/{key}/mesh.azmodel"), TEST_ASSET_TYPE);
    db.set_product(&mut product)?;

    Ok(Chain {
        scan_folder,
        source,
        job,
        product,
    })
}

pub fn arb_guid() -> impl Strategy<Value = Uuid> {
    any::<u128>().prop_map(Uuid::from_u128)
}

/// Relative, slash-separated file names such as `textures/rock.png`.
pub fn arb_source_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,7}(/[a-z][a-z0-9_]{0,7}){0,2}\\.(png|tif|fbx|mat)"
}

pub fn arb_platform() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["pc", "android", "ios", "linux", "mac"]).prop_map(str::to_owned)
}

pub fn arb_job_status() -> impl Strategy<Value = JobStatus> {
    prop::sample::select(JobStatus::ALL.to_vec())
}

prop_compose! {
    pub fn arb_scan_folder()(
        portable_key in "[a-z][a-z0-9]{0,11}",
        path in "/[a-z]{1,12}(/[a-z]{1,12}){0,2}",
        display_name in "[A-Za-z][A-Za-z ]{0,15}",
        output_prefix in "[a-z]{0,6}",
        is_root in any::<bool>(),
    ) -> ScanFolderEntry {
        ScanFolderEntry::new(path, display_name, portable_key, output_prefix, is_root)
    }
}

prop_compose! {
    pub fn arb_source(scan_folder_pk: i64)(
        source_name in arb_source_name(),
        source_guid in arb_guid(),
    ) -> SourceEntry {
        SourceEntry::new(scan_folder_pk, source_name, source_guid)
    }
}

prop_compose! {
    pub fn arb_job(source_pk: i64)(
        job_key in "[a-z]{1,10}",
        platform in arb_platform(),
        builder_guid in arb_guid(),
        job_run_key in 1..1_000_000i64,
        fingerprint in any::<u32>(),
        status in arb_job_status(),
        first_fail_log_time in 0..i64::MAX,
        first_fail_log_file in proptest::option::of("[a-z]{1,8}\\.log"),
        last_fail_log_time in 0..i64::MAX,
        last_fail_log_file in proptest::option::of("[a-z]{1,8}\\.log"),
        last_log_time in 0..i64::MAX,
        last_log_file in proptest::option::of("[a-z]{1,8}\\.log"),
    ) -> JobEntry {
        JobEntry {
            fingerprint,
            status,
            first_fail_log_time,
            first_fail_log_file,
            last_fail_log_time,
            last_fail_log_file,
            last_log_time,
            last_log_file,
            ..JobEntry::new(source_pk, job_key, platform, builder_guid, job_run_key)
        }
    }
}

prop_compose! {
    pub fn arb_product(job_pk: i64)(
        sub_id in any::<u32>(),
        product_name in arb_source_name(),
        asset_type in arb_guid(),
        legacy_guid in arb_guid(),
    ) -> ProductEntry {
        ProductEntry {
            legacy_guid,
            ..ProductEntry::new(job_pk, sub_id, product_name, asset_type)
        }
    }
}

prop_compose! {
    pub fn arb_dependency()(
        builder_guid in arb_guid(),
        source in arb_source_name(),
        depends_on_source in arb_source_name(),
    ) -> SourceFileDependencyEntry {
        SourceFileDependencyEntry::new(builder_guid, source, depends_on_source)
    }
}
