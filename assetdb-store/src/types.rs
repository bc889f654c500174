// SPDX-FileCopyrightText: 2025 Asset Pipeline Maintainers
// SPDX-License-Identifier: MIT

//! Database row types for asset pipeline metadata.

use rusqlite::Row;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use uuid::Uuid;

/// Identity of a row that has not been written to the database yet.
pub const INVALID_ID: i64 = -1;

/// A registered directory that supplies build inputs.
///
/// This represents a row from the ScanFolders table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanFolderEntry {
    /// Database row ID
    pub id: i64,
    /// Absolute location on disk (compared case-insensitively)
    pub path: String,
    /// Name shown to users
    pub display_name: String,
    /// Location-independent key, unique across the table
    pub portable_key: String,
    /// Prefix prepended to product paths of sources in this folder
    pub output_prefix: String,
    /// Whether this is the project root folder
    pub is_root: bool,
}

impl ScanFolderEntry {
    pub fn new(
        path: impl Into<String>,
        display_name: impl Into<String>,
        portable_key: impl Into<String>,
        output_prefix: impl Into<String>,
        is_root: bool,
    ) -> Self {
        Self {
            id: INVALID_ID,
            path: path.into(),
            display_name: display_name.into(),
            portable_key: portable_key.into(),
            output_prefix: output_prefix.into(),
            is_root,
        }
    }

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            path: row.get(1)?,
            display_name: row.get(2)?,
            portable_key: row.get(3)?,
            output_prefix: row.get(4)?,
            is_root: row.get(5)?,
        })
    }
}

/// One tracked input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    /// Database row ID
    pub id: i64,
    /// Owning scan folder
    pub scan_folder_pk: i64,
    /// Path relative to the scan folder (compared case-insensitively)
    pub source_name: String,
    /// Stable identity that survives renames and moves
    pub source_guid: Uuid,
}

impl SourceEntry {
    pub fn new(scan_folder_pk: i64, source_name: impl Into<String>, source_guid: Uuid) -> Self {
        Self {
            id: INVALID_ID,
            scan_folder_pk,
            source_name: source_name.into(),
            source_guid,
        }
    }

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            scan_folder_pk: row.get(1)?,
            source_name: row.get(2)?,
            source_guid: row.get(3)?,
        })
    }
}

/// Processing state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum JobStatus {
    Pending = 0,
    InProgress = 1,
    Failed = 2,
    FailedInvalidSourceNameExceedsMaxLimit = 3,
    Completed = 4,
    Missing = 5,
}

impl JobStatus {
    pub const ALL: [JobStatus; 6] = [
        JobStatus::Pending,
        JobStatus::InProgress,
        JobStatus::Failed,
        JobStatus::FailedInvalidSourceNameExceedsMaxLimit,
        JobStatus::Completed,
        JobStatus::Missing,
    ];

    pub fn from_i64(value: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|status| *status as i64 == value)
    }

    pub fn is_failure(self) -> bool {
        matches!(
            self,
            JobStatus::Failed | JobStatus::FailedInvalidSourceNameExceedsMaxLimit
        )
    }
}

impl ToSql for JobStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(*self as i32))
    }
}

impl FromSql for JobStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let raw = value.as_i64()?;
        JobStatus::from_i64(raw).ok_or(FromSqlError::OutOfRange(raw))
    }
}

/// One run of a builder against a source for a platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobEntry {
    /// Database row ID
    pub id: i64,
    /// Source the job processed
    pub source_pk: i64,
    /// Distinguishes multiple jobs emitted for one source
    pub job_key: String,
    /// Summary of the inputs at the last run, owned by the scheduler
    pub fingerprint: u32,
    /// Target platform identifier
    pub platform: String,
    /// Identity of the builder that created the job
    pub builder_guid: Uuid,
    pub status: JobStatus,
    /// Build pass this job belongs to; always positive once stored
    pub job_run_key: i64,
    pub first_fail_log_time: i64,
    pub first_fail_log_file: Option<String>,
    pub last_fail_log_time: i64,
    pub last_fail_log_file: Option<String>,
    pub last_log_time: i64,
    pub last_log_file: Option<String>,
}

impl JobEntry {
    pub fn new(
        source_pk: i64,
        job_key: impl Into<String>,
        platform: impl Into<String>,
        builder_guid: Uuid,
        job_run_key: i64,
    ) -> Self {
        Self {
            id: INVALID_ID,
            source_pk,
            job_key: job_key.into(),
            fingerprint: 0,
            platform: platform.into(),
            builder_guid,
            status: JobStatus::Pending,
            job_run_key,
            first_fail_log_time: 0,
            first_fail_log_file: None,
            last_fail_log_time: 0,
            last_fail_log_file: None,
            last_log_time: 0,
            last_log_file: None,
        }
    }

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            source_pk: row.get(1)?,
            job_key: row.get(2)?,
            fingerprint: row.get(3)?,
            platform: row.get(4)?,
            builder_guid: row.get(5)?,
            status: row.get(6)?,
            job_run_key: row.get(7)?,
            first_fail_log_time: row.get(8)?,
            first_fail_log_file: row.get(9)?,
            last_fail_log_time: row.get(10)?,
            last_fail_log_file: row.get(11)?,
            last_log_time: row.get(12)?,
            last_log_file: row.get(13)?,
        })
    }
}

/// An output artifact emitted by a completed job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductEntry {
    /// Database row ID
    pub id: i64,
    /// Job that emitted the product
    pub job_pk: i64,
    /// Distinguishes multiple outputs of one job
    pub sub_id: u32,
    pub product_name: String,
    pub asset_type: Uuid,
    pub legacy_guid: Uuid,
}

impl ProductEntry {
    pub fn new(job_pk: i64, sub_id: u32, product_name: impl Into<String>, asset_type: Uuid) -> Self {
        Self {
            id: INVALID_ID,
            job_pk,
            sub_id,
            product_name: product_name.into(),
            asset_type,
            legacy_guid: Uuid::nil(),
        }
    }

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            job_pk: row.get(1)?,
            sub_id: row.get(2)?,
            product_name: row.get(3)?,
            asset_type: row.get(4)?,
            legacy_guid: row.get(5)?,
        })
    }
}

/// A builder-declared edge: `source` depends on `depends_on_source`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFileDependencyEntry {
    /// Database row ID
    pub id: i64,
    /// Builder that declared the dependency
    pub builder_guid: Uuid,
    /// Path of the dependent file
    pub source: String,
    /// Path of the file it depends on
    pub depends_on_source: String,
}

impl SourceFileDependencyEntry {
    pub fn new(
        builder_guid: Uuid,
        source: impl Into<String>,
        depends_on_source: impl Into<String>,
    ) -> Self {
        Self {
            id: INVALID_ID,
            builder_guid,
            source: source.into(),
            depends_on_source: depends_on_source.into(),
        }
    }

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            builder_guid: row.get(1)?,
            source: row.get(2)?,
            depends_on_source: row.get(3)?,
        })
    }
}

/// A job joined with the names of its source and scan folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobInfo {
    pub job: JobEntry,
    pub source_name: String,
    /// Path of the scan folder that owns the source
    pub scan_folder_path: String,
}

impl JobInfo {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            job: JobEntry::from_row(row)?,
            source_name: row.get(14)?,
            scan_folder_path: row.get(15)?,
        })
    }
}

/// Row counts of every entity table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStatistics {
    pub scan_folders: u64,
    pub sources: u64,
    pub jobs: u64,
    pub products: u64,
    pub source_dependencies: u64,
}
