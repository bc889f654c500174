// SPDX-FileCopyrightText: 2025 Asset Pipeline Maintainers
// SPDX-License-Identifier: MIT

//! SQLite metadata store for the asset build pipeline.
//!
//! This crate records which source files exist, which build jobs ran against
//! them, which products those jobs emitted and which sources depend on which
//! others. An incremental build orchestrator consults it to decide what must
//! be rebuilt.
//!
//! # Key Features
//!
//! - Versioned schema with in-place upgrades and a logged drop-and-recreate
//!   fallback for versions without an upgrade path
//! - Upsert by natural key (`set_*`) for every entity
//! - Parent-owns-children cascades: scan folder → source → job → product
//! - Lazy, restartable [`Query`] enumeration with early stop
//! - Compound job filters and case-insensitive name patterns
//!
//! # Example
//!
//! ```no_run
//! use assetdb_store::{AssetDb, JobEntry, JobFilter, OpenMode, ScanFolderEntry, SourceEntry};
//! use uuid::Uuid;
//!
//! # fn main() -> assetdb_store::Result<()> {
//! let db = AssetDb::open("assetdb.sqlite", OpenMode::Create)?;
//!
//! let mut folder = ScanFolderEntry::new("/project/assets", "Assets", "assets", "", true);
//! db.set_scan_folder(&mut folder)?;
//!
//! let mut source = SourceEntry::new(folder.id, "textures/rock.png", Uuid::new_v4());
//! db.set_source(&mut source)?;
//!
//! let run_key = db.get_highest_job_run_key()? + 1;
//! let mut job = JobEntry::new(source.id, "texture", "pc", Uuid::new_v4(), run_key);
//! db.set_job(&mut job)?;
//!
//! for job in db.get_jobs_by_source_id(source.id, &JobFilter::any())?.collect_vec()? {
//!     println!("{} {:?}", job.platform, job.status);
//! }
//! # Ok(())
//! # }
//! ```

mod connection;
mod dependency;
mod error;
mod filter;
mod job;
mod job_info;
mod migrate;
mod product;
mod query;
mod scan_folder;
mod schema;
mod source;
mod statements;
mod transaction;
mod types;

pub use connection::{AssetDb, OpenMode, StoreOptions};
pub use error::{Error, ErrorKind, Result};
pub use filter::{JobFilter, LikeType};
pub use migrate::MigrationOutcome;
pub use query::Query;
pub use schema::{INDICES, SCHEMA_VERSION, SchemaVersion, TABLES};
pub use transaction::TransactionGuard;
pub use types::*;
