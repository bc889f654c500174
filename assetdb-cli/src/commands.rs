// SPDX-FileCopyrightText: 2025 Asset Pipeline Maintainers
// SPDX-License-Identifier: MIT

use std::io::Write;
use std::ops::ControlFlow;
use std::path::PathBuf;

use assetdb_store::{AssetDb, LikeType, OpenMode, Query, SourceFileDependencyEntry};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{CliError, IoContext};

#[derive(Parser, Debug)]
#[command(name = "assetdb", version, about = "Inspect and maintain asset pipeline databases")]
pub struct Cli {
    /// Database file, overriding the configured `db_path`
    #[arg(long, global = true, env = "ASSETDB_PATH")]
    pub db: Option<PathBuf>,

    /// Config file to load instead of `./assetdb.toml`
    #[arg(long, global = true, env = "ASSETDB_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Report whether the database file exists
    Exists,
    /// Open the database, upgrading it if needed, and print a summary
    Info,
    /// Delete every row and recreate the schema
    Clear {
        /// Confirm the wipe
        #[arg(long)]
        yes: bool,
    },
    /// Reclaim free pages and refresh planner statistics
    Vacuum,
    /// Print the run key the next job should use
    NextRunKey,
    /// List the sources a source depends on
    DependsOn {
        source: String,
        /// Only edges recorded by this builder
        #[arg(long)]
        builder: Option<Uuid>,
    },
    /// List the sources that depend on a source
    Dependents { source: String },
    /// List sources whose name matches a pattern
    Sources {
        pattern: String,
        #[arg(long, value_enum, default_value_t = PatternMode::Prefix)]
        mode: PatternMode,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternMode {
    Prefix,
    Suffix,
    Contains,
}

impl From<PatternMode> for LikeType {
    fn from(mode: PatternMode) -> Self {
        match mode {
            PatternMode::Prefix => LikeType::StartsWith,
            PatternMode::Suffix => LikeType::EndsWith,
            PatternMode::Contains => LikeType::Matches,
        }
    }
}

impl Command {
    /// Queries never write, so they never migrate either.
    fn open_mode(&self) -> OpenMode {
        match self {
            Command::Exists | Command::Clear { .. } => OpenMode::Create,
            Command::Info | Command::Vacuum => OpenMode::ReadWrite,
            Command::NextRunKey
            | Command::DependsOn { .. }
            | Command::Dependents { .. }
            | Command::Sources { .. } => OpenMode::ReadOnly,
        }
    }
}

pub fn run(command: &Command, config: &Config, out: &mut impl Write) -> Result<(), CliError> {
    let mut db = AssetDb::with_options(&config.db_path, command.open_mode(), config.store_options());

    if let Command::Exists = command {
        let exists = db.data_exists();
        writeln!(out, "{}", if exists { "yes" } else { "no" }).io_context(write_failed)?;
        return Ok(());
    }
    if let Command::Clear { yes: false } = command {
        return Err(CliError::Refused(format!(
            "clearing {} needs --yes",
            config.db_path.display()
        )));
    }

    db.load()?;
    match command {
        Command::Exists => {}
        Command::Info => {
            let stats = db.statistics()?;
            let lines = [
                format!("path: {}", config.db_path.display()),
                format!("schema version: {}", db.stored_version()?.unwrap_or_default()),
                format!("open: {:?}", db.migration_outcome()),
                format!("scan folders: {}", stats.scan_folders),
                format!("sources: {}", stats.sources),
                format!("jobs: {}", stats.jobs),
                format!("products: {}", stats.products),
                format!("source dependencies: {}", stats.source_dependencies),
            ];
            for line in lines {
                writeln!(out, "{line}").io_context(write_failed)?;
            }
        }
        Command::Clear { .. } => {
            db.clear()?;
            info!(path = %config.db_path.display(), "database cleared");
        }
        Command::Vacuum => db.vacuum_and_analyze()?,
        Command::NextRunKey => {
            let next = db
                .get_highest_job_run_key()?
                .checked_add(1)
                .ok_or_else(|| CliError::Refused("job run keys are exhausted".to_string()))?;
            writeln!(out, "{next}").io_context(write_failed)?;
        }
        Command::DependsOn { source, builder } => {
            print_edges(db.get_depends_on(source, *builder)?, out, |e| e.depends_on_source.as_str())?;
        }
        Command::Dependents { source } => {
            print_edges(db.get_dependents(source)?, out, |e| e.source.as_str())?;
        }
        Command::Sources { pattern, mode } => {
            let mut failure = None;
            db.get_sources_like_name(pattern, (*mode).into())?
                .for_each(|source| match writeln!(out, "{}\t{}", source.source_guid, source.source_name) {
                    Ok(()) => ControlFlow::Continue(()),
                    Err(e) => {
                        failure = Some(e);
                        ControlFlow::Break(())
                    }
                })?;
            if let Some(e) = failure {
                return Err(CliError::io(write_failed(), e));
            }
        }
    }
    db.close()?;
    Ok(())
}

fn print_edges(
    edges: Query<'_, SourceFileDependencyEntry>,
    out: &mut impl Write,
    other_end: impl Fn(&SourceFileDependencyEntry) -> &str,
) -> Result<(), CliError> {
    for edge in edges.collect_vec()? {
        writeln!(out, "{}\t{}", edge.builder_guid, other_end(&edge)).io_context(write_failed)?;
    }
    Ok(())
}

fn write_failed() -> String {
    "Failed to write command output".to_string()
}
