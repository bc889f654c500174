// SPDX-FileCopyrightText: 2025 Asset Pipeline Maintainers
// SPDX-License-Identifier: MIT

//! Error types for asset database operations.

use std::path::PathBuf;

use rusqlite::ErrorCode;
use thiserror::Error;

/// Result type for asset database operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during asset database operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Stored schema version differs from the one this build expects and
    /// the connection is not allowed to migrate it.
    #[error("Schema version mismatch: expected {expected}, found {found}")]
    SchemaVersionMismatch { expected: i64, found: i64 },

    /// A declared table or index is missing after open.
    #[error("Missing {kind} '{name}' in asset database schema")]
    MissingSchema { kind: &'static str, name: &'static str },

    /// Filesystem operation on the backing file failed.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to open database with context
    #[error("Failed to open database at '{path}': {source}")]
    DatabaseOpen {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Database file not found
    #[error("Database not found at: {0}")]
    DatabaseNotFound(PathBuf),

    /// The connection has been closed (or never loaded).
    #[error("Asset database is not open")]
    NotOpen,

    /// A caller-supplied id does not name an existing row.
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// Caller supplied a value that can never be stored.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// `begin` was called while a transaction is already active.
    #[error("A transaction is already active on this connection")]
    NestedTransaction,

    /// Unique or foreign-key constraint rejected a write.
    #[error("Constraint violation in {statement}: {source}")]
    ConstraintViolation {
        statement: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    /// A statement failed to prepare, bind, step or decode.
    #[error("Statement {statement} failed: {source}")]
    Statement {
        statement: &'static str,
        #[source]
        source: rusqlite::Error,
    },
}

/// Coarse classification of [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Schema,
    Io,
    NotFound,
    InvalidArgument,
    ConstraintViolation,
    Statement,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::SchemaVersionMismatch { .. } | Error::MissingSchema { .. } => ErrorKind::Schema,
            Error::Io { .. }
            | Error::DatabaseOpen { .. }
            | Error::DatabaseNotFound(_)
            | Error::NotOpen => ErrorKind::Io,
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::InvalidArgument(_) | Error::NestedTransaction => ErrorKind::InvalidArgument,
            Error::ConstraintViolation { .. } => ErrorKind::ConstraintViolation,
            Error::Statement { .. } => ErrorKind::Statement,
        }
    }

    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

/// Helper trait for attaching the failing statement's name to SQLite errors.
pub(crate) trait StatementContext<T> {
    fn statement(self, name: impl Into<&'static str>) -> Result<T>;
}

impl<T> StatementContext<T> for std::result::Result<T, rusqlite::Error> {
    fn statement(self, name: impl Into<&'static str>) -> Result<T> {
        self.map_err(|source| {
            let statement = name.into();
            match source.sqlite_error_code() {
                Some(ErrorCode::ConstraintViolation) => Error::ConstraintViolation { statement, source },
                _ => Error::Statement { statement, source },
            }
        })
    }
}
