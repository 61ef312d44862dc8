use std::io;
use thiserror::Error;

use gwloc_core::VariantError;

/// Error type for gwloc-io operations.
///
/// Everything except [`SumstatsError::Dropped`] is a schema or I/O problem and
/// ends the run; `Dropped` marks one unusable row and is meant to be counted.
#[derive(Error, Debug)]
pub enum SumstatsError {
    /// IO error occurred during file operations.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The input had no header line.
    #[error("Summary statistics input is empty: {0}")]
    EmptyInput(String),

    /// A required column could not be found under its configured name or any alias.
    #[error("Required column `{field}` not found (looked for `{expected}`); header has: {header}")]
    MissingColumn {
        field: &'static str,
        expected: String,
        header: String,
    },

    /// A required column holds values of the wrong type.
    #[error("Column `{column}` has the wrong type: cannot parse `{value}` on line {line}")]
    ColumnType {
        column: String,
        value: String,
        line: usize,
    },

    /// A table written by gwloc could not be read back.
    #[error("Malformed table {path} at line {line}: {reason}")]
    MalformedTable {
        path: String,
        line: usize,
        reason: String,
    },

    /// One row was unusable.
    #[error(transparent)]
    Dropped(#[from] VariantError),
}

/// Result type alias for gwloc-io operations.
pub type Result<T> = std::result::Result<T, SumstatsError>;
