use std::path::PathBuf;

use thiserror::Error;

use crate::parse::ParseError;
use crate::schema::ColumnType;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum Error {
    #[error("input file not found: {}", .path.display())]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A record does not match the schema. `row` is 1-based.
    #[error("row {row}: {reason}")]
    Parse { row: usize, reason: String },

    /// A non-missing cell could not be converted to its declared type.
    #[error("column `{column}`, row {row}: cannot convert {value:?} to {to}")]
    TypeCast {
        column: String,
        row: usize,
        value: String,
        to: ColumnType,
        #[source]
        source: ParseError,
    },

    #[error("column `{0}` has no values to average")]
    EmptyColumn(String),

    #[error("no column named `{0}`")]
    UnknownColumn(String),

    #[error("column `{0}` is not numeric")]
    NotNumeric(String),

    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    #[error("{column} should be {expected}, instead {actual}")]
    ValidationMismatch {
        column: String,
        expected: f64,
        actual: f64,
    },
}
