//! An interface to headerless CSV (comma-separated values) input.

pub(crate) mod reader;

pub use reader::Reader;
pub use reader::Record;

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use tracing::info;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::table::Table;

/// Loads the file at `path` into a table of raw text columns named after
/// `config.schema`.
///
/// # Errors
///
/// Returns `Error::FileNotFound` if `path` does not exist, and otherwise
/// the errors of [`read`].
pub fn load<P: AsRef<Path>>(path: P, config: &Config) -> Result<Table> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            Error::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            Error::Io(e)
        }
    })?;
    let table = read(BufReader::new(file), config)?;
    info!(
        path = %path.display(),
        rows = table.num_rows(),
        "loaded input"
    );
    Ok(table)
}

/// Reads every record from `input` into a table of raw text columns.
///
/// # Errors
///
/// Returns `Error::Parse` if a record does not have exactly one field per
/// schema column, and `Error::Io` if reading fails.
pub fn read<R: BufRead>(input: R, config: &Config) -> Result<Table> {
    let mut reader = Reader::new(input, config);
    let mut table = Table::empty(reader.schema().clone());
    while let Some(mut batch) = reader.next_batch()? {
        table.append(&mut batch)?;
    }
    Ok(table)
}
