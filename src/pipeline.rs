use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::csv;
use crate::error::{Error, Result};
use crate::stats::Means;
use crate::table::Table;

/// Loads a file, casts its columns and averages the numeric ones.
///
/// A `Pipeline` holds no state besides its configuration, so running it
/// twice on the same input gives the same result.
#[derive(Clone, Debug, Default)]
pub struct Pipeline {
    config: Arc<Config>,
}

impl Pipeline {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Loads and casts the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, a record does not match
    /// the schema, or a cell cannot be converted.
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<Table> {
        let mut table = csv::load(path, &self.config)?;
        table.cast(&self.config.schema)?;
        Ok(table)
    }

    /// Computes the mean of every numeric column of the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Pipeline::load`], or `Error::EmptyColumn` if
    /// a numeric column has no present values.
    pub fn run<P: AsRef<Path>>(&self, path: P) -> Result<Means> {
        self.load(path)?.mean(None)
    }

    /// Same as [`Pipeline::run`], reading from `input` instead of a file.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`Pipeline::run`].
    pub fn run_from<R: BufRead>(&self, input: R) -> Result<Means> {
        let mut table = csv::read(input, &self.config)?;
        table.cast(&self.config.schema)?;
        table.mean(None)
    }

    /// Checks `means` against the configured reference means.
    ///
    /// # Errors
    ///
    /// Returns `Error::ValidationMismatch` for the first column outside the
    /// tolerance, or `Error::UnknownColumn` if a reference column is absent
    /// from `means`.
    pub fn validate(&self, means: &Means) -> Result<()> {
        let reference = &self.config.reference;
        for (column, expected) in &reference.means {
            let actual = means
                .get(column)
                .ok_or_else(|| Error::UnknownColumn(column.clone()))?;
            if !reference.is_close(*expected, actual) {
                warn!(%column, expected, actual, "mean outside tolerance");
                return Err(Error::ValidationMismatch {
                    column: column.clone(),
                    expected: *expected,
                    actual,
                });
            }
        }
        info!(columns = reference.means.len(), "validated means");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Reference;

    const ROWS: &str = "2021-01-01,80.0,36.0,20.0,34.0,5.5\n\
                        2021-01-02,81.6258,36.2866,19.5952,34.3366,6.0554\n";

    #[test]
    fn run_in_memory() {
        let means = Pipeline::default().run_from(ROWS.as_bytes()).unwrap();
        assert_eq!(means.len(), 5);
        assert_eq!(means.get("humidity"), Some((80.0 + 81.6258) / 2.0));
        assert_eq!(means.get("time"), None);
    }

    #[test]
    fn validate_against_reference() {
        let pipeline = Pipeline::new(Config {
            reference: Reference {
                means: vec![
                    ("humidity".to_string(), 80.8129),
                    ("wind_speed".to_string(), 5.7777),
                ],
                rel_tol: 1e-5,
            },
            ..Config::default()
        });
        let means = pipeline.run_from(ROWS.as_bytes()).unwrap();
        pipeline.validate(&means).unwrap();

        let strict = Pipeline::default();
        match strict.validate(&means) {
            Err(Error::ValidationMismatch {
                column, expected, ..
            }) => {
                assert_eq!(column, "wind_speed");
                assert_eq!(expected, 5.6777);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn config_is_shared_by_clones() {
        let pipeline = Pipeline::new(Config {
            batch_size: 2,
            ..Config::default()
        });
        let clone = pipeline.clone();
        assert!(std::ptr::eq(pipeline.config(), clone.config()));
        assert_eq!(clone.config().batch_size, 2);
        assert_eq!(clone.config().schema.len(), 6);
    }

    #[test]
    fn validate_missing_column() {
        let pipeline = Pipeline::default();
        let means = Means::default();
        assert!(matches!(
            pipeline.validate(&means),
            Err(Error::UnknownColumn(ref c)) if c == "humidity"
        ));
    }
}
