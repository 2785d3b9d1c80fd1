//! Run configuration.

use serde::{Deserialize, Serialize};

use crate::schema::Schema;

pub const DEFAULT_BATCH_SIZE: usize = 1024;

/// Cells equal to one of these are treated as missing.
pub const NA_VALUES: [&str; 13] = [
    "", "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "null", "NULL", "#N/A", "<NA>", "None",
];

/// Mean values a sensor-reading run is checked against.
pub const SENSOR_REFERENCE_MEANS: [(&str, f64); 5] = [
    ("humidity", 80.8129),
    ("salinity", 36.1433),
    ("air_temperature", 19.7976),
    ("water_temperature", 34.1683),
    ("wind_speed", 5.6777),
];

pub const DEFAULT_REL_TOL: f64 = 1e-5;

/// Everything a run depends on besides the input file.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Config {
    pub schema: Schema,
    pub na_values: Vec<String>,
    /// Number of records read before they are appended to the table.
    pub batch_size: usize,
    pub reference: Reference,
}

impl Config {
    #[must_use]
    pub fn is_missing(&self, field: &str) -> bool {
        self.na_values.iter().any(|na| na == field)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema: Schema::sensor_readings(),
            na_values: NA_VALUES.iter().map(|&s| s.to_string()).collect(),
            batch_size: DEFAULT_BATCH_SIZE,
            reference: Reference::default(),
        }
    }
}

/// Expected means and the relative tolerance they are compared with.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Reference {
    pub means: Vec<(String, f64)>,
    pub rel_tol: f64,
}

impl Reference {
    /// Returns `true` if `actual` is within the relative tolerance of
    /// `expected`, measured against the larger magnitude of the two.
    #[must_use]
    pub fn is_close(&self, expected: f64, actual: f64) -> bool {
        if expected == actual {
            return true;
        }
        (expected - actual).abs() <= self.rel_tol * expected.abs().max(actual.abs())
    }
}

impl Default for Reference {
    fn default() -> Self {
        Self {
            means: SENSOR_REFERENCE_MEANS
                .iter()
                .map(|&(name, mean)| (name.to_string(), mean))
                .collect(),
            rel_tol: DEFAULT_REL_TOL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_tokens() {
        let config = Config::default();
        assert!(config.is_missing(""));
        assert!(config.is_missing("NaN"));
        assert!(config.is_missing("NA"));
        assert!(!config.is_missing("0"));
        assert!(!config.is_missing("abc"));
    }

    #[test]
    fn relative_tolerance() {
        let reference = Reference::default();
        assert!(reference.is_close(80.8129, 80.8129));
        assert!(reference.is_close(80.8129, 80.8129 * (1.0 + 5e-6)));
        assert!(!reference.is_close(80.8129, 80.8129 * (1.0 + 2e-5)));
        assert!(!reference.is_close(0.0, 1e-12));
        assert!(!reference.is_close(5.6777, f64::NAN));
    }

    #[test]
    fn default_reference_columns_exist_in_schema() {
        let config = Config::default();
        for (column, _) in &config.reference.means {
            assert!(config.schema.column_type(column).is_some());
        }
    }
}
