//! Conversion of raw text columns to their declared types.

use std::fmt;
use std::num::ParseFloatError;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, PrimitiveBuilder, StringArray};
use arrow::datatypes::{ArrowPrimitiveType, DataType, Float64Type, TimestampNanosecondType};
use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::error::{Error, Result};
use crate::schema::ColumnType;
use crate::table::Column;

/// Formats tried, in order, after RFC 3339. Slashed dates with the year
/// last are read month first.
const DATETIME_FORMATS: [&str; 8] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S%.f",
    "%m/%d/%Y %H:%M",
];
/// Bare dates, read as midnight.
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error(transparent)]
    Float(#[from] ParseFloatError),
    #[error(transparent)]
    DateTime(#[from] chrono::ParseError),
    #[error("timestamp out of range")]
    OutOfRange,
}

/// A parser returns `Ok(None)` for a value it reads as missing.
pub type Float64Parser = dyn Fn(&str) -> Result<Option<f64>, ParseError> + Send + Sync;
pub type TimestampParser = dyn Fn(&str) -> Result<Option<i64>, ParseError> + Send + Sync;

#[derive(Clone)]
pub enum FieldParser {
    Float64(Arc<Float64Parser>),
    Timestamp(Arc<TimestampParser>),
    Utf8,
}

impl FieldParser {
    #[must_use]
    pub fn float64() -> Self {
        Self::Float64(Arc::new(parse_float64))
    }

    #[must_use]
    pub fn timestamp() -> Self {
        Self::Timestamp(Arc::new(parse_timestamp))
    }
}

impl From<ColumnType> for FieldParser {
    fn from(ct: ColumnType) -> Self {
        match ct {
            ColumnType::Float64 => Self::float64(),
            ColumnType::DateTime => Self::timestamp(),
            ColumnType::Utf8 => Self::Utf8,
        }
    }
}

impl fmt::Debug for FieldParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Float64(_) => write!(f, "Float64"),
            Self::Timestamp(_) => write!(f, "Timestamp"),
            Self::Utf8 => write!(f, "Utf8"),
        }
    }
}

/// Parses a decimal number. `NaN` is read as missing.
fn parse_float64(v: &str) -> Result<Option<f64>, ParseError> {
    let value = v.trim().parse::<f64>()?;
    Ok(if value.is_nan() { None } else { Some(value) })
}

/// Parses a date or date-time into nanoseconds since the Unix epoch.
///
/// RFC 3339 values are converted to UTC; values without an offset are
/// taken as UTC, and a bare date as its midnight.
fn parse_timestamp(v: &str) -> Result<Option<i64>, ParseError> {
    let v = v.trim();
    let datetime = if let Ok(dt) = DateTime::parse_from_rfc3339(v) {
        dt.naive_utc()
    } else if let Some(dt) = DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(v, format).ok())
    {
        dt
    } else {
        parse_date(v)?
            .and_hms_opt(0, 0, 0)
            .ok_or(ParseError::OutOfRange)?
    };
    datetime
        .and_utc()
        .timestamp_nanos_opt()
        .map(Some)
        .ok_or(ParseError::OutOfRange)
}

/// Tries each of `DATE_FORMATS`, returning the error of the first one if
/// none matches.
fn parse_date(v: &str) -> Result<NaiveDate, ParseError> {
    let mut first_err = None;
    for format in DATE_FORMATS {
        match NaiveDate::parse_from_str(v, format) {
            Ok(date) => return Ok(date),
            Err(e) => {
                first_err.get_or_insert(e);
            }
        }
    }
    match first_err {
        Some(e) => Err(e.into()),
        None => Err(ParseError::OutOfRange),
    }
}

/// Converts a raw text column to `column_type`.
///
/// Null cells stay null. A cell the parser rejects fails the conversion
/// with `Error::TypeCast`; nothing is coerced to a default value. A column
/// already holding `column_type` is returned unchanged.
///
/// # Errors
///
/// Returns an error if a cell cannot be converted, or if `column` holds
/// neither raw text nor `column_type`.
pub(crate) fn cast_column(column: &Column, name: &str, column_type: ColumnType) -> Result<Column> {
    let target = DataType::from(column_type);
    match column.data_type() {
        None => return Ok(Column::default()),
        Some(dt) if *dt == target => return Ok(column.clone()),
        Some(DataType::Utf8) => {}
        Some(dt) => {
            return Err(Error::InvalidSchema(format!(
                "column `{}` holds {} values, not raw text",
                name, dt
            )))
        }
    }

    let array = match FieldParser::from(column_type) {
        FieldParser::Float64(parse) => {
            build_primitive_array::<Float64Type, Float64Parser>(column, name, column_type, &parse)?
        }
        FieldParser::Timestamp(parse) => build_primitive_array::<
            TimestampNanosecondType,
            TimestampParser,
        >(column, name, column_type, &parse)?,
        FieldParser::Utf8 => return Ok(column.clone()),
    };
    Ok(array.into())
}

fn build_primitive_array<T, P>(
    column: &Column,
    name: &str,
    column_type: ColumnType,
    parse: &Arc<P>,
) -> Result<ArrayRef>
where
    T: ArrowPrimitiveType,
    P: Fn(&str) -> Result<Option<T::Native>, ParseError> + Send + Sync + ?Sized,
{
    let values = column
        .iter::<StringArray>()
        .map_err(|_| Error::InvalidSchema(format!("column `{}` is not raw text", name)))?;
    let mut builder = PrimitiveBuilder::<T>::with_capacity(column.len());
    for (i, value) in values.enumerate() {
        let parsed = match value {
            Some(v) => parse(v).map_err(|source| Error::TypeCast {
                column: name.to_string(),
                row: i + 1,
                value: v.to_string(),
                to: column_type,
                source,
            })?,
            None => None,
        };
        builder.append_option(parsed);
    }
    let array: ArrayRef = Arc::new(builder.finish());
    debug_assert_eq!(array.len(), column.len());
    Ok(array)
}
