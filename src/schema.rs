//! Column layout of an input file.

use std::collections::HashSet;
use std::str::FromStr;

use arrow::datatypes::{DataType, Field, TimeUnit};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::error::{Error, Result};

/// Columns of a sensor-reading file, in file order.
pub const SENSOR_COLUMNS: [(&str, ColumnType); 6] = [
    ("time", ColumnType::DateTime),
    ("humidity", ColumnType::Float64),
    ("salinity", ColumnType::Float64),
    ("air_temperature", ColumnType::Float64),
    ("water_temperature", ColumnType::Float64),
    ("wind_speed", ColumnType::Float64),
];

/// The data type of a table column.
#[derive(Clone, Copy, Debug, Deserialize, Display, EnumString, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ColumnType {
    Float64,
    /// Nanoseconds since the Unix epoch, UTC.
    DateTime,
    Utf8,
}

impl From<ColumnType> for DataType {
    fn from(ct: ColumnType) -> Self {
        match ct {
            ColumnType::Float64 => Self::Float64,
            ColumnType::DateTime => Self::Timestamp(TimeUnit::Nanosecond, None),
            ColumnType::Utf8 => Self::Utf8,
        }
    }
}

/// An ordered sequence of named, typed columns.
///
/// Files carry no header, so the order of the fields must match the order
/// of the columns in the file.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(
    try_from = "Vec<(String, ColumnType)>",
    into = "Vec<(String, ColumnType)>"
)]
pub struct Schema {
    fields: Vec<(String, ColumnType)>,
}

impl Schema {
    /// Creates a `Schema` from `(name, type)` pairs.
    ///
    /// # Errors
    ///
    /// Returns an error if `fields` is empty or a name appears twice.
    pub fn new<I, S>(fields: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, ColumnType)>,
        S: Into<String>,
    {
        let fields: Vec<(String, ColumnType)> = fields
            .into_iter()
            .map(|(name, ty)| (name.into(), ty))
            .collect();
        if fields.is_empty() {
            return Err(Error::InvalidSchema("no columns".to_string()));
        }
        let mut seen = HashSet::with_capacity(fields.len());
        for (name, _) in &fields {
            if !seen.insert(name.as_str()) {
                return Err(Error::InvalidSchema(format!("duplicate column `{}`", name)));
            }
        }
        Ok(Self { fields })
    }

    /// Creates a `Schema` from column names paired with type names such as
    /// `"float64"` or `"date_time"`.
    ///
    /// # Errors
    ///
    /// Returns an error if a type name is unknown, or for the same reasons
    /// as [`Schema::new`].
    pub fn parse(pairs: &[(&str, &str)]) -> Result<Self> {
        let fields = pairs
            .iter()
            .map(|&(name, ty)| {
                ColumnType::from_str(ty)
                    .map(|ty| (name, ty))
                    .map_err(|_| {
                        Error::InvalidSchema(format!("unknown type `{}` for column `{}`", ty, name))
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(fields)
    }

    /// The schema of a sensor-reading file.
    #[must_use]
    pub fn sensor_readings() -> Self {
        Self {
            fields: SENSOR_COLUMNS
                .iter()
                .map(|&(name, ty)| (name.to_string(), ty))
                .collect(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    #[must_use]
    pub fn fields(&self) -> &[(String, ColumnType)] {
        &self.fields
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    #[must_use]
    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, ty)| *ty)
    }

    /// Returns the arrow schema of a table cast to this schema.
    #[must_use]
    pub fn to_arrow(&self) -> arrow::datatypes::Schema {
        arrow::datatypes::Schema::new(
            self.fields
                .iter()
                .map(|(name, ty)| Field::new(name, DataType::from(*ty), true))
                .collect::<Vec<_>>(),
        )
    }

    /// Returns the arrow schema of a freshly loaded table, where every
    /// column still holds raw text.
    #[must_use]
    pub fn to_raw_arrow(&self) -> arrow::datatypes::Schema {
        arrow::datatypes::Schema::new(
            self.names()
                .map(|name| Field::new(name, DataType::Utf8, true))
                .collect::<Vec<_>>(),
        )
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::sensor_readings()
    }
}

impl TryFrom<Vec<(String, ColumnType)>> for Schema {
    type Error = Error;

    fn try_from(fields: Vec<(String, ColumnType)>) -> Result<Self> {
        Self::new(fields)
    }
}

impl From<Schema> for Vec<(String, ColumnType)> {
    fn from(schema: Schema) -> Self {
        schema.fields
    }
}
