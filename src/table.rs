use arrow::array::{Array, ArrayRef, Float64Array, PrimitiveArray, StringArray};
use arrow::datatypes::{
    ArrowPrimitiveType, DataType, SchemaRef, TimeUnit, TimestampNanosecondType,
};
use std::iter::Flatten;
use std::sync::Arc;
use std::vec;
use tracing::info;

use crate::error::{Error, Result};
use crate::parse::cast_column;
use crate::schema::Schema;
use crate::stats::{self, Description, Means};

/// Structured data represented in a column-oriented form.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    schema: SchemaRef,
    columns: Vec<Column>,
}

impl Table {
    /// Creates a new `Table` with the given `schema` and `columns`.
    ///
    /// # Errors
    ///
    /// Returns an error if the number of columns differs from the number of
    /// fields in `schema`, or if `columns` have different lengths.
    pub fn new(schema: SchemaRef, columns: Vec<Column>) -> Result<Self> {
        if schema.fields().len() != columns.len() {
            return Err(Error::InvalidSchema(format!(
                "{} fields but {} columns",
                schema.fields().len(),
                columns.len()
            )));
        }
        let len = columns.first().map_or(0, Column::len);
        if columns.iter().skip(1).all(|c| c.len() == len) {
            Ok(Self { schema, columns })
        } else {
            Err(Error::InvalidSchema(
                "columns must have the same length".to_string(),
            ))
        }
    }

    /// Creates a `Table` with no rows.
    #[must_use]
    pub fn empty(schema: SchemaRef) -> Self {
        let columns = vec![Column::default(); schema.fields().len()];
        Self { schema, columns }
    }

    /// Moves all the rows of `other` into `self`, leaving `other` empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the two tables have different schemas.
    pub fn append(&mut self, other: &mut Self) -> Result<()> {
        if self.schema != other.schema {
            return Err(Error::InvalidSchema(
                "cannot append a table with a different schema".to_string(),
            ));
        }
        for (self_col, other_col) in self.columns.iter_mut().zip(other.columns.iter_mut()) {
            self_col.append(other_col);
        }
        Ok(())
    }

    /// Returns an immutable reference of a specific column
    #[must_use]
    pub fn column(&self, i: usize) -> Option<&Column> {
        self.columns.get(i)
    }

    #[must_use]
    pub fn column_by_name(&self, name: &str) -> Option<&Column> {
        let (i, _) = self.schema.column_with_name(name)?;
        self.columns.get(i)
    }

    /// Returns the number of columns in the table.
    #[must_use]
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Returns the number of rows in the table.
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.columns.first().map_or(0, Column::len)
    }

    /// Returns the schema of the table.
    #[must_use]
    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    /// Converts every column to the type `schema` declares for it.
    ///
    /// Rows are neither added nor removed. On failure the table is left as
    /// it was.
    ///
    /// # Errors
    ///
    /// Returns `Error::TypeCast` if a present cell cannot be converted, or
    /// `Error::InvalidSchema` if `schema` does not describe this table.
    pub fn cast(&mut self, schema: &Schema) -> Result<()> {
        if schema.len() != self.columns.len() {
            return Err(Error::InvalidSchema(format!(
                "schema has {} columns, table has {}",
                schema.len(),
                self.columns.len()
            )));
        }
        let columns = self
            .columns
            .iter()
            .zip(schema.fields())
            .map(|(column, (name, ty))| cast_column(column, name, *ty))
            .collect::<Result<Vec<_>>>()?;
        self.columns = columns;
        self.schema = Arc::new(schema.to_arrow());
        info!(
            rows = self.num_rows(),
            columns = self.num_columns(),
            "cast columns"
        );
        Ok(())
    }

    /// Computes the mean of each selected numeric column, skipping missing
    /// values.
    ///
    /// With `None`, every `Float64` column is selected and the rest are
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if a named column does not exist or is not numeric,
    /// or if a selected column has no present values.
    pub fn mean(&self, columns: Option<&[&str]>) -> Result<Means> {
        let selected: Vec<usize> = match columns {
            None => self
                .schema
                .fields()
                .iter()
                .enumerate()
                .filter(|(_, field)| field.data_type() == &DataType::Float64)
                .map(|(i, _)| i)
                .collect(),
            Some(names) => names
                .iter()
                .map(|name| self.numeric_index(name))
                .collect::<Result<_>>()?,
        };

        let mut means = Means::with_capacity(selected.len());
        for i in selected {
            let name = self.schema.field(i).name();
            let values = self.present_values(i)?;
            let mean = stats::mean(&values).ok_or_else(|| Error::EmptyColumn(name.clone()))?;
            means.push(name.clone(), mean);
        }
        Ok(means)
    }

    /// Summarizes a numeric column.
    ///
    /// # Errors
    ///
    /// Returns an error if the column does not exist or is not numeric, or
    /// if it has no present values.
    pub fn describe(&self, column: &str) -> Result<Description> {
        let i = self.numeric_index(column)?;
        let values = self.present_values(i)?;
        stats::describe(&values, self.columns[i].len())
            .ok_or_else(|| Error::EmptyColumn(column.to_string()))
    }

    fn numeric_index(&self, name: &str) -> Result<usize> {
        let (i, field) = self
            .schema
            .column_with_name(name)
            .ok_or_else(|| Error::UnknownColumn(name.to_string()))?;
        if field.data_type() == &DataType::Float64 {
            Ok(i)
        } else {
            Err(Error::NotNumeric(name.to_string()))
        }
    }

    fn present_values(&self, i: usize) -> Result<Vec<f64>> {
        let name = self.schema.field(i).name();
        Ok(self.columns[i]
            .iter::<Float64Array>()
            .map_err(|_| Error::NotNumeric(name.clone()))?
            .flatten()
            .collect())
    }
}

/// A single column in a table, made of one or more arrays of the same type.
#[derive(Clone, Debug, Default)]
pub struct Column {
    arrays: Vec<ArrayRef>,
    len: usize,
}

impl Column {
    /// Converts a slice into a `Column`.
    #[must_use]
    pub fn from_slice<T>(slice: &[T::Native]) -> Self
    where
        T: ArrowPrimitiveType,
    {
        let array: ArrayRef = Arc::new(PrimitiveArray::<T>::from_iter_values(
            slice.iter().copied(),
        ));
        array.into()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of missing values.
    #[must_use]
    pub fn null_count(&self) -> usize {
        self.arrays.iter().map(|arr| arr.null_count()).sum()
    }

    /// Returns the type of the values, or `None` if the column holds no
    /// arrays yet.
    #[must_use]
    pub fn data_type(&self) -> Option<&DataType> {
        self.arrays.first().map(|arr| arr.data_type())
    }

    fn append(&mut self, other: &mut Self) {
        self.arrays.append(&mut other.arrays);
        self.len += other.len;
        other.len = 0;
    }

    /// Creates an iterator iterating over all the cells in this `Column`.
    ///
    /// # Errors
    ///
    /// Returns an error if the type parameter does not match with the type of
    /// this `Column`.
    #[allow(clippy::iter_not_returning_iterator)]
    pub fn iter<'a, T>(&'a self) -> Result<Flatten<vec::IntoIter<&'a T>>, TypeError>
    where
        T: Array + 'static,
        &'a T: IntoIterator,
    {
        let mut arrays: Vec<&T> = Vec::with_capacity(self.arrays.len());
        for arr in &self.arrays {
            let Some(typed_arr) = arr.as_any().downcast_ref::<T>() else {
                return Err(TypeError());
            };
            arrays.push(typed_arr);
        }
        Ok(arrays.into_iter().flatten())
    }
}

impl PartialEq for Column {
    fn eq(&self, other: &Self) -> bool {
        let data_type = match (self.data_type(), other.data_type()) {
            (Some(x), Some(y)) if x == y => x.clone(),
            (None, None) => return true,
            _ => return false,
        };
        if self.len() != other.len() {
            return false;
        }

        match data_type {
            DataType::Float64 => self
                .iter::<Float64Array>()
                .expect("invalid array")
                .zip(other.iter::<Float64Array>().expect("invalid array"))
                .all(|(x, y)| x == y),
            DataType::Timestamp(TimeUnit::Nanosecond, _) => self
                .iter::<PrimitiveArray<TimestampNanosecondType>>()
                .expect("invalid array")
                .zip(
                    other
                        .iter::<PrimitiveArray<TimestampNanosecondType>>()
                        .expect("invalid array"),
                )
                .all(|(x, y)| x == y),
            DataType::Utf8 => self
                .iter::<StringArray>()
                .expect("invalid array")
                .zip(other.iter::<StringArray>().expect("invalid array"))
                .all(|(x, y)| x == y),
            _ => false,
        }
    }
}

impl From<ArrayRef> for Column {
    fn from(array: ArrayRef) -> Self {
        let len = array.len();
        Self {
            arrays: vec![array],
            len,
        }
    }
}

#[derive(Debug, Eq, thiserror::Error, PartialEq)]
#[error("array type mismatch")]
pub struct TypeError();

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnType;
    use arrow::datatypes::{Field, Float64Type, Schema as ArrowSchema};

    fn raw_table(rows: &[[Option<&str>; 2]]) -> Table {
        let schema = Arc::new(ArrowSchema::new(vec![
            Field::new("time", DataType::Utf8, true),
            Field::new("depth", DataType::Utf8, true),
        ]));
        let columns = (0..2)
            .map(|i| {
                let array: ArrayRef =
                    Arc::new(StringArray::from(rows.iter().map(|r| r[i]).collect::<Vec<_>>()));
                Column::from(array)
            })
            .collect();
        Table::new(schema, columns).expect("valid columns")
    }

    fn depth_schema() -> Schema {
        Schema::new(vec![
            ("time", ColumnType::DateTime),
            ("depth", ColumnType::Float64),
        ])
        .unwrap()
    }

    #[test]
    fn table_new() {
        let table = Table::new(Arc::new(ArrowSchema::empty()), Vec::new())
            .expect("creating an empty `Table` should not fail");
        assert_eq!(table.num_columns(), 0);
        assert_eq!(table.num_rows(), 0);

        let schema = Arc::new(ArrowSchema::new(vec![
            Field::new("a", DataType::Float64, true),
            Field::new("b", DataType::Float64, true),
        ]));
        let uneven = Table::new(
            schema.clone(),
            vec![
                Column::from_slice::<Float64Type>(&[1.0, 2.0]),
                Column::from_slice::<Float64Type>(&[1.0]),
            ],
        );
        assert!(matches!(uneven, Err(Error::InvalidSchema(_))));
        let missing = Table::new(schema, vec![Column::from_slice::<Float64Type>(&[1.0])]);
        assert!(matches!(missing, Err(Error::InvalidSchema(_))));
    }

    #[test]
    fn column_new() {
        let column = Column::default();
        assert_eq!(column.len(), 0);
        assert!(column.is_empty());
        assert_eq!(column.data_type(), None);
        assert_eq!(column.iter::<Float64Array>().unwrap().count(), 0);
    }

    #[test]
    fn column_type_mismatch() {
        let column = Column::from_slice::<Float64Type>(&[1.0]);
        assert_eq!(column.iter::<StringArray>().err(), Some(TypeError()));
    }

    #[test]
    fn append_keeps_row_order() {
        let mut table = raw_table(&[[Some("2021-01-01"), Some("1.0")]]);
        let mut other = raw_table(&[
            [Some("2021-01-02"), None],
            [Some("2021-01-03"), Some("3.0")],
        ]);
        table.append(&mut other).unwrap();
        assert_eq!(table.num_rows(), 3);
        assert_eq!(other.num_rows(), 0);
        let depth: Vec<Option<&str>> = table
            .column_by_name("depth")
            .unwrap()
            .iter::<StringArray>()
            .unwrap()
            .collect();
        assert_eq!(depth, vec![Some("1.0"), None, Some("3.0")]);
        assert_eq!(table.column(1).unwrap().null_count(), 1);
    }

    #[test]
    fn cast_then_mean() {
        let mut table = raw_table(&[
            [Some("2021-01-01"), Some("1.0")],
            [Some("2021-01-02"), None],
            [Some("2021-01-03"), Some("4.0")],
        ]);
        table.cast(&depth_schema()).unwrap();
        assert_eq!(
            table.schema().field(0).data_type(),
            &DataType::from(ColumnType::DateTime)
        );

        let means = table.mean(None).unwrap();
        assert_eq!(means.len(), 1);
        assert_eq!(means.get("depth"), Some(2.5));
        assert_eq!(means.get("time"), None);
    }

    #[test]
    fn failed_cast_leaves_table() {
        let mut table = raw_table(&[[Some("2021-01-01"), Some("deep")]]);
        let before = table.clone();
        let err = table.cast(&depth_schema()).unwrap_err();
        assert!(matches!(err, Error::TypeCast { ref column, row: 1, .. } if column == "depth"));
        assert_eq!(table, before);
    }

    #[test]
    fn mean_of_selected_columns() {
        let mut table = raw_table(&[[Some("2021-01-01"), Some("2.0")]]);
        table.cast(&depth_schema()).unwrap();
        assert_eq!(table.mean(Some(&["depth"])).unwrap().get("depth"), Some(2.0));
        assert!(matches!(
            table.mean(Some(&["time"])),
            Err(Error::NotNumeric(ref c)) if c == "time"
        ));
        assert!(matches!(
            table.mean(Some(&["pressure"])),
            Err(Error::UnknownColumn(ref c)) if c == "pressure"
        ));
    }

    #[test]
    fn mean_of_empty_column() {
        let mut table = raw_table(&[
            [Some("2021-01-01"), None],
            [Some("2021-01-02"), None],
        ]);
        table.cast(&depth_schema()).unwrap();
        assert!(matches!(
            table.mean(None),
            Err(Error::EmptyColumn(ref c)) if c == "depth"
        ));
    }

    #[test]
    fn describe_column() {
        let mut table = raw_table(&[
            [Some("2021-01-01"), Some("2.0")],
            [Some("2021-01-02"), None],
            [Some("2021-01-03"), Some("6.0")],
        ]);
        table.cast(&depth_schema()).unwrap();
        let description = table.describe("depth").unwrap();
        assert_eq!(description.get_count(), 2);
        assert_eq!(description.get_missing(), 1);
        assert_eq!(description.get_mean(), 4.0);
        assert_eq!(description.get_s_deviation(), 2.0);
        assert_eq!(description.get_min(), 2.0);
        assert_eq!(description.get_max(), 6.0);
        assert!(matches!(
            table.describe("time"),
            Err(Error::NotNumeric(_))
        ));
    }
}
