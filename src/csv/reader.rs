use arrow::array::{ArrayRef, StringBuilder};
use arrow::datatypes::SchemaRef;
use csv_core::ReadRecordResult;
use std::io::{self, BufRead};
use std::str;
use std::sync::Arc;
use tracing::debug;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::table::{Column, Table};

/// A single CSV record: the bytes of all fields, and where each one ends.
pub struct Record {
    fields: Vec<u8>,
    ends: Vec<usize>,
}

impl Record {
    /// Reads the next record from `input`, or returns `None` at the end of
    /// input. Blank lines are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if reading from `input` fails.
    pub fn from_buf<R: BufRead + ?Sized>(
        reader: &mut csv_core::Reader,
        input: &mut R,
    ) -> io::Result<Option<Self>> {
        let mut fields = vec![0; 1024];
        let mut ends = vec![0; 16];
        let (mut outlen, mut endlen) = (0, 0);
        loop {
            let (res, nin, nout, nend) = {
                let buf = input.fill_buf()?;
                reader.read_record(buf, &mut fields[outlen..], &mut ends[endlen..])
            };
            input.consume(nin);
            outlen += nout;
            endlen += nend;
            match res {
                ReadRecordResult::InputEmpty => continue,
                ReadRecordResult::OutputFull => {
                    fields.resize(std::cmp::max(4, fields.len().saturating_mul(2)), 0);
                }
                ReadRecordResult::OutputEndsFull => {
                    ends.resize(std::cmp::max(4, ends.len().saturating_mul(2)), 0);
                }
                ReadRecordResult::Record => {
                    fields.truncate(outlen);
                    ends.truncate(endlen);
                    return Ok(Some(Self { fields, ends }));
                }
                ReadRecordResult::End => return Ok(None),
            }
        }
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ends.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ends.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn get(&self, i: usize) -> Option<&[u8]> {
        let end = match self.ends.get(i) {
            None => return None,
            Some(&end) => end,
        };
        let start = match i.checked_sub(1).and_then(|i| self.ends.get(i)) {
            None => 0,
            Some(&start) => start,
        };
        Some(&self.fields[start..end])
    }
}

/// CSV reader producing raw text tables of `batch_size` rows.
pub struct Reader<'a, R: BufRead> {
    input: R,
    csv_reader: csv_core::Reader,
    config: &'a Config,
    schema: SchemaRef,
    rows_read: usize,
}

impl<'a, R: BufRead> Reader<'a, R> {
    /// Creates a `Reader` for headerless input laid out as `config.schema`.
    pub fn new(input: R, config: &'a Config) -> Self {
        Self {
            input,
            csv_reader: csv_core::Reader::new(),
            config,
            schema: Arc::new(config.schema.to_raw_arrow()),
            rows_read: 0,
        }
    }

    /// Returns the number of records read so far.
    #[must_use]
    pub fn rows_read(&self) -> usize {
        self.rows_read
    }

    /// Returns the schema of the tables this reader produces.
    #[must_use]
    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    /// Reads the next batch of records.
    ///
    /// Empty cells and the configured missing-value tokens become nulls.
    ///
    /// # Errors
    ///
    /// Returns `Error::Parse` if a record has the wrong number of fields or
    /// is not valid UTF-8, and `Error::Io` if reading fails.
    pub fn next_batch(&mut self) -> Result<Option<Table>> {
        let batch_size = self.config.batch_size.max(1);
        let num_fields = self.schema.fields().len();
        let mut rows = Vec::with_capacity(batch_size);
        while rows.len() < batch_size {
            let Some(record) = Record::from_buf(&mut self.csv_reader, &mut self.input)? else {
                break;
            };
            self.rows_read += 1;
            if record.len() != num_fields {
                return Err(Error::Parse {
                    row: self.rows_read,
                    reason: format!("expected {} fields, found {}", num_fields, record.len()),
                });
            }
            rows.push(record);
        }

        if rows.is_empty() {
            return Ok(None);
        }
        let first_row = self.rows_read - rows.len() + 1;

        let mut columns = Vec::with_capacity(num_fields);
        for i in 0..num_fields {
            let mut builder = StringBuilder::with_capacity(rows.len(), rows.len() * 8);
            for (offset, row) in rows.iter().enumerate() {
                let field = str::from_utf8(row.get(i).unwrap_or_default()).map_err(|e| {
                    Error::Parse {
                        row: first_row + offset,
                        reason: format!("field {} is not valid UTF-8: {}", i + 1, e),
                    }
                })?;
                if self.config.is_missing(field) {
                    builder.append_null();
                } else {
                    builder.append_value(field);
                }
            }
            let array: ArrayRef = Arc::new(builder.finish());
            columns.push(Column::from(array));
        }
        debug!(first_row, rows = rows.len(), "read batch");
        Table::new(self.schema.clone(), columns).map(Some)
    }
}
