pub mod config;
pub mod csv;
mod error;
mod parse;
mod pipeline;
pub mod schema;
mod stats;
mod table;

pub use arrow;
pub use config::{Config, Reference};
pub use error::{Error, Result};
pub use parse::{FieldParser, ParseError};
pub use pipeline::Pipeline;
pub use schema::{ColumnType, Schema};
pub use stats::{Description, Means};
pub use table::{Column, Table, TypeError};
