use std::path::PathBuf;

use thiserror::Error;

use crate::columns::{Field, MissingColumn};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("input file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read workbook: {0}")]
    Workbook(#[from] calamine::XlsxError),

    #[error("no data rows found after the header")]
    EmptyInput,

    #[error("no delimiter ({tried}) produced a table with a consistent column count")]
    MalformedInput { tried: String },

    #[error("missing required columns: {}", join_missing(.0))]
    MissingColumns(Vec<MissingColumn>),

    #[error("line {line}: invalid {field} value {value:?}")]
    InvalidValue {
        line: usize,
        field: Field,
        value: String,
    },

    #[error("line {line}: cannot parse {field} {value:?} as a date")]
    DateParse {
        line: usize,
        field: Field,
        value: String,
    },

    #[error("line {line}: {field} total exceeds the representable range")]
    Overflow { line: usize, field: Field },

    #[error("line {line}: cannot classify holding period: {reason}")]
    RowClassification { line: usize, reason: String },
}

fn join_missing(missing: &[MissingColumn]) -> String {
    missing
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
