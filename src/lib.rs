//! Short-term / long-term capital gains summary for crypto disposal exports.
//!
//! The pipeline reads a loosely structured table ([`reader`]), maps its
//! headers onto canonical fields ([`columns`]), converts each row into a
//! [`Disposal`] and totals them by holding term ([`engine`]).

use std::path::Path;

use tracing::debug;

pub mod columns;
pub mod disposal;
pub mod engine;
mod error;
pub mod reader;
pub mod report;

pub use columns::{reconcile, ColumnMap, Field, MissingColumn};
pub use disposal::Disposal;
pub use engine::{
    classify, classify_all, summarize, ClassificationMode, HoldingTerm, Summary,
    LONG_TERM_THRESHOLD_DAYS,
};
pub use error::{Error, Result};
pub use reader::{read_table, ReadOptions};
pub use report::format_usd;

/// Reads the disposals in `file_path` and returns their summary.
pub fn summarize_file<P: AsRef<Path>>(file_path: P, options: &ReadOptions) -> Result<Summary> {
    let table = read_table(&file_path, options)?;
    let columns = reconcile(&table.headers)?;
    let rows = disposal::disposals(&table, &columns)?;
    debug!(
        path = %file_path.as_ref().display(),
        header_line = table.header_line,
        rows = rows.len(),
        "loaded disposals"
    );
    summarize(rows)
}
