use std::{fs, io::ErrorKind, path::Path};

use calamine::{open_workbook, Data, Reader, Xlsx};
use csv::{ReaderBuilder, Trim};
use time::{Date, Duration, Month};
use tracing::debug;

use crate::{columns::recognizes, disposal::ISO_DATE_FMT, Error, Result};

/// Delimiters tried, in order, when none is forced.
pub const DELIMITERS: [u8; 3] = [b',', b'\t', b';'];

#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    /// Skip auto-detection and split on this byte only.
    pub delimiter: Option<u8>,
    /// Worksheet to read from a workbook. Defaults to the first one.
    pub sheet: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// 1-based line (or worksheet row) the record starts on.
    pub line: usize,
    pub fields: Vec<String>,
}

impl RawRecord {
    fn is_blank(&self) -> bool {
        self.fields.iter().all(|f| f.trim().is_empty())
    }

    fn filled(&self) -> usize {
        self.fields.iter().filter(|f| !f.trim().is_empty()).count()
    }
}

/// Header and data records of one input file, noise lines removed.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<RawRecord>,
    pub header_line: usize,
}

enum Located {
    /// `recognized` is false when no candidate header names every
    /// required field and the first candidate was taken instead.
    Table { table: RawTable, recognized: bool },
    HeaderOnly,
    NoHeader,
}

/// Loads the file at `file_path` as a table. Workbooks (`.xlsx`, `.xlsm`)
/// are read from a worksheet, anything else as delimited text.
pub fn read_table<P: AsRef<Path>>(file_path: P, options: &ReadOptions) -> Result<RawTable> {
    let path = file_path.as_ref();
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }
    if is_workbook(path) {
        return read_workbook(path, options.sheet.as_deref());
    }
    let bytes = fs::read(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => Error::FileNotFound(path.to_path_buf()),
        _ => Error::Io {
            path: path.to_path_buf(),
            source,
        },
    })?;
    parse_delimited(&String::from_utf8_lossy(&bytes), options.delimiter)
}

fn is_workbook(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xlsx") || ext.eq_ignore_ascii_case("xlsm"))
}

/// Finds the header and data rows in delimited text, trying each candidate
/// delimiter until one yields a consistent table.
pub fn parse_delimited(text: &str, delimiter: Option<u8>) -> Result<RawTable> {
    let text = text.trim_start_matches('\u{feff}');
    let candidates = delimiter.map_or_else(|| DELIMITERS.to_vec(), |d| vec![d]);
    let mut header_only = false;
    let mut unrecognized = None;
    for &delim in &candidates {
        let Some(records) = split_records(text, delim) else {
            debug!(delimiter = %(delim as char).escape_default(), "input does not decode");
            continue;
        };
        match locate_table(records) {
            Located::Table {
                table,
                recognized: true,
            } => {
                debug!(
                    delimiter = %(delim as char).escape_default(),
                    header_line = table.header_line,
                    columns = table.headers.len(),
                    rows = table.rows.len(),
                    "detected table"
                );
                return Ok(table);
            }
            Located::Table { table, .. } => {
                debug!(
                    delimiter = %(delim as char).escape_default(),
                    header_line = table.header_line,
                    "table header names no known column set, trying next delimiter"
                );
                unrecognized.get_or_insert(table);
            }
            Located::HeaderOnly => header_only = true,
            Located::NoHeader => {}
        }
    }
    // Let reconciliation report which columns the best guess lacks.
    if let Some(table) = unrecognized {
        return Ok(table);
    }
    if header_only || text.trim().is_empty() {
        return Err(Error::EmptyInput);
    }
    Err(Error::MalformedInput {
        tried: candidates
            .iter()
            .map(|d| format!("{:?}", *d as char))
            .collect::<Vec<_>>()
            .join(", "),
    })
}

fn split_records(text: &str, delimiter: u8) -> Option<Vec<RawRecord>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .delimiter(delimiter)
        .from_reader(text.as_bytes());
    let mut records = Vec::new();
    for record in rdr.records() {
        let record = record.ok()?;
        let line = record.position().map_or(0, |p| p.line() as usize);
        records.push(RawRecord {
            line,
            fields: record.iter().map(str::to_string).collect(),
        });
    }
    Some(records)
}

/// Header candidates are the records with at least two filled fields
/// after which every record has the candidate's width, so data rows form
/// the trailing run of equal-width records. The first candidate naming
/// every required field wins, otherwise the first candidate. Trailing
/// records with fewer than two filled fields are footers and dropped.
fn locate_table(records: Vec<RawRecord>) -> Located {
    let mut records: Vec<RawRecord> = records.into_iter().filter(|r| !r.is_blank()).collect();
    while records.last().is_some_and(|r| r.filled() < 2) {
        records.pop();
    }
    let Some(width) = records.last().map(|r| r.fields.len()) else {
        return Located::NoHeader;
    };
    let run_start = records
        .iter()
        .rposition(|r| r.fields.len() != width)
        .map_or(0, |i| i + 1);
    let candidates: Vec<usize> = (run_start..records.len())
        .filter(|&i| records[i].filled() >= 2)
        .collect();
    let recognized = candidates
        .iter()
        .copied()
        .find(|&i| recognizes(&records[i].fields));
    let Some(header_pos) = recognized.or(candidates.first().copied()) else {
        return Located::NoHeader;
    };
    let rows = records.split_off(header_pos + 1);
    if rows.is_empty() {
        // A lone trailing record after rejected structured lines is more
        // likely a stray row than a header.
        let rejected = records[..header_pos].iter().any(|r| r.filled() >= 2);
        return if rejected && recognized.is_none() {
            Located::NoHeader
        } else {
            Located::HeaderOnly
        };
    }
    let Some(header) = records.pop() else {
        return Located::NoHeader;
    };
    Located::Table {
        table: RawTable {
            headers: header.fields,
            rows,
            header_line: header.line,
        },
        recognized: recognized.is_some(),
    }
}

fn read_workbook(path: &Path, sheet: Option<&str>) -> Result<RawTable> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let range = match sheet {
        Some(name) => workbook.worksheet_range(name)?,
        None => workbook.worksheet_range_at(0).ok_or(Error::EmptyInput)??,
    };
    let first_row = range.start().map_or(0, |(row, _)| row as usize);
    let records: Vec<RawRecord> = range
        .rows()
        .enumerate()
        .map(|(i, cells)| RawRecord {
            line: first_row + i + 1,
            fields: cells.iter().map(cell_text).collect(),
        })
        .collect();
    let blank = records.iter().all(RawRecord::is_blank);
    match locate_table(records) {
        Located::Table { table, .. } => {
            debug!(
                header_line = table.header_line,
                columns = table.headers.len(),
                rows = table.rows.len(),
                "detected worksheet table"
            );
            Ok(table)
        }
        Located::HeaderOnly => Err(Error::EmptyInput),
        Located::NoHeader if blank => Err(Error::EmptyInput),
        Located::NoHeader => Err(Error::MalformedInput {
            tried: "worksheet cells".to_string(),
        }),
    }
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.trim().to_string(),
        Data::DateTime(dt) => {
            excel_serial_date(dt.as_f64()).unwrap_or_else(|| dt.as_f64().to_string())
        }
        other => other.to_string(),
    }
}

/// Renders an Excel (1900 system) day serial as an ISO date.
fn excel_serial_date(serial: f64) -> Option<String> {
    if !serial.is_finite() {
        return None;
    }
    let epoch = Date::from_calendar_date(1899, Month::December, 30).ok()?;
    epoch
        .checked_add(Duration::days(serial.floor() as i64))?
        .format(ISO_DATE_FMT)
        .ok()
}
