use std::fmt;

use serde::Serialize;
use tracing::{debug, warn};

use crate::{Error, Result};

/// Canonical meaning of an input column, independent of the header text a
/// given exchange or tracker uses for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Field {
    TransactionType,
    TransactionId,
    TaxLotId,
    AssetName,
    Amount,
    DateAcquired,
    CostBasis,
    DateOfDisposition,
    Proceeds,
    GainLoss,
    HoldingPeriodDays,
    DataSource,
}

impl Field {
    pub const ALL: [Field; 12] = [
        Field::TransactionType,
        Field::TransactionId,
        Field::TaxLotId,
        Field::AssetName,
        Field::Amount,
        Field::DateAcquired,
        Field::CostBasis,
        Field::DateOfDisposition,
        Field::Proceeds,
        Field::GainLoss,
        Field::HoldingPeriodDays,
        Field::DataSource,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Field::TransactionType => "TransactionType",
            Field::TransactionId => "TransactionID",
            Field::TaxLotId => "TaxLotID",
            Field::AssetName => "AssetName",
            Field::Amount => "Amount",
            Field::DateAcquired => "DateAcquired",
            Field::CostBasis => "CostBasis",
            Field::DateOfDisposition => "DateOfDisposition",
            Field::Proceeds => "Proceeds",
            Field::GainLoss => "GainLoss",
            Field::HoldingPeriodDays => "HoldingPeriodDays",
            Field::DataSource => "DataSource",
        }
    }

    pub fn is_required(self) -> bool {
        self != Field::HoldingPeriodDays
    }

    /// Header texts accepted for this field, already trimmed and lowercased.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Field::TransactionType => &["transaction type", "trade type", "tx type", "type"],
            Field::TransactionId => &["transaction id", "trade id", "tx id", "txid", "id"],
            Field::TaxLotId => &["tax lot id", "tax lot", "lot id", "lot"],
            Field::AssetName => &["asset name", "asset", "currency name", "currency", "coin", "symbol"],
            Field::Amount => &["amount", "quantity", "qty", "units", "amount disposed"],
            Field::DateAcquired => &[
                "date acquired",
                "acquired",
                "acquisition date",
                "date of acquisition",
                "purchase date",
                "date opened",
            ],
            Field::CostBasis => &["cost basis (usd)", "cost basis", "cost basis usd", "cost (usd)", "cost"],
            Field::DateOfDisposition => &[
                "date of disposition",
                "date disposed",
                "disposition date",
                "date sold",
                "sale date",
                "date closed",
            ],
            Field::Proceeds => &["proceeds (usd)", "proceeds", "total proceeds", "sale proceeds"],
            Field::GainLoss => &[
                "gains (losses) (usd)",
                "gains (losses)",
                "gain (loss)",
                "gain/loss",
                "gain/loss (usd)",
                "realized gain/loss",
                "adjusted gain/loss",
                "gain loss",
            ],
            Field::HoldingPeriodDays => &[
                "holding period (days)",
                "holding period",
                "holding days",
                "days held",
            ],
            Field::DataSource => &["data source", "source", "exchange", "wallet", "platform"],
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A required field that matched none of the header's columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingColumn {
    pub field: Field,
    pub aliases: &'static [&'static str],
}

impl fmt::Display for MissingColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (accepted headers: {})", self.field, self.aliases.join(", "))
    }
}

fn normalize(header: &str) -> String {
    header
        .trim()
        .trim_start_matches('\u{feff}')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Looks a raw header up in the alias table.
pub fn canonical_field(header: &str) -> Option<Field> {
    let header = normalize(header);
    Field::ALL
        .into_iter()
        .find(|field| field.aliases().contains(&header.as_str()))
}

/// True when every required field has a column in `headers`.
pub fn recognizes(headers: &[String]) -> bool {
    let found: Vec<Field> = headers.iter().filter_map(|h| canonical_field(h)).collect();
    Field::ALL
        .into_iter()
        .filter(|f| f.is_required())
        .all(|f| found.contains(&f))
}

/// Column position of every canonical field found in a header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    indices: [Option<usize>; Field::ALL.len()],
}

impl ColumnMap {
    pub fn get(&self, field: Field) -> Option<usize> {
        self.indices[field as usize]
    }

    pub fn contains(&self, field: Field) -> bool {
        self.get(field).is_some()
    }
}

/// Maps each header column to its canonical field. Unknown columns are
/// ignored; when two columns map to the same field the leftmost one wins.
pub fn reconcile(headers: &[String]) -> Result<ColumnMap> {
    let mut map = ColumnMap::default();
    for (pos, header) in headers.iter().enumerate() {
        let Some(field) = canonical_field(header) else {
            debug!(column = %header, "ignoring unrecognized column");
            continue;
        };
        if let Some(first) = map.indices[field as usize] {
            warn!(
                %field,
                kept = %headers[first],
                ignored = %header,
                "several columns match the same field, keeping the first"
            );
        } else {
            map.indices[field as usize] = Some(pos);
        }
    }

    let missing: Vec<MissingColumn> = Field::ALL
        .into_iter()
        .filter(|f| f.is_required() && !map.contains(*f))
        .map(|field| MissingColumn {
            field,
            aliases: field.aliases(),
        })
        .collect();
    if !missing.is_empty() {
        return Err(Error::MissingColumns(missing));
    }
    Ok(map)
}
