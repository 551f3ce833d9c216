use std::str::FromStr;

use rust_decimal::{prelude::ToPrimitive, Decimal};
use time::{format_description::BorrowedFormatItem, macros::format_description, Date};

use crate::{
    columns::{ColumnMap, Field},
    reader::{RawRecord, RawTable},
    Error, Result,
};

pub(crate) static ISO_DATE_FMT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");

static DATE_FMTS: &[&[BorrowedFormatItem]] = &[
    format_description!("[year]-[month padding:none]-[day padding:none]"),
    format_description!("[year]/[month padding:none]/[day padding:none]"),
    format_description!("[month padding:none]/[day padding:none]/[year]"),
];

const MISSING_MARKERS: [&str; 7] = ["nan", "n/a", "na", "null", "none", "-", "--"];

/// One fully resolved disposal event read from the input.
#[derive(Debug, Clone, PartialEq)]
pub struct Disposal {
    pub line: usize,
    pub transaction_type: String,
    pub transaction_id: String,
    pub tax_lot_id: String,
    pub asset_name: String,
    pub amount: Decimal,
    /// Raw text; only parsed when the dataset is classified by dates.
    pub date_acquired: Option<String>,
    pub cost_basis: Decimal,
    pub date_of_disposition: Option<String>,
    pub proceeds: Decimal,
    pub gain_loss: Decimal,
    pub holding_period_days: Option<i64>,
    pub data_source: String,
}

impl Disposal {
    pub fn from_record(record: &RawRecord, columns: &ColumnMap) -> Result<Self> {
        let cell = |field: Field| {
            columns
                .get(field)
                .and_then(|i| record.fields.get(i))
                .map(|s| s.trim())
                .filter(|s| !is_missing(s))
        };
        let text = |field: Field| cell(field).unwrap_or_default().to_string();
        let decimal = |field: Field| -> Result<Decimal> {
            let raw = cell(field).unwrap_or_default();
            parse_money(raw).ok_or_else(|| Error::InvalidValue {
                line: record.line,
                field,
                value: raw.to_string(),
            })
        };
        let holding_period_days = match cell(Field::HoldingPeriodDays) {
            None => None,
            Some(raw) => Some(parse_days(raw).ok_or_else(|| Error::InvalidValue {
                line: record.line,
                field: Field::HoldingPeriodDays,
                value: raw.to_string(),
            })?),
        };

        Ok(Self {
            line: record.line,
            transaction_type: text(Field::TransactionType),
            transaction_id: text(Field::TransactionId),
            tax_lot_id: text(Field::TaxLotId),
            asset_name: text(Field::AssetName),
            amount: decimal(Field::Amount)?,
            date_acquired: cell(Field::DateAcquired).map(str::to_string),
            cost_basis: decimal(Field::CostBasis)?,
            date_of_disposition: cell(Field::DateOfDisposition).map(str::to_string),
            proceeds: decimal(Field::Proceeds)?,
            gain_loss: decimal(Field::GainLoss)?,
            holding_period_days,
            data_source: text(Field::DataSource),
        })
    }
}

/// Converts every data row of a reconciled table.
pub fn disposals(table: &RawTable, columns: &ColumnMap) -> Result<Vec<Disposal>> {
    table
        .rows
        .iter()
        .map(|record| Disposal::from_record(record, columns))
        .collect()
}

pub fn is_missing(raw: &str) -> bool {
    let raw = raw.trim();
    raw.is_empty() || MISSING_MARKERS.iter().any(|m| raw.eq_ignore_ascii_case(m))
}

/// Parses a currency or quantity cell: `$1,234.50`, `(12.00)`, `-3`, `1e-8`.
pub fn parse_money(raw: &str) -> Option<Decimal> {
    let mut s = raw.trim();
    if is_missing(s) {
        return None;
    }
    let mut negative = false;
    if let Some(inner) = s.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        negative = true;
        s = inner.trim();
    }
    if let Some(rest) = s.strip_prefix('-') {
        negative = !negative;
        s = rest.trim_start();
    } else if let Some(rest) = s.strip_prefix('+') {
        s = rest.trim_start();
    }
    let s = s.trim_start_matches('$');
    let s = match s.len().checked_sub(3).and_then(|i| s.get(i..).map(|suffix| (i, suffix))) {
        Some((i, suffix)) if suffix.eq_ignore_ascii_case("usd") => &s[..i],
        _ => s,
    };
    let cleaned: String = s
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    let value = Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .ok()?;
    Some(if negative { -value } else { value })
}

/// Parses a whole-day count, tolerating a zero fractional part (`183.0`).
pub fn parse_days(raw: &str) -> Option<i64> {
    let value = Decimal::from_str(raw.trim()).ok()?;
    if !value.fract().is_zero() {
        return None;
    }
    value.to_i64()
}

/// Parses a calendar date, dropping any time-of-day suffix.
pub fn parse_date(raw: &str) -> Option<Date> {
    let raw = raw.trim();
    let day = raw.split(['T', ' ']).next().unwrap_or(raw);
    DATE_FMTS
        .iter()
        .find_map(|fmt| Date::parse(day, fmt).ok())
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use time::Month;

    use super::*;
    use crate::columns::reconcile;

    #[test]
    fn money_formats() {
        assert_eq!(parse_money("40000"), Some(dec!(40000)));
        assert_eq!(parse_money(" $1,234.56 "), Some(dec!(1234.56)));
        assert_eq!(parse_money("-$12.30"), Some(dec!(-12.30)));
        assert_eq!(parse_money("$-12.30"), Some(dec!(-12.30)));
        assert_eq!(parse_money("(500.00)"), Some(dec!(-500.00)));
        assert_eq!(parse_money("+7"), Some(dec!(7)));
        assert_eq!(parse_money("1.5e-8"), Some(dec!(0.000000015)));
        assert_eq!(parse_money("12.5 USD"), Some(dec!(12.5)));
        assert_eq!(parse_money("12.5 usd"), Some(dec!(12.5)));
        assert_eq!(parse_money("$3,000.10Usd"), Some(dec!(3000.10)));
        assert_eq!(parse_money(""), None);
        assert_eq!(parse_money("NaN"), None);
        assert_eq!(parse_money("abc"), None);
    }

    #[test]
    fn day_counts() {
        assert_eq!(parse_days("365"), Some(365));
        assert_eq!(parse_days("183.0"), Some(183));
        assert_eq!(parse_days("-3"), Some(-3));
        assert_eq!(parse_days("12.5"), None);
        assert_eq!(parse_days("soon"), None);
    }

    #[test]
    fn date_formats() {
        let jan5 = Date::from_calendar_date(2024, Month::January, 5).unwrap();
        assert_eq!(parse_date("2024-01-05"), Some(jan5));
        assert_eq!(parse_date("2024-1-5"), Some(jan5));
        assert_eq!(parse_date("2024/01/05"), Some(jan5));
        assert_eq!(parse_date("01/05/2024"), Some(jan5));
        assert_eq!(parse_date("1/5/2024"), Some(jan5));
        assert_eq!(parse_date("2024-01-05T23:59:59Z"), Some(jan5));
        assert_eq!(parse_date("2024-01-05 10:00:00"), Some(jan5));
        assert_eq!(parse_date("2024-02-30"), None);
        assert_eq!(parse_date("yesterday"), None);
    }

    fn record(fields: &[&str]) -> RawRecord {
        RawRecord {
            line: 9,
            fields: fields.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn columns() -> ColumnMap {
        let headers: Vec<String> = Field::ALL.iter().map(|f| f.aliases()[0].to_string()).collect();
        reconcile(&headers).unwrap()
    }

    #[test]
    fn builds_disposal_from_record() {
        let r = record(&[
            "Sale", "1", "A", "BTC", "1.0", "2024-01-01", "40000", "2024-12-31", "50000", "10000", "365",
            "Exchange",
        ]);
        let d = Disposal::from_record(&r, &columns()).unwrap();
        assert_eq!(d.line, 9);
        assert_eq!(d.asset_name, "BTC");
        assert_eq!(d.amount, dec!(1.0));
        assert_eq!(d.cost_basis, dec!(40000));
        assert_eq!(d.gain_loss, dec!(10000));
        assert_eq!(d.holding_period_days, Some(365));
        assert_eq!(d.date_acquired.as_deref(), Some("2024-01-01"));
    }

    #[test]
    fn blank_optional_cells_are_absent() {
        let r = record(&["Sale", "1", "A", "BTC", "1", "", "10", "N/A", "20", "10", "", "X"]);
        let d = Disposal::from_record(&r, &columns()).unwrap();
        assert_eq!(d.holding_period_days, None);
        assert_eq!(d.date_acquired, None);
        assert_eq!(d.date_of_disposition, None);
    }

    #[test]
    fn bad_money_cell_names_line_and_field() {
        let r = record(&["Sale", "1", "A", "BTC", "1", "", "10", "", "lots", "10", "", "X"]);
        match Disposal::from_record(&r, &columns()) {
            Err(Error::InvalidValue { line, field, value }) => {
                assert_eq!(line, 9);
                assert_eq!(field, Field::Proceeds);
                assert_eq!(value, "lots");
            }
            other => panic!("expected invalid proceeds, got {other:?}"),
        }
    }

    #[test]
    fn bad_day_count_is_rejected() {
        let r = record(&["Sale", "1", "A", "BTC", "1", "", "10", "", "20", "10", "a year", "X"]);
        assert!(matches!(
            Disposal::from_record(&r, &columns()),
            Err(Error::InvalidValue {
                field: Field::HoldingPeriodDays,
                ..
            })
        ));
    }
}
