use std::fmt;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    columns::Field,
    disposal::{parse_date, Disposal},
    Error, Result,
};

/// Holdings of this many days or more are long-term.
pub const LONG_TERM_THRESHOLD_DAYS: i64 = 365;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HoldingTerm {
    ShortTerm,
    LongTerm,
}

impl HoldingTerm {
    pub fn from_days(days: i64) -> Self {
        if days < LONG_TERM_THRESHOLD_DAYS {
            HoldingTerm::ShortTerm
        } else {
            HoldingTerm::LongTerm
        }
    }
}

impl fmt::Display for HoldingTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HoldingTerm::ShortTerm => write!(f, "Short-term"),
            HoldingTerm::LongTerm => write!(f, "Long-term"),
        }
    }
}

/// Input used to decide every row's holding term. Chosen once per dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationMode {
    /// The holding period column has at least one value.
    DayCount,
    /// No day counts at all; subtract acquisition from disposition dates.
    Dates,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub short_term_gains_losses: Decimal,
    pub long_term_gains_losses: Decimal,
    pub total_proceeds: Decimal,
    pub total_cost_basis: Decimal,
    pub short_term_rows: usize,
    pub long_term_rows: usize,
    pub mode: ClassificationMode,
}

impl Summary {
    fn empty(mode: ClassificationMode) -> Self {
        Self {
            short_term_gains_losses: Decimal::ZERO,
            long_term_gains_losses: Decimal::ZERO,
            total_proceeds: Decimal::ZERO,
            total_cost_basis: Decimal::ZERO,
            short_term_rows: 0,
            long_term_rows: 0,
            mode,
        }
    }

    fn add(&mut self, term: HoldingTerm, row: &Disposal) -> Result<()> {
        let (bucket, count) = match term {
            HoldingTerm::ShortTerm => (&mut self.short_term_gains_losses, &mut self.short_term_rows),
            HoldingTerm::LongTerm => (&mut self.long_term_gains_losses, &mut self.long_term_rows),
        };
        accumulate(bucket, row.gain_loss, row.line, Field::GainLoss)?;
        *count += 1;
        accumulate(&mut self.total_proceeds, row.proceeds, row.line, Field::Proceeds)?;
        accumulate(&mut self.total_cost_basis, row.cost_basis, row.line, Field::CostBasis)
    }
}

fn accumulate(total: &mut Decimal, value: Decimal, line: usize, field: Field) -> Result<()> {
    *total = total
        .checked_add(value)
        .ok_or(Error::Overflow { line, field })?;
    Ok(())
}

pub fn classification_mode(rows: &[Disposal]) -> ClassificationMode {
    if rows.iter().any(|r| r.holding_period_days.is_some()) {
        ClassificationMode::DayCount
    } else {
        ClassificationMode::Dates
    }
}

pub fn classify(row: &Disposal, mode: ClassificationMode) -> Result<HoldingTerm> {
    let days = match mode {
        ClassificationMode::DayCount => {
            row.holding_period_days
                .ok_or_else(|| Error::RowClassification {
                    line: row.line,
                    reason: "holding period is empty while other rows provide one".to_string(),
                })?
        }
        ClassificationMode::Dates => {
            let acquired = row_date(row.line, Field::DateAcquired, row.date_acquired.as_deref())?;
            let disposed = row_date(
                row.line,
                Field::DateOfDisposition,
                row.date_of_disposition.as_deref(),
            )?;
            (disposed - acquired).whole_days()
        }
    };
    if days < 0 {
        return Err(Error::RowClassification {
            line: row.line,
            reason: format!("negative holding period of {days} days"),
        });
    }
    Ok(HoldingTerm::from_days(days))
}

fn row_date(line: usize, field: Field, raw: Option<&str>) -> Result<time::Date> {
    let raw = raw.ok_or_else(|| Error::RowClassification {
        line,
        reason: format!("{field} is empty and no holding period is given"),
    })?;
    parse_date(raw).ok_or_else(|| Error::DateParse {
        line,
        field,
        value: raw.to_string(),
    })
}

/// Holding term of every row, in input order.
pub fn classify_all(rows: &[Disposal]) -> Result<Vec<HoldingTerm>> {
    let mode = classification_mode(rows);
    rows.iter().map(|row| classify(row, mode)).collect()
}

/// Classifies and totals the rows. The first row that cannot be classified
/// aborts the run.
pub fn summarize(rows: Vec<Disposal>) -> Result<Summary> {
    let mode = classification_mode(&rows);
    debug!(?mode, rows = rows.len(), "classifying disposals");
    let summary = rows
        .into_iter()
        .try_fold(Summary::empty(mode), |mut summary, row| {
            let term = classify(&row, mode)?;
            summary.add(term, &row)?;
            Ok::<_, Error>(summary)
        })?;
    info!(
        short_term_rows = summary.short_term_rows,
        long_term_rows = summary.long_term_rows,
        short_term = %summary.short_term_gains_losses,
        long_term = %summary.long_term_gains_losses,
        "summary computed"
    );
    Ok(summary)
}
