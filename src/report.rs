use std::fmt;

use rust_decimal::{Decimal, RoundingStrategy};

use crate::engine::Summary;

/// Formats an amount as US dollars with thousands separators and cents,
/// e.g. `$12,345.60` or `-$0.50`.
pub fn format_usd(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let digits = format!("{:.2}", rounded.abs());
    let (whole, cents) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{sign}${grouped}.{cents}")
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Crypto Transaction Summary:")?;
        writeln!(
            f,
            "Short-term Gains/Losses: {}",
            format_usd(self.short_term_gains_losses)
        )?;
        writeln!(
            f,
            "Long-term Gains/Losses: {}",
            format_usd(self.long_term_gains_losses)
        )?;
        writeln!(f, "Total Proceeds: {}", format_usd(self.total_proceeds))?;
        write!(f, "Total Cost Basis: {}", format_usd(self.total_cost_basis))
    }
}
