// Monetary string parsing for CSV cells and form fields.
//
// Research spreadsheets carry prices like "$1,234.56"; the currency symbol and
// thousands separators are stripped before parsing.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MoneyError {
    #[error("empty monetary value")]
    Empty,

    #[error("unparsable monetary value '{0}'")]
    Unparsable(String),

    #[error("monetary value '{0}' is not finite")]
    NotFinite(String),

    #[error("negative monetary value '{0}'")]
    Negative(String),
}

/// Parse a monetary string into a non-negative amount.
///
/// Accepts an optional leading `$`, `,` thousands separators and surrounding
/// whitespace. Rejects empty, non-numeric, non-finite and negative input.
pub fn parse_amount(raw: &str) -> Result<f64, MoneyError> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| *c != '$' && *c != ',')
        .collect();
    let cleaned = cleaned.trim();

    if cleaned.is_empty() {
        return Err(MoneyError::Empty);
    }

    let value: f64 = cleaned
        .parse()
        .map_err(|_| MoneyError::Unparsable(raw.trim().to_string()))?;

    if !value.is_finite() {
        return Err(MoneyError::NotFinite(raw.trim().to_string()));
    }
    if value < 0.0 {
        return Err(MoneyError::Negative(raw.trim().to_string()));
    }

    // Normalize -0.0 so it prints as 0.00.
    Ok(if value == 0.0 { 0.0 } else { value })
}

/// Format an amount for display with two decimals and a dollar sign.
pub fn format_amount(value: f64) -> String {
    format!("${value:.2}")
}
