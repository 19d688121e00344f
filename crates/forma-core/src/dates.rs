//! Conversion between database and UI date representations.

use chrono::format::{Item, StrftimeItems};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use thiserror::Error;

/// strftime patterns for stored and displayed dates.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DateFormats {
    /// Format dates are stored in
    pub database: String,
    /// Format dates are shown in
    pub ui: String,
}

impl Default for DateFormats {
    fn default() -> Self {
        Self {
            database: "%Y-%m-%d".to_string(),
            ui: "%d/%m/%Y".to_string(),
        }
    }
}

impl DateFormats {
    /// Convert a stored date into its display form.
    pub fn to_ui(&self, raw: &str) -> Result<String, DateFormatError> {
        convert_date(raw, &self.database, &self.ui)
    }

    /// Convert a displayed date into its stored form.
    pub fn to_database(&self, shown: &str) -> Result<String, DateFormatError> {
        convert_date(shown, &self.ui, &self.database)
    }
}

/// Date conversion failures.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DateFormatError {
    /// Input does not match the expected pattern
    #[error("unable to parse date {input:?}, expected format {expected}")]
    Parse {
        /// Offending input
        input: String,
        /// Pattern the input was parsed with
        expected: String,
    },
    /// Pattern itself is malformed
    #[error("invalid date pattern {0:?}")]
    Pattern(String),
}

/// Whether `pattern` is a well-formed strftime pattern.
pub fn is_valid_pattern(pattern: &str) -> bool {
    !pattern.is_empty() && !StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error))
}

/// Re-render `input` from the `from` pattern into the `to` pattern.
pub fn convert_date(input: &str, from: &str, to: &str) -> Result<String, DateFormatError> {
    if !is_valid_pattern(to) {
        return Err(DateFormatError::Pattern(to.to_string()));
    }
    let date = NaiveDate::parse_from_str(input.trim(), from).map_err(|_| DateFormatError::Parse {
        input: input.to_string(),
        expected: from.to_string(),
    })?;
    let mut out = String::new();
    write!(out, "{}", date.format(to)).map_err(|_| DateFormatError::Pattern(to.to_string()))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn converts_database_date_for_display() {
        let formats = DateFormats::default();
        assert_eq!(formats.to_ui("2024-03-09").unwrap(), "09/03/2024");
        assert_eq!(formats.to_database("09/03/2024").unwrap(), "2024-03-09");
    }

    #[test]
    fn rejects_malformed_input() {
        let formats = DateFormats::default();
        assert_matches!(
            formats.to_ui("09/03/2024"),
            Err(DateFormatError::Parse { expected, .. }) if expected == "%Y-%m-%d"
        );
    }

    #[test]
    fn rejects_malformed_pattern() {
        assert!(!is_valid_pattern("%Q"));
        assert!(!is_valid_pattern(""));
        assert_matches!(
            convert_date("2024-03-09", "%Y-%m-%d", "%Q"),
            Err(DateFormatError::Pattern(_))
        );
    }
}
