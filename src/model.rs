// src/model.rs
//! Plain data carried between the store, the news source, the controller and the API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Lowest price a simulated instrument can reach.
pub const MIN_PRICE: f64 = 0.01;

/// One tracked instrument on the watchlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolRecord {
    pub symbol: String,       // always uppercase, e.g. "AAPL"
    pub display_name: String, // e.g. "Apple Inc."
    pub price: f64,
    pub absolute_change: f64,
    pub percent_change: f64,
}

/// One synthetic news item. Immutable once generated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsArticle {
    pub id: String, // "{symbol}-{sequence}-{generation millis}"
    pub headline: String,
    pub summary: Option<String>,
    pub published_at: DateTime<Utc>,
    pub source: String,
    pub related_symbol: Option<String>,
    pub url: String,
}

/// The add-stock submission as typed by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddStockForm {
    pub symbol: String,
    pub name: String,
}

impl AddStockForm {
    pub fn new(symbol: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            name: name.into(),
        }
    }

    /// Both fields non-blank after trimming. A front end disables its
    /// submit button while this is false.
    pub fn can_submit(&self) -> bool {
        self.validate().is_ok()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.symbol.trim().is_empty() {
            return Err(ValidationError::BlankSymbol);
        }
        if self.name.trim().is_empty() {
            return Err(ValidationError::BlankName);
        }
        Ok(())
    }
}

/// Round to two decimal places (cents).
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round2_keeps_cents() {
        assert_eq!(round2(1.005_1), 1.01);
        assert_eq!(round2(-3.456), -3.46);
        assert_eq!(round2(0.01), 0.01);
    }

    #[test]
    fn form_needs_both_fields() {
        assert!(AddStockForm::new(" tsla ", "Tesla").can_submit());
        assert_eq!(
            AddStockForm::new("   ", "Tesla").validate(),
            Err(ValidationError::BlankSymbol)
        );
        assert_eq!(
            AddStockForm::new("TSLA", "\t").validate(),
            Err(ValidationError::BlankName)
        );
    }
}
