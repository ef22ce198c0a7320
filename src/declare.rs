use std::{fmt, str::FromStr};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Value of [`Quote::source`] for every quote this crate produces.
pub const QUOTE_SOURCE: &str = "finance";

/// Text rendered in place of a field the provider left out.
const MISSING: &str = "N/A";

/// The provider's price, carried as sent.
///
/// Numbers that fit a [`Decimal`] are kept as one; anything else (strings,
/// booleans, numbers out of range) stays the raw JSON value.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum Price {
    Decimal(Decimal),
    Raw(Value),
}

impl Price {
    /// `None` for a JSON `null`.
    pub fn from_json(value: &Value) -> Option<Price> {
        match value {
            Value::Null => None,
            Value::Number(number) => match Decimal::from_str(&number.to_string()) {
                Ok(decimal) => Some(Price::Decimal(decimal)),
                Err(_) => Some(Price::Raw(value.clone())),
            },
            other => Some(Price::Raw(other.clone())),
        }
    }
}

impl From<Decimal> for Price {
    fn from(value: Decimal) -> Self {
        Price::Decimal(value)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Price::Decimal(decimal) => write!(f, "{}", decimal),
            Price::Raw(Value::String(text)) => f.write_str(text),
            Price::Raw(other) => write!(f, "{}", other),
        }
    }
}

/// A normalized price observation for one symbol.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    pub source: String,
    /// Uppercased ticker, e.g. `AAPL`.
    pub symbol: String,
    pub price: Option<Price>,
    /// Provider timestamp, kept as the provider sent it.
    pub time: Option<String>,
}

impl Quote {
    pub fn new(symbol: &str, price: Option<Price>, time: Option<String>) -> Self {
        Quote {
            source: QUOTE_SOURCE.to_string(),
            symbol: symbol.to_uppercase(),
            price,
            time,
        }
    }
}

impl fmt::Display for Quote {
    /// `AAPL current price: $150.25 (as of: 2024-01-01T00:00:00Z)`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let price = self
            .price
            .as_ref()
            .map(|p| p.to_string())
            .unwrap_or_else(|| MISSING.to_string());
        let time = self.time.as_deref().unwrap_or(MISSING);

        write!(f, "{} current price: ${} (as of: {})", self.symbol, price, time)
    }
}
