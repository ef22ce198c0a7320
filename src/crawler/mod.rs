use async_trait::async_trait;

use crate::{declare::Quote, error::QuoteError};

/// JSON GET with deadline and error classification
pub mod fetcher;
/// SerpApi finance
pub mod serpapi;

/// A remote site that can produce a [`Quote`] for a symbol.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Fetches and normalizes the current quote. `symbol` is already uppercased.
    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, QuoteError>;
}
