//! Error types for the quote pipeline.
//!
//! Every layer below the request handler returns [`QuoteError`]; the handler is
//! the single place where an error is turned into reply text.

use std::fmt;

use thiserror::Error;

/// Reply text for a fetch that outlived its deadline.
pub const TIMEOUT_MESSAGE: &str = "The request took too long, please try again shortly.";

/// Coarse classification of a [`QuoteError`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    Timeout,
    Api,
    Transport,
    Decode,
    InvalidSymbol,
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Timeout => "timeout",
            ErrorKind::Api => "api",
            ErrorKind::Transport => "transport",
            ErrorKind::Decode => "decode",
            ErrorKind::InvalidSymbol => "invalid_symbol",
            ErrorKind::Config => "config",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuoteError {
    /// The provider did not answer within the request timeout.
    #[error("{}", TIMEOUT_MESSAGE)]
    Timeout,

    /// The provider answered with a non-200 status.
    ///
    /// `code` and `message` come from the response body when present, otherwise
    /// from the HTTP status code and its reason phrase.
    #[error("API Error {code}: {message}")]
    Api { code: String, message: String },

    /// DNS, connect, TLS or body read failures.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A successful response whose body could not be understood.
    #[error("Failed to decode the provider response: {0}")]
    Decode(String),

    #[error("Please provide a stock symbol.")]
    InvalidSymbol,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl QuoteError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QuoteError::Timeout => ErrorKind::Timeout,
            QuoteError::Api { .. } => ErrorKind::Api,
            QuoteError::Transport(_) => ErrorKind::Transport,
            QuoteError::Decode(_) => ErrorKind::Decode,
            QuoteError::InvalidSymbol => ErrorKind::InvalidSymbol,
            QuoteError::Config(_) => ErrorKind::Config,
        }
    }
}

impl From<reqwest::Error> for QuoteError {
    /// The request URL is dropped first: it carries `api_key` in its query.
    fn from(why: reqwest::Error) -> Self {
        let why = why.without_url();
        if why.is_timeout() {
            QuoteError::Timeout
        } else if why.is_decode() {
            QuoteError::Decode(why.to_string())
        } else if why.is_builder() {
            QuoteError::Config(why.to_string())
        } else {
            QuoteError::Transport(why.to_string())
        }
    }
}

impl From<tokio::time::error::Elapsed> for QuoteError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        QuoteError::Timeout
    }
}
