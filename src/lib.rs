//! Stock quote replies for a chat bot.
//!
//! [`bot::QuoteBot::handle`] takes the raw chat text, looks the symbol up through
//! [`service::QuoteService`] (TTL cache, client-side rate limit, 3 second fetch
//! deadline against SerpApi) and returns the reply sentence or the error text.

pub mod bot;
pub mod cache;
pub mod config;
pub mod crawler;
pub mod declare;
pub mod error;
pub mod logging;
pub mod ratelimit;
pub mod service;
pub mod util;

pub use bot::QuoteBot;
pub use declare::{Price, Quote};
pub use error::{ErrorKind, QuoteError};
pub use service::QuoteService;
