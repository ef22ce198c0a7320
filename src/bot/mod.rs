use std::sync::Arc;

use crate::{config::App, logging, service::QuoteService};

/// Turns chat text into a quote reply.
///
/// The whole message is taken as the symbol after trimming and uppercasing;
/// there is no parsing of longer sentences.
#[derive(Clone)]
pub struct QuoteBot {
    service: Arc<QuoteService>,
}

impl QuoteBot {
    pub fn new(service: Arc<QuoteService>) -> Self {
        QuoteBot { service }
    }

    pub fn from_settings(settings: &App) -> Self {
        QuoteBot::new(Arc::new(QuoteService::from_settings(settings)))
    }

    /// Answers one request. Never fails: errors come back as their message text.
    pub async fn handle(&self, request_text: &str) -> String {
        let symbol = request_text.trim().to_uppercase();

        match self.service.get_quote(&symbol).await {
            Ok(quote) => {
                let reply = quote.to_string();
                logging::info_file_async(format!("reply {}", reply));
                reply
            }
            Err(why) => {
                logging::warn_file_async(format!(
                    "Failed to answer {:?} ({}) because {}",
                    request_text,
                    why.kind(),
                    why
                ));
                why.to_string()
            }
        }
    }
}
