use std::env;

use futures::future::join_all;
use quote_bot::{config::SETTINGS, logging, QuoteBot};

const SAMPLE_SYMBOL: &str = "AAPL";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    logging::info_console("quote_bot start".to_string());

    let bot = QuoteBot::from_settings(&SETTINGS);

    let mut requests: Vec<String> = env::args().skip(1).collect();
    if requests.is_empty() {
        requests.push(SAMPLE_SYMBOL.to_string());
    }

    let replies = join_all(requests.iter().map(|text| bot.handle(text))).await;
    for reply in replies {
        println!("{}", reply);
    }

    Ok(())
}
