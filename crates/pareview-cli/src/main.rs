//! pareview - review price-action trades from the terminal.
//!
//! Talks to the review backend with a persisted JWT session, renews expired
//! access tokens transparently, and keeps a local cache for `--offline` use.

mod cli;
mod output;

#[tokio::main]
async fn main() {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    if let Err(e) = cli::run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
