//! # RecTrade - REC Ledger CLI
//!
//! The main binary for the rectrade ledger state machine.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │            apps/rectrade (THE BINARY)         │
//! │                                               │
//! │   ┌─────────────┐        ┌──────────────┐     │
//! │   │    CLI      │        │  AppConfig   │     │
//! │   │   (clap)    │◄───────│   (toml)     │     │
//! │   └──────┬──────┘        └──────────────┘     │
//! │          ▼                                    │
//! │   ┌───────────────┐                           │
//! │   │ rectrade-core │                           │
//! │   │  (THE LOGIC)  │                           │
//! │   └───────────────┘                           │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! rectrade init
//! rectrade register --supplier S1 --quantity 100 --jeju
//! rectrade sell --target CERTIFICATE_1700000000 --price 10 --quantity 40 --supplier S1
//! rectrade buy TRANSACTION_1 --buyer B1
//! rectrade approve TRANSACTION_1
//! rectrade buyer-sum --buyer B1
//! ```

use clap::Parser;
use rectrade::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    let cli = cli::Cli::parse();

    // RECTRADE_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("RECTRADE_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| cli.log_filter().into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    let output = cli::execute(cli).and_then(|value| {
        serde_json::to_string_pretty(&value)
            .map_err(|e| rectrade_core::RecError::Serialization(e.to_string()))
    });

    match output {
        Ok(text) => println!("{}", text),
        Err(e) => {
            tracing::error!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
