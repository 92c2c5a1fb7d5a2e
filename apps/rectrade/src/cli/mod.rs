//! # RecTrade CLI Module
//!
//! This module implements the CLI interface for the REC ledger.
//!
//! ## Available Commands
//!
//! - `init` - Initialize a new ledger
//! - `status` - Show ledger status
//! - `register` - Register a certificate
//! - `certificate` / `certificates` / `certificate-sum` - Certificate queries
//! - `sell` / `buy` / `approve` - Transaction lifecycle
//! - `transaction` / `transactions` / `buyer-sum` - Transaction queries
//! - `dump` - Every key and record in the ledger
//! - `export` / `import` - Ledger snapshots
//! - `hash` - State checksum and BLAKE3 digest

mod commands;

use crate::config::{AppConfig, BackendKind};
use clap::{Parser, Subcommand};
use rectrade_core::{CertificateRequest, QueryType, RecError, SaleRequest};
use serde_json::Value;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// RecTrade - Renewable Energy Certificate ledger
///
/// Issues certificates, lists them for sale, and records purchases and
/// confirmations. Every command prints its result as JSON.
#[derive(Parser, Debug)]
#[command(name = "rectrade")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Path to the ledger database [default: rectrade.db]
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Storage backend [default: redb]
    #[arg(short = 'B', long, global = true, value_enum)]
    pub backend: Option<BackendKind>,

    /// Configuration file [default: rectrade.toml if present]
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Default log filter for the chosen verbosity.
    #[must_use]
    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "rectrade=debug,rectrade_core=debug"
        } else if self.quiet {
            "rectrade=error,rectrade_core=error"
        } else {
            "rectrade=info,rectrade_core=info"
        }
    }
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new ledger
    Init {
        /// Overwrite an existing database
        #[arg(short, long)]
        force: bool,
    },

    /// Show ledger status
    Status,

    /// Register a new certificate
    Register {
        /// Issuing supplier
        #[arg(short, long)]
        supplier: String,

        /// Certificate quantity
        #[arg(short = 'n', long)]
        quantity: u64,

        /// Issued in Jeju
        #[arg(long)]
        jeju: bool,

        /// Supply date
        #[arg(long, default_value = "0")]
        supply_date: i64,

        /// Expiry date
        #[arg(long, default_value = "0")]
        expire_date: i64,
    },

    /// Show one certificate
    Certificate {
        /// Certificate id
        id: String,
    },

    /// List certificates
    Certificates {
        /// Only certificates of this supplier
        #[arg(short, long)]
        supplier: Option<String>,
    },

    /// Remaining quantity over a supplier's certificates
    CertificateSum {
        /// Supplier
        #[arg(short, long)]
        supplier: String,
    },

    /// List part of a certificate for sale
    Sell {
        /// Certificate id
        #[arg(short, long)]
        target: String,

        /// Unit price
        #[arg(short, long)]
        price: u64,

        /// Amount to sell
        #[arg(short = 'n', long)]
        quantity: u64,

        /// Selling supplier
        #[arg(short, long)]
        supplier: String,
    },

    /// Execute a listed transaction
    Buy {
        /// Transaction id
        id: String,

        /// Buyer
        #[arg(short, long)]
        buyer: String,
    },

    /// Confirm a transaction
    Approve {
        /// Transaction id
        id: String,
    },

    /// Show one transaction
    Transaction {
        /// Transaction id
        id: String,
    },

    /// List transactions
    Transactions {
        /// Execution state to list
        #[arg(short, long, value_enum, default_value_t = TransactionView::All)]
        filter: TransactionView,

        /// Only transactions of this supplier
        #[arg(short, long, conflicts_with_all = ["buyer", "filter"])]
        supplier: Option<String>,

        /// Only transactions of this buyer
        #[arg(short, long, conflicts_with = "filter")]
        buyer: Option<String>,
    },

    /// Confirmed quantity bought by a buyer
    BuyerSum {
        /// Buyer
        #[arg(short, long)]
        buyer: String,
    },

    /// Every key and record in the ledger
    Dump,

    /// Export a ledger snapshot
    Export {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Import a ledger snapshot into a ledger without records
    Import {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Compute the state checksum and BLAKE3 digest
    Hash,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Resolve configuration and run the parsed command.
pub fn execute(cli: Cli) -> Result<Value, RecError> {
    let config = AppConfig::resolve(cli.config.as_deref())?
        .with_overrides(cli.database, cli.backend);
    tracing::debug!(?config, "resolved configuration");
    run(&config, cli.command)
}

/// Run one command against `config`.
pub fn run(config: &AppConfig, command: Option<Commands>) -> Result<Value, RecError> {
    match command {
        Some(Commands::Init { force }) => cmd_init(config, force),
        Some(Commands::Register {
            supplier,
            quantity,
            jeju,
            supply_date,
            expire_date,
        }) => cmd_register(
            config,
            &CertificateRequest {
                supplier,
                quantity,
                is_jeju: jeju,
                supply_date,
                expire_date,
            },
        ),
        Some(Commands::Certificate { id }) => cmd_query(config, &QueryType::Certificate(id)),
        Some(Commands::Certificates { supplier }) => {
            cmd_query(config, &certificates_query(supplier))
        }
        Some(Commands::CertificateSum { supplier }) => {
            cmd_query(config, &QueryType::supplier_quantity(supplier))
        }
        Some(Commands::Sell {
            target,
            price,
            quantity,
            supplier,
        }) => cmd_sell(
            config,
            &SaleRequest {
                target,
                price,
                quantity,
                supplier,
            },
        ),
        Some(Commands::Buy { id, buyer }) => cmd_buy(config, &id, &buyer),
        Some(Commands::Approve { id }) => cmd_approve(config, &id),
        Some(Commands::Transaction { id }) => cmd_query(config, &QueryType::Transaction(id)),
        Some(Commands::Transactions {
            filter,
            supplier,
            buyer,
        }) => cmd_query(config, &transactions_query(filter, supplier, buyer)),
        Some(Commands::BuyerSum { buyer }) => {
            cmd_query(config, &QueryType::buyer_quantity(buyer))
        }
        Some(Commands::Dump) => cmd_query(config, &QueryType::AllRecords),
        Some(Commands::Export { output }) => cmd_export(config, &output),
        Some(Commands::Import { input }) => cmd_import(config, &input),
        Some(Commands::Hash) => cmd_hash(config),
        // No subcommand - show status by default
        Some(Commands::Status) | None => cmd_status(config),
    }
}
