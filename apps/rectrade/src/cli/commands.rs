//! # CLI Command Implementations
//!
//! Each `cmd_*` runs one ledger operation and returns its JSON result.
//! Printing is left to the caller.

use crate::config::{AppConfig, BackendKind};
use rectrade_core::{
    CertificateFilter, CertificateRequest, Ledger, LedgerStore, QueryType, RecError, RecordKind,
    SaleRequest, SequenceAllocator, StorageBackend, TransactionFilter, formats, keys,
};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum file size for snapshot import (500 MB).
const MAX_IMPORT_FILE_SIZE: u64 = 500 * 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), RecError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| RecError::Storage(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(RecError::Serialization(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Resolve an input path to an existing regular file.
///
/// Canonicalization resolves ".." and symlinks before anything is read.
fn validate_file_path(path: &Path) -> Result<PathBuf, RecError> {
    let canonical = path.canonicalize().map_err(|e| {
        RecError::Storage(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(RecError::Storage(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Resolve an output path whose parent directory exists.
fn validate_output_path(path: &Path) -> Result<PathBuf, RecError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        RecError::Storage(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(RecError::Storage(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| RecError::Storage("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

// =============================================================================
// LEDGER LIFECYCLE
// =============================================================================

/// Open the ledger described by `config` (`initLedger`).
pub fn load_ledger(config: &AppConfig) -> Result<Ledger, RecError> {
    let store = match config.storage.backend {
        BackendKind::Redb => StorageBackend::redb(&config.storage.path)?,
        BackendKind::Memory => StorageBackend::default(),
    };
    Ledger::open(store, config.ledger)
}

/// Initialize a new ledger.
pub fn cmd_init(config: &AppConfig, force: bool) -> Result<Value, RecError> {
    let path = &config.storage.path;
    if config.storage.backend == BackendKind::Redb && path.exists() {
        if !force {
            return Err(RecError::AlreadyExists(format!(
                "database {} already exists, use --force to overwrite",
                path.display()
            )));
        }
        std::fs::remove_file(path)
            .map_err(|e| RecError::Storage(format!("Remove {}: {}", path.display(), e)))?;
        tracing::warn!(path = %path.display(), "removed existing database");
    }

    let ledger = load_ledger(config)?;
    Ok(json!({
        "database": path.to_string_lossy(),
        "backend": config.storage.backend.to_string(),
        "next_transaction": SequenceAllocator::peek(ledger.store())?,
    }))
}

/// Summarize the ledger.
pub fn cmd_status(config: &AppConfig) -> Result<Value, RecError> {
    let ledger = load_ledger(config)?;
    let store = ledger.store();

    let count = |kind: RecordKind| -> Result<usize, RecError> {
        let (start, end) = keys::kind_range(kind);
        Ok(store.scan_range(&start, &end)?.count())
    };

    Ok(json!({
        "database": config.storage.path.to_string_lossy(),
        "backend": config.storage.backend.to_string(),
        "persistent": ledger.is_persistent(),
        "certificate_keys": count(RecordKind::Certificate)?,
        "transaction_keys": count(RecordKind::Transaction)?,
        "next_transaction": SequenceAllocator::peek(store)?,
        "policy": ledger.config(),
    }))
}

// =============================================================================
// CERTIFICATE COMMANDS
// =============================================================================

/// Register a certificate.
pub fn cmd_register(config: &AppConfig, request: &CertificateRequest) -> Result<Value, RecError> {
    let mut ledger = load_ledger(config)?;
    let certificate = ledger.register_certificate(request)?;
    formats::record_value(&certificate.into())
}

/// Run a read-only query and convert the result.
pub fn cmd_query(config: &AppConfig, query: &QueryType) -> Result<Value, RecError> {
    let ledger = load_ledger(config)?;
    let output = ledger.query(query)?;
    formats::to_value(&output)
}

/// `certificates [--supplier]`.
pub fn certificates_query(supplier: Option<String>) -> QueryType {
    match supplier {
        Some(s) => QueryType::certificates_by_supplier(s),
        None => QueryType::Certificates(CertificateFilter::All),
    }
}

// =============================================================================
// TRANSACTION COMMANDS
// =============================================================================

/// List part of a certificate for sale.
pub fn cmd_sell(config: &AppConfig, request: &SaleRequest) -> Result<Value, RecError> {
    let mut ledger = load_ledger(config)?;
    let transaction = ledger.create_transaction(request)?;
    formats::record_value(&transaction.into())
}

/// Execute a listed transaction.
pub fn cmd_buy(config: &AppConfig, id: &str, buyer: &str) -> Result<Value, RecError> {
    let mut ledger = load_ledger(config)?;
    let transaction = ledger.execute_transaction(id, buyer)?;
    formats::record_value(&transaction.into())
}

/// Confirm a transaction.
pub fn cmd_approve(config: &AppConfig, id: &str) -> Result<Value, RecError> {
    let mut ledger = load_ledger(config)?;
    let transaction = ledger.approve_transaction(id)?;
    formats::record_value(&transaction.into())
}

/// Which transactions `transactions` lists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum TransactionView {
    #[default]
    All,
    Unexecuted,
    Executed,
}

/// `transactions [--filter] [--supplier] [--buyer]`.
///
/// A party filter takes precedence over the execution view.
pub fn transactions_query(
    view: TransactionView,
    supplier: Option<String>,
    buyer: Option<String>,
) -> QueryType {
    let filter = match (supplier, buyer, view) {
        (Some(s), _, _) => TransactionFilter::BySupplier(s),
        (None, Some(b), _) => TransactionFilter::ByBuyer(b),
        (None, None, TransactionView::All) => TransactionFilter::All,
        (None, None, TransactionView::Unexecuted) => TransactionFilter::Unexecuted,
        (None, None, TransactionView::Executed) => TransactionFilter::Executed,
    };
    QueryType::Transactions(filter)
}

// =============================================================================
// SNAPSHOT COMMANDS
// =============================================================================

/// Export the ledger snapshot to `output`.
pub fn cmd_export(config: &AppConfig, output: &Path) -> Result<Value, RecError> {
    let validated_output = validate_output_path(output)?;
    let ledger = load_ledger(config)?;

    let data = ledger.export_snapshot()?;
    std::fs::write(&validated_output, &data)
        .map_err(|e| RecError::Storage(format!("Write file: {}", e)))?;

    tracing::info!(bytes = data.len(), output = %validated_output.display(), "exported snapshot");
    Ok(json!({
        "output": validated_output.to_string_lossy(),
        "bytes": data.len(),
        "checksum": format!("{:016x}", ledger.checksum()?),
    }))
}

/// Import a snapshot from `input` into a ledger without records.
pub fn cmd_import(config: &AppConfig, input: &Path) -> Result<Value, RecError> {
    let validated_path = validate_file_path(input)?;
    validate_file_size(&validated_path, MAX_IMPORT_FILE_SIZE)?;

    let data = std::fs::read(&validated_path)
        .map_err(|e| RecError::Storage(format!("Read file: {}", e)))?;

    let mut ledger = load_ledger(config)?;
    let imported = ledger.import_snapshot(&data)?;
    Ok(json!({
        "imported": imported,
        "checksum": format!("{:016x}", ledger.checksum()?),
    }))
}

/// State checksum and BLAKE3 digest.
pub fn cmd_hash(config: &AppConfig) -> Result<Value, RecError> {
    let ledger = load_ledger(config)?;
    Ok(json!({
        "checksum": format!("{:016x}", ledger.checksum()?),
        "blake3": ledger.crypto_hash()?,
    }))
}
