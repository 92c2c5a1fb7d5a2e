//! # JSON Query Output
//!
//! Query results leave the core as JSON:
//! - record lists: `[{ "<Kind>": <record> }, ...]`, kind label mirroring
//!   the queried record type
//! - aggregates: `{ "sum": <integer> }`
//! - single records: the record object itself
//! - namespace dump: `[{ "Key": <key>, "Record": <value> }, ...]`

use crate::query::QueryOutput;
use crate::record::Record;
use crate::types::{RecError, RecordKind};
use serde::Serialize;
use serde_json::{Map, Value, json};

/// Wrap each item as `{ "<Kind>": item }`.
pub fn wrap_records<T: Serialize>(kind: RecordKind, items: &[T]) -> Result<Value, RecError> {
    items
        .iter()
        .map(|item| {
            let inner =
                serde_json::to_value(item).map_err(|e| RecError::Serialization(e.to_string()))?;
            let mut wrapper = Map::new();
            wrapper.insert(kind.label().to_string(), inner);
            Ok(Value::Object(wrapper))
        })
        .collect::<Result<Vec<_>, RecError>>()
        .map(Value::Array)
}

/// `{ "sum": total }`.
#[must_use]
pub fn sum_value(total: u64) -> Value {
    json!({ "sum": total })
}

/// A single record as stored, without the `docType` tag.
pub fn record_value(record: &Record) -> Result<Value, RecError> {
    let value = match record {
        Record::Certificate(c) => serde_json::to_value(c),
        Record::Transaction(t) => serde_json::to_value(t),
    };
    value.map_err(|e| RecError::Serialization(e.to_string()))
}

/// Convert a query result to its JSON value.
pub fn to_value(output: &QueryOutput) -> Result<Value, RecError> {
    match output {
        QueryOutput::Single(record) => record_value(record),
        QueryOutput::Certificates(items) => wrap_records(RecordKind::Certificate, items),
        QueryOutput::Transactions(items) => wrap_records(RecordKind::Transaction, items),
        QueryOutput::Sum(total) => Ok(sum_value(*total)),
        QueryOutput::Records(items) => {
            serde_json::to_value(items).map_err(|e| RecError::Serialization(e.to_string()))
        }
    }
}

/// Render a query result as a compact JSON string.
pub fn render(output: &QueryOutput) -> Result<String, RecError> {
    let value = to_value(output)?;
    serde_json::to_string(&value).map_err(|e| RecError::Serialization(e.to_string()))
}
