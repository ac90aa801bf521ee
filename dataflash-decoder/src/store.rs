//! Decoded message storage
//!
//! `MessageStore` keeps every decoded record in arrival order, with an index
//! per record type name. `LogStore` is what a finished decode hands back: the
//! messages, the formats that described them, and any collected diagnostics.

use crate::diagnostics::Diagnostic;
use crate::format::FormatRegistry;
use crate::types::{trim_padding, LogRecord};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Append-only store of decoded records
#[derive(Debug, Clone, Default)]
pub struct MessageStore {
    /// All records in arrival order
    records: Vec<LogRecord>,

    /// Type name lookup
    /// Key: type name, Value: indices into `records`
    by_type: HashMap<String, Vec<usize>>,
}

impl MessageStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record to the master list and its type bucket
    pub fn append(&mut self, record: LogRecord) {
        let idx = self.records.len();
        self.by_type
            .entry(record.type_name.clone())
            .or_default()
            .push(idx);
        self.records.push(record);
    }

    /// All records in arrival order
    pub fn all(&self) -> &[LogRecord] {
        &self.records
    }

    /// Records of one type in arrival order (empty if the type was never seen)
    pub fn by_type(&self, name: &str) -> Vec<&LogRecord> {
        self.by_type
            .get(trim_padding(name))
            .map(|indices| indices.iter().map(|&i| &self.records[i]).collect())
            .unwrap_or_default()
    }

    /// First record of a type
    pub fn first_of_type(&self, name: &str) -> Option<&LogRecord> {
        self.by_type
            .get(trim_padding(name))
            .and_then(|indices| indices.first())
            .map(|&i| &self.records[i])
    }

    /// Number of records of a type
    pub fn count_of_type(&self, name: &str) -> usize {
        self.by_type.get(trim_padding(name)).map_or(0, Vec::len)
    }

    /// All distinct type names, sorted
    pub fn type_names(&self) -> BTreeSet<String> {
        self.by_type.keys().cloned().collect()
    }

    /// Record count per type name, sorted by name
    pub fn type_counts(&self) -> BTreeMap<String, usize> {
        self.by_type
            .iter()
            .map(|(name, indices)| (name.clone(), indices.len()))
            .collect()
    }

    /// Total number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if nothing was decoded
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Extend<LogRecord> for MessageStore {
    fn extend<T: IntoIterator<Item = LogRecord>>(&mut self, iter: T) {
        for record in iter {
            self.append(record);
        }
    }
}

impl FromIterator<LogRecord> for MessageStore {
    fn from_iter<T: IntoIterator<Item = LogRecord>>(iter: T) -> Self {
        let mut store = MessageStore::new();
        store.extend(iter);
        store
    }
}

/// One numeric sample of a field
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesPoint {
    /// Record timestamp (TimeUS), if present
    pub timestamp: Option<i64>,
    /// Field value converted to f64
    pub value: f64,
}

/// Summary counts for a decoded log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogStats {
    /// Decoded records across all types
    pub num_records: usize,
    /// Distinct record type names
    pub num_types: usize,
    /// Registered formats
    pub num_formats: usize,
    /// Stored diagnostics (zero unless collection is enabled)
    pub num_diagnostics: usize,
}

/// Result of decoding one log
#[derive(Debug, Clone, Default)]
pub struct LogStore {
    messages: MessageStore,
    formats: FormatRegistry,
    diagnostics: Vec<Diagnostic>,
}

impl LogStore {
    /// Assemble a store from the parts of a finished decode
    pub fn new(messages: MessageStore, formats: FormatRegistry, diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            messages,
            formats,
            diagnostics,
        }
    }

    /// All decoded records in arrival order
    pub fn all_messages(&self) -> &[LogRecord] {
        self.messages.all()
    }

    /// Records of one type in arrival order
    pub fn messages_by_type(&self, name: &str) -> Vec<&LogRecord> {
        self.messages.by_type(name)
    }

    /// Sorted set of record type names that have at least one record
    pub fn message_types(&self) -> BTreeSet<String> {
        self.messages.type_names()
    }

    /// First record of a type
    pub fn first_of_type(&self, name: &str) -> Option<&LogRecord> {
        self.messages.first_of_type(name)
    }

    /// Record count per type name
    pub fn type_counts(&self) -> BTreeMap<String, usize> {
        self.messages.type_counts()
    }

    /// Numeric values of one field across all records of a type
    ///
    /// Records where the field is missing or not numeric are skipped.
    pub fn numeric_series(&self, type_name: &str, field: &str) -> Vec<SeriesPoint> {
        self.messages
            .by_type(type_name)
            .into_iter()
            .filter_map(|record| {
                let value = record.get(field)?.as_f64()?;
                Some(SeriesPoint {
                    timestamp: record.timestamp,
                    value,
                })
            })
            .collect()
    }

    /// The underlying message store
    pub fn messages(&self) -> &MessageStore {
        &self.messages
    }

    /// Formats registered while decoding
    pub fn formats(&self) -> &FormatRegistry {
        &self.formats
    }

    /// Diagnostics collected while decoding (empty unless enabled)
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Summary counts
    pub fn stats(&self) -> LogStats {
        LogStats {
            num_records: self.messages.len(),
            num_types: self.messages.by_type.len(),
            num_formats: self.formats.len(),
            num_diagnostics: self.diagnostics.len(),
        }
    }
}
