//! Core types for the DataFlash log decoder library
//!
//! This module defines the values the decoder emits when processing a log:
//! typed field values, decoded records, and the error type. Decoded records
//! own all of their data; nothing here borrows from the input buffer.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Result type for decoder operations
pub type Result<T> = std::result::Result<T, DecoderError>;

/// Field name whose integer value becomes the record timestamp
pub const TIME_FIELD: &str = "TimeUS";

/// Errors that can occur during decoding
///
/// Malformed log content is never an error. Only failing to get at the bytes
/// (or the caller cancelling) ends a decode early.
#[derive(Debug, thiserror::Error)]
pub enum DecoderError {
    #[error("Log file not found: {0:?}")]
    FileNotFound(PathBuf),

    #[error("Failed to read log file {path:?}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Decoding cancelled")]
    Cancelled,
}

/// A single decoded field value
///
/// One variant per field type code. `Null` is produced for codes the decoder
/// does not recognise.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int8(i8),
    UInt8(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Text(String),
    Null,
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Int8(v) => write!(f, "{}", v),
            FieldValue::UInt8(v) => write!(f, "{}", v),
            FieldValue::Int16(v) => write!(f, "{}", v),
            FieldValue::UInt16(v) => write!(f, "{}", v),
            FieldValue::Int32(v) => write!(f, "{}", v),
            FieldValue::UInt32(v) => write!(f, "{}", v),
            FieldValue::Int64(v) => write!(f, "{}", v),
            FieldValue::Float32(v) => write!(f, "{}", v),
            FieldValue::Float64(v) => write!(f, "{}", v),
            FieldValue::Text(v) => write!(f, "{}", v),
            FieldValue::Null => write!(f, "null"),
        }
    }
}

impl FieldValue {
    /// Integer value widened to i64, `None` for floats, text and null
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Int8(v) => Some(i64::from(*v)),
            FieldValue::UInt8(v) => Some(i64::from(*v)),
            FieldValue::Int16(v) => Some(i64::from(*v)),
            FieldValue::UInt16(v) => Some(i64::from(*v)),
            FieldValue::Int32(v) => Some(i64::from(*v)),
            FieldValue::UInt32(v) => Some(i64::from(*v)),
            FieldValue::Int64(v) => Some(*v),
            FieldValue::Float32(_)
            | FieldValue::Float64(_)
            | FieldValue::Text(_)
            | FieldValue::Null => None,
        }
    }

    /// Any numeric value as f64, `None` for text and null
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Float32(v) => Some(f64::from(*v)),
            FieldValue::Float64(v) => Some(*v),
            other => other.as_i64().map(|v| v as f64),
        }
    }

    /// Borrow the string of a text field
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// True for integer and floating-point values
    pub fn is_numeric(&self) -> bool {
        self.as_f64().is_some()
    }
}

/// One named field of a decoded record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedField {
    /// Field name from the FORMAT label string
    pub name: String,
    /// Decoded value
    pub value: FieldValue,
}

/// A decoded data record
///
/// Fields keep the order of the FORMAT declaration. A label that appears
/// twice keeps its first position and the last decoded value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRecord {
    /// Record type name copied from its FORMAT definition
    pub type_name: String,
    /// Value of the `TimeUS` field, when the record has an integer one
    pub timestamp: Option<i64>,
    /// Decoded fields, possibly fewer than declared if the record was cut short
    pub fields: Vec<DecodedField>,
}

impl LogRecord {
    /// Create an empty record of the given type
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            timestamp: None,
            fields: Vec::new(),
        }
    }

    /// Look up a field value by name
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.value)
    }

    /// Insert a field, replacing the value of an existing field with the same name
    pub fn insert_field(&mut self, name: &str, value: FieldValue) {
        if name == TIME_FIELD {
            if let Some(t) = value.as_i64() {
                self.timestamp = Some(t);
            }
        }

        match self.fields.iter_mut().find(|f| f.name == name) {
            Some(existing) => existing.value = value,
            None => self.fields.push(DecodedField {
                name: name.to_string(),
                value,
            }),
        }
    }

    /// Number of decoded fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True if no field was decoded
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Timestamp interpreted as microseconds since boot
    pub fn time_since_boot(&self) -> Option<chrono::Duration> {
        self.timestamp.map(chrono::Duration::microseconds)
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", field.name, field.value)?;
        }
        Ok(())
    }
}

/// Trim a fixed-width ASCII field the way the log writer pads it
///
/// Strips NUL padding, spaces and any other control characters from both ends.
pub(crate) fn trim_padding(s: &str) -> &str {
    s.trim_matches(|c: char| c <= ' ')
}

/// Decode a fixed-width byte field into an owned, trimmed string
pub(crate) fn padded_text(bytes: &[u8]) -> String {
    trim_padding(&String::from_utf8_lossy(bytes)).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_value_conversions() {
        let int_val = FieldValue::UInt32(4_000_000_000);
        assert_eq!(int_val.as_i64(), Some(4_000_000_000));
        assert_eq!(int_val.as_f64(), Some(4_000_000_000.0));
        assert!(int_val.is_numeric());

        let float_val = FieldValue::Float32(-2.5);
        assert_eq!(float_val.as_f64(), Some(-2.5));
        assert_eq!(float_val.as_i64(), None);

        let text_val = FieldValue::Text("GPS".to_string());
        assert_eq!(text_val.as_str(), Some("GPS"));
        assert!(!text_val.is_numeric());

        assert_eq!(FieldValue::Null.as_f64(), None);
    }

    #[test]
    fn test_field_value_display() {
        assert_eq!(format!("{}", FieldValue::Int16(-42)), "-42");
        assert_eq!(format!("{}", FieldValue::Float64(1.5)), "1.5");
        assert_eq!(format!("{}", FieldValue::Text("Armed".into())), "Armed");
        assert_eq!(format!("{}", FieldValue::Null), "null");
    }

    #[test]
    fn test_insert_field_sets_timestamp() {
        let mut record = LogRecord::new("ATT");
        record.insert_field("TimeUS", FieldValue::Int64(1_500_000));
        record.insert_field("Roll", FieldValue::Float32(1.0));

        assert_eq!(record.timestamp, Some(1_500_000));
        assert_eq!(record.time_since_boot(), Some(chrono::Duration::milliseconds(1500)));
        assert_eq!(record.len(), 2);
    }

    #[test]
    fn test_non_integer_time_field_is_ignored() {
        let mut record = LogRecord::new("ATT");
        record.insert_field("TimeUS", FieldValue::Float32(3.0));
        assert_eq!(record.timestamp, None);
        assert!(record.get("TimeUS").is_some());
    }

    #[test]
    fn test_duplicate_field_keeps_position() {
        let mut record = LogRecord::new("X");
        record.insert_field("A", FieldValue::UInt8(1));
        record.insert_field("B", FieldValue::UInt8(2));
        record.insert_field("A", FieldValue::UInt8(3));

        assert_eq!(record.len(), 2);
        assert_eq!(record.fields[0].name, "A");
        assert_eq!(record.get("A"), Some(&FieldValue::UInt8(3)));
    }

    #[test]
    fn test_record_display() {
        let mut record = LogRecord::new("MODE");
        record.insert_field("Mode", FieldValue::UInt8(5));
        record.insert_field("Name", FieldValue::Text("LOITER".into()));
        assert_eq!(record.to_string(), "Mode=5, Name=LOITER");
    }

    #[test]
    fn test_padded_text() {
        assert_eq!(padded_text(b"ATT\0"), "ATT");
        assert_eq!(padded_text(b" GPS \0\0\0"), "GPS");
        assert_eq!(padded_text(b"\0\0\0\0"), "");
        assert_eq!(trim_padding("ATT "), "ATT");
    }
}
