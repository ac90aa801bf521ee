//! Structural anomalies found while scanning a log
//!
//! None of these stop decoding. They are always logged; they are kept only
//! when the caller asks for them via `DecoderConfig::collect_diagnostics`.

use serde::Serialize;
use std::fmt;

/// A non-fatal anomaly in the log byte stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Diagnostic {
    /// Sentinel followed by a type id with no FORMAT definition
    UnknownRecordType { offset: usize, type_id: u8 },
    /// FORMAT record cut off by the end of the buffer
    TruncatedFormat { offset: usize },
    /// Data record cut off by the end of the buffer
    TruncatedRecord {
        offset: usize,
        type_name: String,
        expected: usize,
        available: usize,
    },
    /// A second FORMAT record for an already registered type id
    FormatRedefined { type_id: u8, name: String },
    /// Format string and label list have different lengths
    FieldCountMismatch {
        type_name: String,
        field_types: usize,
        field_names: usize,
    },
    /// Declared record length disagrees with the sum of field widths
    LengthMismatch {
        type_name: String,
        declared: usize,
        computed: usize,
    },
    /// Field type code the decoder does not know
    UnknownFieldType {
        type_name: String,
        field: String,
        code: char,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UnknownRecordType { offset, type_id } => {
                write!(f, "unknown record type {} at offset {}", type_id, offset)
            }
            Diagnostic::TruncatedFormat { offset } => {
                write!(f, "truncated FORMAT record at offset {}", offset)
            }
            Diagnostic::TruncatedRecord {
                offset,
                type_name,
                expected,
                available,
            } => write!(
                f,
                "truncated {} record at offset {}: {} of {} body bytes",
                type_name, offset, available, expected
            ),
            Diagnostic::FormatRedefined { type_id, name } => {
                write!(f, "FORMAT for type {} redefined as {}", type_id, name)
            }
            Diagnostic::FieldCountMismatch {
                type_name,
                field_types,
                field_names,
            } => write!(
                f,
                "{}: {} field types but {} field names",
                type_name, field_types, field_names
            ),
            Diagnostic::LengthMismatch {
                type_name,
                declared,
                computed,
            } => write!(
                f,
                "{}: declared length {} but fields need {}",
                type_name, declared, computed
            ),
            Diagnostic::UnknownFieldType {
                type_name,
                field,
                code,
            } => write!(f, "{}.{}: unknown field type '{}'", type_name, field, code),
        }
    }
}

/// Collector handed through a decode session
#[derive(Debug, Default)]
pub(crate) struct Diagnostics {
    enabled: bool,
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub(crate) fn new(enabled: bool) -> Self {
        Self {
            enabled,
            entries: Vec::new(),
        }
    }

    /// Log a diagnostic and keep it if collection is enabled
    pub(crate) fn push(&mut self, diagnostic: Diagnostic) {
        match &diagnostic {
            // Garbage between records produces a lot of these
            Diagnostic::UnknownRecordType { .. } => log::trace!("{}", diagnostic),
            Diagnostic::FormatRedefined { .. } => log::debug!("{}", diagnostic),
            _ => log::warn!("{}", diagnostic),
        }

        if self.enabled {
            self.entries.push(diagnostic);
        }
    }

    pub(crate) fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub(crate) fn into_entries(self) -> Vec<Diagnostic> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_collector_drops_entries() {
        let mut diagnostics = Diagnostics::new(false);
        diagnostics.push(Diagnostic::TruncatedFormat { offset: 3 });
        assert!(diagnostics.entries().is_empty());
    }

    #[test]
    fn test_enabled_collector_keeps_order() {
        let mut diagnostics = Diagnostics::new(true);
        diagnostics.push(Diagnostic::TruncatedFormat { offset: 3 });
        diagnostics.push(Diagnostic::UnknownRecordType {
            offset: 10,
            type_id: 7,
        });

        let entries = diagnostics.into_entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], Diagnostic::TruncatedFormat { offset: 3 });
    }

    #[test]
    fn test_display() {
        let d = Diagnostic::UnknownFieldType {
            type_name: "ATT".into(),
            field: "Roll".into(),
            code: 'x',
        };
        assert_eq!(d.to_string(), "ATT.Roll: unknown field type 'x'");
    }
}
