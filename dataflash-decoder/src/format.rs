//! FORMAT records and the per-session format registry
//!
//! Every DataFlash log carries its own schema: before a record type can be
//! decoded, a FORMAT record must have declared its length, name, field type
//! codes and field labels. The registry collects those declarations keyed by
//! type id.

use crate::types::padded_text;
use std::collections::BTreeMap;
use std::fmt;

/// Reserved type id of FORMAT records
pub const FORMAT_TYPE_ID: u8 = 0x80;

/// Body length of a FORMAT record (after the 3-byte header)
pub const FORMAT_BODY_LEN: usize = 86;

const NAME_RANGE: std::ops::Range<usize> = 2..6;
const FORMAT_RANGE: std::ops::Range<usize> = 6..22;
const LABELS_RANGE: std::ops::Range<usize> = 22..86;

/// Field type, one per format string character
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// `b`
    Int8,
    /// `B`
    UInt8,
    /// `h`
    Int16,
    /// `H`
    UInt16,
    /// `i`
    Int32,
    /// `I`
    UInt32,
    /// `f`
    Float32,
    /// `d`
    Float64,
    /// `n`: 4-byte string
    Char4,
    /// `N`: 16-byte string
    Char16,
    /// `Z`: 64-byte string
    Char64,
    /// `q` and `Q`, both read as signed
    Int64(char),
    /// Anything else. Decodes to a null value and consumes no bytes.
    Unknown(char),
}

impl FieldType {
    /// Map a format string character to its field type
    pub fn from_code(code: char) -> Self {
        match code {
            'b' => FieldType::Int8,
            'B' => FieldType::UInt8,
            'h' => FieldType::Int16,
            'H' => FieldType::UInt16,
            'i' => FieldType::Int32,
            'I' => FieldType::UInt32,
            'f' => FieldType::Float32,
            'd' => FieldType::Float64,
            'n' => FieldType::Char4,
            'N' => FieldType::Char16,
            'Z' => FieldType::Char64,
            'q' | 'Q' => FieldType::Int64(code),
            other => FieldType::Unknown(other),
        }
    }

    /// The format string character for this type
    pub fn code(&self) -> char {
        match self {
            FieldType::Int8 => 'b',
            FieldType::UInt8 => 'B',
            FieldType::Int16 => 'h',
            FieldType::UInt16 => 'H',
            FieldType::Int32 => 'i',
            FieldType::UInt32 => 'I',
            FieldType::Float32 => 'f',
            FieldType::Float64 => 'd',
            FieldType::Char4 => 'n',
            FieldType::Char16 => 'N',
            FieldType::Char64 => 'Z',
            FieldType::Int64(c) | FieldType::Unknown(c) => *c,
        }
    }

    /// Encoded width in bytes, `None` for unknown codes
    pub fn width(&self) -> Option<usize> {
        match self {
            FieldType::Int8 | FieldType::UInt8 => Some(1),
            FieldType::Int16 | FieldType::UInt16 => Some(2),
            FieldType::Int32 | FieldType::UInt32 | FieldType::Float32 | FieldType::Char4 => Some(4),
            FieldType::Float64 | FieldType::Int64(_) => Some(8),
            FieldType::Char16 => Some(16),
            FieldType::Char64 => Some(64),
            FieldType::Unknown(_) => None,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Layout of one record type, as declared by a FORMAT record
#[derive(Debug, Clone, PartialEq)]
pub struct LogFormat {
    /// Record type id
    pub type_id: u8,
    /// Total record length including the 3-byte header
    pub record_length: u8,
    /// Record type name (trimmed)
    pub name: String,
    /// Field types in declaration order
    pub field_types: Vec<FieldType>,
    /// Field names in declaration order
    pub field_names: Vec<String>,
}

impl LogFormat {
    /// Build a format from its parts
    pub fn new(
        type_id: u8,
        record_length: u8,
        name: &str,
        format: &str,
        labels: &str,
    ) -> Self {
        Self {
            type_id,
            record_length,
            name: crate::types::trim_padding(name).to_string(),
            field_types: format.chars().map(FieldType::from_code).collect(),
            field_names: split_labels(labels),
        }
    }

    /// Parse the body of a FORMAT record
    ///
    /// Layout: type id (1), record length (1), name (4), format string (16),
    /// comma-separated labels (64). Text fields are NUL/space padded.
    pub fn from_body(body: &[u8; FORMAT_BODY_LEN]) -> Self {
        let name = padded_text(&body[NAME_RANGE]);
        let format = padded_text(&body[FORMAT_RANGE]);
        let labels = padded_text(&body[LABELS_RANGE]);

        Self::new(body[0], body[1], &name, &format, &labels)
    }

    /// Body length of a data record of this type (record length minus header)
    pub fn body_length(&self) -> usize {
        usize::from(self.record_length).saturating_sub(crate::scanner::HEADER_LEN)
    }

    /// Number of fields actually decoded per record
    pub fn field_count(&self) -> usize {
        self.field_types.len().min(self.field_names.len())
    }

    /// Sum of the widths of the decoded fields, `None` if any code is unknown
    pub fn payload_width(&self) -> Option<usize> {
        self.field_types
            .iter()
            .take(self.field_count())
            .map(FieldType::width)
            .sum()
    }

    /// Reassemble the format string
    pub fn format_string(&self) -> String {
        self.field_types.iter().map(FieldType::code).collect()
    }

    /// Iterate decoded fields as (type, name) pairs
    pub fn fields(&self) -> impl Iterator<Item = (FieldType, &str)> {
        self.field_types
            .iter()
            .copied()
            .zip(self.field_names.iter().map(String::as_str))
    }
}

/// Split a label string on commas, dropping trailing empty labels
///
/// An empty string still yields one empty label, so a single-field format
/// with no labels decodes one field named `""`.
fn split_labels(labels: &str) -> Vec<String> {
    if labels.is_empty() {
        return vec![String::new()];
    }
    let mut names: Vec<String> = labels.split(',').map(str::to_string).collect();
    while names.last().is_some_and(|n| n.is_empty()) {
        names.pop();
    }
    names
}

/// Registry of record layouts for one decode session
///
/// Later definitions for the same type id replace earlier ones.
#[derive(Debug, Clone, Default)]
pub struct FormatRegistry {
    formats: BTreeMap<u8, LogFormat>,
}

impl FormatRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a FORMAT record body and store the resulting layout
    pub fn register_format(&mut self, body: &[u8; FORMAT_BODY_LEN]) -> &LogFormat {
        let format = LogFormat::from_body(body);
        log::debug!(
            "Registered format {} (type {}, length {}, fields \"{}\")",
            format.name,
            format.type_id,
            format.record_length,
            format.format_string()
        );
        self.insert(format)
    }

    /// Store a layout, replacing any previous one with the same type id
    pub fn insert(&mut self, format: LogFormat) -> &LogFormat {
        use std::collections::btree_map::Entry;

        match self.formats.entry(format.type_id) {
            Entry::Occupied(mut entry) => {
                entry.insert(format);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(format),
        }
    }

    /// Get the layout for a type id
    pub fn lookup(&self, type_id: u8) -> Option<&LogFormat> {
        self.formats.get(&type_id)
    }

    /// Get a layout by record type name
    pub fn lookup_by_name(&self, name: &str) -> Option<&LogFormat> {
        let name = crate::types::trim_padding(name);
        self.formats.values().find(|f| f.name == name)
    }

    /// Iterate layouts in type id order
    pub fn iter(&self) -> impl Iterator<Item = &LogFormat> {
        self.formats.values()
    }

    /// Number of registered layouts
    pub fn len(&self) -> usize {
        self.formats.len()
    }

    /// True if no FORMAT record has been seen
    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format_body(type_id: u8, length: u8, name: &str, format: &str, labels: &str) -> [u8; FORMAT_BODY_LEN] {
        let mut body = [0u8; FORMAT_BODY_LEN];
        body[0] = type_id;
        body[1] = length;
        body[NAME_RANGE.start..NAME_RANGE.start + name.len()].copy_from_slice(name.as_bytes());
        body[FORMAT_RANGE.start..FORMAT_RANGE.start + format.len()].copy_from_slice(format.as_bytes());
        body[LABELS_RANGE.start..LABELS_RANGE.start + labels.len()].copy_from_slice(labels.as_bytes());
        body
    }

    #[test]
    fn test_parse_format_body() {
        let body = format_body(1, 15, "ATT ", "fff", "Roll,Pitch,Yaw");
        let format = LogFormat::from_body(&body);

        assert_eq!(format.type_id, 1);
        assert_eq!(format.record_length, 15);
        assert_eq!(format.name, "ATT");
        assert_eq!(format.field_types, vec![FieldType::Float32; 3]);
        assert_eq!(format.field_names, vec!["Roll", "Pitch", "Yaw"]);
        assert_eq!(format.body_length(), 12);
        assert_eq!(format.payload_width(), Some(12));
    }

    #[test]
    fn test_field_type_codes() {
        for code in "bBhHiIfdnNZqQ".chars() {
            let field_type = FieldType::from_code(code);
            assert_eq!(field_type.code(), code);
            assert!(field_type.width().is_some());
        }
        assert_eq!(FieldType::from_code('Q'), FieldType::Int64('Q'));
        assert_eq!(FieldType::from_code('M'), FieldType::Unknown('M'));
        assert_eq!(FieldType::Unknown('M').width(), None);
    }

    #[test]
    fn test_field_count_is_shorter_of_types_and_names() {
        let format = LogFormat::new(2, 11, "GPS", "IHBB", "TimeMS,Week");
        assert_eq!(format.field_count(), 2);
        assert_eq!(format.payload_width(), Some(6));
        assert_eq!(format.fields().count(), 2);
    }

    #[test]
    fn test_unknown_code_has_no_payload_width() {
        let format = LogFormat::new(3, 10, "X", "fMf", "A,B,C");
        assert_eq!(format.payload_width(), None);
    }

    #[test]
    fn test_split_labels() {
        assert_eq!(split_labels("A,B,"), vec!["A", "B"]);
        assert_eq!(split_labels("A,,B"), vec!["A", "", "B"]);
        assert_eq!(split_labels("A, B"), vec!["A", " B"]);
        assert_eq!(split_labels(""), vec![""]);
        assert!(split_labels(",,").is_empty());
    }

    #[test]
    fn test_empty_labels_name_one_field() {
        let format = LogFormat::new(4, 7, "NOL", "f", "");
        assert_eq!(format.field_count(), 1);
        assert_eq!(format.fields().collect::<Vec<_>>(), vec![(FieldType::Float32, "")]);
    }

    #[test]
    fn test_registry_last_write_wins() {
        let mut registry = FormatRegistry::new();
        registry.register_format(&format_body(5, 7, "OLD", "f", "A"));
        registry.register_format(&format_body(5, 11, "NEW", "d", "B"));

        assert_eq!(registry.len(), 1);
        let format = registry.lookup(5).unwrap();
        assert_eq!(format.name, "NEW");
        assert_eq!(format.format_string(), "d");
    }

    #[test]
    fn test_registry_lookup() {
        let mut registry = FormatRegistry::new();
        assert!(registry.is_empty());
        registry.insert(LogFormat::new(9, 7, "BARO", "f", "Alt"));

        assert!(registry.lookup(9).is_some());
        assert!(registry.lookup(10).is_none());
        assert_eq!(registry.lookup_by_name("BARO ").map(|f| f.type_id), Some(9));
    }
}
