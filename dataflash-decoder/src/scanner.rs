//! Stream scanner for DataFlash byte streams
//!
//! Walks a byte buffer looking for the `A3 95` sentinel that precedes every
//! record, reads the type id that follows, and either registers a FORMAT
//! record or decodes a data record of a known type.
//!
//! ## Recovery
//! - Bytes that are not part of a sentinel are skipped one at a time.
//! - A sentinel followed by an unregistered type id is skipped by its 3-byte
//!   header only, since its length is unknown. Scanning resumes right after
//!   the header and can lock onto a sentinel-looking byte pair inside the
//!   unknown record's body.
//! - Running out of bytes mid-record ends the scan. The partially decoded
//!   record is kept if at least one field was decoded.

use crate::config::DecoderConfig;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::format::{FormatRegistry, FORMAT_BODY_LEN, FORMAT_TYPE_ID};
use crate::record_decoder::RecordDecoder;
use crate::types::LogRecord;

/// First sentinel byte
pub const HEAD_BYTE1: u8 = 0xA3;
/// Second sentinel byte
pub const HEAD_BYTE2: u8 = 0x95;
/// Sentinel plus type id
pub const HEADER_LEN: usize = 3;

/// Iterator over the data records of a DataFlash buffer
///
/// Owns its format registry, so independent scanners never share schema
/// state. The buffer can be owned (`Vec<u8>`) or borrowed (`&[u8]`).
/// Finite and not restartable.
pub struct StreamScanner<B> {
    buf: B,
    pos: usize,
    registry: FormatRegistry,
    diagnostics: Diagnostics,
    config: DecoderConfig,
    decoded: usize,
    finished: bool,
    cancelled: bool,
}

impl<B: AsRef<[u8]>> StreamScanner<B> {
    /// Create a scanner positioned at the start of the buffer
    pub fn new(buf: B, config: DecoderConfig) -> Self {
        Self {
            buf,
            pos: 0,
            registry: FormatRegistry::new(),
            diagnostics: Diagnostics::new(config.collect_diagnostics),
            config,
            decoded: 0,
            finished: false,
            cancelled: false,
        }
    }

    /// Formats registered so far
    pub fn registry(&self) -> &FormatRegistry {
        &self.registry
    }

    /// Diagnostics collected so far (empty unless enabled in the config)
    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.diagnostics.entries()
    }

    /// Current byte offset into the buffer
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Number of records yielded so far
    pub fn decoded(&self) -> usize {
        self.decoded
    }

    /// True if the scan stopped because the cancellation flag was raised
    pub fn was_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Give up the scanner, keeping the registry and diagnostics
    pub fn into_parts(self) -> (FormatRegistry, Vec<Diagnostic>) {
        (self.registry, self.diagnostics.into_entries())
    }

    /// Advance to the next sentinel and return the offset of its header
    fn find_sentinel(buf: &[u8], from: usize) -> Option<usize> {
        buf.get(from..)?
            .windows(2)
            .position(|w| w[0] == HEAD_BYTE1 && w[1] == HEAD_BYTE2)
            .map(|i| from + i)
    }

    /// Scan forward until one data record has been decoded or the buffer ends
    fn next_record(&mut self) -> Option<LogRecord> {
        let buf = self.buf.as_ref();

        loop {
            if self.config.is_cancelled() {
                log::info!("Scan cancelled at offset {}", self.pos);
                self.cancelled = true;
                return None;
            }
            if self.config.limit_reached(self.decoded) {
                log::debug!("Record limit reached at offset {}", self.pos);
                return None;
            }

            let start = Self::find_sentinel(buf, self.pos)?;
            let Some(&type_id) = buf.get(start + 2) else {
                // Sentinel is the last thing in the buffer
                self.pos = buf.len();
                return None;
            };
            let body_start = start + HEADER_LEN;
            self.pos = body_start;

            if type_id == FORMAT_TYPE_ID {
                let Some(body) = buf[body_start..].first_chunk::<FORMAT_BODY_LEN>() else {
                    self.diagnostics.push(Diagnostic::TruncatedFormat { offset: start });
                    self.pos = buf.len();
                    return None;
                };

                if let Some(previous) = self.registry.lookup(body[0]) {
                    self.diagnostics.push(Diagnostic::FormatRedefined {
                        type_id: previous.type_id,
                        name: previous.name.clone(),
                    });
                }

                let format = self.registry.register_format(body);
                if format.field_types.len() != format.field_names.len() {
                    self.diagnostics.push(Diagnostic::FieldCountMismatch {
                        type_name: format.name.clone(),
                        field_types: format.field_types.len(),
                        field_names: format.field_names.len(),
                    });
                }
                if let Some(computed) = format.payload_width() {
                    if computed != format.body_length() {
                        self.diagnostics.push(Diagnostic::LengthMismatch {
                            type_name: format.name.clone(),
                            declared: usize::from(format.record_length),
                            computed: computed + HEADER_LEN,
                        });
                    }
                }

                self.pos = body_start + FORMAT_BODY_LEN;
                continue;
            }

            let Some(format) = self.registry.lookup(type_id) else {
                self.diagnostics.push(Diagnostic::UnknownRecordType {
                    offset: start,
                    type_id,
                });
                continue;
            };

            let expected = format.body_length();
            let available = expected.min(buf.len() - body_start);
            let body = &buf[body_start..body_start + available];
            self.pos = body_start + available;

            if !self.config.should_decode_type(&format.name) {
                if available < expected {
                    self.pos = buf.len();
                    return None;
                }
                continue;
            }

            let record = RecordDecoder::decode_with_diagnostics(body, format, &mut self.diagnostics);

            if available < expected {
                self.diagnostics.push(Diagnostic::TruncatedRecord {
                    offset: start,
                    type_name: format.name.clone(),
                    expected,
                    available,
                });
                self.finished = true;
                if record.is_empty() {
                    return None;
                }
            }

            self.decoded += 1;
            return Some(record);
        }
    }
}

impl<B: AsRef<[u8]>> Iterator for StreamScanner<B> {
    type Item = LogRecord;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let record = self.next_record();
        if record.is_none() {
            self.finished = true;
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldValue;

    fn format_record(type_id: u8, length: u8, name: &str, format: &str, labels: &str) -> Vec<u8> {
        let mut out = vec![HEAD_BYTE1, HEAD_BYTE2, FORMAT_TYPE_ID, type_id, length];
        let mut pad = |s: &str, n: usize| {
            let mut field = s.as_bytes().to_vec();
            field.resize(n, 0);
            out.extend_from_slice(&field);
        };
        pad(name, 4);
        pad(format, 16);
        pad(labels, 64);
        out
    }

    fn data_record(type_id: u8, body: &[u8]) -> Vec<u8> {
        let mut out = vec![HEAD_BYTE1, HEAD_BYTE2, type_id];
        out.extend_from_slice(body);
        out
    }

    #[test]
    fn test_find_sentinel() {
        let buf = [0x00, 0xA3, 0xA3, 0x95, 0x01];
        assert_eq!(StreamScanner::<&[u8]>::find_sentinel(&buf, 0), Some(2));
        assert_eq!(StreamScanner::<&[u8]>::find_sentinel(&buf, 3), None);
        assert_eq!(StreamScanner::<&[u8]>::find_sentinel(&buf, 10), None);
    }

    #[test]
    fn test_format_then_data() {
        let mut buf = format_record(1, 4, "ONE", "B", "V");
        buf.extend(data_record(1, &[42]));

        let mut scanner = StreamScanner::new(buf.as_slice(), DecoderConfig::new());
        let record = scanner.next().unwrap();
        assert_eq!(record.get("V"), Some(&FieldValue::UInt8(42)));
        assert!(scanner.next().is_none());
        assert_eq!(scanner.registry().len(), 1);
        assert_eq!(scanner.position(), buf.len());
    }

    #[test]
    fn test_unknown_type_skips_header_only() {
        let mut buf = format_record(1, 4, "ONE", "B", "V");
        // Unknown type 7, whose body happens to contain a full record of type 1
        buf.extend(data_record(7, &data_record(1, &[5])));

        let config = DecoderConfig::new().with_diagnostics(true);
        let mut scanner = StreamScanner::new(buf.as_slice(), config);
        let record = scanner.next().unwrap();
        assert_eq!(record.get("V"), Some(&FieldValue::UInt8(5)));
        assert_eq!(
            scanner.diagnostics()[0],
            Diagnostic::UnknownRecordType {
                offset: 89,
                type_id: 7
            }
        );
    }

    #[test]
    fn test_truncated_format_ends_scan() {
        let mut buf = format_record(1, 4, "ONE", "B", "V");
        buf.truncate(50);

        let config = DecoderConfig::new().with_diagnostics(true);
        let mut scanner = StreamScanner::new(buf.as_slice(), config);
        assert!(scanner.next().is_none());
        assert!(scanner.registry().is_empty());
        assert_eq!(scanner.diagnostics(), &[Diagnostic::TruncatedFormat { offset: 0 }]);
    }

    #[test]
    fn test_header_only_record_is_dropped() {
        let mut buf = format_record(1, 4, "ONE", "B", "V");
        buf.extend_from_slice(&[HEAD_BYTE1, HEAD_BYTE2, 1]);

        let scanner = StreamScanner::new(buf.as_slice(), DecoderConfig::new());
        assert_eq!(scanner.count(), 0);
    }

    #[test]
    fn test_type_filter_skips_by_length() {
        let mut buf = format_record(1, 4, "ONE", "B", "V");
        buf.extend(format_record(2, 5, "TWO", "H", "W"));
        // The filtered record's body looks like a sentinel of type 1
        buf.extend(data_record(2, &[HEAD_BYTE1, HEAD_BYTE2]));
        buf.extend(data_record(1, &[9]));

        let config = DecoderConfig::new().with_type_filter(vec!["ONE".to_string()]);
        let records: Vec<_> = StreamScanner::new(buf.as_slice(), config).collect();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("V"), Some(&FieldValue::UInt8(9)));
    }

    #[test]
    fn test_max_records() {
        let mut buf = format_record(1, 4, "ONE", "B", "V");
        for i in 0..5 {
            buf.extend(data_record(1, &[i]));
        }

        let config = DecoderConfig::new().with_max_records(3);
        assert_eq!(StreamScanner::new(buf, config).count(), 3);
    }

    #[test]
    fn test_cancelled_before_start() {
        let mut buf = format_record(1, 4, "ONE", "B", "V");
        buf.extend(data_record(1, &[1]));

        let flag = crate::config::CancelFlag::new();
        flag.cancel();
        let mut scanner = StreamScanner::new(buf, DecoderConfig::new().with_cancel_flag(flag));
        assert!(scanner.next().is_none());
        assert!(scanner.was_cancelled());
    }

    #[test]
    fn test_mismatch_diagnostics() {
        let mut buf = format_record(1, 20, "BAD", "Bf", "A");
        buf.extend(format_record(1, 4, "BAD", "B", "A"));

        let config = DecoderConfig::new().with_diagnostics(true);
        let mut scanner = StreamScanner::new(buf.as_slice(), config);
        assert!(scanner.next().is_none());

        let diagnostics = scanner.diagnostics();
        assert!(diagnostics.contains(&Diagnostic::FieldCountMismatch {
            type_name: "BAD".into(),
            field_types: 2,
            field_names: 1,
        }));
        assert!(diagnostics.contains(&Diagnostic::LengthMismatch {
            type_name: "BAD".into(),
            declared: 20,
            computed: 4,
        }));
        assert!(diagnostics.contains(&Diagnostic::FormatRedefined {
            type_id: 1,
            name: "BAD".into(),
        }));
    }
}
