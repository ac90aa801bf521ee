//! DataFlash Log Decoder Library
//!
//! Decodes ArduPilot-style binary DataFlash logs: a byte stream of records,
//! each prefixed by the `A3 95` sentinel and a type id, whose layouts are
//! declared inside the same stream by FORMAT records.
//!
//! # Architecture
//!
//! - `StreamScanner` finds record boundaries and dispatches each record
//! - `FormatRegistry` stores layouts declared by FORMAT records
//! - `RecordDecoder` turns a record body into typed fields
//! - `MessageStore` keeps decoded records in order and by type name
//!
//! The library does NOT:
//! - Write logs
//! - Validate checksums
//! - Interpret values (units, scaling, charting)
//!
//! Malformed content is never an error: corrupt bytes and unknown record
//! types are skipped, truncated records are decoded as far as possible.
//!
//! # Example Usage
//!
//! ```no_run
//! use dataflash_decoder::{Decoder, DecoderConfig};
//! use std::path::Path;
//!
//! let decoder = Decoder::with_config(DecoderConfig::new().with_diagnostics(true));
//! let log = decoder.parse(Path::new("00000042.BIN")).unwrap();
//!
//! for name in log.message_types() {
//!     println!("{}: {} records", name, log.messages_by_type(&name).len());
//! }
//!
//! for record in log.messages_by_type("ATT") {
//!     println!("{:?} {}", record.timestamp, record);
//! }
//! ```

// Public modules
pub mod config;
pub mod decoder;
pub mod diagnostics;
pub mod format;
pub mod record_decoder;
pub mod scanner;
pub mod store;
pub mod types;

// Re-export main types for convenience
pub use config::{CancelFlag, DecoderConfig};
pub use decoder::Decoder;
pub use diagnostics::Diagnostic;
pub use format::{FieldType, FormatRegistry, LogFormat, FORMAT_TYPE_ID};
pub use record_decoder::RecordDecoder;
pub use scanner::{StreamScanner, HEAD_BYTE1, HEAD_BYTE2};
pub use store::{LogStats, LogStore, MessageStore, SeriesPoint};
pub use types::{DecodedField, DecoderError, FieldValue, LogRecord, Result, TIME_FIELD};

use std::path::Path;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Decode a log file with the default configuration
pub fn parse(path: &Path) -> Result<LogStore> {
    Decoder::new().parse(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_basics() {
        // Smoke test: an empty buffer decodes to an empty store
        let log = Decoder::new().parse_bytes(&[]);
        assert_eq!(log.stats().num_records, 0);
        assert!(!VERSION.is_empty());
    }
}
