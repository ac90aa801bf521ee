//! Main decoder API
//!
//! This module provides the primary interface for the decoder library.
//! A `Decoder` holds only configuration; each call to `parse` or
//! `stream_file` is an independent session with its own format registry, so
//! one decoder can be shared across threads decoding different files.

use crate::config::DecoderConfig;
use crate::scanner::StreamScanner;
use crate::store::{LogStore, MessageStore};
use crate::types::{DecoderError, Result};
use std::path::Path;

/// The main decoder struct - entry point for all decoding operations
#[derive(Debug, Clone, Default)]
pub struct Decoder {
    config: DecoderConfig,
}

impl Decoder {
    /// Create a decoder with the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a decoder with a custom configuration
    pub fn with_config(config: DecoderConfig) -> Self {
        Self { config }
    }

    /// The configuration used for every decode
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Decode a log file into a LogStore
    ///
    /// Fails only if the file cannot be read (or the decode is cancelled);
    /// malformed content yields a partial result instead.
    ///
    /// # Example
    /// ```no_run
    /// use dataflash_decoder::Decoder;
    /// use std::path::Path;
    ///
    /// let log = Decoder::new().parse(Path::new("00000042.BIN")).unwrap();
    /// for record in log.messages_by_type("ATT") {
    ///     println!("{}", record);
    /// }
    /// ```
    pub fn parse(&self, path: &Path) -> Result<LogStore> {
        let bytes = read_log(path)?;
        let mut scanner = self.stream_bytes(&bytes);
        let messages: MessageStore = scanner.by_ref().collect();

        if scanner.was_cancelled() {
            return Err(DecoderError::Cancelled);
        }

        let (formats, diagnostics) = scanner.into_parts();
        let store = LogStore::new(messages, formats, diagnostics);
        let stats = store.stats();
        log::info!(
            "Decoded {:?}: {} records, {} types, {} formats",
            path,
            stats.num_records,
            stats.num_types,
            stats.num_formats
        );
        Ok(store)
    }

    /// Decode an in-memory buffer into a LogStore
    ///
    /// A cancelled decode returns whatever was decoded before the flag was seen.
    pub fn parse_bytes(&self, bytes: &[u8]) -> LogStore {
        let mut scanner = self.stream_bytes(bytes);
        let messages: MessageStore = scanner.by_ref().collect();
        let (formats, diagnostics) = scanner.into_parts();
        LogStore::new(messages, formats, diagnostics)
    }

    /// Read a log file and return a lazy iterator over its records
    ///
    /// # Example
    /// ```no_run
    /// use dataflash_decoder::Decoder;
    /// use std::path::Path;
    ///
    /// let records = Decoder::new().stream_file(Path::new("00000042.BIN")).unwrap();
    /// let gps_fixes = records.filter(|r| r.type_name == "GPS").count();
    /// println!("{} GPS records", gps_fixes);
    /// ```
    pub fn stream_file(&self, path: &Path) -> Result<StreamScanner<Vec<u8>>> {
        let bytes = read_log(path)?;
        Ok(StreamScanner::new(bytes, self.config.clone()))
    }

    /// Lazy iterator over the records of an in-memory buffer
    pub fn stream_bytes<'a>(&self, bytes: &'a [u8]) -> StreamScanner<&'a [u8]> {
        StreamScanner::new(bytes, self.config.clone())
    }
}

/// Read a whole log file into memory
fn read_log(path: &Path) -> Result<Vec<u8>> {
    log::info!("Reading log file: {:?}", path);

    if !path.exists() {
        return Err(DecoderError::FileNotFound(path.to_path_buf()));
    }

    let bytes = std::fs::read(path).map_err(|source| DecoderError::ReadFailed {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!("Read {} bytes from {:?}", bytes.len(), path);
    Ok(bytes)
}
