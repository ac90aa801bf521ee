//! Decoder configuration types
//!
//! This module defines the small set of knobs the decoder library accepts.
//! None of them change how an individual record is decoded; they only select
//! which records are decoded and how much bookkeeping is kept.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Configuration for the decoder library
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Keep a list of structural anomalies seen while scanning
    #[serde(default)]
    pub collect_diagnostics: bool,

    /// Optional: only decode data records with these type names
    #[serde(default)]
    pub type_filter: Option<Vec<String>>,

    /// Optional: stop after this many decoded records
    #[serde(default)]
    pub max_records: Option<usize>,

    /// Cooperative cancellation, checked once per record boundary
    #[serde(skip)]
    pub cancel: Option<CancelFlag>,
}

/// Shared flag a caller can raise to stop a decode running on another thread
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Create a new, lowered flag
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Check whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

impl DecoderConfig {
    /// Create a new decoder configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: keep diagnostics
    pub fn with_diagnostics(mut self, enabled: bool) -> Self {
        self.collect_diagnostics = enabled;
        self
    }

    /// Builder method: set type name filter
    pub fn with_type_filter(mut self, names: Vec<String>) -> Self {
        self.type_filter = Some(names);
        self
    }

    /// Builder method: limit the number of decoded records
    pub fn with_max_records(mut self, max: usize) -> Self {
        self.max_records = Some(max);
        self
    }

    /// Builder method: attach a cancellation flag
    pub fn with_cancel_flag(mut self, flag: CancelFlag) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Check if records of a type should be decoded
    pub fn should_decode_type(&self, type_name: &str) -> bool {
        match &self.type_filter {
            Some(names) => names
                .iter()
                .any(|n| crate::types::trim_padding(n) == type_name),
            None => true,
        }
    }

    /// Check if the record limit has been reached
    pub fn limit_reached(&self, decoded: usize) -> bool {
        self.max_records.is_some_and(|max| decoded >= max)
    }

    /// Check if the attached cancellation flag has been raised
    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelFlag::is_cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoder_config_builder() {
        let config = DecoderConfig::new()
            .with_diagnostics(true)
            .with_type_filter(vec!["ATT".to_string(), "GPS".to_string()])
            .with_max_records(10);

        assert!(config.collect_diagnostics);
        assert_eq!(config.max_records, Some(10));
        assert!(config.should_decode_type("ATT"));
        assert!(!config.should_decode_type("BARO"));
    }

    #[test]
    fn test_no_filters() {
        let config = DecoderConfig::new();

        assert!(config.should_decode_type("ATT"));
        assert!(config.should_decode_type("ANYTHING"));
        assert!(!config.limit_reached(usize::MAX));
        assert!(!config.is_cancelled());
    }

    #[test]
    fn test_filter_names_are_trimmed() {
        let config = DecoderConfig::new().with_type_filter(vec!["ATT ".to_string()]);
        assert!(config.should_decode_type("ATT"));
    }

    #[test]
    fn test_limit_reached() {
        let config = DecoderConfig::new().with_max_records(2);
        assert!(!config.limit_reached(1));
        assert!(config.limit_reached(2));
    }

    #[test]
    fn test_cancel_flag_is_shared() {
        let flag = CancelFlag::new();
        let config = DecoderConfig::new().with_cancel_flag(flag.clone());

        assert!(!config.is_cancelled());
        flag.cancel();
        assert!(config.is_cancelled());
    }
}
