//! Report generation
//!
//! Renders a decoded log as a TXT summary or a JSON document.

use crate::config::OutputConfig;
use anyhow::Result;
use dataflash_decoder::{LogRecord, LogStore};
use serde_json::{json, Map, Value};
use std::io::Write;
use std::path::Path;

/// Heading used for a message section
fn section_title(type_name: &str) -> String {
    match type_name {
        "ERR" => "ERRORS".to_string(),
        "MODE" => "MODE CHANGES".to_string(),
        "EV" => "EVENTS".to_string(),
        other => other.to_string(),
    }
}

/// Format a TimeUS value as H:MM:SS.mmm since boot
fn format_time(record: &LogRecord) -> String {
    match record.time_since_boot() {
        Some(t) => format!(
            "{}:{:02}:{:02}.{:03}",
            t.num_hours(),
            t.num_minutes() % 60,
            t.num_seconds() % 60,
            t.num_milliseconds() % 1000
        ),
        None => "-".to_string(),
    }
}

/// Write a TXT report for one log
pub fn write_txt<W: Write>(out: &mut W, path: &Path, log: &LogStore, options: &OutputConfig) -> Result<()> {
    let stats = log.stats();

    writeln!(out, "═══════════════════════════════════════════════")?;
    writeln!(out, "  DataFlash Log: {}", path.display())?;
    writeln!(out, "═══════════════════════════════════════════════")?;
    writeln!(out, "  Records:     {}", stats.num_records)?;
    writeln!(out, "  Types:       {}", stats.num_types)?;
    writeln!(out, "  Formats:     {}", stats.num_formats)?;
    writeln!(out, "  Diagnostics: {}", stats.num_diagnostics)?;

    writeln!(out, "\nMessage Types:")?;
    writeln!(out, "─────────────────────────")?;
    for (name, count) in log.type_counts() {
        writeln!(out, "  {:<6} {:>8}", name, count)?;
    }

    writeln!(out, "\nFormats:")?;
    writeln!(out, "─────────────────────────")?;
    for format in log.formats().iter() {
        writeln!(
            out,
            "  [{:3}] {:<4} len {:3}  {:<16} {}",
            format.type_id,
            format.name,
            format.record_length,
            format.format_string(),
            format.field_names.join(",")
        )?;
    }

    if !log.diagnostics().is_empty() {
        writeln!(out, "\nDiagnostics:")?;
        writeln!(out, "─────────────────────────")?;
        for diagnostic in log.diagnostics() {
            writeln!(out, "  {}", diagnostic)?;
        }
    }

    for name in &options.sections {
        let records = log.messages_by_type(name);
        if records.is_empty() {
            continue;
        }
        writeln!(out, "\n=== {} ===", section_title(name))?;
        for record in records {
            writeln!(out, "  [{}] {}", format_time(record), record)?;
        }
    }

    for name in &options.dump_types {
        let records = log.messages_by_type(name);
        writeln!(out, "\n=== {} ({} records) ===", name, records.len())?;
        for record in records {
            writeln!(out, "  [{}] {}", format_time(record), record)?;
        }
    }

    Ok(())
}

fn record_to_json(record: &LogRecord) -> Result<Value> {
    let mut fields = Map::new();
    for field in &record.fields {
        fields.insert(field.name.clone(), serde_json::to_value(&field.value)?);
    }
    Ok(json!({
        "timestamp": record.timestamp,
        "fields": fields,
    }))
}

/// Build a JSON report for one log
pub fn to_json(path: &Path, log: &LogStore, options: &OutputConfig) -> Result<Value> {
    let stats = log.stats();

    let formats: Vec<Value> = log
        .formats()
        .iter()
        .map(|f| {
            json!({
                "type_id": f.type_id,
                "name": f.name,
                "length": f.record_length,
                "format": f.format_string(),
                "labels": f.field_names,
            })
        })
        .collect();

    let mut records = Map::new();
    for name in options.sections.iter().chain(&options.dump_types) {
        let key = name.trim().to_string();
        if records.contains_key(&key) {
            continue;
        }
        let values = log
            .messages_by_type(name)
            .into_iter()
            .map(record_to_json)
            .collect::<Result<Vec<_>>>()?;
        if !values.is_empty() {
            records.insert(key, Value::Array(values));
        }
    }

    Ok(json!({
        "file": path.display().to_string(),
        "stats": {
            "records": stats.num_records,
            "types": stats.num_types,
            "formats": stats.num_formats,
            "diagnostics": stats.num_diagnostics,
        },
        "types": log.type_counts(),
        "formats": formats,
        "diagnostics": serde_json::to_value(log.diagnostics())?,
        "records": records,
    }))
}
