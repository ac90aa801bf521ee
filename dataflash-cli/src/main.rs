//! DataFlash Log Reader CLI Application
//!
//! Command-line front end for the dataflash-decoder library. It decodes one
//! or more logs and prints:
//! - Per-type record counts and the registered formats
//! - Message sections (errors, mode changes, events)
//! - Full dumps of selected record types
//! - Optional diagnostics about corrupt or truncated data

use anyhow::{bail, Context, Result};
use clap::Parser;
use dataflash_decoder::{Decoder, LogStore};
use rayon::prelude::*;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

mod config;
mod report;

use config::{AppConfig, OutputFormat};

/// DataFlash Log Reader - Decode and summarise ArduPilot binary logs
#[derive(Parser, Debug)]
#[command(name = "dataflash-cli")]
#[command(about = "Decode and summarise DataFlash (.BIN) logs", long_about = None)]
#[command(version)]
struct Args {
    /// Path to DataFlash log file(s) (can be repeated)
    #[arg(short, long, value_name = "FILE")]
    log: Vec<PathBuf>,

    /// Record type to dump in full (can be repeated)
    #[arg(short = 't', long = "type", value_name = "NAME")]
    types: Vec<String>,

    /// Only decode these record types (can be repeated)
    #[arg(long, value_name = "NAME")]
    only: Vec<String>,

    /// Report format
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Output file for the report (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Path to configuration file (config.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Maximum number of records to decode per log
    #[arg(long, value_name = "COUNT")]
    max_records: Option<usize>,

    /// Report corrupt, truncated and unknown records
    #[arg(short, long)]
    diagnostics: bool,

    /// Verbosity level (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("DataFlash Log Reader CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using decoder library v{}", dataflash_decoder::VERSION);

    let app = build_config(&args)?;

    if app.input.files.is_empty() {
        // No input - show help
        println!("DataFlash Log Reader - No input specified");
        println!("\nQuick Start:");
        println!("  dataflash-cli --log 00000042.BIN");
        println!("  dataflash-cli --log 00000042.BIN --type GPS --type ATT");
        println!("  dataflash-cli --log 00000042.BIN --format json -o report.json");
        println!("\nFor advanced features:");
        println!("  dataflash-cli --config config.toml");
        println!("\nUse --help for more options");
        return Ok(());
    }

    decode_all(&app, args.output.as_deref())
}

/// Merge the config file (if any) with command line overrides
fn build_config(args: &Args) -> Result<AppConfig> {
    let mut app = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            config::load_config(path)?
        }
        None => AppConfig::default(),
    };

    app.input.files.extend(args.log.iter().cloned());
    app.output.dump_types.extend(args.types.iter().cloned());

    if !args.only.is_empty() {
        app.decoder.type_filter = Some(args.only.clone());
    }
    if let Some(max) = args.max_records {
        app.decoder.max_records = Some(max);
    }
    if args.diagnostics {
        app.decoder.collect_diagnostics = true;
    }
    if let Some(format) = args.format {
        app.output.format = format;
    }

    log::debug!("Effective configuration: {:?}", app);
    Ok(app)
}

/// Decode every input log in parallel and write the reports
fn decode_all(app: &AppConfig, output: Option<&Path>) -> Result<()> {
    let decoder = Decoder::with_config(app.decoder.clone());

    // Each parse is its own session with its own format registry
    let results: Vec<(&PathBuf, dataflash_decoder::Result<LogStore>)> = app
        .input
        .files
        .par_iter()
        .map(|path| (path, decoder.parse(path)))
        .collect();

    let mut writer: Box<dyn Write> = match output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create output file: {:?}", path))?,
        )),
        None => Box::new(BufWriter::new(io::stdout())),
    };

    let mut failures = 0;
    for (path, result) in &results {
        match result {
            Ok(log) => {
                if let (Some(dir), None) = (&app.output.output_dir, output) {
                    write_report_file(dir, path, log, app)?;
                } else {
                    write_report(&mut writer, path, log, app)?;
                }
            }
            Err(e) => {
                log::error!("Failed to decode {:?}: {}", path, e);
                failures += 1;
            }
        }
    }
    writer.flush()?;

    if failures > 0 {
        bail!("{} of {} logs could not be decoded", failures, results.len());
    }
    Ok(())
}

fn write_report<W: Write>(out: &mut W, path: &Path, log: &LogStore, app: &AppConfig) -> Result<()> {
    match app.output.format {
        OutputFormat::Txt => {
            report::write_txt(out, path, log, &app.output)?;
            writeln!(out)?;
        }
        OutputFormat::Json => {
            let value = report::to_json(path, log, &app.output)?;
            serde_json::to_writer_pretty(&mut *out, &value)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

/// Write one report per log into the output directory
fn write_report_file(dir: &Path, path: &Path, log: &LogStore, app: &AppConfig) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {:?}", dir))?;

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "log".to_string());
    let report_path = dir.join(format!("{}.{}", stem, app.output.format.extension()));

    let file = File::create(&report_path)
        .with_context(|| format!("Failed to create report file: {:?}", report_path))?;
    let mut out = BufWriter::new(file);
    write_report(&mut out, path, log, app)?;
    out.flush()?;

    log::info!("Wrote report: {:?}", report_path);
    Ok(())
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_config() {
        let args = Args::parse_from([
            "dataflash-cli",
            "--log",
            "a.BIN",
            "--type",
            "GPS",
            "--only",
            "GPS",
            "--format",
            "json",
            "--diagnostics",
            "--max-records",
            "10",
        ]);
        let app = build_config(&args).unwrap();

        assert_eq!(app.input.files, vec![PathBuf::from("a.BIN")]);
        assert_eq!(app.output.dump_types, vec!["GPS"]);
        assert_eq!(app.output.format, OutputFormat::Json);
        assert!(app.decoder.collect_diagnostics);
        assert_eq!(app.decoder.max_records, Some(10));
        assert!(!app.decoder.should_decode_type("ATT"));
    }

    #[test]
    fn test_report_file_per_log() {
        let dir = tempfile::tempdir().unwrap();
        let log = Decoder::new().parse_bytes(&[]);
        let app = AppConfig::default();

        write_report_file(dir.path(), Path::new("flights/00000007.BIN"), &log, &app).unwrap();
        let text = std::fs::read_to_string(dir.path().join("00000007.txt")).unwrap();
        assert!(text.contains("Records:     0"));
    }
}
