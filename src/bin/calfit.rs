use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kpix_calib::config::AnalysisConfig;
use kpix_calib::document;
use kpix_calib::error::log_document_error;
use kpix_calib::fit::{CurveFitter, LeastSquaresFitter};
use kpix_calib::run::{CalibrationRun, RunSettings};
use kpix_calib::sample::RawSample;
use kpix_calib::store::CalibrationStore;
use serde::Deserialize;

#[derive(Parser, Debug)]
#[command(
    name = "calfit",
    about = "Offline calibration fitter for detector sample dumps"
)]
struct Cli {
    /// Analysis configuration file (defaults to built-in values)
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fit a JSON-lines sample dump into a calibration XML file
    Fit {
        /// Sample dump, one {"settings":..,"sample":..} object per line
        #[arg(long)]
        input: PathBuf,
        /// Calibration XML output path
        #[arg(long)]
        output: PathBuf,
    },
    /// Print per-device record counts for an existing calibration file
    Summary {
        #[arg(long)]
        input: PathBuf,
    },
}

/// One line of the sample dump
#[derive(Debug, Deserialize)]
struct DumpRecord {
    settings: RunSettings,
    sample: RawSample,
}

fn main() -> ExitCode {
    env_logger::init();
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = cli
        .config
        .map(AnalysisConfig::load_from_file)
        .unwrap_or_default();

    match cli.command {
        Commands::Fit { input, output } => run_fit(&config, &input, &output),
        Commands::Summary { input } => run_summary(&input),
    }
}

fn run_fit(config: &AnalysisConfig, input: &PathBuf, output: &PathBuf) -> Result<ExitCode> {
    let file = File::open(input).with_context(|| format!("opening sample dump {:?}", input))?;
    let mut run = CalibrationRun::new(config.fitting.inject_windows);

    for (lineno, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("reading {:?} line {}", input, lineno + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        let record: DumpRecord = serde_json::from_str(&line)
            .with_context(|| format!("parsing {:?} line {}", input, lineno + 1))?;
        run.process_sample(&record.sample, &record.settings);
    }

    log::info!(
        "[calfit] Accepted {} samples over {} keys",
        run.consumed(),
        run.key_count()
    );

    let fitter = CurveFitter::new(LeastSquaresFitter::new());
    let store = run.finish(
        &fitter,
        config.device.positive_polarity,
        config.device.b0_calib_high,
    );

    if let Err(err) = document::write_file(output, &store) {
        log_document_error(&err, "calfit fit");
        return Err(err).with_context(|| format!("writing calibration file {:?}", output));
    }
    println!("Wrote {} records to {}", store.len(), output.display());
    Ok(ExitCode::from(0))
}

fn run_summary(input: &PathBuf) -> Result<ExitCode> {
    let mut store = CalibrationStore::new();
    if let Err(err) = document::parse_file(input, &mut store) {
        log_document_error(&err, "calfit summary");
        return Err(err).with_context(|| format!("parsing calibration file {:?}", input));
    }

    let mut per_device: BTreeMap<String, usize> = BTreeMap::new();
    for (key, _) in store.iter() {
        *per_device.entry(key.device_id.clone()).or_default() += 1;
    }

    println!("{}: {} records", input.display(), store.len());
    for (device, count) in &per_device {
        println!("  device {}: {} records", device, count);
    }
    Ok(ExitCode::from(0))
}
