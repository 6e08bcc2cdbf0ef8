//! Forensic Triage CLI Module
//!
//! Command-line front end: analyze a CSV log file, run the local-dataset
//! preset, inspect a file, or start the HTTP upload server.

use clap::{Parser, Subcommand};
use colored::*;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::{ContaminationRate, FeatureMode, TriageConfig};
use crate::dataset::load_csv;
use crate::pipeline::{TriageOutcome, TriagePipeline};
use crate::preprocessing::{select_features, ColumnType};
use crate::report::SeverityDistribution;

/// Dataset analyzed by `triage local` when no path is given
pub const LOCAL_DATA_PATH: &str = "dataset/cybersecurity_threat_detection_logs.csv";

/// Rows of the input shown before analysis
const DATASET_PREVIEW_ROWS: usize = 50;

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 58; // box inner width

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }
fn alert(s: &str) -> ColoredString  { s.truecolor(240, 110, 100) }

fn line_box_top()    { println!("  {}", dim("┌─────────────────────────────────────────────────────────┐")); }
fn line_box_bottom() { println!("  {}", dim("└─────────────────────────────────────────────────────────┘")); }
fn line_box_sep()    { println!("  {}", dim("├─────────────────────────────────────────────────────────┤")); }

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let pad = W.saturating_sub(visible_len);
    println!("  {}  {}{} {}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn line_box_center(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let total_pad = W.saturating_sub(visible_len);
    let left = total_pad / 2;
    let right = total_pad - left;
    println!("  {}  {}{}{} {}", dim("│"), " ".repeat(left), content, " ".repeat(right), dim("│"));
}

fn line_box_empty() { line_box(""); }

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' { in_escape = true; continue; }
        if in_escape { if c == 'm' { in_escape = false; } continue; }
        out.push(c);
    }
    out
}

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(key), val.white())
}

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "triage")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Forensic log triage: flag anomalous rows in CSV security logs")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze a CSV log file
    Analyze {
        /// Input CSV file (header row required)
        #[arg(short, long)]
        data: PathBuf,

        /// Contamination rate in percent (1-40)
        #[arg(short, long, default_value_t = ContaminationRate::INTERACTIVE_DEFAULT_PERCENT)]
        contamination: u8,

        /// Score only this column instead of every numeric column
        #[arg(short, long)]
        feature: Option<String>,

        /// Column that must be present (repeatable)
        #[arg(short, long)]
        require: Vec<String>,

        /// Report output path (default: <stem>_report.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Rows shown in the result previews
        #[arg(long, default_value = "100")]
        preview: usize,

        /// Cap on suspicious rows printed (default: all)
        #[arg(long)]
        suspicious_limit: Option<usize>,
    },

    /// Analyze the local dataset (bytes_transferred, 2%, 50 000-row sample)
    Local {
        /// Input CSV file
        #[arg(short, long, default_value = LOCAL_DATA_PATH)]
        data: PathBuf,

        /// Report output path (default: local_report.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show columns and the features that would be scored
    Info {
        /// Input CSV file
        #[arg(short, long)]
        data: PathBuf,
    },

    /// Start the HTTP upload server
    Serve {
        /// Server port
        #[arg(short, long, default_value = "8080")]
        port: u16,

        /// Server host
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
    },
}

/// Build the configuration behind `triage analyze`
pub fn analyze_config(
    contamination: u8,
    feature: Option<&str>,
    require: &[String],
) -> anyhow::Result<TriageConfig> {
    let mut config = TriageConfig::interactive()
        .with_env_overrides()
        .with_contamination(ContaminationRate::from_percent(contamination)?);

    if let Some(column) = feature {
        config = config
            .with_feature_mode(FeatureMode::Fixed(column.to_string()))
            .with_required_column(column)
            .with_report_stem("upload");
    }
    for column in require {
        config = config.with_required_column(column.as_str());
    }
    Ok(config)
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_analyze(
    data_path: &Path,
    contamination: u8,
    feature: Option<&str>,
    require: &[String],
    output: Option<&Path>,
    preview: usize,
    suspicious_limit: Option<usize>,
) -> anyhow::Result<()> {
    section("Analyze");

    let config = analyze_config(contamination, feature, require)?;
    let view = OutputView {
        dataset_preview: Some(DATASET_PREVIEW_ROWS),
        preview,
        suspicious_limit,
    };
    run_and_report(data_path, config, output, &view)
}

pub fn cmd_local(data_path: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    section("Local Dataset Mode");

    let config = TriageConfig::local().with_env_overrides();
    let view = OutputView {
        dataset_preview: None,
        preview: 100,
        suspicious_limit: None,
    };
    run_and_report(data_path, config, output, &view)
}

/// How much of each table the terminal report prints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputView {
    /// Input rows shown before analysis, if any
    pub dataset_preview: Option<usize>,
    /// Rows of the augmented dataset shown
    pub preview: usize,
    /// Cap on suspicious rows shown, `None` for all of them
    pub suspicious_limit: Option<usize>,
}

impl OutputView {
    /// Number of suspicious rows printed out of `available`
    pub fn suspicious_rows(&self, available: usize) -> usize {
        self.suspicious_limit.map_or(available, |limit| limit.min(available))
    }
}

/// Print the first `rows` rows without polars' default row elision
fn print_frame(df: &DataFrame, rows: usize) {
    let shown = df.head(Some(rows));
    std::env::set_var("POLARS_FMT_MAX_ROWS", shown.height().max(1).to_string());
    println!("{}", shown);
}

fn run_and_report(
    data_path: &Path,
    config: TriageConfig,
    output: Option<&Path>,
    view: &OutputView,
) -> anyhow::Result<()> {
    step_run("Loading data");
    let start = Instant::now();
    let df = load_csv(data_path)?;
    step_done(&format!("{} rows × {} cols in {:?}", df.height(), df.width(), start.elapsed()));

    if let Some(rows) = view.dataset_preview {
        section("Dataset Preview");
        print_frame(&df, rows);
    }

    let pipeline = TriagePipeline::new(config)?;
    println!(
        "  {} {}",
        muted("contamination"),
        format!("{:.0}%", pipeline.config().contamination.percent()).white()
    );

    step_run("Running anomaly detection");
    let outcome = pipeline.run_sampled(&df)?;
    step_done(&format!("{:.3}s", outcome.elapsed_secs));

    print_outcome(&outcome, view)?;

    let report_path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&outcome.report_name));
    step_run(&format!("Saving → {}", report_path.display()));
    let bytes = outcome.export()?;
    std::fs::write(&report_path, &bytes)?;
    step_done(&format!("{} bytes", bytes.len()));

    println!();
    Ok(())
}

fn print_outcome(outcome: &TriageOutcome, view: &OutputView) -> anyhow::Result<()> {
    section("Detected Numeric Features");
    for name in outcome.features.iter() {
        step_ok(name);
    }

    section("Detection Results");
    print_frame(outcome.augmented.frame(), view.preview);

    section("Suspicious Records");
    let suspicious = outcome.augmented.suspicious()?;
    if suspicious.height() == 0 {
        println!("  {}", ok("No suspicious activity detected."));
    } else {
        let shown = view.suspicious_rows(suspicious.height());
        if shown < suspicious.height() {
            println!("  {}", dim(&format!("showing {} of {} suspicious rows", shown, suspicious.height())));
        }
        print_frame(&suspicious, shown);
    }

    section("Forensic Summary");
    let summary = &outcome.summary;
    println!("  {:<28} {}", muted("Total Rows Analyzed"), summary.total_rows.to_string().white().bold());
    println!("  {:<28} {}", muted("Suspicious Rows Detected"), summary.suspicious_rows.to_string().white().bold());
    println!();
    if summary.has_anomalies() {
        println!("  {}", alert(summary.verdict()));
    } else {
        println!("  {}", ok(summary.verdict()));
    }

    section("Anomaly Distribution");
    print_distribution(&outcome.distribution, summary.total_rows);
    Ok(())
}

fn print_distribution(dist: &SeverityDistribution, total: usize) {
    const BAR: usize = 40;
    for (severity, count) in dist.ranked() {
        let width = if total == 0 { 0 } else { (count * BAR).div_ceil(total) };
        println!(
            "  {:<12} {} {}",
            severity.as_str(),
            accent(&"█".repeat(width)),
            dim(&count.to_string())
        );
    }
}

pub fn cmd_info(data_path: &Path) -> anyhow::Result<()> {
    section("Data Info");

    let df = load_csv(data_path)?;

    println!("  {:<12} {}", muted("File"), data_path.display());
    println!("  {:<12} {}", muted("Rows"), df.height());
    println!("  {:<12} {}", muted("Columns"), df.width());
    println!();

    println!("  {:<24} {:<12} {:>6}", muted("Column"), muted("Type"), muted("Nulls"));
    println!("  {}", dim(&"─".repeat(44)));

    for col in df.get_columns() {
        let kind = ColumnType::of(col.dtype());
        let name = col.name().to_string();
        let name = if kind.is_numeric() { name.white() } else { muted(&name) };
        println!(
            "  {:<24} {:<12} {:>6}",
            name,
            format!("{:?}", col.dtype()).truecolor(140, 140, 140),
            col.null_count()
        );
    }

    section("Scored Features");
    match select_features(&df, &FeatureMode::AutoNumeric) {
        Ok(features) => {
            for name in features.iter() {
                step_ok(name);
            }
        }
        Err(e) => println!("  {}", alert(&e.to_string())),
    }

    println!();
    Ok(())
}

// ─── Serve ─────────────────────────────────────────────────────────────────────

pub async fn cmd_serve(host: &str, port: u16) -> anyhow::Result<()> {
    use crate::server::{run_server, ServerConfig};

    println!();
    line_box_top();
    line_box_empty();
    line_box_center(&format!("{}", "Forensic Triage".white().bold()));
    line_box_center(&format!("{}", dim(&format!("v{}", env!("CARGO_PKG_VERSION")))));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box(&kv("Analyze", &format!("http://{}:{}/api/analyze", host, port)));
    line_box(&kv("Report ", &format!("http://{}:{}/api/report", host, port)));
    line_box(&kv("Health ", &format!("http://{}:{}/api/health", host, port)));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box_center(&format!("{}", dim("ctrl+c to stop")));
    line_box_empty();
    line_box_bottom();
    println!();

    let config = ServerConfig {
        host: host.to_string(),
        port,
        ..Default::default()
    };

    run_server(config).await
}
