//! Log Viewer - Entry Point

use clap::{Parser, ValueEnum};
use logview::config::{
    apply_cli_overrides, apply_env_overrides, load_config_with_precedence, merge_config,
    CliOverrides, ResolvedConfig,
};
use logview::filter::FilterState;
use logview::model::AppError;
use logview::store::{export, ExportFormat, LogStore};
use logview::view::{ColorConfig, TuiOptions};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::info;

/// Log Viewer - interactive viewer for append-only log streams
#[derive(Parser, Debug)]
#[command(name = "logview")]
#[command(version)]
#[command(about = "Interactive, highlighted, filterable viewer for log streams")]
pub struct Args {
    /// Log file to view (reads from stdin if not provided)
    pub file: Option<PathBuf>,

    /// Start with this filter query (`@@tag="[INFO]" timeout`)
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Strip ANSI styling instead of rendering it
    #[arg(long)]
    pub strip_styling: bool,

    /// Disable colors
    #[arg(long)]
    pub no_color: bool,

    /// Show arrival timestamps in a gutter
    #[arg(short, long)]
    pub timestamps: bool,

    /// Tokenizer worker threads (0 tokenizes inline)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Path to configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Write the (filtered) entries to this file and exit without a TUI
    #[arg(long, value_name = "PATH")]
    pub export: Option<PathBuf>,

    /// Format used by --export
    #[arg(long, value_enum, default_value_t = ExportFormatArg::Text)]
    pub export_format: ExportFormatArg,
}

/// `--export-format` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormatArg {
    /// Raw text, one entry per line
    Text,
    /// One JSON object per line
    Jsonl,
}

impl From<ExportFormatArg> for ExportFormat {
    fn from(arg: ExportFormatArg) -> Self {
        match arg {
            ExportFormatArg::Text => ExportFormat::Text,
            ExportFormatArg::Jsonl => ExportFormat::JsonLines,
        }
    }
}

impl Args {
    fn cli_overrides(&self) -> CliOverrides {
        CliOverrides {
            strip_styling: self.strip_styling.then_some(true),
            worker_threads: self.workers,
            log_file_path: None,
        }
    }
}

/// Defaults → Config File → Env Vars → CLI Args
fn resolve_config(args: &Args) -> Result<ResolvedConfig, logview::config::ConfigError> {
    let config_file = load_config_with_precedence(args.config.clone())?;
    let merged = merge_config(config_file);
    let with_env = apply_env_overrides(merged);
    Ok(apply_cli_overrides(with_env, args.cli_overrides()))
}

fn run_export(
    args: &Args,
    config: &ResolvedConfig,
    path: &Path,
) -> Result<usize, AppError> {
    let timestamp = chrono::Utc::now().timestamp_millis();
    let entries = logview::source::read_all_from(args.file.clone(), timestamp)?;

    let mut store =
        LogStore::new(config.cache_capacity).with_strip_styling(config.strip_styling);
    store.append(entries)?;
    if let Some(query) = args.filter.as_deref() {
        store.set_filter(Some(FilterState::parse(query)))?;
    }

    let mut writer = BufWriter::new(File::create(path)?);
    let written = export(
        store.visible_entries(),
        &mut writer,
        args.export_format.into(),
    )?;
    info!(written, path = %path.display(), "export finished");
    Ok(written)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = resolve_config(&args)?;

    logview::logging::init(&config.log_file_path)?;
    info!(config = ?config, "Configuration loaded and resolved");

    if let Some(path) = args.export.as_ref() {
        run_export(&args, &config, path)?;
        return Ok(());
    }

    let feed = logview::source::detect_input(args.file.clone())?;
    let options = TuiOptions {
        viewport: config.viewport_options(),
        cache_capacity: config.cache_capacity,
        strip_styling: config.strip_styling,
        worker_threads: config.worker_threads,
        initial_filter: args.filter.clone(),
        colors: ColorConfig::from_env_and_args(args.no_color),
        show_timestamps: args.timestamps,
    };
    logview::view::run_with_source(feed, options)?;

    Ok(())
}
