//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use patrimonio_core::cache::CachePolicy;
use patrimonio_core::pipeline::{
    IndexSource, ProgressReporter, ScanSummary, VerifyConfig, build_index, search_registry,
    verify_report, write_export, write_strokes,
};
use patrimonio_registry::{CalamineReader, CancelFlag};
use patrimonio_report::DocumentLayout;
use patrimonio_shared::{
    AppConfig, AssetField, MatchMode, ScanConfig, ScannedRecord, SearchOptions, cache_file_path,
    init_config, load_config, load_config_from,
};
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Patrimonio: look up fixed assets and verify inventory reports.
#[derive(Parser)]
#[command(
    name = "patrimonio",
    version,
    about = "Search the fixed-asset registry and check inventory reports against it.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.patrimonio/patrimonio.toml).
    #[arg(long, global = true, env = "PATRIMONIO_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Find registry records whose field matches a value.
    Lookup {
        /// Field to search: tombamento, patrimonio, inventario, specification, item.
        field: AssetField,

        /// Value to look for.
        value: String,

        /// Match mode: exact or partial (defaults to the configured mode).
        #[arg(short, long)]
        mode: Option<MatchMode>,

        /// Compare case-sensitively.
        #[arg(long)]
        case_sensitive: bool,

        /// Compare case-insensitively, overriding the config.
        #[arg(long, conflicts_with = "case_sensitive")]
        ignore_case: bool,

        /// Registry folder to scan instead of the configured ones (repeatable).
        #[arg(long)]
        folder: Vec<PathBuf>,

        /// Print matches as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Build the asset index and report what was scanned.
    Index {
        /// Ignore and do not write the index snapshot cache.
        #[arg(long)]
        no_cache: bool,

        /// Registry folder to scan instead of the configured ones (repeatable).
        #[arg(long)]
        folder: Vec<PathBuf>,
    },

    /// Check every asset listed in an inventory report against the registry.
    Verify {
        /// Page layout of the report (JSON produced by the text extractor).
        #[arg(long)]
        layout: PathBuf,

        /// Write entries and marker drawing instructions to this JSON file.
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Write marker strokes as JSON lines (one line per stroke) for a drawing tool.
        #[arg(long)]
        strokes: Option<PathBuf>,

        /// Ignore and do not write the index snapshot cache.
        #[arg(long)]
        no_cache: bool,

        /// Registry folder to scan instead of the configured ones (repeatable).
        #[arg(long)]
        folder: Vec<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
///
/// Logs go to stderr so `lookup --json` output stays clean.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "patrimonio=info",
        1 => "patrimonio=debug",
        _ => "patrimonio=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config;
    match cli.command {
        Command::Lookup {
            field,
            value,
            mode,
            case_sensitive,
            ignore_case,
            folder,
            json,
        } => {
            let config = resolve_config(config_path.as_deref())?;
            let mut options = SearchOptions::from(&config);
            if let Some(mode) = mode {
                options.match_mode = mode;
            }
            if case_sensitive {
                options.case_sensitive = true;
            } else if ignore_case {
                options.case_sensitive = false;
            }
            cmd_lookup(&config, field, value, options, folder, json).await
        }
        Command::Index { no_cache, folder } => {
            let config = resolve_config(config_path.as_deref())?;
            cmd_index(&config, no_cache, folder).await
        }
        Command::Verify {
            layout,
            out,
            strokes,
            no_cache,
            folder,
        } => {
            let config = resolve_config(config_path.as_deref())?;
            let outputs = VerifyOutputs {
                export: out.as_deref(),
                strokes: strokes.as_deref(),
            };
            cmd_verify(&config, &layout, outputs, no_cache, folder).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(config_path.as_deref()).await,
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

fn scan_config(config: &AppConfig, folders: Vec<PathBuf>) -> Result<ScanConfig> {
    let mut scan = ScanConfig::from(config);
    if !folders.is_empty() {
        scan.folders = folders;
    }
    if scan.folders.is_empty() {
        return Err(eyre!(
            "no registry folders configured: set [registry] folders or pass --folder"
        ));
    }
    Ok(scan)
}

fn cache_policy(config: &AppConfig, no_cache: bool) -> Result<Option<CachePolicy>> {
    if no_cache || config.cache.ttl_minutes == 0 {
        return Ok(None);
    }
    Ok(Some(CachePolicy::new(cache_file_path()?, config.cache.ttl_minutes)))
}

/// Run a blocking registry job, cancelling it cooperatively on Ctrl-C.
///
/// The scan stops before the next workbook and the partial result is returned.
async fn run_cancellable<T, F>(job: F) -> Result<T>
where
    F: FnOnce(CancelFlag) -> T + Send + 'static,
    T: Send + 'static,
{
    let cancel = CancelFlag::new();
    let mut handle = tokio::task::spawn_blocking({
        let cancel = cancel.clone();
        move || job(cancel)
    });

    tokio::select! {
        joined = &mut handle => Ok(joined?),
        _ = tokio::signal::ctrl_c() => {
            warn!("interrupted, stopping after the current workbook");
            cancel.cancel();
            Ok(handle.await?)
        }
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_lookup(
    config: &AppConfig,
    field: AssetField,
    value: String,
    options: SearchOptions,
    folders: Vec<PathBuf>,
    json: bool,
) -> Result<()> {
    let scan = scan_config(config, folders)?;
    info!(%field, value = %value, mode = ?options.match_mode, "searching registry");

    let reporter = CliProgress::new();
    let outcome = run_cancellable(move |cancel| {
        search_registry(
            &scan,
            field,
            &value,
            &options,
            &CalamineReader,
            &reporter,
            &cancel,
        )
    })
    .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome.matches)?);
        return Ok(());
    }

    println!();
    if outcome.matches.is_empty() {
        println!("  No results found.");
    } else {
        for (i, m) in outcome.matches.iter().enumerate() {
            if i > 0 {
                println!("  {}", "-".repeat(40));
            }
            print_match(m);
        }
        println!();
        println!("  {} match(es)", outcome.matches.len());
    }
    print_scan_summary(&outcome.scan);
    println!();

    Ok(())
}

fn print_match(m: &ScannedRecord) {
    let r = &m.record;
    println!("  Origin:        {}", r.origin_tag);
    println!("  File:          {}", m.provenance.file);
    println!("  Location:      {}", r.source_location);
    println!("  Sheet:         {}", m.provenance.sheet);
    println!("  Row:           {}", m.provenance.row);
    println!("  Tombamento:    {}", r.tombamento);
    println!("  Patrimônio:    {}", r.patrimonio.as_deref().unwrap_or("-"));
    println!("  Inventário:    {}", r.inventario.as_deref().unwrap_or("-"));
    println!("  Item:          {}", r.item);
    println!("  Specification: {}", r.specification);
    println!("  TR:            {}", r.tr);
    println!("  Status:        {}", r.status);
}

async fn cmd_index(config: &AppConfig, no_cache: bool, folders: Vec<PathBuf>) -> Result<()> {
    let scan = scan_config(config, folders)?;
    let cache = cache_policy(config, no_cache)?;

    let reporter = CliProgress::new();
    let build = run_cancellable(move |cancel| {
        let build = build_index(&scan, cache.as_ref(), &CalamineReader, &reporter, &cancel);
        reporter.done();
        build
    })
    .await??;

    println!();
    println!("  Asset index ready");
    println!("  Entries:    {}", build.index.len());
    println!("  Collisions: {}", build.index.collisions());
    println!("  Source:     {}", index_source_label(build.source));
    print_scan_summary(&build.scan);
    println!();

    Ok(())
}

/// Optional files written by `verify`.
struct VerifyOutputs<'a> {
    export: Option<&'a Path>,
    strokes: Option<&'a Path>,
}

async fn cmd_verify(
    config: &AppConfig,
    layout_path: &Path,
    outputs: VerifyOutputs<'_>,
    no_cache: bool,
    folders: Vec<PathBuf>,
) -> Result<()> {
    let layout = DocumentLayout::load(layout_path)?;
    let mut verify = VerifyConfig::from_app(config, cache_policy(config, no_cache)?);
    verify.scan = scan_config(config, folders)?;

    info!(layout = %layout_path.display(), pages = layout.pages.len(), "verifying report");

    let reporter = CliProgress::new();
    let outcome = run_cancellable(move |cancel| {
        verify_report(&verify, &layout, &CalamineReader, &reporter, &cancel)
    })
    .await??;

    println!();
    if outcome.result.is_empty() {
        println!("  No asset lines recognised in the report.");
    }
    for entry in outcome.result.entries() {
        let item = &entry.item;
        match (&entry.location, entry.found) {
            (Some(location), true) => println!(
                "  ✔ {}  {}  → {} ({})",
                item.candidate_id,
                item.label,
                location,
                entry.origin.as_deref().unwrap_or("-"),
            ),
            _ => println!("  ✖ {}  {}  not found", item.candidate_id, item.label),
        }
    }

    println!();
    println!("  Items:   {}", outcome.result.len());
    println!("  Found:   {}", outcome.result.found_count());
    println!("  Missing: {}", outcome.result.missing_count());
    println!("  Markers: {}", outcome.markers.len());
    println!(
        "  Index:   {} entries ({})",
        outcome.index_entries,
        index_source_label(outcome.index_source)
    );
    print_scan_summary(&outcome.scan);
    println!("  Time:    {:.1}s", outcome.elapsed.as_secs_f64());

    if let Some(path) = outputs.export {
        write_export(path, &outcome)?;
        println!("  Export:  {}", path.display());
    }
    if let Some(path) = outputs.strokes {
        let drawn = write_strokes(path, &outcome.markers)?;
        println!("  Strokes: {drawn} → {}", path.display());
    }
    println!();

    Ok(())
}

fn index_source_label(source: IndexSource) -> &'static str {
    match source {
        IndexSource::Scanned => "scanned",
        IndexSource::Cached => "cached snapshot",
    }
}

fn print_scan_summary(scan: &ScanSummary) {
    if scan.sources_scanned > 0 {
        println!("  Workbooks scanned: {}", scan.sources_scanned);
    }
    if scan.rows_skipped > 0 {
        println!("  Rows skipped:      {}", scan.rows_skipped);
    }
    for folder in &scan.missing_folders {
        println!("  Folder unavailable: {}", folder.display());
    }
    for failure in &scan.failures {
        println!("  Skipped {}: {}", failure.path.display(), failure.reason);
    }
    if scan.interrupted {
        println!("  Scan interrupted: results are partial.");
    }
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn source_scanned(&self, file: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Reading [{current}/{total}] {file}"));
    }

    fn done(&self) {
        self.spinner.finish_and_clear();
    }
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(path: Option<&Path>) -> Result<()> {
    let config = resolve_config(path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn lookup_parses_field_aliases_and_mode() {
        let cli = Cli::try_parse_from([
            "patrimonio",
            "lookup",
            "specification",
            "projetor",
            "--mode",
            "partial",
            "--folder",
            "/tmp/a",
            "--folder",
            "/tmp/b",
        ])
        .expect("parse");

        match cli.command {
            Command::Lookup {
                field,
                value,
                mode,
                folder,
                ..
            } => {
                assert_eq!(field, AssetField::Specification);
                assert_eq!(value, "projetor");
                assert_eq!(mode, Some(MatchMode::Partial));
                assert_eq!(folder.len(), 2);
            }
            _ => panic!("expected lookup"),
        }
    }

    #[test]
    fn verify_accepts_export_and_strokes_paths() {
        let cli = Cli::try_parse_from([
            "patrimonio",
            "verify",
            "--layout",
            "report.json",
            "--out",
            "result.json",
            "--strokes",
            "strokes.jsonl",
        ])
        .expect("parse");

        match cli.command {
            Command::Verify { out, strokes, .. } => {
                assert_eq!(out, Some(PathBuf::from("result.json")));
                assert_eq!(strokes, Some(PathBuf::from("strokes.jsonl")));
            }
            _ => panic!("expected verify"),
        }
    }

    #[test]
    fn case_flags_conflict() {
        let parsed = Cli::try_parse_from([
            "patrimonio",
            "lookup",
            "item",
            "mesa",
            "--case-sensitive",
            "--ignore-case",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn folder_override_replaces_configured_roots() {
        let config = AppConfig::default();
        assert_eq!(
            scan_config(&config, Vec::new()).unwrap().folders.len(),
            config.registry.folders.len()
        );

        let scan = scan_config(&config, vec![PathBuf::from("/srv/registry")]).unwrap();
        assert_eq!(scan.folders, vec![PathBuf::from("/srv/registry")]);
    }

    #[test]
    fn empty_folder_list_is_rejected() {
        let mut config = AppConfig::default();
        config.registry.folders.clear();
        assert!(scan_config(&config, Vec::new()).is_err());
    }

    #[test]
    fn no_cache_flag_disables_snapshot() {
        let config = AppConfig::default();
        assert!(cache_policy(&config, true).unwrap().is_none());
    }
}
