//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use logosync_core::pipeline::{self, ProgressReporter, RunConfig, RunSummary};
use logosync_shared::{AppConfig, LogoSyncError, init_config, load_config};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// logosync: scrape website logos and sync them to a content store.
#[derive(Parser)]
#[command(
    name = "logosync",
    version,
    about = "Find each website's logo and create or update its content-store entry.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

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
    /// Scrape logos (or reuse the cache), then create/update every entry.
    Run {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        store: StoreArgs,
    },

    /// Scrape logos into the cache without touching the content store.
    Scrape {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Create/update entries from the cached scrape results.
    Import {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        store: StoreArgs,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Where records come from and where state is kept.
#[derive(Args)]
pub(crate) struct SourceArgs {
    /// CSV input with `name` and `url` columns.
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Directory for cache.json and log.json.
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Maximum items in flight per phase.
    #[arg(short, long)]
    pub concurrency: Option<usize>,
}

/// Content store credentials and placement.
#[derive(Args)]
pub(crate) struct StoreArgs {
    /// OAuth token for the management API.
    #[arg(long, env = "LOGOSYNC_OAUTH_TOKEN", hide_env_values = true)]
    pub oauth_token: Option<String>,

    /// Target space id.
    #[arg(long)]
    pub space_id: u64,

    /// Parent folder id for every entry.
    #[arg(long)]
    pub folder_id: Option<u64>,
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
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "logosync=info",
        1 => "logosync=debug",
        _ => "logosync=trace",
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
    match cli.command {
        Command::Run { source, store } => cmd_run(source, store).await,
        Command::Scrape { source } => cmd_scrape(source).await,
        Command::Import { source, store } => cmd_import(source, store).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

/// Merge CLI flags over the loaded config.
fn run_config(app: &AppConfig, source: SourceArgs, store: Option<StoreArgs>) -> Result<RunConfig> {
    let mut config = RunConfig::from_app(app);
    if let Some(input) = source.input {
        config.input = input;
    }
    if let Some(data_dir) = source.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(concurrency) = source.concurrency {
        if concurrency == 0 {
            return Err(eyre!("--concurrency must be at least 1"));
        }
        config.concurrency = concurrency;
    }
    if let Some(store) = store {
        config.oauth_token = store.oauth_token;
        config.space_id = Some(store.space_id);
        config.folder_id = store.folder_id;
    }
    Ok(config)
}

/// A token that fires on Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, finishing in-flight work");
            trigger.cancel();
        }
    });
    cancel
}

async fn cmd_run(source: SourceArgs, store: StoreArgs) -> Result<()> {
    let app = load_config()?;
    let config = run_config(&app, source, Some(store))?;
    info!(input = %config.input.display(), data_dir = %config.data_dir.display(), "starting run");

    let reporter = CliProgress::new();
    let summary = pipeline::run(&config, &app, &reporter, &cancel_on_ctrl_c())
        .await
        .map_err(cancelled_hint)?;

    print_summary(&summary, &config);
    Ok(())
}

async fn cmd_scrape(source: SourceArgs) -> Result<()> {
    let app = load_config()?;
    let config = run_config(&app, source, None)?;
    let start = Instant::now();

    let reporter = CliProgress::new();
    let records = pipeline::scrape(&config, &app, &reporter, &cancel_on_ctrl_c())
        .await
        .map_err(cancelled_hint)?;

    let summary = RunSummary::new(&records, None, start.elapsed());
    reporter.finish(&summary);
    print_summary(&summary, &config);
    Ok(())
}

async fn cmd_import(source: SourceArgs, store: StoreArgs) -> Result<()> {
    let app = load_config()?;
    let config = run_config(&app, source, Some(store))?;

    let reporter = CliProgress::new();
    let summary = pipeline::import_cached(&config, &app, &reporter, &cancel_on_ctrl_c())
        .await
        .map_err(cancelled_hint)?;

    print_summary(&summary, &config);
    Ok(())
}

fn cancelled_hint(err: LogoSyncError) -> color_eyre::Report {
    match err {
        LogoSyncError::Cancelled => eyre!("cancelled before all sites were scraped; nothing was cached"),
        other => other.into(),
    }
}

fn print_summary(summary: &RunSummary, config: &RunConfig) {
    println!();
    println!("  Websites:    {}", summary.records);
    println!("  Logos found: {}", summary.logos_found);
    if let Some(reconcile) = &summary.reconcile {
        println!("  Created:     {}", reconcile.created);
        println!("  Updated:     {}", reconcile.updated);
        println!("  Failed:      {}", reconcile.failed);
        if reconcile.cancelled > 0 {
            println!("  Skipped:     {} (cancelled)", reconcile.cancelled);
        }
        println!("  Log:         {}", config.data_dir.join("log.json").display());
    }
    println!("  Time:        {:.1}s", summary.elapsed.as_secs_f64());
    println!();
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif bar.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg} [{bar:30.cyan/blue}] {pos} of {len}")
                .unwrap()
                .progress_chars("=> ")
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        bar.enable_steady_tick(Duration::from_millis(80));
        Self { bar }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.bar.set_position(0);
        self.bar.set_message(name.to_string());
    }

    fn item_done(&self, completed: usize, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_position(completed as u64);
    }

    fn finish(&self, _summary: &RunSummary) {
        self.bar.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// Config commands
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let cli = Cli::try_parse_from([
            "logosync",
            "run",
            "--input",
            "sites.csv",
            "--concurrency",
            "4",
            "--oauth-token",
            "tok",
            "--space-id",
            "12",
            "--folder-id",
            "99",
        ])
        .unwrap();

        let Command::Run { source, store } = cli.command else {
            panic!("expected run");
        };
        let config = run_config(&AppConfig::default(), source, Some(store)).unwrap();
        assert_eq!(config.input, PathBuf::from("sites.csv"));
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.space_id, Some(12));
        assert_eq!(config.folder_id, Some(99));
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let cli = Cli::try_parse_from(["logosync", "scrape", "-c", "0"]).unwrap();
        let Command::Scrape { source } = cli.command else {
            panic!("expected scrape");
        };
        assert!(run_config(&AppConfig::default(), source, None).is_err());
    }

    #[test]
    fn import_requires_space_id() {
        assert!(Cli::try_parse_from(["logosync", "import", "--oauth-token", "t"]).is_err());
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from(["logosync", "scrape", "-vv", "--log-format", "json"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.log_format, LogFormat::Json));
    }
}
