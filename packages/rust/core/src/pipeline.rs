//! End-to-end runs: input/cache → scrape → reconcile → summary.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use logosync_resolver::{LogoResolver, ResolverOptions, build_client};
use logosync_shared::{AppConfig, LogoSyncError, Result, WebsiteRecord};
use logosync_store::{SpaceClient, StoreClient};

use crate::cache::DataDir;
use crate::reconcile::{EntryReconciler, ReconcileSummary};
use crate::scrape::BatchScraper;
use crate::upload::AssetUploader;

/// Settings for one invocation, after CLI flags have been merged over config.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// CSV input, read only when there is no cache.
    pub input: PathBuf,
    /// Directory holding `cache.json` and `log.json`.
    pub data_dir: PathBuf,
    /// Items in flight per phase.
    pub concurrency: usize,
    /// OAuth token for the content store management API.
    pub oauth_token: Option<String>,
    pub space_id: Option<u64>,
    /// Optional parent folder for every entry.
    pub folder_id: Option<u64>,
}

impl RunConfig {
    /// Start from the config file's defaults.
    pub fn from_app(app: &AppConfig) -> Self {
        Self {
            input: PathBuf::from(&app.defaults.input_file),
            data_dir: PathBuf::from(&app.defaults.data_dir),
            concurrency: app.defaults.concurrency,
            oauth_token: None,
            space_id: None,
            folder_id: None,
        }
    }

    fn data_dir(&self) -> DataDir {
        DataDir::new(&self.data_dir)
    }

    /// The token and space id, or a config error naming what is missing.
    fn credentials(&self) -> Result<(&str, u64)> {
        let token = self
            .oauth_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| LogoSyncError::config("an OAuth token is required to import"))?;
        let space_id = self
            .space_id
            .ok_or_else(|| LogoSyncError::config("a space id is required to import"))?;
        Ok((token, space_id))
    }
}

/// Outcome of a run, reported to [`ProgressReporter::finish`].
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Number of website records processed.
    pub records: usize,
    /// Records that ended up with a logo.
    pub logos_found: usize,
    /// Import counts, when the import phase ran.
    pub reconcile: Option<ReconcileSummary>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn new(records: &[WebsiteRecord], reconcile: Option<ReconcileSummary>, elapsed: Duration) -> Self {
        Self {
            records: records.len(),
            logos_found: records.iter().filter(|r| r.logo.is_present()).count(),
            reconcile,
            elapsed,
        }
    }
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each item of the current phase finishes.
    fn item_done(&self, completed: usize, total: usize);
    /// Called when the run completes.
    fn finish(&self, summary: &RunSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn item_done(&self, _completed: usize, _total: usize) {}
    fn finish(&self, _summary: &RunSummary) {}
}

// ---------------------------------------------------------------------------
// Phases
// ---------------------------------------------------------------------------

/// Scrape phase only. Reuses the cache when present.
#[instrument(skip_all, fields(input = %config.input.display()))]
pub async fn scrape(
    config: &RunConfig,
    app: &AppConfig,
    progress: &dyn ProgressReporter,
    cancel: &CancellationToken,
) -> Result<Vec<WebsiteRecord>> {
    let data = config.data_dir();
    data.ensure()?;

    let resolver = LogoResolver::new(ResolverOptions::from(app))?;
    BatchScraper::new(Arc::new(resolver))
        .with_concurrency(config.concurrency)
        .scrape(&config.input, &data, progress, cancel)
        .await
}

/// Import phase only: write `records` to the content store.
#[instrument(skip_all, fields(count = records.len()))]
pub async fn import(
    records: &[WebsiteRecord],
    config: &RunConfig,
    app: &AppConfig,
    progress: &dyn ProgressReporter,
    cancel: &CancellationToken,
) -> Result<ReconcileSummary> {
    let (token, space_id) = config.credentials()?;
    let timeout = Duration::from_secs(app.defaults.request_timeout_secs);

    progress.phase("Connecting to content store");
    let store = StoreClient::connect(&app.store, token, space_id, timeout).await?;
    let space = SpaceClient::new(Arc::new(store), space_id);
    let uploader = AssetUploader::new(build_client(&ResolverOptions::from(app))?, space.clone());

    EntryReconciler::new(space, uploader, app.store.component.clone())
        .with_folder(config.folder_id)
        .with_concurrency(config.concurrency)
        .reconcile(records, &config.data_dir(), progress, cancel)
        .await
}

/// Import the cached scrape results. Fails if nothing has been scraped yet.
pub async fn import_cached(
    config: &RunConfig,
    app: &AppConfig,
    progress: &dyn ProgressReporter,
    cancel: &CancellationToken,
) -> Result<RunSummary> {
    let start = Instant::now();
    let data = config.data_dir();
    let records = data.read_cache().filter(|r| !r.is_empty()).ok_or_else(|| {
        LogoSyncError::validation(format!(
            "no cached scrape results at {}; run the scrape first",
            data.cache_path().display()
        ))
    })?;

    let reconcile = import(&records, config, app, progress, cancel).await?;
    let summary = RunSummary::new(&records, Some(reconcile), start.elapsed());
    progress.finish(&summary);
    Ok(summary)
}

/// Scrape then import.
///
/// Credentials are checked before scraping so a misconfigured run fails fast.
/// The cache written by the scrape survives a failed import.
#[instrument(skip_all)]
pub async fn run(
    config: &RunConfig,
    app: &AppConfig,
    progress: &dyn ProgressReporter,
    cancel: &CancellationToken,
) -> Result<RunSummary> {
    let start = Instant::now();
    config.credentials()?;

    let records = scrape(config, app, progress, cancel).await?;
    info!(count = records.len(), "scrape phase finished");

    let reconcile = import(&records, config, app, progress, cancel).await?;
    let summary = RunSummary::new(&records, Some(reconcile), start.elapsed());
    progress.finish(&summary);
    Ok(summary)
}
