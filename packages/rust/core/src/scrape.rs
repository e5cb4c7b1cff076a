//! Batch logo scraping with a bounded worker pool and an all-or-nothing cache.

use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use logosync_resolver::{LogoSource, ensure_scheme};
use logosync_shared::{DEFAULT_CONCURRENCY, LogoReference, LogoSyncError, Result, WebsiteRecord};

use crate::cache::DataDir;
use crate::dispatch::run_bounded;
use crate::input::read_records;
use crate::pipeline::ProgressReporter;

/// Resolves logos for a whole input list.
pub struct BatchScraper {
    source: Arc<dyn LogoSource>,
    concurrency: usize,
}

impl BatchScraper {
    pub fn new(source: Arc<dyn LogoSource>) -> Self {
        Self {
            source,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Limit the number of resolutions in flight (minimum 1).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Return the cached snapshot if there is one, otherwise read `input` and
    /// scrape it.
    ///
    /// The input file is only opened on a cache miss.
    pub async fn scrape(
        &self,
        input: &Path,
        data: &DataDir,
        progress: &dyn ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<Vec<WebsiteRecord>> {
        if let Some(cached) = data.read_cache().filter(|records| !records.is_empty()) {
            info!(count = cached.len(), "using cached scrape results");
            return Ok(cached);
        }

        let records = read_records(input)?;
        self.scrape_records(records, data, progress, cancel).await
    }

    /// Resolve every record, preserving input order, then write the cache.
    ///
    /// Records without a URL pass through with no logo. A cancelled batch is
    /// not cached.
    #[instrument(skip_all, fields(count = records.len(), concurrency = self.concurrency))]
    pub async fn scrape_records(
        &self,
        mut records: Vec<WebsiteRecord>,
        data: &DataDir,
        progress: &dyn ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<Vec<WebsiteRecord>> {
        let total = records.len();
        progress.phase("Scraping logos");
        info!(total, "scraping logos");

        let mut targets = Vec::new();
        let mut urls = Vec::new();
        for (index, record) in records.iter_mut().enumerate() {
            if record.url.trim().is_empty() {
                continue;
            }
            record.url = ensure_scheme(record.url.trim());
            targets.push(index);
            urls.push(record.url.clone());
        }

        let mut logos = vec![LogoReference::Absent; total];
        let mut completed = total - urls.len();
        if completed > 0 {
            progress.item_done(completed, total);
        }

        let cancelled = run_bounded(
            urls,
            self.concurrency,
            cancel,
            |url| {
                let source = Arc::clone(&self.source);
                async move { source.resolve(&url).await }
            },
            |job, logo| {
                if let Some(logo) = logo {
                    logos[targets[job]] = logo;
                }
                completed += 1;
                progress.item_done(completed, total);
            },
        )
        .await;

        if cancelled {
            info!(completed, total, "scrape cancelled, cache left untouched");
            return Err(LogoSyncError::Cancelled);
        }

        for (record, logo) in records.iter_mut().zip(logos) {
            record.logo = logo;
        }

        let found = records.iter().filter(|r| r.logo.is_present()).count();
        info!(total, found, "scrape complete");

        data.write_cache(&records)?;
        Ok(records)
    }
}
