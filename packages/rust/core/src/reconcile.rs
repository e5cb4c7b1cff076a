//! Create or update one remote entry per enriched record.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use logosync_shared::{
    DEFAULT_CONCURRENCY, FailureKind, FailureLogEntry, LogoSyncError, Result, WebsiteRecord, basename,
};
use logosync_store::{AssetRef, SpaceClient, Story, StoryContent, StoryPayload};

use crate::cache::DataDir;
use crate::dispatch::run_bounded;
use crate::pipeline::ProgressReporter;
use crate::slug::slugify;
use crate::upload::AssetUploader;

/// Counts for one reconciliation batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub created: usize,
    pub updated: usize,
    pub failed: usize,
    /// Records left unprocessed because the batch was cancelled.
    pub cancelled: usize,
}

/// Parent folder all entries are nested under.
#[derive(Debug, Clone)]
struct Folder {
    id: u64,
    /// Slug prefix for draft reads; `None` when the folder could not be read.
    full_slug: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Created,
    Updated,
}

/// What a worker reports back for one record.
struct RecordReport {
    outcome: Result<Outcome>,
    upload_error: Option<String>,
}

struct Shared {
    space: SpaceClient,
    uploader: AssetUploader,
    component: String,
}

/// Writes enriched records to the content store.
pub struct EntryReconciler {
    shared: Arc<Shared>,
    folder_id: Option<u64>,
    concurrency: usize,
}

impl EntryReconciler {
    pub fn new(space: SpaceClient, uploader: AssetUploader, component: impl Into<String>) -> Self {
        Self {
            shared: Arc::new(Shared {
                space,
                uploader,
                component: component.into(),
            }),
            folder_id: None,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Nest entries under this folder.
    pub fn with_folder(mut self, folder_id: Option<u64>) -> Self {
        self.folder_id = folder_id;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Reconcile every record, then write the failure log.
    ///
    /// Per-record failures never abort the batch. The log is written even when
    /// the batch is cancelled.
    #[instrument(skip_all, fields(count = records.len(), space = self.shared.space.space_id()))]
    pub async fn reconcile(
        &self,
        records: &[WebsiteRecord],
        data: &DataDir,
        progress: &dyn ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<ReconcileSummary> {
        let total = records.len();
        progress.phase("Saving entries");
        info!(total, "reconciling entries");

        let folder = self.resolve_folder().await;
        let mut failures = Vec::new();
        let mut summary = ReconcileSummary::default();
        let mut completed = 0;

        let cancelled = run_bounded(
            records.to_vec(),
            self.concurrency,
            cancel,
            |record| {
                let shared = Arc::clone(&self.shared);
                let folder = folder.clone();
                async move { reconcile_record(&shared, record, folder.as_ref()).await }
            },
            |index, report| {
                completed += 1;
                progress.item_done(completed, total);
                let name = &records[index].name;

                let Some(report) = report else {
                    summary.failed += 1;
                    failures.push(FailureLogEntry::new(
                        name,
                        FailureKind::Reconciliation,
                        "worker task failed",
                    ));
                    return;
                };

                if let Some(message) = report.upload_error {
                    failures.push(FailureLogEntry::new(name, FailureKind::AssetUpload, message));
                }
                match report.outcome {
                    Ok(Outcome::Created) => summary.created += 1,
                    Ok(Outcome::Updated) => summary.updated += 1,
                    Err(e) => {
                        warn!(website = %name, error = %e, "entry not saved");
                        summary.failed += 1;
                        failures.push(FailureLogEntry::new(name, FailureKind::Reconciliation, e.to_string()));
                    }
                }
            },
        )
        .await;

        if cancelled {
            summary.cancelled = total - completed;
            info!(completed, total, "reconciliation cancelled");
        }

        data.write_failure_log(&failures)?;
        info!(
            created = summary.created,
            updated = summary.updated,
            failed = summary.failed,
            "reconciliation complete"
        );
        Ok(summary)
    }

    /// Look up the parent folder's slug once.
    ///
    /// A failed lookup only affects draft reads: new entries are still created
    /// under the configured folder.
    async fn resolve_folder(&self) -> Option<Folder> {
        let id = self.folder_id?;
        let full_slug = match self.shared.space.story_by_id(id).await {
            Ok(story) => {
                let full_slug = story.full_slug.unwrap_or(story.slug);
                debug!(folder_id = id, %full_slug, "resolved parent folder");
                Some(full_slug)
            }
            Err(e) => {
                warn!(folder_id = id, error = %e, "parent folder lookup failed, reading entries unprefixed");
                None
            }
        };
        Some(Folder { id, full_slug })
    }
}

// ---------------------------------------------------------------------------
// Per-record work
// ---------------------------------------------------------------------------

async fn reconcile_record(shared: &Shared, record: WebsiteRecord, folder: Option<&Folder>) -> RecordReport {
    let mut upload_error = None;
    let outcome = save_record(shared, &record, folder, &mut upload_error).await;
    RecordReport { outcome, upload_error }
}

async fn save_record(
    shared: &Shared,
    record: &WebsiteRecord,
    folder: Option<&Folder>,
    upload_error: &mut Option<String>,
) -> Result<Outcome> {
    let slug = slugify(&record.name);
    if slug.is_empty() {
        return Err(LogoSyncError::validation(format!(
            "name {:?} produces an empty slug",
            record.name
        )));
    }

    let path = match folder.and_then(|f| f.full_slug.as_deref()) {
        Some(prefix) => format!("{}/{slug}", prefix.trim_end_matches('/')),
        None => slug.clone(),
    };

    match shared.space.draft_story(&path).await {
        Ok(existing) => {
            let id = existing
                .id
                .ok_or_else(|| LogoSyncError::parse(format!("entry {path} has no id")))?;
            let publish = existing.is_published().then_some(1);
            let logo = updated_logo(shared, record, existing.content.logo, upload_error).await;

            let payload = StoryPayload {
                story: Story {
                    id: Some(id),
                    name: existing.name,
                    slug: existing.slug,
                    parent_id: existing.parent_id,
                    content: content_for(shared, record, logo),
                    ..Story::default()
                },
                publish,
            };
            shared.space.update_story(id, &payload).await?;
            debug!(%path, id, "entry updated");
            Ok(Outcome::Updated)
        }
        Err(e) => {
            if e.is_not_found() {
                debug!(%path, "no existing entry, creating");
            } else {
                debug!(%path, error = %e, "draft read failed, creating");
            }
            let logo = new_logo(shared, record, upload_error).await;

            let payload = StoryPayload {
                story: Story {
                    name: record.name.clone(),
                    slug,
                    parent_id: folder.map(|f| f.id),
                    content: content_for(shared, record, logo),
                    ..Story::default()
                },
                publish: None,
            };
            shared.space.create_story(&payload).await?;
            debug!(%path, "entry created");
            Ok(Outcome::Created)
        }
    }
}

fn content_for(shared: &Shared, record: &WebsiteRecord, logo: Option<AssetRef>) -> StoryContent {
    StoryContent {
        component: shared.component.clone(),
        website: record.url.clone(),
        logo,
    }
}

/// Keep the stored asset when the new logo has the same file name; otherwise
/// upload the new one, keeping the stored asset if the upload fails.
async fn updated_logo(
    shared: &Shared,
    record: &WebsiteRecord,
    existing: Option<AssetRef>,
    upload_error: &mut Option<String>,
) -> Option<AssetRef> {
    if !record.logo.is_present() {
        return existing;
    }

    let stored_name = existing
        .as_ref()
        .and_then(AssetRef::stored_filename)
        .map(basename);
    if stored_name.is_some() && stored_name == record.logo.basename() {
        debug!(website = %record.name, "logo unchanged, keeping stored asset");
        return existing;
    }

    match shared.uploader.upload(&record.name, &record.logo).await {
        Ok(asset) => Some(asset),
        Err(e) => {
            note_upload_failure(record, e, upload_error);
            existing
        }
    }
}

async fn new_logo(shared: &Shared, record: &WebsiteRecord, upload_error: &mut Option<String>) -> Option<AssetRef> {
    if !record.logo.is_present() {
        return None;
    }
    match shared.uploader.upload(&record.name, &record.logo).await {
        Ok(asset) => Some(asset),
        Err(e) => {
            note_upload_failure(record, e, upload_error);
            None
        }
    }
}

fn note_upload_failure(record: &WebsiteRecord, error: LogoSyncError, slot: &mut Option<String>) {
    warn!(website = %record.name, error = %error, "logo upload failed, saving entry without new logo");
    *slot = Some(error.to_string());
}
