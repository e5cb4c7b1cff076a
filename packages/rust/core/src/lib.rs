//! Batch orchestration for logosync.
//!
//! This crate ties the logo resolver and the content-store client together:
//! [`scrape::BatchScraper`] enriches the input list, [`reconcile::EntryReconciler`]
//! writes it to the store, and [`pipeline`] runs the phases end to end.

pub mod cache;
mod dispatch;
pub mod input;
pub mod pipeline;
pub mod reconcile;
pub mod scrape;
pub mod slug;
pub mod upload;

pub use cache::DataDir;
pub use pipeline::{ProgressReporter, RunConfig, RunSummary, SilentProgress};
pub use reconcile::{EntryReconciler, ReconcileSummary};
pub use scrape::BatchScraper;
pub use upload::AssetUploader;
