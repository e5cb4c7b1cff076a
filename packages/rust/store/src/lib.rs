//! # logosync-store
//!
//! Client for the headless content store: a generic [`ContentStore`] seam,
//! the rate-limited HTTP [`StoreClient`], and typed space operations.

pub mod client;
pub mod space;
pub mod types;

pub use client::{ContentStore, StoreClient};
pub use space::SpaceClient;
pub use types::{AssetRef, Story, StoryContent, StoryPayload, UploadTicket};
