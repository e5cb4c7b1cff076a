//! Typed operations on one space of the content store.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use logosync_shared::{LogoSyncError, Result};

use crate::client::ContentStore;
use crate::types::{Story, StoryPayload, UploadTicket};

/// Story and asset calls scoped to a single space.
#[derive(Clone)]
pub struct SpaceClient {
    store: Arc<dyn ContentStore>,
    space_id: u64,
}

impl SpaceClient {
    pub fn new(store: Arc<dyn ContentStore>, space_id: u64) -> Self {
        Self { store, space_id }
    }

    pub fn space_id(&self) -> u64 {
        self.space_id
    }

    /// Fetch a story (usually a folder) by id from the management API.
    pub async fn story_by_id(&self, story_id: u64) -> Result<Story> {
        let path = format!("spaces/{}/stories/{story_id}", self.space_id);
        let value = self.store.get(&path, &[]).await?;
        field(value, "story", &path)
    }

    /// Read the draft version of a story by its full slug.
    pub async fn draft_story(&self, full_slug: &str) -> Result<Story> {
        let path = format!("cdn/stories/{}", full_slug.trim_matches('/'));
        let value = self.store.get(&path, &[("version", "draft")]).await?;
        field(value, "story", &path)
    }

    pub async fn create_story(&self, payload: &StoryPayload) -> Result<Story> {
        let path = format!("spaces/{}/stories", self.space_id);
        let value = self.store.post(&path, &to_value(payload)?).await?;
        field(value, "story", &path)
    }

    pub async fn update_story(&self, story_id: u64, payload: &StoryPayload) -> Result<Story> {
        let path = format!("spaces/{}/stories/{story_id}", self.space_id);
        let value = self.store.put(&path, &to_value(payload)?).await?;
        field(value, "story", &path)
    }

    /// Register an asset and obtain signed upload credentials for it.
    pub async fn request_upload(&self, filename: &str) -> Result<UploadTicket> {
        let path = format!("spaces/{}/assets", self.space_id);
        let value = self
            .store
            .post(&path, &serde_json::json!({ "filename": filename }))
            .await?;
        serde_json::from_value(value)
            .map_err(|e| LogoSyncError::parse(format!("{path}: unexpected upload ticket: {e}")))
    }
}

fn to_value(payload: &StoryPayload) -> Result<Value> {
    serde_json::to_value(payload).map_err(|e| LogoSyncError::parse(e.to_string()))
}

fn field<T: DeserializeOwned>(mut value: Value, key: &str, path: &str) -> Result<T> {
    let inner = value
        .get_mut(key)
        .map(Value::take)
        .ok_or_else(|| LogoSyncError::parse(format!("{path}: response has no `{key}`")))?;
    serde_json::from_value(inner).map_err(|e| LogoSyncError::parse(format!("{path}: {e}")))
}
