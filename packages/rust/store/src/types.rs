//! Wire types for stories, assets, and signed upload tickets.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An entry in the content store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Story {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
    #[serde(default)]
    pub content: StoryContent,
}

impl Story {
    /// Whether the entry has been published at least once.
    pub fn is_published(&self) -> bool {
        self.published_at.as_deref().is_some_and(|s| !s.is_empty())
    }
}

/// Body of a website entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoryContent {
    #[serde(default)]
    pub component: String,
    #[serde(default)]
    pub website: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<AssetRef>,
}

/// Asset field value as stored on an entry.
///
/// Fields other than the ones we set are kept so an unchanged logo is written
/// back exactly as it was read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetRef {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default = "asset_fieldtype")]
    pub fieldtype: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn asset_fieldtype() -> String {
    "asset".into()
}

impl AssetRef {
    /// Asset metadata for a freshly uploaded file.
    pub fn uploaded(ticket: &UploadTicket, alt: impl Into<String>) -> Self {
        Self {
            id: Some(ticket.id),
            alt: Some(alt.into()),
            filename: Some(ticket.pretty_url.clone()),
            fieldtype: asset_fieldtype(),
            extra: Map::new(),
        }
    }

    /// The stored filename, if the field actually points at a file.
    pub fn stored_filename(&self) -> Option<&str> {
        self.filename.as_deref().filter(|f| !f.is_empty())
    }
}

/// Request body for story create/update calls.
#[derive(Debug, Clone, Serialize)]
pub struct StoryPayload {
    pub story: Story,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish: Option<u8>,
}

/// Signed credentials for a single asset upload.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadTicket {
    /// Id of the asset record that the upload will fill.
    pub id: u64,
    /// Public URL the asset will be served from.
    pub pretty_url: String,
    /// Pre-signed destination for the multipart POST.
    pub post_url: String,
    /// Form fields that must accompany the file.
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn story_from_delivery_response() {
        let json = r#"{
            "id": 42, "name": "Acme", "slug": "acme", "full_slug": "partners/acme",
            "parent_id": 7, "published_at": "2024-05-01T10:00:00.000Z",
            "content": {"_uid": "x", "component": "website", "website": "https://acme.test",
                "logo": {"id": 9, "alt": "Acme Logo", "filename": "https://a.example/f/1/acme.png", "fieldtype": "asset", "focus": null}}
        }"#;
        let story: Story = serde_json::from_str(json).expect("deserialize");
        assert_eq!(story.id, Some(42));
        assert!(story.is_published());
        let logo = story.content.logo.expect("logo");
        assert_eq!(logo.stored_filename(), Some("https://a.example/f/1/acme.png"));
        assert!(logo.extra.contains_key("focus"));
    }

    #[test]
    fn empty_asset_field_has_no_filename() {
        let asset: AssetRef =
            serde_json::from_str(r#"{"id": null, "filename": "", "fieldtype": "asset"}"#).unwrap();
        assert_eq!(asset.stored_filename(), None);
    }

    #[test]
    fn payload_omits_unset_fields() {
        let payload = StoryPayload {
            story: Story {
                name: "Acme".into(),
                slug: "acme".into(),
                content: StoryContent {
                    component: "website".into(),
                    website: "https://acme.test".into(),
                    logo: None,
                },
                ..Story::default()
            },
            publish: None,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("publish").is_none());
        assert!(json["story"].get("id").is_none());
        assert!(json["story"]["content"].get("logo").is_none());
    }

    #[test]
    fn ticket_fields_parse() {
        let ticket: UploadTicket = serde_json::from_str(
            r#"{"id": 5, "pretty_url": "//a.example/f/1/logo.png", "post_url": "https://s3.example/upload",
                "fields": {"key": "f/1/logo.png", "policy": "abc"}}"#,
        )
        .unwrap();
        assert_eq!(ticket.fields.len(), 2);
        assert_eq!(ticket.fields["key"], "f/1/logo.png");
    }
}
