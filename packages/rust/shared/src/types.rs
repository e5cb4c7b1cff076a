//! Core domain types shared by the resolver, the batch pipeline, and the CLI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// LogoReference
// ---------------------------------------------------------------------------

/// The single logo retained for a website.
///
/// On disk this is a plain string so cache files stay flat: an empty string
/// or `null` is [`LogoReference::Absent`], text containing `<svg` is inline
/// markup, anything else is a remote URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum LogoReference {
    /// Absolute URL of an image resource.
    RemoteUrl(String),
    /// Serialized inline `<svg>` markup.
    InlineMarkup(String),
    /// No logo could be determined.
    #[default]
    Absent,
}

impl LogoReference {
    /// Whether a logo was found.
    pub fn is_present(&self) -> bool {
        !matches!(self, Self::Absent)
    }

    /// The raw string form (URL or markup), if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::RemoteUrl(s) | Self::InlineMarkup(s) => Some(s),
            Self::Absent => None,
        }
    }

    /// Last path segment of the reference with any query string removed.
    ///
    /// Inline markup has no meaningful basename and yields `None`.
    pub fn basename(&self) -> Option<String> {
        match self {
            Self::RemoteUrl(url) => Some(basename(url)),
            _ => None,
        }
    }
}

impl From<Option<String>> for LogoReference {
    fn from(value: Option<String>) -> Self {
        match value {
            None => Self::Absent,
            Some(s) if s.trim().is_empty() => Self::Absent,
            Some(s) if s.contains("<svg") => Self::InlineMarkup(s),
            Some(s) => Self::RemoteUrl(s),
        }
    }
}

impl From<LogoReference> for Option<String> {
    fn from(value: LogoReference) -> Self {
        match value {
            LogoReference::RemoteUrl(s) | LogoReference::InlineMarkup(s) => Some(s),
            LogoReference::Absent => None,
        }
    }
}

/// Strip the query string, then keep everything after the last `/`.
pub fn basename(reference: &str) -> String {
    let without_query = reference.split(['?', '#']).next().unwrap_or_default();
    without_query
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

// ---------------------------------------------------------------------------
// WebsiteRecord
// ---------------------------------------------------------------------------

/// One website from the input list, enriched in place with its logo.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebsiteRecord {
    /// Display name; the remote entry slug is derived from it.
    pub name: String,
    /// Site URL as given in the input (scheme added during scraping).
    #[serde(default)]
    pub url: String,
    /// Resolved logo.
    #[serde(default)]
    pub logo: LogoReference,
}

impl WebsiteRecord {
    /// Create a record that has not been scraped yet.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            logo: LogoReference::Absent,
        }
    }
}

// ---------------------------------------------------------------------------
// FailureLogEntry
// ---------------------------------------------------------------------------

/// What went wrong for a failure log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Remote read/create/update failed; the entry was not saved.
    Reconciliation,
    /// The entry was saved but its logo could not be uploaded.
    AssetUpload,
}

/// An entry in `log.json`. Written for auditing, never read back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureLogEntry {
    /// Name of the affected website.
    pub website_name: String,
    /// Failure category.
    pub kind: FailureKind,
    /// Error summary.
    pub message: String,
    /// When the failure was recorded.
    pub at: DateTime<Utc>,
}

impl FailureLogEntry {
    /// Record a failure now.
    pub fn new(website_name: impl Into<String>, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            website_name: website_name.into(),
            kind,
            message: message.into(),
            at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logo_reference_classifies_strings() {
        assert_eq!(LogoReference::from(None), LogoReference::Absent);
        assert_eq!(LogoReference::from(Some(String::new())), LogoReference::Absent);
        assert_eq!(
            LogoReference::from(Some("<svg viewBox=\"0 0 1 1\"></svg>".to_string())),
            LogoReference::InlineMarkup("<svg viewBox=\"0 0 1 1\"></svg>".into())
        );
        assert_eq!(
            LogoReference::from(Some("https://x.com/logo.png".to_string())),
            LogoReference::RemoteUrl("https://x.com/logo.png".into())
        );
    }

    #[test]
    fn record_serializes_logo_as_plain_string() {
        let record = WebsiteRecord {
            name: "Acme".into(),
            url: "https://acme.test".into(),
            logo: LogoReference::RemoteUrl("https://acme.test/logo.png".into()),
        };
        let json = serde_json::to_value(&record).expect("serialize");
        assert_eq!(json["logo"], "https://acme.test/logo.png");

        let absent = WebsiteRecord::new("Blank", "");
        let json = serde_json::to_value(&absent).expect("serialize");
        assert!(json["logo"].is_null());
    }

    #[test]
    fn record_reads_legacy_cache_rows() {
        let json = r#"[
            {"name": "A", "url": "https://a.test", "logo": ""},
            {"name": "B", "url": "https://b.test", "logo": "<svg></svg>"},
            {"name": "C", "url": ""}
        ]"#;
        let records: Vec<WebsiteRecord> = serde_json::from_str(json).expect("deserialize");
        assert_eq!(records[0].logo, LogoReference::Absent);
        assert!(matches!(records[1].logo, LogoReference::InlineMarkup(_)));
        assert_eq!(records[2].logo, LogoReference::Absent);
    }

    #[test]
    fn basename_strips_path_and_query() {
        assert_eq!(basename("a.png?x=1"), "a.png");
        assert_eq!(basename("https://y.com/a.png"), "a.png");
        assert_eq!(
            basename("https://a.storyblok.com/f/1/200x200/abc/a.png?cv=2"),
            "a.png"
        );
        assert_eq!(
            LogoReference::RemoteUrl("https://y.com/img/a.png?v=3".into()).basename(),
            Some("a.png".into())
        );
        assert_eq!(LogoReference::InlineMarkup("<svg/>".into()).basename(), None);
    }

    #[test]
    fn failure_entry_uses_camel_case() {
        let entry = FailureLogEntry::new("Acme", FailureKind::Reconciliation, "HTTP 500");
        let json = serde_json::to_value(&entry).expect("serialize");
        assert_eq!(json["websiteName"], "Acme");
        assert_eq!(json["kind"], "reconciliation");
        assert_eq!(json["message"], "HTTP 500");
    }
}
