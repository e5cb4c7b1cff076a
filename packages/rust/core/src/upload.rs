//! Signed asset upload: register the file, then POST it to the signed URL.

use reqwest::Client;
use reqwest::multipart::{Form, Part};
use tracing::{debug, instrument, warn};

use logosync_shared::{LogoReference, LogoSyncError, Result, basename};
use logosync_store::{AssetRef, SpaceClient};

/// Filename used for inline SVG logos.
const INLINE_SVG_FILENAME: &str = "logo.svg";

/// Filename the asset is registered under.
pub fn upload_filename(logo: &LogoReference) -> Option<String> {
    match logo {
        LogoReference::RemoteUrl(url) => Some(basename(url)).filter(|name| !name.is_empty()),
        LogoReference::InlineMarkup(_) => Some(INLINE_SVG_FILENAME.to_string()),
        LogoReference::Absent => None,
    }
}

/// The file to upload and its content type, if known.
struct Payload {
    bytes: Vec<u8>,
    mime: Option<String>,
}

/// Whether a content type can be attached to a multipart part.
fn is_valid_mime(value: &str) -> bool {
    let valid = Part::text("").mime_str(value).is_ok();
    if !valid {
        warn!(content_type = value, "malformed content type, uploading without one");
    }
    valid
}

/// Uploads logos as content-store assets.
#[derive(Clone)]
pub struct AssetUploader {
    client: Client,
    space: SpaceClient,
}

impl AssetUploader {
    /// `client` fetches remote logos and posts to signed URLs.
    pub fn new(client: Client, space: SpaceClient) -> Self {
        Self { client, space }
    }

    /// Upload `logo` and return the asset metadata to attach to the entry.
    #[instrument(skip(self, logo), fields(website = %website_name))]
    pub async fn upload(&self, website_name: &str, logo: &LogoReference) -> Result<AssetRef> {
        let filename = upload_filename(logo)
            .ok_or_else(|| LogoSyncError::Upload("logo has no usable filename".into()))?;
        let payload = self.payload(logo).await?;

        let ticket = self.space.request_upload(&filename).await?;
        debug!(asset_id = ticket.id, %filename, "upload ticket issued");

        let mut form = Form::new();
        for (key, value) in &ticket.fields {
            form = form.text(key.clone(), value.clone());
        }
        let mut part = Part::bytes(payload.bytes).file_name(filename);
        if let Some(mime) = payload.mime.as_deref().filter(|m| is_valid_mime(m)) {
            part = part
                .mime_str(mime)
                .map_err(|e| LogoSyncError::Upload(format!("content type {mime}: {e}")))?;
        }
        form = form.part("file", part);

        let response = self
            .client
            .post(&ticket.post_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| LogoSyncError::Upload(format!("signed upload: {e}")))?;

        if !response.status().is_success() {
            return Err(LogoSyncError::Upload(format!(
                "signed upload returned HTTP {}",
                response.status()
            )));
        }

        Ok(AssetRef::uploaded(&ticket, format!("{website_name} Logo")))
    }

    async fn payload(&self, logo: &LogoReference) -> Result<Payload> {
        match logo {
            LogoReference::InlineMarkup(markup) => Ok(Payload {
                bytes: markup.clone().into_bytes(),
                mime: Some("image/svg+xml".into()),
            }),
            LogoReference::RemoteUrl(url) => {
                let response = self
                    .client
                    .get(url)
                    .send()
                    .await
                    .and_then(|r| r.error_for_status())
                    .map_err(|e| LogoSyncError::Upload(format!("fetch {url}: {e}")))?;
                let mime = response
                    .headers()
                    .get(reqwest::header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| LogoSyncError::Upload(format!("read {url}: {e}")))?;
                Ok(Payload {
                    bytes: bytes.to_vec(),
                    mime,
                })
            }
            LogoReference::Absent => Err(LogoSyncError::Upload("no logo to upload".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use logosync_shared::StoreConfig;
    use logosync_store::StoreClient;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn filenames() {
        assert_eq!(
            upload_filename(&LogoReference::RemoteUrl("https://x.com/img/logo.png?v=3".into())),
            Some("logo.png".into())
        );
        assert_eq!(
            upload_filename(&LogoReference::InlineMarkup("<svg></svg>".into())),
            Some("logo.svg".into())
        );
        assert_eq!(upload_filename(&LogoReference::RemoteUrl("https://x.com/".into())), None);
        assert_eq!(upload_filename(&LogoReference::Absent), None);
    }

    fn uploader_for(server: &MockServer) -> AssetUploader {
        let config = StoreConfig {
            management_api_url: format!("{}/v1", server.uri()),
            delivery_api_url: format!("{}/v2", server.uri()),
            rate_limit_per_sec: 50,
            ..StoreConfig::default()
        };
        let store = StoreClient::new(&config, "oauth", Duration::from_secs(5)).unwrap();
        AssetUploader::new(Client::new(), SpaceClient::new(Arc::new(store), 7))
    }

    async fn mount_ticket(server: &MockServer, filename: &str) {
        Mock::given(method("POST"))
            .and(path("/v1/spaces/7/assets"))
            .and(body_string_contains(filename))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 501,
                "pretty_url": format!("//assets.test/f/7/{filename}"),
                "post_url": format!("{}/signed", server.uri()),
                "fields": {"key": format!("f/7/{filename}"), "policy": "p0l1cy"}
            })))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn remote_logo_is_fetched_and_posted_with_ticket_fields() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/brand/acme.png"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/png")
                    .set_body_bytes(b"PNGDATA".to_vec()),
            )
            .mount(&server)
            .await;
        mount_ticket(&server, "acme.png").await;
        Mock::given(method("POST"))
            .and(path("/signed"))
            .and(body_string_contains("p0l1cy"))
            .and(body_string_contains("PNGDATA"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let logo = LogoReference::RemoteUrl(format!("{}/brand/acme.png?v=2", server.uri()));
        let asset = uploader_for(&server).upload("Acme", &logo).await.unwrap();

        assert_eq!(asset.id, Some(501));
        assert_eq!(asset.alt.as_deref(), Some("Acme Logo"));
        assert_eq!(asset.filename.as_deref(), Some("//assets.test/f/7/acme.png"));
        assert_eq!(asset.fieldtype, "asset");
    }

    #[tokio::test]
    async fn inline_svg_is_uploaded_as_logo_svg() {
        let server = MockServer::start().await;
        mount_ticket(&server, "logo.svg").await;
        Mock::given(method("POST"))
            .and(path("/signed"))
            .and(body_string_contains("<svg"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let logo = LogoReference::InlineMarkup(r#"<svg viewBox="0 0 1 1"></svg>"#.into());
        let asset = uploader_for(&server).upload("Acme", &logo).await.unwrap();
        assert_eq!(asset.filename.as_deref(), Some("//assets.test/f/7/logo.svg"));
    }

    #[tokio::test]
    async fn rejected_signed_post_is_an_upload_error() {
        let server = MockServer::start().await;
        mount_ticket(&server, "logo.svg").await;
        Mock::given(method("POST"))
            .and(path("/signed"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let err = uploader_for(&server)
            .upload("Acme", &LogoReference::InlineMarkup("<svg></svg>".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, LogoSyncError::Upload(_)));
    }

    #[tokio::test]
    async fn malformed_content_type_is_dropped_not_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/brand/acme.png"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image")
                    .set_body_bytes(b"PNGDATA".to_vec()),
            )
            .mount(&server)
            .await;
        mount_ticket(&server, "acme.png").await;
        Mock::given(method("POST"))
            .and(path("/signed"))
            .and(body_string_contains("PNGDATA"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let logo = LogoReference::RemoteUrl(format!("{}/brand/acme.png", server.uri()));
        let asset = uploader_for(&server).upload("Acme", &logo).await.unwrap();
        assert_eq!(asset.id, Some(501));
    }

    #[test]
    fn mime_validation() {
        assert!(is_valid_mime("image/png"));
        assert!(is_valid_mime("image/svg+xml; charset=utf-8"));
        assert!(!is_valid_mime("image"));
        assert!(!is_valid_mime(""));
    }

    #[tokio::test]
    async fn unreachable_logo_fails_before_requesting_ticket() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/spaces/7/assets"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let logo = LogoReference::RemoteUrl(format!("{}/gone.png", server.uri()));
        let err = uploader_for(&server).upload("Acme", &logo).await.unwrap_err();
        assert!(matches!(err, LogoSyncError::Upload(_)));
    }
}
