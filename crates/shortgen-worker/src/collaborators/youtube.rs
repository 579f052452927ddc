//! YouTube Data API v3 uploads.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::{UploadReceipt, UploadRequest, Uploader};
use crate::config::YoutubeConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::retry::{retry_async, RetryConfig};

const UPLOAD_PATH: &str = "/upload/youtube/v3/videos";
const BOUNDARY: &str = "shortgen-upload-boundary";
/// "People & Blogs"
const CATEGORY_ID: &str = "22";

#[derive(Debug, Deserialize)]
struct VideoResource {
    id: String,
    #[serde(default)]
    status: Option<VideoStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoStatus {
    upload_status: Option<String>,
}

/// Uploads clips with a single multipart/related request per clip.
pub struct YoutubeUploader {
    client: Client,
    access_token: String,
    api_base: String,
    retry: RetryConfig,
}

impl YoutubeUploader {
    pub fn new(config: &YoutubeConfig) -> WorkerResult<Self> {
        let access_token = config
            .access_token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| WorkerError::config_error("YOUTUBE_ACCESS_TOKEN is not set"))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(600))
            .build()?;

        Ok(Self {
            client,
            access_token,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            retry: RetryConfig::new("youtube_upload"),
        })
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn metadata(request: &UploadRequest) -> serde_json::Value {
        json!({
            "snippet": {
                "title": request.title,
                "description": request.description,
                "tags": request.tags,
                "categoryId": CATEGORY_ID,
            },
            "status": {
                "privacyStatus": request.privacy,
                "selfDeclaredMadeForKids": false,
            }
        })
    }

    fn multipart_body(metadata: &serde_json::Value, video: &[u8]) -> Vec<u8> {
        let mut body = Vec::with_capacity(video.len() + 1024);
        body.extend_from_slice(
            format!(
                "--{b}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{m}\r\n--{b}\r\nContent-Type: video/mp4\r\n\r\n",
                b = BOUNDARY,
                m = metadata
            )
            .as_bytes(),
        );
        body.extend_from_slice(video);
        body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    async fn send(&self, body: Vec<u8>) -> WorkerResult<UploadReceipt> {
        let response = self
            .client
            .post(format!("{}{}", self.api_base, UPLOAD_PATH))
            .query(&[("uploadType", "multipart"), ("part", "snippet,status")])
            .header(AUTHORIZATION, format!("Bearer {}", self.access_token))
            .header(
                CONTENT_TYPE,
                format!("multipart/related; boundary={}", BOUNDARY),
            )
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = format!("{}: {}", status, text.trim());
            return Err(if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                WorkerError::upload_failed(message)
            } else {
                WorkerError::upload_rejected(message)
            });
        }

        let video: VideoResource = response.json().await?;
        Ok(UploadReceipt {
            remote_id: video.id,
            status: video
                .status
                .and_then(|s| s.upload_status)
                .unwrap_or_else(|| "uploaded".to_string()),
        })
    }
}

#[async_trait]
impl Uploader for YoutubeUploader {
    async fn upload(&self, clip: &Path, request: &UploadRequest) -> WorkerResult<UploadReceipt> {
        let video = tokio::fs::read(clip).await?;
        let body = Self::multipart_body(&Self::metadata(request), &video);

        let receipt = retry_async(&self.retry, || self.send(body.clone())).await?;
        info!(
            "Uploaded {} as {} ({})",
            clip.display(),
            receipt.remote_id,
            receipt.status
        );
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn uploader(server: &MockServer) -> YoutubeUploader {
        let config = YoutubeConfig {
            access_token: Some("test-token".into()),
            privacy: "unlisted".into(),
            api_base: server.uri(),
        };
        YoutubeUploader::new(&config)
            .unwrap()
            .with_retry(
                RetryConfig::new("test_upload")
                    .with_base_delay(Duration::from_millis(1))
                    .with_max_retries(2),
            )
    }

    fn clip() -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"fake mp4 bytes").unwrap();
        file
    }

    #[test]
    fn test_requires_token() {
        assert!(YoutubeUploader::new(&YoutubeConfig::default()).is_err());
    }

    #[test]
    fn test_multipart_body_layout() {
        let req = UploadRequest::for_highlight(1, "talk.mp4", "private");
        let body = YoutubeUploader::multipart_body(&YoutubeUploader::metadata(&req), b"VIDEO");
        let text = String::from_utf8(body).unwrap();
        assert!(text.starts_with("--shortgen-upload-boundary\r\n"));
        assert!(text.contains("\"title\":\"Highlight 2 - talk.mp4\""));
        assert!(text.contains("\"privacyStatus\":\"private\""));
        assert!(text.contains("Content-Type: video/mp4\r\n\r\nVIDEO\r\n"));
        assert!(text.ends_with("--shortgen-upload-boundary--\r\n"));
    }

    #[tokio::test]
    async fn test_upload_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(UPLOAD_PATH))
            .and(query_param("uploadType", "multipart"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "abc123",
                "status": {"uploadStatus": "uploaded"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let file = clip();
        let receipt = uploader(&server)
            .upload(file.path(), &UploadRequest::for_highlight(0, "talk.mp4", "unlisted"))
            .await
            .unwrap();
        assert_eq!(receipt.remote_id, "abc123");
        assert_eq!(receipt.status, "uploaded");
    }

    #[tokio::test]
    async fn test_upload_retries_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(UPLOAD_PATH))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(UPLOAD_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "retried"})))
            .mount(&server)
            .await;

        let file = clip();
        let receipt = uploader(&server)
            .upload(file.path(), &UploadRequest::for_highlight(0, "talk.mp4", "unlisted"))
            .await
            .unwrap();
        assert_eq!(receipt.remote_id, "retried");
        assert_eq!(receipt.status, "uploaded");
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(UPLOAD_PATH))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid credentials"))
            .expect(1)
            .mount(&server)
            .await;

        let file = clip();
        let err = uploader(&server)
            .upload(file.path(), &UploadRequest::for_highlight(0, "talk.mp4", "unlisted"))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::UploadRejected(_)));
    }
}
