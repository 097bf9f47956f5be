//! Hosted media: church logos and donation QR codes.
//!
//! Images live in an external hosted image service under two folders,
//! `churchdonate/churchlogo` and `churchdonate/qrcodes`. QR bitmaps are
//! rendered by an external renderer and re-uploaded so the stored URL is
//! stable. Supported providers:
//! - `console`: Logs uploads and fabricates stable URLs (development)
//! - `http`: Talks to the configured upload/delete endpoints

use crate::config::MediaConfig;
use base64::Engine;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

const LOGO_FOLDER: &str = "churchdonate/churchlogo";
const QR_FOLDER: &str = "churchdonate/qrcodes";

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Media service not configured")]
    NotConfigured,

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("QR rendering failed: {0}")]
    RenderFailed(String),
}

#[derive(Clone)]
pub struct MediaService {
    config: Arc<MediaConfig>,
    client: reqwest::Client,
}

impl MediaService {
    pub fn new(config: MediaConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            config: Arc::new(config),
            client,
        }
    }

    /// The public donation page URL a church's QR code points at.
    pub fn qr_target_url(&self, public_id: &str) -> String {
        format!(
            "{}/church/{}?source=qr",
            self.config.public_base_url, public_id
        )
    }

    /// Render and store the QR code for a church, returning its hosted URL.
    pub async fn generate_qr_code(&self, public_id: &str) -> Result<String, MediaError> {
        let target = self.qr_target_url(public_id);

        match self.config.provider.as_str() {
            "console" => {
                info!(public_id = %public_id, target = %target, "QR code (console provider)");
                Ok(format!("https://media.example.com/{}/{}.png", QR_FOLDER, public_id))
            }
            "http" => {
                let png = self.render_qr(&target).await?;
                self.upload(QR_FOLDER, public_id, &png, "image/png").await
            }
            provider => {
                warn!(provider = %provider, "Unknown media provider");
                Err(MediaError::NotConfigured)
            }
        }
    }

    /// Store a church logo, returning its hosted URL.
    pub async fn upload_logo(
        &self,
        public_id: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<String, MediaError> {
        match self.config.provider.as_str() {
            "console" => {
                info!(
                    public_id = %public_id,
                    size = bytes.len(),
                    content_type = %content_type,
                    "Logo upload (console provider)"
                );
                Ok(format!("https://media.example.com/{}/{}", LOGO_FOLDER, public_id))
            }
            "http" => self.upload(LOGO_FOLDER, public_id, bytes, content_type).await,
            provider => {
                warn!(provider = %provider, "Unknown media provider");
                Err(MediaError::NotConfigured)
            }
        }
    }

    /// Delete a church's QR code. Best effort, failures are logged only.
    pub async fn delete_qr_code(&self, public_id: &str) {
        self.delete(QR_FOLDER, public_id).await;
    }

    /// Delete a church's logo. Best effort, failures are logged only.
    pub async fn delete_logo(&self, public_id: &str) {
        self.delete(LOGO_FOLDER, public_id).await;
    }

    async fn render_qr(&self, target: &str) -> Result<Vec<u8>, MediaError> {
        let response = self
            .client
            .get(&self.config.qr_render_url)
            .query(&[("data", target), ("size", "512x512"), ("format", "png")])
            .send()
            .await
            .map_err(|e| MediaError::RenderFailed(format!("renderer request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(MediaError::RenderFailed(format!(
                "renderer returned {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| MediaError::RenderFailed(format!("renderer body read failed: {}", e)))?;

        Ok(bytes.to_vec())
    }

    async fn upload(
        &self,
        folder: &str,
        public_id: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<String, MediaError> {
        if self.config.upload_url.is_empty() {
            return Err(MediaError::NotConfigured);
        }

        let data_url = format!(
            "data:{};base64,{}",
            content_type,
            base64::engine::general_purpose::STANDARD.encode(bytes)
        );

        let body = serde_json::json!({
            "file": data_url,
            "folder": folder,
            "public_id": public_id,
            "overwrite": true,
        });

        let response = self
            .client
            .post(&self.config.upload_url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| MediaError::UploadFailed(format!("upload request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            return Err(MediaError::UploadFailed(format!(
                "upload endpoint returned {}: {}",
                status, error_body
            )));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| MediaError::UploadFailed(format!("upload response parse failed: {}", e)))?;

        payload["secure_url"]
            .as_str()
            .or_else(|| payload["url"].as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| MediaError::UploadFailed("upload response carried no URL".into()))
    }

    async fn delete(&self, folder: &str, public_id: &str) {
        match self.config.provider.as_str() {
            "console" => {
                info!(folder = %folder, public_id = %public_id, "Media delete (console provider)");
            }
            "http" => {
                if self.config.delete_url.is_empty() {
                    warn!(folder = %folder, public_id = %public_id, "Delete endpoint not configured");
                    return;
                }

                let body = serde_json::json!({
                    "folder": folder,
                    "public_id": public_id,
                });

                let result = self
                    .client
                    .post(&self.config.delete_url)
                    .header("Authorization", format!("Bearer {}", self.config.api_key))
                    .json(&body)
                    .send()
                    .await;

                match result {
                    Ok(response) if response.status().is_success() => {
                        info!(folder = %folder, public_id = %public_id, "Media deleted");
                    }
                    Ok(response) => {
                        warn!(
                            folder = %folder,
                            public_id = %public_id,
                            status = %response.status(),
                            "Media delete rejected"
                        );
                    }
                    Err(e) => {
                        warn!(
                            folder = %folder,
                            public_id = %public_id,
                            error = %e,
                            "Media delete failed"
                        );
                    }
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn console_service() -> MediaService {
        MediaService::new(MediaConfig {
            provider: "console".to_string(),
            public_base_url: "https://churchdonate.app".to_string(),
            ..MediaConfig::default()
        })
    }

    #[test]
    fn test_qr_target_url() {
        let svc = console_service();
        assert_eq!(
            svc.qr_target_url("ab12c-de34f-gh56i-jk78l"),
            "https://churchdonate.app/church/ab12c-de34f-gh56i-jk78l?source=qr"
        );
    }

    #[tokio::test]
    async fn test_console_qr_generation() {
        let svc = console_service();
        let url = svc
            .generate_qr_code("ab12c-de34f-gh56i-jk78l")
            .await
            .expect("console provider should succeed");
        assert!(url.contains("churchdonate/qrcodes"));
        assert!(url.contains("ab12c-de34f-gh56i-jk78l"));
    }

    #[tokio::test]
    async fn test_console_logo_upload() {
        let svc = console_service();
        let url = svc
            .upload_logo("ab12c-de34f-gh56i-jk78l", b"fake-png", "image/png")
            .await
            .expect("console provider should succeed");
        assert!(url.contains("churchdonate/churchlogo"));
    }

    #[tokio::test]
    async fn test_console_delete_is_silent() {
        let svc = console_service();
        svc.delete_logo("ab12c-de34f-gh56i-jk78l").await;
        svc.delete_qr_code("ab12c-de34f-gh56i-jk78l").await;
    }

    #[tokio::test]
    async fn test_http_upload_without_endpoint_fails() {
        let svc = MediaService::new(MediaConfig {
            provider: "http".to_string(),
            ..MediaConfig::default()
        });
        let result = svc.upload_logo("id", b"bytes", "image/png").await;
        assert!(matches!(result, Err(MediaError::NotConfigured)));
    }

    #[tokio::test]
    async fn test_unknown_provider_fails() {
        let svc = MediaService::new(MediaConfig {
            provider: "carrier-pigeon".to_string(),
            ..MediaConfig::default()
        });
        let result = svc.generate_qr_code("id").await;
        assert!(matches!(result, Err(MediaError::NotConfigured)));
    }
}
