// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::error::{code::ErrorCode, MailbotResult};
use crate::modules::gateway::HttpClient;
use crate::modules::settings::cli::SETTINGS;
use crate::modules::store::object::ObjectStore;
use crate::raise_error;

/// Object store client speaking plain HTTP PUT against a bucket endpoint.
/// Re-uploading an existing path overwrites it, which is exactly what the
/// idempotent archiver retry loop relies on.
pub struct HttpObjectStore {
    endpoint: String,
    bucket: String,
    token: String,
}

impl HttpObjectStore {
    pub fn from_settings() -> MailbotResult<Self> {
        let endpoint = SETTINGS.mailbot_object_store_endpoint.clone().ok_or_else(|| {
            raise_error!(
                "'mailbot_object_store_endpoint' is not configured.".into(),
                ErrorCode::MissingConfiguration
            )
        })?;
        let token = SETTINGS.mailbot_object_store_token.clone().ok_or_else(|| {
            raise_error!(
                "'mailbot_object_store_token' is not configured.".into(),
                ErrorCode::MissingConfiguration
            )
        })?;
        Ok(Self {
            endpoint,
            bucket: SETTINGS.mailbot_object_store_bucket.clone(),
            token,
        })
    }

    fn object_url(&self, path: &str) -> String {
        let encoded: Vec<String> = path
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!(
            "{}/{}/{}",
            self.endpoint.trim_end_matches('/'),
            self.bucket,
            encoded.join("/")
        )
    }
}

impl ObjectStore for HttpObjectStore {
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> MailbotResult<String> {
        let url = self.object_url(path);
        let client = HttpClient::new()?;
        client
            .put_bytes(&url, &self.token, bytes, content_type)
            .await
            .map_err(|e| {
                raise_error!(
                    format!("Upload to '{path}' failed: {e}"),
                    ErrorCode::ObjectUploadFailed
                )
            })?;
        Ok(path.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_url_encodes_each_segment() {
        let store = HttpObjectStore {
            endpoint: "https://objects.internal.example/".into(),
            bucket: "mail-attachments".into(),
            token: "t".into(),
        };
        let url = store.object_url("견적요청/2025-08-12/단가표 v2.xlsx");
        assert_eq!(
            url,
            "https://objects.internal.example/mail-attachments/%EA%B2%AC%EC%A0%81%EC%9A%94%EC%B2%AD/2025-08-12/%EB%8B%A8%EA%B0%80%ED%91%9C%20v2.xlsx"
        );
    }
}
