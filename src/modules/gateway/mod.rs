// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::future::Future;
use std::time::Duration;

use crate::modules::error::{code::ErrorCode, MailbotResult};
use crate::modules::gateway::model::FullMessage;
use crate::modules::settings::cli::SETTINGS;
use crate::{mailbot_version, raise_error};

pub mod auth;
pub mod gmail;
pub mod model;
pub mod object;

/// A reference returned by the listing call; carries the source-side id only.
/// The full content is fetched separately, one message at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRef {
    pub id: String,
}

/// The remote mailbox this pipeline ingests from. Listing and fetching are
/// split so a run can dedup on ids before paying for full message bodies.
pub trait MailSource: Send + Sync {
    fn list_since(
        &self,
        query: &str,
        lookback: Duration,
    ) -> impl Future<Output = MailbotResult<Vec<MessageRef>>> + Send;

    fn fetch_full(&self, id: &str) -> impl Future<Output = MailbotResult<FullMessage>> + Send;

    /// Re-fetches attachment bytes, already decoded from the transport encoding.
    fn fetch_attachment(
        &self,
        message_id: &str,
        attachment_id: &str,
    ) -> impl Future<Output = MailbotResult<Vec<u8>>> + Send;
}

pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new() -> MailbotResult<HttpClient> {
        let timeout = Duration::from_secs(SETTINGS.mailbot_http_timeout_secs);
        let client = reqwest::ClientBuilder::new()
            .user_agent(format!("mailbot/{}", mailbot_version!()))
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| {
                raise_error!(
                    format!("Failed to build HTTP client: {:#?}", e),
                    ErrorCode::InternalError
                )
            })?;
        Ok(Self { client })
    }

    pub async fn get(&self, url: &str, access_token: &str) -> MailbotResult<serde_json::Value> {
        let response = self
            .client
            .get(url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::NetworkError))?;
        Self::json_body(response).await
    }

    pub async fn post_json(
        &self,
        url: &str,
        access_token: &str,
        body: &serde_json::Value,
    ) -> MailbotResult<serde_json::Value> {
        let response = self
            .client
            .post(url)
            .bearer_auth(access_token)
            .json(body)
            .send()
            .await
            .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::NetworkError))?;
        Self::json_body(response).await
    }

    pub async fn post_form(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> MailbotResult<serde_json::Value> {
        let response = self
            .client
            .post(url)
            .form(params)
            .send()
            .await
            .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::NetworkError))?;
        Self::json_body(response).await
    }

    pub async fn put_bytes(
        &self,
        url: &str,
        access_token: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> MailbotResult<()> {
        let response = self
            .client
            .put(url)
            .bearer_auth(access_token)
            .header("Content-Type", content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::NetworkError))?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(raise_error!(
                format!("HTTP request failed with status {}: {}", status, text),
                ErrorCode::HttpResponseError
            ));
        }
        Ok(())
    }

    async fn json_body(response: reqwest::Response) -> MailbotResult<serde_json::Value> {
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(raise_error!(
                format!("HTTP request failed with status {}: {}", status, text),
                ErrorCode::HttpResponseError
            ));
        }
        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::HttpResponseError))
    }
}
