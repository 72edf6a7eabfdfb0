// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::time::Duration;

use crate::modules::error::{code::ErrorCode, MailbotResult};
use crate::modules::gateway::auth::AccessTokenProvider;
use crate::modules::gateway::model::{AttachmentBody, FullMessage, MessageList};
use crate::modules::gateway::{HttpClient, MailSource, MessageRef};
use crate::modules::utils::decode_base64url;
use crate::{raise_error, utc_now};

const API_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";
const PAGE_SIZE: u32 = 100;

/// Gmail REST client; the access token is supplied by the injected provider
/// on every call, so token rotation never invalidates a gateway instance.
pub struct GmailGateway<P: AccessTokenProvider> {
    provider: P,
    label: String,
}

impl<P: AccessTokenProvider> GmailGateway<P> {
    pub fn new(provider: P, label: String) -> Self {
        Self { provider, label }
    }

    async fn list_page(
        &self,
        query: &str,
        after_epoch_secs: i64,
        page_token: Option<&str>,
    ) -> MailbotResult<MessageList> {
        let mut q = format!("after:{}", after_epoch_secs);
        if !query.is_empty() {
            q.push(' ');
            q.push_str(query);
        }
        let mut url = format!(
            "{}/messages?labelIds={}&maxResults={}&q={}",
            API_BASE,
            urlencoding::encode(&self.label),
            PAGE_SIZE,
            urlencoding::encode(&q)
        );
        if let Some(page_token) = page_token {
            url.push_str(&format!("&pageToken={}", page_token));
        }

        let client = HttpClient::new()?;
        let access_token = self.provider.bearer_token().await?;
        let value = client.get(url.as_str(), &access_token).await?;
        let list = serde_json::from_value::<MessageList>(value).map_err(|e| {
            raise_error!(
                format!(
                    "Failed to deserialize mail API response into MessageList: {:#?}. Possible model mismatch or API change.",
                    e
                ),
                ErrorCode::MailApiCallFailed
            )
        })?;
        Ok(list)
    }
}

impl<P: AccessTokenProvider> MailSource for GmailGateway<P> {
    async fn list_since(&self, query: &str, lookback: Duration) -> MailbotResult<Vec<MessageRef>> {
        let after_epoch_secs = (utc_now!() / 1000) - lookback.as_secs() as i64;
        let mut refs = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let list = self
                .list_page(query, after_epoch_secs, page_token.as_deref())
                .await?;
            if let Some(messages) = list.messages {
                refs.extend(messages.into_iter().map(|m| MessageRef { id: m.id }));
            }
            match list.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        Ok(refs)
    }

    async fn fetch_full(&self, id: &str) -> MailbotResult<FullMessage> {
        let url = format!("{}/messages/{}?format=full", API_BASE, id);
        let client = HttpClient::new()?;
        let access_token = self.provider.bearer_token().await?;
        let value = client.get(url.as_str(), &access_token).await?;
        let message = serde_json::from_value::<FullMessage>(value).map_err(|e| {
            raise_error!(
                format!(
                    "Failed to deserialize mail API response into FullMessage: {:#?}. Possible model mismatch or API change.",
                    e
                ),
                ErrorCode::MailApiCallFailed
            )
        })?;
        Ok(message)
    }

    async fn fetch_attachment(
        &self,
        message_id: &str,
        attachment_id: &str,
    ) -> MailbotResult<Vec<u8>> {
        let url = format!(
            "{}/messages/{}/attachments/{}",
            API_BASE, message_id, attachment_id
        );
        let client = HttpClient::new()?;
        let access_token = self.provider.bearer_token().await?;
        let value = client.get(url.as_str(), &access_token).await?;
        let body = serde_json::from_value::<AttachmentBody>(value).map_err(|e| {
            raise_error!(
                format!(
                    "Failed to deserialize mail API response into AttachmentBody: {:#?}. Possible model mismatch or API change.",
                    e
                ),
                ErrorCode::MailApiCallFailed
            )
        })?;
        decode_base64url(&body.data).map_err(|e| {
            raise_error!(
                format!("Failed to decode attachment bytes: {}", e),
                ErrorCode::MalformedMessage
            )
        })
    }
}
