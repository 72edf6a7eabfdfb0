// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::modules::common::lru::TimedLruCache;
use crate::modules::database::{async_find_impl, manager::DB_MANAGER, update_impl, upsert_impl};
use crate::modules::error::{code::ErrorCode, MailbotResult};
use crate::modules::gateway::HttpClient;
use crate::modules::settings::cli::SETTINGS;
use crate::modules::utils::hash;
use crate::{raise_error, utc_now};
use native_db::*;
use native_model::{native_model, Model};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Google access tokens live for an hour; refresh a little earlier.
const TOKEN_CACHE_TTL: Duration = Duration::from_secs(50 * 60);

/// Supplies a valid bearer token for the mail source. A refresh failure here
/// is fatal to the whole run: nothing can be listed without authentication.
pub trait AccessTokenProvider: Send + Sync {
    fn bearer_token(&self) -> impl Future<Output = MailbotResult<String>> + Send;
}

/// Persisted OAuth2 access/refresh token pair for the mail source account.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[native_model(id = 4, version = 1)]
#[native_db]
pub struct AccessTokenEntry {
    /// Hash of the OAuth2 client id this token pair belongs to.
    #[primary_key]
    pub id: u64,
    pub client_id: String,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    /// The timestamp when the token record was created, in milliseconds since the Unix epoch.
    pub created_at: i64,
    /// The timestamp when the token record was last updated, in milliseconds since the Unix epoch.
    pub updated_at: i64,
}

impl AccessTokenEntry {
    pub fn create(client_id: String, access_token: String, refresh_token: String) -> Self {
        Self {
            id: hash(&client_id),
            client_id,
            access_token: Some(access_token),
            refresh_token: Some(refresh_token),
            created_at: utc_now!(),
            updated_at: utc_now!(),
        }
    }

    // This function may be called multiple times for one client, so we use upsert.
    pub async fn save_or_update(&self) -> MailbotResult<()> {
        upsert_impl(DB_MANAGER.meta_db(), self.clone()).await
    }

    pub async fn get(client_id: &str) -> MailbotResult<Option<AccessTokenEntry>> {
        async_find_impl::<AccessTokenEntry>(DB_MANAGER.meta_db(), hash(client_id)).await
    }

    pub async fn set_access_token(client_id: &str, access_token: String) -> MailbotResult<()> {
        let id = hash(client_id);
        update_impl(
            DB_MANAGER.meta_db(),
            move |rw| {
                rw.get()
                    .primary::<AccessTokenEntry>(id)
                    .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?
                    .ok_or_else(|| {
                        raise_error!(
                            format!("The access token entry with id={id} that you want to modify was not found."),
                            ErrorCode::ResourceNotFound
                        )
                    })
            },
            move |current| {
                let mut updated = current.clone();
                updated.access_token = Some(access_token);
                updated.updated_at = utc_now!();
                Ok(updated)
            },
        )
        .await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Refreshes the mail source bearer token through the OAuth2 token endpoint,
/// caching fresh tokens for most of their lifetime. No ambient global state:
/// the cache is owned by the provider and injected at construction.
pub struct OAuthTokenProvider {
    client_id: String,
    client_secret: String,
    token_endpoint: String,
    cache: Arc<TimedLruCache<u64, String>>,
}

impl OAuthTokenProvider {
    pub fn from_settings() -> MailbotResult<Self> {
        let client_id = SETTINGS.mailbot_oauth_client_id.clone().ok_or_else(|| {
            raise_error!(
                "'mailbot_oauth_client_id' is not configured.".into(),
                ErrorCode::MissingConfiguration
            )
        })?;
        let client_secret = SETTINGS.mailbot_oauth_client_secret.clone().ok_or_else(|| {
            raise_error!(
                "'mailbot_oauth_client_secret' is not configured.".into(),
                ErrorCode::MissingConfiguration
            )
        })?;
        Ok(Self::new(
            client_id,
            client_secret,
            SETTINGS.mailbot_oauth_token_endpoint.clone(),
            Arc::new(TimedLruCache::new(4, TOKEN_CACHE_TTL)),
        ))
    }

    pub fn new(
        client_id: String,
        client_secret: String,
        token_endpoint: String,
        cache: Arc<TimedLruCache<u64, String>>,
    ) -> Self {
        Self {
            client_id,
            client_secret,
            token_endpoint,
            cache,
        }
    }

    async fn refresh(&self) -> MailbotResult<String> {
        let entry = AccessTokenEntry::get(&self.client_id).await?.ok_or_else(|| {
            raise_error!(
                format!(
                    "No stored credential for client '{}'; complete the OAuth2 authorization first.",
                    self.client_id
                ),
                ErrorCode::MissingCredential
            )
        })?;
        let refresh_token = entry.refresh_token.ok_or_else(|| {
            raise_error!(
                format!("The stored credential for client '{}' has no refresh token.", self.client_id),
                ErrorCode::MissingCredential
            )
        })?;

        let client = HttpClient::new()?;
        let value = client
            .post_form(
                &self.token_endpoint,
                &[
                    ("client_id", self.client_id.as_str()),
                    ("client_secret", self.client_secret.as_str()),
                    ("refresh_token", refresh_token.as_str()),
                    ("grant_type", "refresh_token"),
                ],
            )
            .await
            .map_err(|e| {
                raise_error!(
                    format!("Access token refresh failed: {e}"),
                    ErrorCode::CredentialRefreshFailed
                )
            })?;
        let response = serde_json::from_value::<TokenResponse>(value).map_err(|e| {
            raise_error!(
                format!("Token endpoint returned an unexpected payload: {:#?}", e),
                ErrorCode::CredentialRefreshFailed
            )
        })?;

        AccessTokenEntry::set_access_token(&self.client_id, response.access_token.clone()).await?;
        info!("Refreshed mail source access token for client '{}'", self.client_id);
        Ok(response.access_token)
    }
}

impl AccessTokenProvider for OAuthTokenProvider {
    async fn bearer_token(&self) -> MailbotResult<String> {
        let key = hash(&self.client_id);
        if let Some(token) = self.cache.get(&key).await {
            return Ok(token.as_ref().clone());
        }
        let token = self.refresh().await?;
        self.cache.set(key, Arc::new(token.clone())).await;
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn token_entry_roundtrip() {
        let entry = AccessTokenEntry::create(
            "client-auth-test".into(),
            "access_token".into(),
            "refresh_token".into(),
        );
        entry.save_or_update().await.unwrap();

        let loaded = AccessTokenEntry::get("client-auth-test").await.unwrap().unwrap();
        assert_eq!(loaded.access_token, Some("access_token".into()));
        assert_eq!(loaded.refresh_token, Some("refresh_token".into()));

        AccessTokenEntry::set_access_token("client-auth-test", "rotated".into())
            .await
            .unwrap();
        let loaded = AccessTokenEntry::get("client-auth-test").await.unwrap().unwrap();
        assert_eq!(loaded.access_token, Some("rotated".into()));
        assert_eq!(loaded.refresh_token, Some("refresh_token".into()));
    }

    #[tokio::test]
    async fn cached_token_short_circuits_the_refresh() {
        let cache = Arc::new(TimedLruCache::new(4, TOKEN_CACHE_TTL));
        cache
            .set(hash("client-cached"), Arc::new("cached-token".to_string()))
            .await;
        // no AccessTokenEntry stored and no reachable token endpoint: a cache
        // miss would fail, so success proves the cache was consulted first
        let provider = OAuthTokenProvider::new(
            "client-cached".into(),
            "secret".into(),
            "http://127.0.0.1:1/token".into(),
            cache,
        );
        assert_eq!(provider.bearer_token().await.unwrap(), "cached-token");
    }

    #[tokio::test]
    async fn missing_stored_credential_fails_the_refresh() {
        let provider = OAuthTokenProvider::new(
            "client-unknown".into(),
            "secret".into(),
            "http://127.0.0.1:1/token".into(),
            Arc::new(TimedLruCache::new(4, TOKEN_CACHE_TTL)),
        );
        let err = provider.bearer_token().await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::MissingCredential);
    }
}
