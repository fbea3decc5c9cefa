//! Shared HTTP plumbing for the Lark client.
//!
//! # Purpose
//! Holds the `reqwest` client, the tenant token cache, and the short-lived
//! listing caches. Endpoint groups live in sibling modules as further
//! `impl LarkClient` blocks.
//!
//! # Notes
//! `LarkClient` is cheap to clone; all clones share the token cache and the
//! listing caches.
use crate::error::{CODE_INVALID_APP_ID, CODE_INVALID_APP_SECRET, LarkError, LarkResult};
use crate::token::{IssuedToken, TokenCache};
use crate::types::{ApiStatus, Bitable, Envelope, TableInfo, TenantTokenResponse};
use dashmap::DashMap;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_BASE_URL: &str = "https://open.feishu.cn";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_LISTING_TTL: Duration = Duration::from_secs(5 * 60);
const MIN_CREDENTIAL_LEN: usize = 10;

#[derive(Debug, Clone)]
pub struct LarkConfig {
    pub app_id: String,
    pub app_secret: String,
    pub base_url: String,
    pub timeout: Duration,
    pub listing_ttl: Duration,
}

impl LarkConfig {
    pub fn new(app_id: impl Into<String>, app_secret: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            app_secret: app_secret.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            listing_ttl: DEFAULT_LISTING_TTL,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_listing_ttl(mut self, ttl: Duration) -> Self {
        self.listing_ttl = ttl;
        self
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Cached<T> {
    pub value: T,
    pub expires_at: Instant,
}

#[derive(Debug, Default)]
pub(crate) struct ListingCache {
    pub bitables: DashMap<String, Cached<Vec<Bitable>>>,
    pub tables: DashMap<String, Cached<Vec<TableInfo>>>,
    /// Wiki node token to bitable token. Node targets do not move, so no expiry.
    pub wiki: DashMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct LarkClient {
    pub(crate) http: reqwest::Client,
    pub(crate) config: Arc<LarkConfig>,
    pub(crate) tokens: TokenCache,
    pub(crate) listings: Arc<ListingCache>,
}

impl LarkClient {
    pub fn new(config: LarkConfig) -> LarkResult<Self> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            config: Arc::new(config),
            tokens: TokenCache::new(),
            listings: Arc::new(ListingCache::default()),
        })
    }

    pub fn app_id(&self) -> &str {
        &self.config.app_id
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    /// Current tenant access token, exchanging credentials when the cache is stale.
    pub async fn access_token(&self) -> LarkResult<String> {
        self.tokens
            .get_or_refresh(|| self.fetch_tenant_token())
            .await
    }

    async fn fetch_tenant_token(&self) -> LarkResult<IssuedToken> {
        let response = self
            .http
            .post(self.url("/open-apis/auth/v3/tenant_access_token/internal"))
            .json(&json!({
                "app_id": self.config.app_id,
                "app_secret": self.config.app_secret,
            }))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LarkError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let body: TenantTokenResponse = response.json().await?;
        match body.code {
            0 if !body.tenant_access_token.is_empty() => Ok(IssuedToken {
                value: body.tenant_access_token,
                expires_in: Duration::from_secs(body.expire),
            }),
            0 => Err(LarkError::Decode(
                "token response carried no tenant_access_token".to_string(),
            )),
            CODE_INVALID_APP_ID | CODE_INVALID_APP_SECRET | 10003 | 10014 => {
                Err(LarkError::InvalidCredentials(body.msg))
            }
            code => Err(LarkError::Api {
                code,
                msg: body.msg,
            }),
        }
    }

    /// Check that the configured app id and secret are accepted.
    ///
    /// # Errors
    /// - `InvalidCredentials` for malformed or rejected credentials.
    /// - Transport errors while reaching the API.
    ///
    /// Other API errors on the probe call are tolerated: the credentials are
    /// valid even when the app lacks drive permissions.
    pub async fn validate_credentials(&self) -> LarkResult<()> {
        if self.config.app_id.len() < MIN_CREDENTIAL_LEN {
            return Err(LarkError::InvalidCredentials(
                "app_id is malformed".to_string(),
            ));
        }
        if self.config.app_secret.len() < MIN_CREDENTIAL_LEN {
            return Err(LarkError::InvalidCredentials(
                "app_secret is malformed".to_string(),
            ));
        }

        self.tokens.invalidate().await;
        let token = self.access_token().await?;
        let probe = self
            .http
            .get(self.url("/open-apis/drive/v1/files"))
            .query(&[("page_size", "1")])
            .bearer_auth(token);
        match self.send::<serde_json::Value>(probe).await {
            Ok(_) => Ok(()),
            Err(err) if err.is_auth_failure() => Err(LarkError::InvalidCredentials(
                "app_id or app_secret rejected".to_string(),
            )),
            Err(err @ LarkError::Http(_)) => Err(err),
            Err(err) => {
                tracing::info!(error = %err, "credentials accepted; probe call returned an api error");
                Ok(())
            }
        }
    }

    /// Send a request and unwrap the `{code, msg, data}` envelope.
    pub(crate) async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> LarkResult<T> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // Lark reports most client errors as 4xx with a JSON code; keep the code.
            if !status.is_server_error()
                && status != StatusCode::TOO_MANY_REQUESTS
                && let Ok(api) = serde_json::from_str::<ApiStatus>(&body)
                && api.code != 0
            {
                return Err(LarkError::Api {
                    code: api.code,
                    msg: api.msg,
                });
            }
            return Err(LarkError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let envelope: Envelope<T> = response.json().await?;
        envelope.into_data()
    }

    /// Authenticated GET returning the envelope's `data`.
    pub(crate) async fn get_data<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> LarkResult<T> {
        let token = self.access_token().await?;
        let request = self.http.get(self.url(path)).query(query).bearer_auth(token);
        self.send(request).await
    }

    /// Authenticated POST of a JSON body returning the envelope's `data`.
    pub(crate) async fn post_data<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        body: &serde_json::Value,
    ) -> LarkResult<T> {
        let token = self.access_token().await?;
        let request = self
            .http
            .post(self.url(path))
            .query(query)
            .bearer_auth(token)
            .json(body);
        self.send(request).await
    }
}
