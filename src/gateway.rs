use std::sync::Arc;

use chrono::Utc;
use reqwest::{Method, StatusCode};
use serde_json::Value;

use crate::auth::token_client;
use crate::config::SpotifyConfig;
use crate::error::{Error, Result};
use crate::token_store::{TokenSet, TokenStore};

/// Authenticated request gateway. Attaches the bearer token, detects 401s,
/// drives a single-flight refresh, and retries each call at most once.
/// Downstream consumers use only `authorized_request` and `logout`.
pub struct Gateway {
    http: reqwest::Client,
    config: SpotifyConfig,
    store: Arc<TokenStore>,
}

enum SendOutcome {
    Success(Value),
    AuthRejected,
}

impl Gateway {
    pub fn new(config: SpotifyConfig, store: Arc<TokenStore>) -> Result<Self> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(Error::Network)?;
        Ok(Self {
            http,
            config,
            store,
        })
    }

    /// Shared HTTP client, also used by the login flow for the token
    /// exchange so the bounded timeout applies there too.
    pub fn http_client(&self) -> reqwest::Client {
        self.http.clone()
    }

    pub fn config(&self) -> &SpotifyConfig {
        &self.config
    }

    pub async fn authorized_request(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<Value> {
        let token = match self.store.get().await {
            Some(set) if TokenStore::is_valid(&set, Utc::now().timestamp()) => set,
            // expired by the margin: refresh before the first send
            Some(set) => self.refresh_stale(&set.access_token).await?,
            None => return Err(Error::Authentication),
        };

        match self
            .send(method.clone(), path, params, &token.access_token)
            .await?
        {
            SendOutcome::Success(value) => Ok(value),
            SendOutcome::AuthRejected => {
                let refreshed = self.refresh_stale(&token.access_token).await?;
                match self
                    .send(method, path, params, &refreshed.access_token)
                    .await?
                {
                    SendOutcome::Success(value) => Ok(value),
                    SendOutcome::AuthRejected => {
                        // a freshly refreshed token was rejected too; one
                        // retry is the limit
                        tracing::warn!("request rejected again after refresh; clearing session");
                        self.store.clear().await?;
                        Err(Error::Authentication)
                    }
                }
            }
        }
    }

    pub async fn logout(&self) -> Result<()> {
        self.store.clear().await
    }

    /// Single-flight refresh: whoever holds the gate performs the refresh;
    /// everyone else suspends on the gate, then re-reads the store and
    /// reuses the winner's result instead of issuing another refresh.
    async fn refresh_stale(&self, stale_access_token: &str) -> Result<TokenSet> {
        let _gate = self.store.refresh_gate().lock().await;

        let current = self.store.get().await.ok_or(Error::Authentication)?;
        if current.access_token != stale_access_token
            && TokenStore::is_valid(&current, Utc::now().timestamp())
        {
            return Ok(current);
        }

        let Some(refresh_token) = current.refresh_token.clone() else {
            self.store.clear().await?;
            return Err(Error::Authentication);
        };

        match token_client::refresh_access_token(&self.http, &self.config, &refresh_token).await {
            Ok(mut set) => {
                // the server may omit a new refresh token; keep the old one
                if set.refresh_token.is_none() {
                    set.refresh_token = Some(refresh_token);
                }
                self.store.replace(set.clone()).await?;
                tracing::debug!(expires_at = set.expires_at, "access token refreshed");
                Ok(set)
            }
            Err(err @ Error::RefreshRejected { .. }) => {
                tracing::warn!("refresh token rejected, clearing session: {}", err);
                self.store.clear().await?;
                Err(err)
            }
            // transient failure: the session is kept for a later attempt
            Err(err) => Err(err),
        }
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, &str)],
        access_token: &str,
    ) -> Result<SendOutcome> {
        let url = format!("{}{}", self.config.api_base_url, path);

        let mut request = self.http.request(method, &url).bearer_auth(access_token);
        if !params.is_empty() {
            request = request.query(params);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            return Ok(SendOutcome::AuthRejected);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let value = serde_json::from_str(&body)?;
        Ok(SendOutcome::Success(value))
    }
}
