use chrono::Utc;
use serde::Deserialize;

use crate::config::SpotifyConfig;
use crate::error::{Error, Result};
use crate::token_store::TokenSet;

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[allow(dead_code)]
    pub token_type: String,
    pub expires_in: i64,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    pub scope: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TokenErrorBody {
    error: Option<String>,
    error_description: Option<String>,
}

enum Grant {
    AuthorizationCode,
    RefreshToken,
}

/// One-shot exchange of an authorization code. Authorization codes are
/// single-use, so a failure here is terminal for the attempt and is never
/// retried with the same code.
pub async fn exchange_code_for_tokens(
    client: &reqwest::Client,
    config: &SpotifyConfig,
    code: &str,
    code_verifier: &str,
) -> Result<TokenSet> {
    let params = [
        ("grant_type", "authorization_code"),
        ("code", code),
        ("redirect_uri", config.redirect_uri.as_str()),
        ("client_id", config.client_id.as_str()),
        ("code_verifier", code_verifier),
    ];

    let response = client
        .post(&config.token_url)
        .form(&params)
        .send()
        .await?;

    read_token_response(response, Grant::AuthorizationCode).await
}

/// One-shot refresh. A 4xx answer means the refresh token is dead and the
/// session must be torn down; transport failures are transient and leave the
/// session alone. Retry policy belongs to the gateway.
pub async fn refresh_access_token(
    client: &reqwest::Client,
    config: &SpotifyConfig,
    refresh_token: &str,
) -> Result<TokenSet> {
    let params = [
        ("grant_type", "refresh_token"),
        ("refresh_token", refresh_token),
        ("client_id", config.client_id.as_str()),
    ];

    let response = client
        .post(&config.token_url)
        .form(&params)
        .send()
        .await?;

    read_token_response(response, Grant::RefreshToken).await
}

async fn read_token_response(response: reqwest::Response, grant: Grant) -> Result<TokenSet> {
    let status = response.status();
    // Expiry is anchored to the moment the response arrived, not to when a
    // caller later inspects the set.
    let received_at = Utc::now().timestamp();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let parsed: TokenErrorBody = serde_json::from_str(&body).unwrap_or_default();
        return Err(match grant {
            Grant::AuthorizationCode => Error::TokenExchange {
                status: status.as_u16(),
                code: parsed.error,
                description: parsed.error_description,
            },
            // 5xx from the token endpoint is a transient outage, not a
            // revoked refresh token.
            Grant::RefreshToken if status.is_server_error() => Error::Api {
                status: status.as_u16(),
                body,
            },
            Grant::RefreshToken => Error::RefreshRejected {
                status: status.as_u16(),
                code: parsed.error,
                description: parsed.error_description,
            },
        });
    }

    let body = response.text().await?;
    let token_response: TokenResponse = serde_json::from_str(&body)?;

    Ok(TokenSet {
        access_token: token_response.access_token,
        refresh_token: token_response.refresh_token,
        expires_at: received_at + token_response.expires_in,
    })
}
