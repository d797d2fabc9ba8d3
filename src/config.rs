use std::time::Duration;

use crate::error::{Error, Result};

pub const SPOTIFY_AUTHORIZE_URL: &str = "https://accounts.spotify.com/authorize";
pub const SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const SPOTIFY_API_BASE_URL: &str = "https://api.spotify.com/v1";

pub const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:5173/callback";

// the value shipped in example .env files; never a real client id
const PLACEHOLDER_CLIENT_ID: &str = "your_spotify_client_id_here";

const REQUEST_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_SCOPES: &[&str] = &[
    "user-read-private",
    "user-read-email",
    "user-top-read",
    "user-read-recently-played",
    "playlist-read-private",
    "user-library-read",
    "user-follow-read",
];

/// Everything the auth flow and the gateway need to talk to Spotify. The
/// endpoint fields default to the real service and exist as fields so tests
/// can point them at a local server.
#[derive(Debug, Clone)]
pub struct SpotifyConfig {
    pub client_id: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub authorize_url: String,
    pub token_url: String,
    pub api_base_url: String,
    pub http_timeout: Duration,
}

impl SpotifyConfig {
    pub fn new(client_id: impl Into<String>, redirect_uri: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            redirect_uri: redirect_uri.into(),
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            authorize_url: SPOTIFY_AUTHORIZE_URL.to_string(),
            token_url: SPOTIFY_TOKEN_URL.to_string(),
            api_base_url: SPOTIFY_API_BASE_URL.to_string(),
            http_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
        }
    }

    /// Reads `SPOTIFY_CLIENT_ID` (required) and `SPOTIFY_REDIRECT_URI`
    /// (optional) from the environment.
    pub fn from_env() -> Result<Self> {
        let client_id = std::env::var("SPOTIFY_CLIENT_ID")
            .map_err(|_| Error::Configuration("SPOTIFY_CLIENT_ID is not set".to_string()))?;
        let redirect_uri = std::env::var("SPOTIFY_REDIRECT_URI")
            .unwrap_or_else(|_| DEFAULT_REDIRECT_URI.to_string());

        let config = Self::new(client_id, redirect_uri);
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.client_id.is_empty() || self.client_id == PLACEHOLDER_CLIENT_ID {
            return Err(Error::Configuration(
                "Spotify client id is missing; set SPOTIFY_CLIENT_ID".to_string(),
            ));
        }
        if self.redirect_uri.is_empty() {
            return Err(Error::Configuration(
                "redirect URI must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Port the loopback callback server should listen on, taken from the
    /// redirect URI.
    pub fn callback_port(&self) -> Option<u16> {
        url::Url::parse(&self.redirect_uri)
            .ok()
            .and_then(|u| u.port_or_known_default())
    }
}
