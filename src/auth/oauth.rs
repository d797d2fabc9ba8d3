use std::sync::Mutex;

use chrono::Utc;
use subtle::ConstantTimeEq;

use super::pkce::{generate_pkce_pair, generate_state};
use crate::config::SpotifyConfig;
use crate::error::{Error, Result};

/// An in-flight authorization attempt. The verifier and state are held only
/// until the callback is verified or the attempt is abandoned.
pub struct AuthState {
    pub code_verifier: String,
    pub state: String,
    pub created_at: i64,
}

pub fn generate_auth_url(config: &SpotifyConfig) -> Result<(String, AuthState)> {
    config.validate()?;

    let pkce = generate_pkce_pair();
    let state = generate_state();

    let scope_string = config.scopes.join(" ");

    let url = format!(
        "{}?response_type=code&client_id={}&redirect_uri={}&scope={}&code_challenge_method=S256&code_challenge={}&state={}",
        config.authorize_url,
        urlencoding::encode(&config.client_id),
        urlencoding::encode(&config.redirect_uri),
        urlencoding::encode(&scope_string),
        urlencoding::encode(&pkce.code_challenge),
        urlencoding::encode(&state)
    );

    Ok((
        url,
        AuthState {
            code_verifier: pkce.code_verifier,
            state,
            created_at: Utc::now().timestamp(),
        },
    ))
}

fn states_match(received: &str, expected: &str) -> bool {
    received.as_bytes().ct_eq(expected.as_bytes()).into()
}

/// Holds the single pending authorization attempt for this session.
/// Starting a new attempt overwrites the previous one, so a stale callback
/// carrying an older state is rejected.
pub struct Authenticator {
    config: SpotifyConfig,
    pending: Mutex<Option<AuthState>>,
}

impl Authenticator {
    pub fn new(config: SpotifyConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            pending: Mutex::new(None),
        })
    }

    /// Builds the authorization URL and records the attempt.
    pub fn begin(&self) -> Result<String> {
        let (url, attempt) = generate_auth_url(&self.config)?;
        *self.lock_pending()? = Some(attempt);
        Ok(url)
    }

    /// Verifies the callback state in constant time and consumes the pending
    /// attempt, returning its code verifier. A mismatched state leaves the
    /// attempt in place; a repeated callback finds nothing to consume.
    pub fn verify_callback(&self, received_state: &str) -> Result<String> {
        let mut pending = self.lock_pending()?;
        let matches = match pending.as_ref() {
            Some(attempt) => states_match(received_state, &attempt.state),
            None => false,
        };
        if !matches {
            return Err(Error::CsrfValidation);
        }
        let attempt = pending.take().ok_or(Error::CsrfValidation)?;
        Ok(attempt.code_verifier)
    }

    /// Drops the pending attempt without completing it.
    pub fn abandon(&self) -> Result<()> {
        *self.lock_pending()? = None;
        Ok(())
    }

    pub fn config(&self) -> &SpotifyConfig {
        &self.config
    }

    fn lock_pending(&self) -> Result<std::sync::MutexGuard<'_, Option<AuthState>>> {
        self.pending
            .lock()
            .map_err(|e| Error::Internal(format!("auth state lock poisoned: {}", e)))
    }
}
