use std::collections::HashMap;
use std::net::SocketAddr;

use axum::{extract::Query, response::Html, routing::get, Router};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct CallbackParams {
    pub code: String,
    pub state: String,
}

enum CallbackOutcome {
    Params(CallbackParams),
    Denied(String),
}

const SUCCESS_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Spotify Connected</title></head>
<body style="font-family: sans-serif; text-align: center; padding-top: 4rem;">
  <h1>&#10003; Spotify connected</h1>
  <p>You can close this window and return to the application.</p>
</body>
</html>"#;

const DENIED_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Authorization Denied</title></head>
<body style="font-family: sans-serif; text-align: center; padding-top: 4rem;">
  <h1>&#10007; Authorization denied</h1>
  <p>No changes were made. You can close this window.</p>
</body>
</html>"#;

const MISSING_PARAMS_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Authorization Error</title></head>
<body style="font-family: sans-serif; text-align: center; padding-top: 4rem;">
  <h1>&#10007; Authorization error</h1>
  <p>Missing code or state parameter.</p>
</body>
</html>"#;

pub struct CallbackServer {
    listener: TcpListener,
    addr: SocketAddr,
}

impl CallbackServer {
    /// Binds the loopback listener. Port 0 asks the OS for a free port;
    /// `port()` reports the one actually bound.
    pub async fn bind(port: u16) -> Result<Self> {
        let addr = SocketAddr::from(([127, 0, 0, 1], port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            Error::Configuration(format!("failed to bind callback listener on {}: {}", addr, e))
        })?;
        let addr = listener.local_addr().map_err(|e| {
            Error::Internal(format!("callback listener has no local address: {}", e))
        })?;
        Ok(Self { listener, addr })
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Serves `/callback` until the first redirect arrives, then shuts down
    /// and hands back the query parameters. Shutdown is graceful so the
    /// browser receives the full result page before the listener closes.
    pub async fn capture(self) -> Result<CallbackParams> {
        let (tx, mut rx) = mpsc::channel::<CallbackOutcome>(1);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let app = Router::new().route(
            "/callback",
            get(move |Query(query): Query<HashMap<String, String>>| {
                let tx = tx.clone();
                async move {
                    if let Some(error) = query.get("error") {
                        let _ = tx.try_send(CallbackOutcome::Denied(error.clone()));
                        return Html(DENIED_PAGE);
                    }
                    match (query.get("code"), query.get("state")) {
                        (Some(code), Some(state)) => {
                            let _ = tx.try_send(CallbackOutcome::Params(CallbackParams {
                                code: code.clone(),
                                state: state.clone(),
                            }));
                            Html(SUCCESS_PAGE)
                        }
                        _ => Html(MISSING_PARAMS_PAGE),
                    }
                }
            }),
        );

        let server = tokio::spawn(async move {
            let serve = axum::serve(self.listener, app).with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            });
            if let Err(e) = serve.await {
                tracing::warn!("callback server error: {}", e);
            }
        });

        let outcome = rx.recv().await;
        let _ = shutdown_tx.send(());
        let _ = server.await;

        match outcome {
            Some(CallbackOutcome::Params(params)) => Ok(params),
            Some(CallbackOutcome::Denied(reason)) => {
                tracing::warn!("authorization denied at the provider: {}", reason);
                Err(Error::Authentication)
            }
            None => Err(Error::Authentication),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn capture_returns_first_code_and_state() {
        let server = CallbackServer::bind(0).await.unwrap();
        let port = server.port();
        assert_ne!(port, 0);
        let handle = tokio::spawn(server.capture());

        let body = reqwest::get(format!(
            "http://127.0.0.1:{}/callback?code=AC-1&state=st-1",
            port
        ))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
        assert!(body.contains("Spotify connected"));

        let params = handle.await.unwrap().unwrap();
        assert_eq!(params.code, "AC-1");
        assert_eq!(params.state, "st-1");
    }

    #[tokio::test]
    async fn denied_callback_is_not_an_auth_success() {
        let server = CallbackServer::bind(0).await.unwrap();
        let port = server.port();
        let handle = tokio::spawn(server.capture());

        let body = reqwest::get(format!(
            "http://127.0.0.1:{}/callback?error=access_denied",
            port
        ))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
        assert!(body.contains("Authorization denied"));

        assert!(matches!(
            handle.await.unwrap(),
            Err(Error::Authentication)
        ));
    }
}
