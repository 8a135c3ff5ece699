//! One-shot HTTP receiver for the OAuth redirect
//!
//! Google redirects the browser to `http://localhost:<port>/?code=...&state=...`
//! once the user grants consent. A small axum server answers that request with
//! a page and hands the outcome back to the flow, then shuts down. Other paths
//! and requests without a code (the browser's favicon fetch) get a 404.

use crate::errors::{RecapError, Result};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

const SUCCESS_PAGE: &str = "<!DOCTYPE html><html><head><title>Authorization complete</title></head>\
<body><h1>Authorization complete</h1><p>You can close this window and return to the terminal.</p></body></html>";

const FAILURE_PAGE: &str = "<!DOCTYPE html><html><head><title>Authorization failed</title></head>\
<body><h1>Authorization failed</h1><p>Check the terminal for details.</p></body></html>";

#[derive(Clone)]
struct CallbackState {
    expected_state: Arc<String>,
    outcome_tx: Arc<Mutex<Option<oneshot::Sender<Result<String>>>>>,
}

async fn callback_handler(
    State(state): State<CallbackState>,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, Html<&'static str>) {
    if !params.contains_key("code") && !params.contains_key("error") {
        log::debug!("Ignoring redirect request without code or error");
        return (StatusCode::NOT_FOUND, Html(""));
    }

    let outcome = check_params(&params, &state.expected_state);
    let page = if outcome.is_ok() { SUCCESS_PAGE } else { FAILURE_PAGE };

    let sender = match state.outcome_tx.lock() {
        Ok(mut slot) => slot.take(),
        Err(_) => None,
    };
    match sender {
        Some(tx) => {
            if tx.send(outcome).is_err() {
                log::debug!("Redirect arrived after the receiver stopped waiting");
            }
        }
        None => log::debug!("Ignoring repeated redirect"),
    }

    (StatusCode::OK, Html(page))
}

pub struct LoopbackReceiver {
    listener: TcpListener,
    addr: SocketAddr,
}

impl LoopbackReceiver {
    /// Bind on 127.0.0.1; port 0 picks a free port.
    pub async fn bind(port: u16) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", port)).await.map_err(|e| {
            RecapError::OAuthError(format!("Failed to bind redirect listener on port {}: {}", port, e))
        })?;
        let addr = listener.local_addr()?;
        log::debug!("OAuth redirect listener bound to {}", addr);
        Ok(Self { listener, addr })
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn redirect_uri(&self) -> String {
        format!("http://localhost:{}/", self.addr.port())
    }

    /// Serve until the redirect arrives and return the authorization code.
    /// Connections are handled concurrently, so idle sockets (browser
    /// preconnects) do not hold up the real redirect.
    pub async fn receive(self, expected_state: &str, timeout: Duration) -> Result<String> {
        let (outcome_tx, outcome_rx) = oneshot::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let app = Router::new()
            .route("/", get(callback_handler))
            .with_state(CallbackState {
                expected_state: Arc::new(expected_state.to_string()),
                outcome_tx: Arc::new(Mutex::new(Some(outcome_tx))),
            });

        let addr = self.addr;
        let mut server = tokio::spawn(async move {
            axum::serve(self.listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
        });

        let outcome = match tokio::time::timeout(timeout, outcome_rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(RecapError::OAuthError(
                "Redirect listener stopped before the browser came back".to_string(),
            )),
            Err(_) => Err(RecapError::OAuthError(format!(
                "Timed out after {}s waiting for the browser redirect",
                timeout.as_secs()
            ))),
        };

        // Let the result page go out, but do not wait on idle connections forever
        let _ = shutdown_tx.send(());
        match tokio::time::timeout(SHUTDOWN_GRACE, &mut server).await {
            Ok(Ok(Ok(()))) => log::debug!("OAuth redirect listener on {} stopped", addr),
            Ok(Ok(Err(e))) => log::warn!("OAuth redirect listener error: {}", e),
            Ok(Err(e)) => log::warn!("OAuth redirect listener task failed: {}", e),
            Err(_) => {
                log::debug!("Closing lingering connections on {}", addr);
                server.abort();
            }
        }

        outcome
    }
}

fn check_params(params: &HashMap<String, String>, expected_state: &str) -> Result<String> {
    if let Some(error) = params.get("error") {
        let detail = params
            .get("error_description")
            .map(|d| format!(": {}", d))
            .unwrap_or_default();
        return Err(RecapError::OAuthError(format!(
            "Authorization denied ({}){}",
            error, detail
        )));
    }

    if params.get("state").map(String::as_str) != Some(expected_state) {
        return Err(RecapError::OAuthError(
            "State parameter mismatch in redirect; the request may have been forged".to_string(),
        ));
    }

    match params.get("code") {
        Some(code) if !code.is_empty() => Ok(code.clone()),
        _ => Err(RecapError::OAuthError(
            "Redirect did not include an authorization code".to_string(),
        )),
    }
}
