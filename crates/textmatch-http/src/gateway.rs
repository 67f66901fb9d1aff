//! Front-facing tier. Forwards requests to the text match server and relays
//! status and JSON body back; an unreachable upstream becomes `502`.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::time::Duration;

use textmatch_core::config::GatewaySettings;

#[derive(Clone)]
pub struct Gateway {
    upstream: String,
    client: reqwest::Client,
    timeout: Duration,
    attempts: usize,
}

type Relayed = (StatusCode, Json<Value>);

impl Gateway {
    pub fn new(settings: &GatewaySettings) -> Self {
        Self {
            upstream: settings.upstream_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            timeout: Duration::from_millis(settings.timeout_ms),
            attempts: settings.attempts.max(1),
        }
    }

    pub fn upstream(&self) -> &str {
        &self.upstream
    }

    pub fn router(self) -> Router {
        Router::new()
            .route("/insert", post(forward_insert))
            .route("/search", get(forward_get))
            .route("/get", get(forward_get))
            .route("/health", get(forward_get))
            .with_state(self)
    }

    pub async fn serve(self, bind_addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(bind_addr).await?;
        tracing::info!(addr = %listener.local_addr()?, upstream = %self.upstream, "gateway listening");
        axum::serve(listener, self.router()).await?;
        Ok(())
    }

    /// Transport failures are retried with exponential backoff plus jitter.
    /// Any HTTP answer from upstream, error statuses included, is final.
    async fn send_with_retry<F>(&self, build: F) -> anyhow::Result<reqwest::Response>
    where
        F: Fn(&reqwest::Client) -> reqwest::RequestBuilder,
    {
        let mut delay_ms = 150u64;
        for attempt in 1..=self.attempts {
            match build(&self.client).timeout(self.timeout).send().await {
                Ok(resp) => return Ok(resp),
                Err(e) if attempt == self.attempts => return Err(anyhow::anyhow!(e)),
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "upstream request failed, retrying");
                    let jitter = rand::random::<u64>() % 50;
                    tokio::time::sleep(Duration::from_millis(delay_ms + jitter)).await;
                    delay_ms = (delay_ms * 2).min(1200);
                }
            }
        }
        Err(anyhow::anyhow!("retry attempts exhausted"))
    }
}

async fn forward_insert(State(gateway): State<Gateway>, headers: HeaderMap, body: Bytes) -> Relayed {
    let url = format!("{}/insert", gateway.upstream);
    let content_type = headers.get(header::CONTENT_TYPE).cloned();
    let sent = gateway
        .send_with_retry(|client| {
            let request = client.post(&url).body(body.clone());
            match &content_type {
                Some(ct) => request.header(header::CONTENT_TYPE, ct.clone()),
                None => request,
            }
        })
        .await;
    relay(sent).await
}

async fn forward_get(State(gateway): State<Gateway>, uri: Uri) -> Relayed {
    let path = uri.path_and_query().map_or(uri.path(), |pq| pq.as_str());
    let url = format!("{}{}", gateway.upstream, path);
    let sent = gateway.send_with_retry(|client| client.get(&url)).await;
    relay(sent).await
}

async fn relay(sent: anyhow::Result<reqwest::Response>) -> Relayed {
    let resp = match sent {
        Ok(resp) => resp,
        Err(e) => {
            tracing::error!(error = %e, "upstream unreachable");
            return (StatusCode::BAD_GATEWAY, Json(json!({ "error": "upstream unavailable" })));
        }
    };
    let status = StatusCode::from_u16(resp.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    match resp.json::<Value>().await {
        Ok(body) => (status, Json(body)),
        Err(e) => {
            tracing::error!(%status, error = %e, "upstream sent a non-JSON body");
            (StatusCode::BAD_GATEWAY, Json(json!({ "error": "invalid upstream response" })))
        }
    }
}
