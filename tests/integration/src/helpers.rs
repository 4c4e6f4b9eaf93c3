//! Test helpers for integration tests
//!
//! Provides a test server bound to an ephemeral port, request helpers that
//! attach a bearer token, and a WebSocket client for the realtime stream.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use engage_api::{create_app, AppState};
use engage_common::AppConfig;
use engage_core::Snowflake;
use engage_db::MemoryStore;
use engage_service::{BatchSettings, ServiceContext};
use futures_util::StreamExt;
use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

/// Signing secret shared by the server and the token helper
pub const TEST_SECRET: &str = "integration-test-secret";

/// Test server instance that manages lifecycle
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: Client,
    /// Backing store, for seeding contribution records
    pub store: MemoryStore,
    state: AppState,
    _handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a server on the in-memory store with default settings
    pub async fn start() -> Result<Self> {
        Self::start_with_config(AppConfig::in_memory(TEST_SECRET)).await
    }

    /// Start a server with a custom config; the store is always in-memory
    pub async fn start_with_config(config: AppConfig) -> Result<Self> {
        let store = MemoryStore::new();
        let context = ServiceContext::builder()
            .memory(&store)
            .scoring(config.scoring.clone())
            .batch_settings(BatchSettings {
                jobs_per_tick: config.engine.batch_jobs_per_tick,
                progress_every: 1,
            })
            .build()
            .map_err(|e| anyhow::anyhow!("service context: {e}"))?;
        let state = AppState::new(context, config);

        let app = create_app(state.clone());

        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
        let addr = listener.local_addr()?;

        let handle = tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .ok();
        });

        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            addr,
            client,
            store,
            state,
            _handle: handle,
        })
    }

    /// Get base URL for the server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url(), path)
    }

    /// Bearer token for a user, signed the way the auth provider would
    pub fn token(&self, user_id: i64, name: &str) -> String {
        self.state
            .verifier()
            .issue(Snowflake::new(user_id), Some(name), chrono::Duration::hours(1))
            .unwrap_or_default()
    }

    /// Wait for background notifications and activity entries to land
    pub async fn settle(&self) {
        self.state.service_context().side_effects().drain().await;
    }

    /// Realtime streams currently registered with the hub
    pub fn subscriber_count(&self) -> usize {
        self.state.service_context().fanout().subscriber_count()
    }

    /// Poll until the hub holds `expected` subscribers or `timeout` passes
    pub async fn wait_for_subscribers(&self, expected: usize, timeout: Duration) -> Result<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        while self.subscriber_count() != expected {
            if tokio::time::Instant::now() >= deadline {
                anyhow::bail!(
                    "expected {expected} subscribers, still {}",
                    self.subscriber_count()
                );
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        Ok(())
    }

    /// Unauthenticated GET against the server root
    pub async fn get(&self, path: &str) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.get(&url).send().await?)
    }

    /// GET under /api/v1 with auth token
    pub async fn get_auth(&self, path: &str, token: &str) -> Result<Response> {
        Ok(self.client.get(self.url(path)).bearer_auth(token).send().await?)
    }

    /// POST under /api/v1 with auth token and JSON body
    pub async fn post_auth<T: Serialize>(&self, path: &str, token: &str, body: &T) -> Result<Response> {
        Ok(self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await?)
    }

    /// POST without a body
    pub async fn post_empty(&self, path: &str, token: &str) -> Result<Response> {
        Ok(self.client.post(self.url(path)).bearer_auth(token).send().await?)
    }

    pub async fn put_auth<T: Serialize>(&self, path: &str, token: &str, body: &T) -> Result<Response> {
        Ok(self
            .client
            .put(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await?)
    }

    pub async fn patch_auth<T: Serialize>(&self, path: &str, token: &str, body: &T) -> Result<Response> {
        Ok(self
            .client
            .patch(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await?)
    }

    pub async fn delete_auth(&self, path: &str, token: &str) -> Result<Response> {
        Ok(self.client.delete(self.url(path)).bearer_auth(token).send().await?)
    }

    /// Open the realtime stream; `query` is appended after the token
    pub async fn realtime(&self, token: &str, query: &str) -> Result<RealtimeClient> {
        let url = format!("ws://{}/api/v1/realtime?token={token}&{query}", self.addr);
        let (socket, _) = connect_async(url).await.context("websocket handshake")?;
        Ok(RealtimeClient { socket })
    }
}

/// Client side of a realtime stream
pub struct RealtimeClient {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl RealtimeClient {
    /// Send a close frame and wait for the handshake to finish
    pub async fn close(mut self) -> Result<()> {
        self.socket.close(None).await?;
        Ok(())
    }

    /// Next change event frame, or an error after `timeout`
    pub async fn next_event(&mut self, timeout: Duration) -> Result<Value> {
        loop {
            let frame = tokio::time::timeout(timeout, self.socket.next())
                .await
                .context("no realtime frame before timeout")?
                .context("realtime stream ended")??;
            if let Message::Text(text) = frame {
                return Ok(serde_json::from_str(&text)?);
            }
        }
    }
}

/// Assert response status and parse JSON body
pub async fn assert_json<T: DeserializeOwned>(response: Response, expected_status: StatusCode) -> Result<T> {
    let status = response.status();
    if status != expected_status {
        let body = response.text().await?;
        anyhow::bail!(
            "Expected status {}, got {}. Body: {}",
            expected_status,
            status,
            body
        );
    }
    Ok(response.json().await?)
}

/// Assert response status and return the error code from the envelope
pub async fn assert_error(response: Response, expected_status: StatusCode) -> Result<String> {
    let body: Value = assert_json(response, expected_status).await?;
    body["error"]["code"]
        .as_str()
        .map(String::from)
        .context("error envelope without a code")
}

/// Assert response status without parsing body
pub async fn assert_status(response: Response, expected_status: StatusCode) -> Result<()> {
    let status = response.status();
    if status != expected_status {
        let body = response.text().await?;
        anyhow::bail!(
            "Expected status {}, got {}. Body: {}",
            expected_status,
            status,
            body
        );
    }
    Ok(())
}
