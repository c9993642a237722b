//! Common test utilities and fixtures

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use odds_stream::config::types::AppConfig;
use odds_stream::AppState;
use serde_json::Value;
use tokio::net::TcpListener;

/// Upper bound for any single read from a running server
pub const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// A server bound to an ephemeral local port
pub struct TestServer {
    pub addr: SocketAddr,
    pub state: AppState,
    pub client: reqwest::Client,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Feed new pools for a market through the ingest route
    pub async fn post_pools(&self, market_id: &str, yes_pool: f64, no_pool: f64) -> reqwest::Response {
        self.client
            .post(self.url(&format!("/markets/{}/pools", market_id)))
            .json(&serde_json::json!({ "yesPool": yes_pool, "noPool": no_pool }))
            .send()
            .await
            .expect("pool update request failed")
    }

    /// Open a stream with an optional `Last-Event-ID` header
    pub async fn open_stream(&self, market_id: &str, last_event_id: Option<i64>) -> SseReader {
        let mut request = self
            .client
            .get(self.url(&format!("/markets/{}/odds/stream", market_id)));
        if let Some(id) = last_event_id {
            request = request.header("Last-Event-ID", id.to_string());
        }
        SseReader::new(request.send().await.expect("stream request failed"))
    }
}

/// Start a server on in-memory stores
pub async fn spawn_server() -> TestServer {
    spawn_server_with(AppConfig::default()).await
}

pub async fn spawn_server_with(config: AppConfig) -> TestServer {
    let state = AppState::in_memory(&config);
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind test listener");
    let addr = listener.local_addr().expect("no local addr");

    let server_state = state.clone();
    tokio::spawn(async move {
        odds_stream::server::serve_with_shutdown(listener, server_state, std::future::pending())
            .await
            .expect("server failed");
    });

    TestServer {
        addr,
        state,
        client: reqwest::Client::new(),
    }
}

/// One parsed event-stream frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SseFrame {
    pub id: Option<i64>,
    pub event: Option<String>,
    pub data: Option<String>,
    pub retry: Option<u64>,
    pub comment: Option<String>,
}

impl SseFrame {
    fn parse(block: &str) -> Self {
        let mut frame = SseFrame::default();
        for line in block.lines() {
            if let Some(comment) = line.strip_prefix(':') {
                frame.comment = Some(comment.trim().to_string());
                continue;
            }
            let (field, value) = line.split_once(':').unwrap_or((line, ""));
            let value = value.strip_prefix(' ').unwrap_or(value);
            match field {
                "id" => frame.id = value.parse().ok(),
                "event" => frame.event = Some(value.to_string()),
                "data" => frame.data = Some(value.to_string()),
                "retry" => frame.retry = value.parse().ok(),
                _ => {}
            }
        }
        frame
    }

    pub fn json(&self) -> Value {
        serde_json::from_str(self.data.as_deref().expect("frame has no data"))
            .expect("frame data is not JSON")
    }

    pub fn is_odds(&self) -> bool {
        self.event.as_deref() == Some("odds")
    }
}

/// Incremental reader over a streaming response body
pub struct SseReader {
    pub response: reqwest::Response,
    buffer: String,
}

impl SseReader {
    pub fn new(response: reqwest::Response) -> Self {
        Self {
            response,
            buffer: String::new(),
        }
    }

    /// Next complete frame, or `None` when the body ends
    pub async fn next_frame(&mut self) -> Option<SseFrame> {
        loop {
            if let Some(end) = self.buffer.find("\n\n") {
                let block: String = self.buffer.drain(..end + 2).collect();
                return Some(SseFrame::parse(block.trim_end_matches('\n')));
            }
            let chunk = tokio::time::timeout(READ_TIMEOUT, self.response.chunk())
                .await
                .expect("timed out waiting for a frame")
                .expect("body read failed")?;
            self.buffer.push_str(&String::from_utf8_lossy(&chunk));
        }
    }

    /// Next frame carrying an odds event, skipping keep-alives
    pub async fn next_odds(&mut self) -> SseFrame {
        loop {
            let frame = self.next_frame().await.expect("stream ended early");
            if frame.is_odds() {
                return frame;
            }
        }
    }
}

/// Poll until the broker reports `count` listeners on a market
pub async fn wait_for_subscribers(state: &AppState, market_id: &str, count: usize) {
    tokio::time::timeout(READ_TIMEOUT, async {
        while state.broker.subscriber_count(market_id) != count {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("subscriber count never reached target");
}
