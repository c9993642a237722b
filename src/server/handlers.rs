//! HTTP route handlers

use std::collections::HashMap;
use std::convert::Infallible;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderName, StatusCode},
    response::{
        sse::{Event, Sse},
        IntoResponse, Json, Response,
    },
};
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::state::AppState;
use crate::common::types::{MarketOdds, OddsUpdate, TradeImpact};
use crate::market::TradeRequest;
use crate::stream::{parse_resume_point, OddsPayload};

const LAST_EVENT_ID: &str = "last-event-id";
const X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");

/// Error body returned by the JSON routes
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };
        (status, Json(ErrorBody { error })).into_response()
    }
}

// ============================================================================
// STREAM
// ============================================================================

/// `GET /markets/:market_id/odds/stream`
pub async fn stream_odds(
    State(state): State<AppState>,
    Path(market_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let header_value = headers.get(LAST_EVENT_ID).and_then(|v| v.to_str().ok());
    let resume_from = parse_resume_point(
        header_value,
        params.get("lastEventId").map(String::as_str),
    );
    debug!(%market_id, ?resume_from, "Stream requested");

    let events = state
        .streams
        .open(market_id, resume_from)
        .filter_map(|frame| async move {
            match frame.to_event() {
                Ok(event) => Some(Ok::<Event, Infallible>(event)),
                Err(e) => {
                    warn!("Dropping frame that failed to encode: {}", e);
                    None
                }
            }
        });

    // Sse sets content type and cache control
    (
        [
            (header::CONNECTION, "keep-alive"),
            (X_ACCEL_BUFFERING, "no"),
        ],
        Sse::new(events),
    )
        .into_response()
}

// ============================================================================
// HOST API (JSON)
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolsRequest {
    pub yes_pool: f64,
    pub no_pool: f64,
    #[serde(default)]
    pub trade: Option<TradeRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishResponse {
    pub persisted: bool,
    #[serde(flatten)]
    pub odds: OddsPayload,
}

/// Odds as reported by the read route
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OddsView {
    pub market_id: String,
    /// Absent when no durable snapshot exists yet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<i64>,
    #[serde(flatten)]
    pub odds: MarketOdds,
    pub timestamp: DateTime<Utc>,
}

fn valid_pool(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

/// `POST /markets/:market_id/pools`
pub async fn update_pools(
    State(state): State<AppState>,
    Path(market_id): Path<String>,
    Json(request): Json<PoolsRequest>,
) -> Result<(StatusCode, Json<PublishResponse>), ApiError> {
    if !valid_pool(request.yes_pool) || !valid_pool(request.no_pool) {
        return Err(ApiError::BadRequest(
            "pools must be finite and non-negative".to_string(),
        ));
    }

    let published = state
        .publisher
        .apply_pools(&market_id, request.yes_pool, request.no_pool, request.trade)
        .await;

    let status = if published.persisted {
        StatusCode::CREATED
    } else {
        StatusCode::ACCEPTED
    };
    Ok((
        status,
        Json(PublishResponse {
            persisted: published.persisted,
            odds: OddsPayload::from(&published.update),
        }),
    ))
}

/// `GET /markets/:market_id/odds`
pub async fn latest_odds(
    State(state): State<AppState>,
    Path(market_id): Path<String>,
) -> Result<Json<OddsView>, ApiError> {
    match state.log.latest(&market_id).await {
        Ok(Some(row)) => return Ok(Json(OddsView::from(&OddsUpdate::durable(row)))),
        Ok(None) => {}
        Err(e) => warn!(%market_id, "Latest snapshot read failed: {}", e),
    }

    let odds = state
        .market
        .current_odds(&market_id)
        .await
        .map_err(|e| ApiError::NotFound(e.to_string()))?;
    Ok(Json(OddsView {
        market_id,
        sequence: None,
        odds,
        timestamp: Utc::now(),
    }))
}

/// `POST /markets/:market_id/quote`
pub async fn quote_trade(
    State(state): State<AppState>,
    Path(market_id): Path<String>,
    Json(trade): Json<TradeRequest>,
) -> Result<Json<TradeImpact>, ApiError> {
    if !trade.amount.is_finite() || trade.amount < 0.0 {
        return Err(ApiError::BadRequest(
            "amount must be finite and non-negative".to_string(),
        ));
    }
    Ok(Json(state.publisher.quote_trade(&market_id, trade).await))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub subscribers: usize,
}

/// `GET /health`
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        subscribers: state.broker.total_subscribers(),
    })
}

impl From<&OddsUpdate> for OddsView {
    fn from(update: &OddsUpdate) -> Self {
        let row = &update.snapshot;
        Self {
            market_id: row.market_id.clone(),
            sequence: update.durable.then_some(row.sequence_id),
            odds: row.odds(),
            timestamp: row.created_at,
        }
    }
}
