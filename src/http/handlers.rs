//! Request handlers for the LungScan API.
//!
//! Every protected handler follows the same sequence: resolve the caller
//! identity, check the operation's quota, then do the work. A quota
//! rejection is mapped to 429 with `Retry-After` and `X-RateLimit-*`
//! headers; it is a normal response, not an error.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, instrument, warn};
use uuid::Uuid;

use super::error::ApiError;
use super::state::AppState;
use crate::history::{ClassProbabilities, HistoryPage, HistoryRecord, HistorySummary};
use crate::inference::{mock_result, ImageUpload};
use crate::ratelimit::{OperationClass, RateLimitDecision};

/// Cookie carrying the signed-in user's email.
const USER_EMAIL_COOKIE: &str = "userEmail";

const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Build the API router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/inference", post(submit_inference))
        .route("/api/history", get(list_history).delete(delete_history))
        .route("/api/history/{id}", get(get_history))
        .with_state(state)
}

/// Resolve the caller identity from the session cookie.
fn identity(jar: &CookieJar) -> Result<String, ApiError> {
    let raw = jar
        .get(USER_EMAIL_COOKIE)
        .map(|cookie| cookie.value())
        .ok_or(ApiError::Unauthorized)?;

    let decoded = percent_decode_str(raw)
        .decode_utf8()
        .map_err(|_| ApiError::Unauthorized)?;

    if decoded.is_empty() {
        return Err(ApiError::Unauthorized);
    }
    Ok(decoded.into_owned())
}

/// Check the caller's quota for an operation class.
fn check_quota(state: &AppState, class: OperationClass, user: &str) -> RateLimitDecision {
    state
        .limiter
        .check(&class.key(user), &state.quotas.quota(class))
}

/// 429 response for a rejected check.
fn rate_limited(decision: &RateLimitDecision) -> Response {
    let retry_after = decision.retry_after.unwrap_or(0);

    (
        StatusCode::TOO_MANY_REQUESTS,
        [
            (header::RETRY_AFTER, retry_after.to_string()),
            (X_RATELIMIT_REMAINING, decision.remaining.to_string()),
            (X_RATELIMIT_RESET, decision.reset_at.to_string()),
        ],
        Json(json!({
            "error": "Rate limit exceeded",
            "retryAfter": retry_after,
            "remaining": decision.remaining,
        })),
    )
        .into_response()
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

#[derive(Debug, Serialize)]
struct InferenceResponse {
    classification: String,
    confidence: f64,
    probabilities: ClassProbabilities,
    gradcam_url: Option<String>,
    attention_url: Option<String>,
    #[serde(rename = "processingTime")]
    processing_time_ms: u64,
}

/// Classify an uploaded X-ray image.
#[instrument(skip_all)]
async fn submit_inference(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let started = Instant::now();
    let user = identity(&jar)?;

    let decision = check_quota(&state, OperationClass::Inference, &user);
    if !decision.allowed {
        return Ok(rate_limited(&decision));
    }

    let image = read_image(multipart).await?;

    let result = match state.inference.classify(&image).await {
        Ok(result) => result,
        Err(err) => {
            warn!(error = %err, "Inference service unavailable, using mock result");
            mock_result()
        }
    };
    let processing_time_ms = started.elapsed().as_millis() as u64;

    let record = HistoryRecord {
        id: Uuid::new_v4(),
        user_email: user,
        created_at: Utc::now(),
        image_name: image.name,
        classification: result.classification.clone(),
        confidence: result.confidence,
        probabilities: result.probabilities,
        gradcam_url: result.gradcam_url.clone(),
        attention_url: result.attention_url.clone(),
        processing_time_ms,
    };
    if let Err(err) = state.history.insert(record).await {
        // The classification is still returned to the caller
        error!(error = %err, "Failed to record inference history");
    }

    let body = InferenceResponse {
        classification: result.classification,
        confidence: result.confidence,
        probabilities: result.probabilities,
        gradcam_url: result.gradcam_url,
        attention_url: result.attention_url,
        processing_time_ms,
    };

    Ok((
        [
            (X_RATELIMIT_REMAINING, decision.remaining.to_string()),
            (X_RATELIMIT_RESET, decision.reset_at.to_string()),
        ],
        Json(body),
    )
        .into_response())
}

/// Pull the `image` part out of the multipart payload.
async fn read_image(mut multipart: Multipart) -> Result<ImageUpload, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::BadRequest("Malformed upload payload"))?
    {
        if field.name() != Some("image") {
            continue;
        }

        let name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|_| ApiError::BadRequest("Malformed upload payload"))?
            .to_vec();

        return Ok(ImageUpload {
            name,
            content_type,
            bytes,
        });
    }

    Err(ApiError::BadRequest("No image provided"))
}

#[derive(Debug, Deserialize)]
struct HistoryListQuery {
    page: Option<u32>,
    limit: Option<u32>,
}

#[derive(Debug, Serialize)]
struct HistoryListResponse {
    data: Vec<HistorySummary>,
    pagination: Pagination,
}

#[derive(Debug, Serialize)]
struct Pagination {
    page: u32,
    limit: u32,
    total: u64,
    #[serde(rename = "totalPages")]
    total_pages: u64,
}

impl From<HistoryPage> for HistoryListResponse {
    fn from(page: HistoryPage) -> Self {
        Self {
            pagination: Pagination {
                page: page.page,
                limit: page.limit,
                total: page.total,
                total_pages: page.total_pages,
            },
            data: page.records,
        }
    }
}

/// List one page of the caller's inference history.
async fn list_history(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(query): Query<HistoryListQuery>,
) -> Result<Response, ApiError> {
    let user = identity(&jar)?;

    let decision = check_quota(&state, OperationClass::History, &user);
    if !decision.allowed {
        return Ok(rate_limited(&decision));
    }

    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(10).max(1);

    let history_page = state.history.list(&user, page, limit).await?;
    Ok(Json(HistoryListResponse::from(history_page)).into_response())
}

/// Fetch one history record with its visualization fields.
async fn get_history(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let user = identity(&jar)?;

    let decision = check_quota(&state, OperationClass::History, &user);
    if !decision.allowed {
        return Ok(rate_limited(&decision));
    }

    match state.history.get(&user, id).await? {
        Some(record) => Ok(Json(record).into_response()),
        None => Err(ApiError::NotFound),
    }
}

#[derive(Debug, Deserialize)]
struct DeleteHistoryRequest {
    id: Option<Uuid>,
}

/// Delete one of the caller's history records.
async fn delete_history(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(request): Json<DeleteHistoryRequest>,
) -> Result<Response, ApiError> {
    let user = identity(&jar)?;

    let decision = check_quota(&state, OperationClass::Delete, &user);
    if !decision.allowed {
        return Ok(rate_limited(&decision));
    }

    let id = request.id.ok_or(ApiError::BadRequest("ID is required"))?;

    let removed = state.history.delete(&user, id).await?;
    if !removed {
        debug!(%id, "Delete matched no history record");
    }

    Ok(Json(json!({ "success": true })).into_response())
}
