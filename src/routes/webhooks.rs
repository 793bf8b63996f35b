use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::post,
};

use crate::{
    error::{AppError, AppResult},
    response::{ApiResponse, Meta},
    services::payment_events,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/payments", post(payment_webhook))
}

#[utoipa::path(
    post,
    path = "/api/webhooks/payments",
    request_body(content = String, content_type = "application/json"),
    responses(
        (status = 200, description = "Event received", body = ApiResponse<serde_json::Value>),
        (status = 400, description = "Missing or invalid signature"),
    ),
    tag = "Webhooks"
)]
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing signature header".to_string()))?;

    // Signature verification happens inside the gateway, before any order
    // mutation is attempted.
    let event = state.payments.parse_event(&body, signature)?;
    payment_events::apply_event(&state.pool, event).await?;

    Ok(Json(ApiResponse::success(
        "Received",
        serde_json::json!({ "received": true }),
        Some(Meta::empty()),
    )))
}
