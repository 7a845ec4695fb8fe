// SPDX-FileCopyrightText: 2026 CareBridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the session and staff APIs.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use carebridge_core::{ActiveConversation, Conversation, HandoffRequest, Message};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::server::GatewayState;
use crate::sse;

/// Request body for POST /v1/sessions.
#[derive(Debug, Default, Deserialize)]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub patient_id: Option<String>,
}

/// Request body for patient POST .../messages.
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

/// Request body for staff takeover/release.
#[derive(Debug, Deserialize)]
pub struct StaffActionRequest {
    pub staff_id: String,
}

/// Query parameters for GET .../history.
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    /// Most-recent-message bound; omitted means the full transcript.
    #[serde(default)]
    pub limit: Option<u32>,
}

/// Request body for staff POST .../messages.
#[derive(Debug, Deserialize)]
pub struct StaffMessageRequest {
    pub staff_id: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
pub struct ActiveConversationsResponse {
    pub conversations: Vec<ActiveConversation>,
}

#[derive(Debug, Serialize)]
pub struct HandoffQueueResponse {
    pub handoffs: Vec<HandoffRequest>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// GET /health (public, unauthenticated).
pub async fn get_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// POST /v1/sessions
pub async fn create_session(
    State(state): State<GatewayState>,
    body: Option<Json<CreateSessionRequest>>,
) -> Result<(StatusCode, Json<Conversation>), ApiError> {
    let patient_id = body.and_then(|Json(b)| b.patient_id);
    let conversation = state.orchestrator.create_session(patient_id).await?;
    Ok((StatusCode::CREATED, Json(conversation)))
}

/// POST /v1/sessions/{token}/messages
///
/// With `Accept: text/event-stream` the turn is delivered as an SSE stream;
/// otherwise the handler blocks until the assistant message is persisted.
/// Safety short-circuits are ordinary 200 responses.
pub async fn send_message(
    State(state): State<GatewayState>,
    Path(token): Path<String>,
    headers: HeaderMap,
    Json(body): Json<SendMessageRequest>,
) -> Result<Response, ApiError> {
    let wants_stream = headers
        .get("accept")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("text/event-stream"));

    if wants_stream {
        let rx = state
            .orchestrator
            .clone()
            .send_message_stream(&token, &body.content)
            .await?;
        return Ok(sse::stream_events(rx).into_response());
    }

    let message = state.orchestrator.send_message(&token, &body.content).await?;
    Ok(Json(message).into_response())
}

/// POST /v1/sessions/{token}/cancel
pub async fn cancel_generation(
    State(state): State<GatewayState>,
    Path(token): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.orchestrator.cancel_generation(&token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /v1/sessions/{token}/history
pub async fn get_history(
    State(state): State<GatewayState>,
    Path(token): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let messages = state.orchestrator.get_history(&token, query.limit).await?;
    Ok(Json(HistoryResponse { messages }))
}

/// POST /v1/sessions/{token}/close
pub async fn close_session(
    State(state): State<GatewayState>,
    Path(token): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.orchestrator.close_session(&token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /v1/staff/conversations
pub async fn list_active(
    State(state): State<GatewayState>,
) -> Result<Json<ActiveConversationsResponse>, ApiError> {
    let conversations = state.orchestrator.list_active().await?;
    Ok(Json(ActiveConversationsResponse { conversations }))
}

/// GET /v1/staff/handoffs
pub async fn list_handoffs(
    State(state): State<GatewayState>,
) -> Result<Json<HandoffQueueResponse>, ApiError> {
    let handoffs = state.orchestrator.list_pending_handoffs().await?;
    Ok(Json(HandoffQueueResponse { handoffs }))
}

/// POST /v1/staff/conversations/{token}/takeover
pub async fn takeover(
    State(state): State<GatewayState>,
    Path(token): Path<String>,
    Json(body): Json<StaffActionRequest>,
) -> Result<StatusCode, ApiError> {
    state.orchestrator.takeover(&token, &body.staff_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /v1/staff/conversations/{token}/release
pub async fn release(
    State(state): State<GatewayState>,
    Path(token): Path<String>,
    Json(body): Json<StaffActionRequest>,
) -> Result<StatusCode, ApiError> {
    state.orchestrator.release(&token, &body.staff_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /v1/staff/conversations/{token}/messages
pub async fn staff_send_message(
    State(state): State<GatewayState>,
    Path(token): Path<String>,
    Json(body): Json<StaffMessageRequest>,
) -> Result<Json<Message>, ApiError> {
    let message = state
        .orchestrator
        .staff_send_message(&token, &body.staff_id, &body.content)
        .await?;
    Ok(Json(message))
}

/// GET /v1/staff/conversations/{token}/transcript
pub async fn get_transcript(
    State(state): State<GatewayState>,
    Path(token): Path<String>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let messages = state.orchestrator.get_transcript(&token).await?;
    Ok(Json(HistoryResponse { messages }))
}
