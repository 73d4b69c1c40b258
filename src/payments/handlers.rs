use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::AuthUser,
    error::ApiError,
    payments::{
        dto::{MarkPaymentRequest, MarkPaymentResponse, PendingPaymentsResponse},
        services,
    },
    state::AppState,
};

pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/payments", post(mark_payment))
        .route("/payments/pending", get(pending_payments))
}

#[instrument(skip(state, payload))]
pub async fn mark_payment(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<MarkPaymentRequest>,
) -> Result<Json<MarkPaymentResponse>, ApiError> {
    services::mark_payment(&state.db, payload.group_id, user_id, &payload.remarks).await?;
    Ok(Json(MarkPaymentResponse {
        message: "Payment marked successfully".into(),
    }))
}

#[instrument(skip(state))]
pub async fn pending_payments(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PendingPaymentsResponse>, ApiError> {
    let response = services::pending_payments(&state.db, user_id).await?;
    Ok(Json(response))
}
