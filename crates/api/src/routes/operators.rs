//! Operator account management routes.
//!
//! Everything here except invitation checks and acceptance is restricted
//! to the configured primary operator.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::auth::OperatorAuth;
use crate::routes::auth::MessageResponse;
use domain::models::operator::{
    AcceptInviteRequest, CreateOperatorRequest, InviteCheckResponse, InviteOperatorRequest,
    ListOperatorsResponse,
};

#[derive(Debug, Deserialize)]
pub struct InviteCheckQuery {
    pub token: String,
}

fn require_primary(state: &AppState, auth: &OperatorAuth) -> Result<(), ApiError> {
    if state.operator_service.is_primary(&auth.email) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "Only the primary operator can manage operator accounts".into(),
        ))
    }
}

/// `GET /api/operators` - list all operator accounts (primary only).
pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<OperatorAuth>,
) -> Result<Json<ListOperatorsResponse>, ApiError> {
    require_primary(&state, &auth)?;

    let operators = state.operator_service.list().await?;
    let count = operators.len();
    Ok(Json(ListOperatorsResponse { operators, count }))
}

/// `POST /api/operators` - create an active account directly, bypassing the
/// invitation flow (primary only).
pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<OperatorAuth>,
    Json(req): Json<CreateOperatorRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    require_primary(&state, &auth)?;
    req.validate()?;

    let operator = state
        .operator_service
        .create(&req.email, &req.name, &req.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: format!("Operator account created for {}", operator.email),
        }),
    ))
}

/// `POST /api/operators/invite` - invite a new operator (primary only).
///
/// Re-inviting a pending account re-issues its token; inviting an active
/// account is a conflict.
pub async fn invite(
    State(state): State<AppState>,
    Extension(auth): Extension<OperatorAuth>,
    Json(req): Json<InviteOperatorRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    require_primary(&state, &auth)?;
    req.validate()?;

    state.operator_service.invite(&req.email, &req.name).await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "Invitation sent".to_string(),
        }),
    ))
}

/// `GET /api/operators/invite/check?token=...` - validity probe for the
/// acceptance page. Unauthenticated; the token is the proof.
pub async fn check_invite(
    State(state): State<AppState>,
    Query(query): Query<InviteCheckQuery>,
) -> Result<Json<InviteCheckResponse>, ApiError> {
    let response = state.operator_service.check_invite(&query.token).await?;
    Ok(Json(response))
}

/// `POST /api/operators/accept-invite` - redeem an invitation and set the
/// account password. Unauthenticated; the token is the proof.
pub async fn accept_invite(
    State(state): State<AppState>,
    Json(req): Json<AcceptInviteRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    req.validate()?;

    let operator = state
        .operator_service
        .accept_invite(&req.token, &req.password)
        .await?;

    Ok(Json(MessageResponse {
        message: format!("Account activated for {}", operator.email),
    }))
}

/// `DELETE /api/operators/:id` - remove an operator account.
///
/// The primary may remove anyone but itself; everyone else may only remove
/// their own account. The service enforces both plus the last-account
/// guard.
pub async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<OperatorAuth>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.operator_service.delete(&auth.email, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
