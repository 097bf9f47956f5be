//! Operator authentication routes: two-phase login and first-run setup.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Serialize;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::metrics::record_login_succeeded;
use crate::routes::client_ip;
use domain::models::auth::{
    LoginStartResponse, OperatorInfo, OperatorLoginRequest, OperatorSessionResponse,
    VerifyOtpRequest,
};
use domain::models::operator::CreateOperatorRequest;

/// First-run setup status.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupStatusResponse {
    pub setup_required: bool,
}

/// Generic confirmation payload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub message: String,
}

/// `GET /api/auth/setup` - whether the initial operator still needs creating.
pub async fn setup_status(
    State(state): State<AppState>,
) -> Result<Json<SetupStatusResponse>, ApiError> {
    let exists = state.operator_service.any_operator_exists().await?;
    Ok(Json(SetupStatusResponse {
        setup_required: !exists,
    }))
}

/// `POST /api/auth/setup` - create the initial operator account.
///
/// Open by necessity (there is nobody to authenticate yet) and inert once
/// any account exists.
pub async fn setup(
    State(state): State<AppState>,
    Json(req): Json<CreateOperatorRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    req.validate()?;

    let operator = state
        .operator_service
        .create_first_operator(&req.email, &req.name, &req.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: format!("Operator account created for {}", operator.email),
        }),
    ))
}

/// `POST /api/auth/login` - phase 1: password check, code sent by email.
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<OperatorLoginRequest>,
) -> Result<Json<LoginStartResponse>, ApiError> {
    req.validate()?;

    let ip = client_ip(&headers);
    let started = state
        .operator_flow
        .start(&req.email, Some(&req.password), &ip)
        .await?;

    Ok(Json(LoginStartResponse {
        message: "OTP sent to your email".to_string(),
        temp_token: started.temp_token,
        email: started.email,
    }))
}

/// `POST /api/auth/verify-otp` - phase 2: code check, session issued.
pub async fn verify_otp(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<VerifyOtpRequest>,
) -> Result<Json<OperatorSessionResponse>, ApiError> {
    req.validate()?;

    let ip = client_ip(&headers);
    let session = state
        .operator_flow
        .verify(&req.temp_token, &req.otp, &ip)
        .await?;

    let operator = state
        .operator_repo
        .find_by_email(&session.email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Account no longer exists".into()))?
        .into_model()?;

    record_login_succeeded("operator");

    Ok(Json(OperatorSessionResponse {
        message: "Login successful".to_string(),
        token: session.token,
        operator: OperatorInfo {
            id: operator.id,
            email: operator.email,
            name: operator.name,
        },
    }))
}
