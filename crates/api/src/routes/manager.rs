//! Manager surface: passwordless login plus maintenance of the churches
//! the manager's email is listed on.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::auth::ManagerAuth;
use crate::middleware::metrics::record_login_succeeded;
use crate::routes::churches::{decode_image_data_url, UploadLogoRequest};
use crate::routes::client_ip;
use domain::models::auth::{
    LoginStartResponse, ManagerLoginRequest, ManagerSessionResponse, VerifyOtpRequest,
};
use domain::models::church::{Church, ListChurchesResponse, UpdateChurchRequest};

/// `POST /api/manager/login` - phase 1.
///
/// No password: the emailed code is the whole credential. The email must be
/// on at least one church's manager list, but the response never says
/// which failure occurred.
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ManagerLoginRequest>,
) -> Result<Json<LoginStartResponse>, ApiError> {
    req.validate()?;

    let ip = client_ip(&headers);
    let started = state.manager_flow.start(&req.email, None, &ip).await?;

    Ok(Json(LoginStartResponse {
        message: "OTP sent to your email".to_string(),
        temp_token: started.temp_token,
        email: started.email,
    }))
}

/// `POST /api/manager/verify-otp` - phase 2.
pub async fn verify_otp(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<VerifyOtpRequest>,
) -> Result<Json<ManagerSessionResponse>, ApiError> {
    req.validate()?;

    let ip = client_ip(&headers);
    let session = state
        .manager_flow
        .verify(&req.temp_token, &req.otp, &ip)
        .await?;

    record_login_succeeded("manager");

    Ok(Json(ManagerSessionResponse {
        message: "Login successful".to_string(),
        token: session.token,
        email: session.email,
    }))
}

/// `GET /api/manager/churches` - the churches this manager may maintain.
pub async fn list_churches(
    State(state): State<AppState>,
    Extension(auth): Extension<ManagerAuth>,
) -> Result<Json<ListChurchesResponse>, ApiError> {
    let churches = state.church_service.list_for_manager(&auth.email).await?;
    let count = churches.len();
    Ok(Json(ListChurchesResponse { churches, count }))
}

/// `GET /api/manager/churches/:id` - one managed church, 403 when the
/// caller's email is not on its manager list.
pub async fn get_church(
    State(state): State<AppState>,
    Extension(auth): Extension<ManagerAuth>,
    Path(id): Path<Uuid>,
) -> Result<Json<Church>, ApiError> {
    let church = state.church_service.manager_get(id, &auth.email).await?;
    Ok(Json(church))
}

/// `POST /api/manager/churches/:id/logo` - upload a logo as a base64 data
/// URL for a managed church.
pub async fn upload_logo(
    State(state): State<AppState>,
    Extension(auth): Extension<ManagerAuth>,
    Path(id): Path<Uuid>,
    Json(req): Json<UploadLogoRequest>,
) -> Result<Json<Church>, ApiError> {
    let (bytes, content_type) = decode_image_data_url(&req.image)?;

    let church = state
        .church_service
        .manager_upload_logo(id, &auth.email, &bytes, &content_type)
        .await?;

    Ok(Json(church))
}

/// `PUT /api/manager/churches/:id` - update a managed church profile.
///
/// The slug never changes on this path, and the manager cannot drop their
/// own email from the manager list.
pub async fn update_church(
    State(state): State<AppState>,
    Extension(auth): Extension<ManagerAuth>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateChurchRequest>,
) -> Result<Json<Church>, ApiError> {
    req.validate()?;

    let church = state
        .church_service
        .manager_update(id, &auth.email, req)
        .await?;

    Ok(Json(church))
}
