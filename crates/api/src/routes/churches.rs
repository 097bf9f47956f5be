//! Operator church management routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use base64::Engine;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::metrics::record_church_created;
use domain::models::church::{
    Church, CreateChurchRequest, ListChurchesResponse, UpdateChurchRequest,
};

/// Logo uploads are capped at 5 MiB (decoded).
const MAX_LOGO_BYTES: usize = 5 * 1024 * 1024;

/// Logo payload: a base64 data URL as produced by a browser file reader.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadLogoRequest {
    pub image: String,
}

/// Splits an `image/*` base64 data URL into bytes and content type.
pub(crate) fn decode_image_data_url(data_url: &str) -> Result<(Vec<u8>, String), ApiError> {
    let rest = data_url
        .strip_prefix("data:")
        .ok_or_else(|| ApiError::Validation("Logo must be a base64 data URL".into()))?;

    let (content_type, payload) = rest
        .split_once(";base64,")
        .ok_or_else(|| ApiError::Validation("Logo must be a base64 data URL".into()))?;

    if !content_type.starts_with("image/") {
        return Err(ApiError::Validation(
            "Logo must be an image (image/png, image/jpeg, ...)".into(),
        ));
    }

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|_| ApiError::Validation("Logo image is not valid base64".into()))?;

    if bytes.is_empty() {
        return Err(ApiError::Validation("Logo image is required".into()));
    }
    if bytes.len() > MAX_LOGO_BYTES {
        return Err(ApiError::Validation(
            "Logo image must be 5 MB or smaller".into(),
        ));
    }

    Ok((bytes, content_type.to_string()))
}

/// `GET /api/churches` - every church, newest first.
pub async fn list(State(state): State<AppState>) -> Result<Json<ListChurchesResponse>, ApiError> {
    let churches = state.church_service.list().await?;
    let count = churches.len();
    Ok(Json(ListChurchesResponse { churches, count }))
}

/// `POST /api/churches` - create a church profile.
pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreateChurchRequest>,
) -> Result<(StatusCode, Json<Church>), ApiError> {
    req.validate()?;

    let church = state.church_service.create(req).await?;
    record_church_created();

    Ok((StatusCode::CREATED, Json(church)))
}

/// `GET /api/churches/:id` - full profile, counters included.
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Church>, ApiError> {
    let church = state.church_service.get(id).await?;
    Ok(Json(church))
}

/// `PUT /api/churches/:id` - update a profile. A name change regenerates
/// the slug.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateChurchRequest>,
) -> Result<Json<Church>, ApiError> {
    req.validate()?;

    let church = state.church_service.operator_update(id, req).await?;
    Ok(Json(church))
}

/// `DELETE /api/churches/:id` - remove a church and its hosted media.
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.church_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/churches/:id/logo` - upload a logo as a base64 data URL. The
/// stored hosted URL replaces any previous logo.
pub async fn upload_logo(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UploadLogoRequest>,
) -> Result<Json<Church>, ApiError> {
    let (bytes, content_type) = decode_image_data_url(&req.image)?;

    let church = state
        .church_service
        .upload_logo(id, &bytes, &content_type)
        .await?;

    Ok(Json(church))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_image_data_url() {
        let (bytes, content_type) =
            decode_image_data_url("data:image/png;base64,aGVsbG8=").expect("valid data URL");
        assert_eq!(bytes, b"hello");
        assert_eq!(content_type, "image/png");
    }

    #[test]
    fn test_decode_rejects_non_image() {
        assert!(decode_image_data_url("data:text/plain;base64,aGVsbG8=").is_err());
    }

    #[test]
    fn test_decode_rejects_plain_string() {
        assert!(decode_image_data_url("not a data url").is_err());
        assert!(decode_image_data_url("data:image/png;base64,%%%").is_err());
    }

    #[test]
    fn test_decode_rejects_empty_payload() {
        assert!(decode_image_data_url("data:image/png;base64,").is_err());
    }
}
