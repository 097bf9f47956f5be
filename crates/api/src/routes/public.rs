//! Public routes: the donation page and the get-started form. No
//! authentication.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::metrics::record_public_visit;
use domain::models::church::{PublicChurchView, VisitSource};

#[derive(Debug, Default, Deserialize)]
pub struct VisitQuery {
    /// `qr` when the visitor scanned the printed code; anything else is a
    /// plain page visit.
    pub source: Option<String>,
}

/// `GET /api/public/churches/:public_id` - the donation page payload.
///
/// Every hit bumps the page or QR counter for the church, depending on
/// the `source` query parameter.
pub async fn get_church(
    State(state): State<AppState>,
    Path(public_id): Path<String>,
    Query(query): Query<VisitQuery>,
) -> Result<Json<PublicChurchView>, ApiError> {
    let source = match query.source.as_deref() {
        Some("qr") => VisitSource::Qr,
        _ => VisitSource::Page,
    };

    let view = state.church_service.public_view(&public_id, source).await?;

    record_public_visit(match source {
        VisitSource::Qr => "qr",
        VisitSource::Page => "page",
    });

    Ok(Json(view))
}

/// The get-started contact form, submitted by churches that want a page.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GetStartedRequest {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, max = 200, message = "Church name is required"))]
    pub church_name: String,

    #[validate(length(min = 1, max = 200, message = "Location is required"))]
    pub location: String,

    pub phone: Option<String>,

    #[validate(length(max = 2000, message = "Message is too long"))]
    pub message: Option<String>,
}

/// `POST /api/get-started` - forward a joining request to the platform
/// admin.
///
/// The submission is accepted once it validates; a failed notification
/// email is logged, not surfaced, so the form never bounces on an email
/// outage.
pub async fn get_started(
    State(state): State<AppState>,
    Json(req): Json<GetStartedRequest>,
) -> Result<Json<Value>, ApiError> {
    req.validate()?;

    let mailer = state.email_service.clone();
    let admin = state.config.auth.primary_operator_email.clone();
    tokio::spawn(async move {
        if let Err(e) = mailer
            .send_get_started(
                &admin,
                &req.name,
                &req.email,
                &req.church_name,
                &req.location,
                req.phone.as_deref(),
                req.message.as_deref(),
            )
            .await
        {
            warn!(church = %req.church_name, error = %e, "Get-started notification failed");
        }
    });

    Ok(Json(json!({
        "message": "Request submitted successfully. We'll be in touch soon!",
        "success": true,
    })))
}
