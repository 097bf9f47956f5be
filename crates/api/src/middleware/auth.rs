//! Session authentication middleware.
//!
//! Verifies `Authorization: Bearer` session tokens against the signer of
//! the relevant identity domain. Tokens are only honored when their kind
//! is `session`; a pre-auth token from an unfinished login gets a 401 even
//! though it carries a valid signature.

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use shared::jwt::TokenKind;

use crate::app::AppState;

/// Authenticated operator identity, inserted into request extensions.
#[derive(Debug, Clone)]
pub struct OperatorAuth {
    pub email: String,
}

/// Authenticated manager identity, inserted into request extensions.
#[derive(Debug, Clone)]
pub struct ManagerAuth {
    pub email: String,
}

/// Middleware guarding operator-only routes.
pub async fn require_operator_session(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let token = match bearer_token(&req) {
        Some(token) => token,
        None => return unauthorized_response("Missing authorization token"),
    };

    let claims = match state.operator_flow.signer().verify(&token) {
        Ok(claims) => claims,
        Err(_) => return unauthorized_response("Invalid or expired session"),
    };

    if claims.kind != TokenKind::Session {
        return unauthorized_response("Invalid or expired session");
    }

    // The account behind the token may have been deleted since issuance.
    let operator = match state.operator_repo.find_by_email(&claims.sub).await {
        Ok(Some(entity)) => match entity.into_model() {
            Ok(op) => op,
            Err(_) => return internal_error_response(),
        },
        Ok(None) => return unauthorized_response("Account no longer exists"),
        Err(_) => return internal_error_response(),
    };

    if !operator.is_active() {
        return unauthorized_response("Account no longer exists");
    }

    req.extensions_mut().insert(OperatorAuth {
        email: operator.email,
    });
    next.run(req).await
}

/// Middleware guarding manager-only routes.
///
/// Membership in a specific church's manager list is checked per handler;
/// this only proves the session is a live manager session.
pub async fn require_manager_session(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let token = match bearer_token(&req) {
        Some(token) => token,
        None => return unauthorized_response("Missing authorization token"),
    };

    let claims = match state.manager_flow.signer().verify(&token) {
        Ok(claims) => claims,
        Err(_) => return unauthorized_response("Invalid or expired session"),
    };

    if claims.kind != TokenKind::Session {
        return unauthorized_response("Invalid or expired session");
    }

    req.extensions_mut().insert(ManagerAuth { email: claims.sub });
    next.run(req).await
}

fn bearer_token(req: &Request<Body>) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|v| v.to_string())
}

fn unauthorized_response(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "error": "unauthorized",
            "message": message,
        })),
    )
        .into_response()
}

fn internal_error_response() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": "internal_error",
            "message": "An internal error occurred",
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with_auth(value: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/api/churches");
        if let Some(v) = value {
            builder = builder.header(header::AUTHORIZATION, v);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_bearer_token_present() {
        let req = request_with_auth(Some("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&req), Some("abc.def.ghi".to_string()));
    }

    #[test]
    fn test_bearer_token_missing_header() {
        let req = request_with_auth(None);
        assert_eq!(bearer_token(&req), None);
    }

    #[test]
    fn test_bearer_token_wrong_scheme() {
        let req = request_with_auth(Some("Basic dXNlcjpwYXNz"));
        assert_eq!(bearer_token(&req), None);
    }

    #[test]
    fn test_unauthorized_response_status() {
        let response = unauthorized_response("nope");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
