//! Authentication request/response payloads.
//!
//! Both identity domains share the same two-phase wire shape: phase 1
//! returns a short-lived pre-auth token alongside an emailed code, phase 2
//! exchanges {token, code} for a session token.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Phase-1 request for the operator domain.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OperatorLoginRequest {
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Phase-1 request for the manager domain. Managers have no password;
/// possession of the mailbox is the credential.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ManagerLoginRequest {
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
}

/// Phase-2 request, shared by both domains.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpRequest {
    #[validate(length(min = 1, message = "Temporary token is required"))]
    pub temp_token: String,

    #[validate(length(equal = 6, message = "Code must be 6 digits"))]
    pub otp: String,
}

/// Phase-1 response: the code went out by email, present this token with it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginStartResponse {
    pub message: String,
    pub temp_token: String,
    pub email: String,
}

/// Identity block returned with an operator session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorInfo {
    pub id: Uuid,
    pub email: String,
    pub name: String,
}

/// Phase-2 response for the operator domain.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorSessionResponse {
    pub message: String,
    pub token: String,
    pub operator: OperatorInfo,
}

/// Phase-2 response for the manager domain.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerSessionResponse {
    pub message: String,
    pub token: String,
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_login_request_validation() {
        let req = OperatorLoginRequest {
            email: "admin@example.com".to_string(),
            password: "secret123".to_string(),
        };
        assert!(req.validate().is_ok());

        let bad_email = OperatorLoginRequest {
            email: "nope".to_string(),
            password: "secret123".to_string(),
        };
        assert!(bad_email.validate().is_err());
    }

    #[test]
    fn test_verify_request_code_length() {
        let req = VerifyOtpRequest {
            temp_token: "token".to_string(),
            otp: "12345".to_string(),
        };
        assert!(req.validate().is_err());

        let req = VerifyOtpRequest {
            temp_token: "token".to_string(),
            otp: "123456".to_string(),
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_response_casing() {
        let resp = LoginStartResponse {
            message: "OTP sent to your email".to_string(),
            temp_token: "abc".to_string(),
            email: "admin@example.com".to_string(),
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert!(json.get("tempToken").is_some());
        assert!(json.get("temp_token").is_none());
    }
}
