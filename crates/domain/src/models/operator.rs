//! Operator (platform administrator) domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Lifecycle status of an operator account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatorStatus {
    /// Invited, no password set yet. Cannot log in.
    Pending,
    /// Fully provisioned with a password.
    Active,
}

impl OperatorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperatorStatus::Pending => "pending",
            OperatorStatus::Active => "active",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(OperatorStatus::Pending),
            "active" => Some(OperatorStatus::Active),
            _ => None,
        }
    }
}

/// An operator account.
///
/// Invariant: `password_hash` is present exactly when `status` is active,
/// and the invite token fields are present only while pending.
#[derive(Debug, Clone)]
pub struct Operator {
    pub id: Uuid,
    /// Stored lowercase, unique.
    pub email: String,
    pub name: String,
    pub password_hash: Option<String>,
    pub status: OperatorStatus,
    /// SHA-256 of the outstanding invite token, while pending.
    pub invite_token_hash: Option<String>,
    pub invite_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Operator {
    /// Whether the account can authenticate.
    pub fn is_active(&self) -> bool {
        self.status == OperatorStatus::Active && self.password_hash.is_some()
    }

    /// Whether the outstanding invite (if any) is still redeemable.
    pub fn invite_is_live(&self, now: DateTime<Utc>) -> bool {
        self.status == OperatorStatus::Pending
            && self.invite_token_hash.is_some()
            && self.invite_expires_at.is_some_and(|exp| exp > now)
    }
}

/// Operator as returned by the management API. Never carries secrets.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorSummary {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub status: OperatorStatus,
    /// True for the configured primary operator.
    pub is_primary: bool,
    pub created_at: DateTime<Utc>,
}

/// Request to create an operator directly, with a password.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOperatorRequest {
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,

    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

/// Request to invite an operator by email.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InviteOperatorRequest {
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,

    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
}

/// Request to redeem an invitation and set the account password.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AcceptInviteRequest {
    #[validate(length(min = 1, message = "Invitation token is required"))]
    pub token: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

/// Response for the invite-token validity check.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteCheckResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Response wrapper for operator listings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListOperatorsResponse {
    pub operators: Vec<OperatorSummary>,
    pub count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_operator() -> Operator {
        Operator {
            id: Uuid::new_v4(),
            email: "new@example.com".to_string(),
            name: "New Operator".to_string(),
            password_hash: None,
            status: OperatorStatus::Pending,
            invite_token_hash: Some("abc123".to_string()),
            invite_expires_at: Some(Utc::now() + chrono::Duration::days(7)),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_status_round_trip() {
        assert_eq!(OperatorStatus::parse("active"), Some(OperatorStatus::Active));
        assert_eq!(
            OperatorStatus::parse(OperatorStatus::Pending.as_str()),
            Some(OperatorStatus::Pending)
        );
        assert_eq!(OperatorStatus::parse("deleted"), None);
    }

    #[test]
    fn test_pending_operator_cannot_authenticate() {
        let op = pending_operator();
        assert!(!op.is_active());
        assert!(op.invite_is_live(Utc::now()));
    }

    #[test]
    fn test_expired_invite_is_not_live() {
        let mut op = pending_operator();
        op.invite_expires_at = Some(Utc::now() - chrono::Duration::hours(1));
        assert!(!op.invite_is_live(Utc::now()));
    }

    #[test]
    fn test_create_request_password_length() {
        let req = CreateOperatorRequest {
            email: "op@example.com".to_string(),
            name: "Op".to_string(),
            password: "short".to_string(),
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_invite_request_email_format() {
        let req = InviteOperatorRequest {
            email: "not-an-email".to_string(),
            name: "Op".to_string(),
        };
        assert!(req.validate().is_err());
    }
}
