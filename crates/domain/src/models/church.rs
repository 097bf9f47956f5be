//! Church domain models.
//!
//! A church is the tenant unit of the platform: it owns a public donation
//! page (addressed by public ID or slug), a hosted QR code pointing at that
//! page, bank details to donate to, and an optional list of manager emails
//! who may maintain the profile without an operator account.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use shared::validation::{validate_manager_emails, validate_theme_color};

lazy_static::lazy_static! {
    static ref COUNTRY_CODE_REGEX: regex::Regex =
        regex::Regex::new(r"^[A-Z]{2}$").unwrap();
}

/// Where a public page visit came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisitSource {
    /// Direct page open (link, search, bookmark).
    Page,
    /// QR code scan (`?source=qr` on the public URL).
    Qr,
}

/// Bank details displayed on the donation page.
///
/// Bank name and account name are always required; at least one concrete
/// payment route (IBAN, account number, or pay link) must be present.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = validate_payment_method))]
pub struct BankDetails {
    #[validate(length(min = 1, message = "Bank name is required"))]
    pub bank_name: String,

    #[validate(length(min = 1, message = "Account name is required"))]
    pub account_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub iban: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_number: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_code: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub swift_code: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub routing_number: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub revolut_link: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_info: Option<String>,
}

fn validate_payment_method(details: &BankDetails) -> Result<(), ValidationError> {
    let has_any = [&details.iban, &details.account_number, &details.revolut_link]
        .iter()
        .any(|f| f.as_deref().is_some_and(|v| !v.trim().is_empty()));

    if has_any {
        Ok(())
    } else {
        let mut err = ValidationError::new("payment_method_required");
        err.message = Some(
            "At least one payment method required (IBAN, account number, or pay link)".into(),
        );
        Err(err)
    }
}

/// A church tenant record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Church {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    /// URL-friendly identifier derived from the name.
    pub slug: String,
    /// Stable public identifier printed on QR codes (xxxxx-xxxxx-xxxxx-xxxxx).
    pub public_id: String,
    /// ISO 3166-1 alpha-2 country code, uppercase.
    pub country: String,
    pub address: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme_color: Option<String>,
    /// Emails allowed to maintain this profile. Never shown publicly.
    pub manager_emails: Vec<String>,
    pub bank_details: BankDetails,
    /// Hosted QR image pointing at the public page with `?source=qr`.
    pub qr_code_url: String,
    pub page_views: i64,
    pub qr_scans: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to create a church (operator only).
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateChurchRequest {
    #[validate(length(min = 1, max = 200, message = "Church name is required"))]
    pub name: String,

    pub nickname: Option<String>,

    #[validate(regex(
        path = *COUNTRY_CODE_REGEX,
        message = "Country must be a 2-letter uppercase code"
    ))]
    pub country: String,

    #[validate(length(min = 1, message = "Address is required"))]
    pub address: String,

    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,

    pub logo: Option<String>,

    #[validate(custom(function = validate_optional_theme_color))]
    pub theme_color: Option<String>,

    #[serde(default)]
    #[validate(custom(function = validate_manager_emails))]
    pub manager_emails: Vec<String>,

    #[validate(nested)]
    pub bank_details: BankDetails,
}

/// Request to update a church.
///
/// Used by both the operator and the manager surface; absent fields keep
/// their current value. Public ID, slug, and the QR reference are never
/// client-writable (the operator path regenerates the slug itself when the
/// name changes).
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateChurchRequest {
    #[validate(length(min = 1, max = 200, message = "Church name cannot be empty"))]
    pub name: Option<String>,

    pub nickname: Option<String>,

    #[validate(regex(
        path = *COUNTRY_CODE_REGEX,
        message = "Country must be a 2-letter uppercase code"
    ))]
    pub country: Option<String>,

    #[validate(length(min = 1, message = "Address cannot be empty"))]
    pub address: Option<String>,

    #[validate(length(min = 1, message = "Description cannot be empty"))]
    pub description: Option<String>,

    pub logo: Option<String>,

    #[validate(custom(function = validate_optional_theme_color))]
    pub theme_color: Option<String>,

    #[validate(custom(function = validate_optional_manager_emails))]
    pub manager_emails: Option<Vec<String>>,

    #[validate(nested)]
    pub bank_details: Option<BankDetails>,
}

fn validate_optional_theme_color(color: &str) -> Result<(), ValidationError> {
    validate_theme_color(color)
}

fn validate_optional_manager_emails(emails: &Vec<String>) -> Result<(), ValidationError> {
    validate_manager_emails(emails)
}

/// Public projection of a church for the donation page.
///
/// Excludes manager emails, counters, and internal identifiers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicChurchView {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    pub slug: String,
    pub public_id: String,
    pub country: String,
    pub address: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme_color: Option<String>,
    pub bank_details: BankDetails,
}

impl From<Church> for PublicChurchView {
    fn from(church: Church) -> Self {
        Self {
            name: church.name,
            nickname: church.nickname,
            slug: church.slug,
            public_id: church.public_id,
            country: church.country,
            address: church.address,
            description: church.description,
            logo: church.logo,
            theme_color: church.theme_color,
            bank_details: church.bank_details,
        }
    }
}

/// Response wrapper for church listings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListChurchesResponse {
    pub churches: Vec<Church>,
    pub count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_bank_details() -> BankDetails {
        BankDetails {
            bank_name: "First National".to_string(),
            account_name: "Grace Chapel".to_string(),
            iban: Some("GB29NWBK60161331926819".to_string()),
            account_number: None,
            sort_code: None,
            swift_code: None,
            routing_number: None,
            revolut_link: None,
            additional_info: None,
        }
    }

    fn valid_create_request() -> CreateChurchRequest {
        CreateChurchRequest {
            name: "Grace Chapel".to_string(),
            nickname: None,
            country: "GB".to_string(),
            address: "1 Church Lane".to_string(),
            description: "A parish church".to_string(),
            logo: None,
            theme_color: None,
            manager_emails: vec![],
            bank_details: valid_bank_details(),
        }
    }

    #[test]
    fn test_bank_details_require_payment_method() {
        let mut details = valid_bank_details();
        assert!(details.validate().is_ok());

        details.iban = None;
        assert!(details.validate().is_err());

        details.revolut_link = Some("https://revolut.me/gracechapel".to_string());
        assert!(details.validate().is_ok());

        // Whitespace-only does not count
        details.revolut_link = Some("   ".to_string());
        assert!(details.validate().is_err());
    }

    #[test]
    fn test_bank_details_require_names() {
        let mut details = valid_bank_details();
        details.bank_name = String::new();
        assert!(details.validate().is_err());
    }

    #[test]
    fn test_create_request_valid() {
        assert!(valid_create_request().validate().is_ok());
    }

    #[test]
    fn test_create_request_country_code() {
        let mut req = valid_create_request();
        req.country = "gb".to_string();
        assert!(req.validate().is_err());

        req.country = "GBR".to_string();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_create_request_manager_emails_limit() {
        let mut req = valid_create_request();
        req.manager_emails = vec![
            "a@example.com".to_string(),
            "b@example.com".to_string(),
            "c@example.com".to_string(),
            "d@example.com".to_string(),
        ];
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_create_request_theme_color() {
        let mut req = valid_create_request();
        req.theme_color = Some("#1a2b3c".to_string());
        assert!(req.validate().is_ok());

        req.theme_color = Some("blue".to_string());
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_update_request_all_absent_is_valid() {
        assert!(UpdateChurchRequest::default().validate().is_ok());
    }

    #[test]
    fn test_public_view_excludes_manager_emails() {
        let church = Church {
            id: Uuid::new_v4(),
            name: "Grace Chapel".to_string(),
            nickname: None,
            slug: "grace-chapel-abc123".to_string(),
            public_id: "abc12-def34-ghi56-jkl78".to_string(),
            country: "GB".to_string(),
            address: "1 Church Lane".to_string(),
            description: "A parish church".to_string(),
            logo: None,
            theme_color: None,
            manager_emails: vec!["manager@example.com".to_string()],
            bank_details: valid_bank_details(),
            qr_code_url: "https://media.example.com/qr/abc.png".to_string(),
            page_views: 10,
            qr_scans: 3,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let view = PublicChurchView::from(church);
        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("managerEmails").is_none());
        assert!(json.get("pageViews").is_none());
        assert_eq!(json["publicId"], "abc12-def34-ghi56-jkl78");
    }

    #[test]
    fn test_visit_source_deserialization() {
        assert_eq!(
            serde_json::from_str::<VisitSource>("\"qr\"").unwrap(),
            VisitSource::Qr
        );
        assert_eq!(
            serde_json::from_str::<VisitSource>("\"page\"").unwrap(),
            VisitSource::Page
        );
    }
}
