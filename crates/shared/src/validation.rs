//! Common validation utilities.

use lazy_static::lazy_static;
use regex::Regex;
use validator::ValidationError;

/// Maximum number of manager emails a single church can carry.
pub const MAX_MANAGER_EMAILS: usize = 3;

lazy_static! {
    static ref HEX_COLOR_RE: Regex = Regex::new(r"^#[0-9a-fA-F]{6}$").unwrap();
    static ref EMAIL_RE: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
}

/// Validates a `#rrggbb` theme color.
pub fn validate_theme_color(color: &str) -> Result<(), ValidationError> {
    if HEX_COLOR_RE.is_match(color) {
        Ok(())
    } else {
        let mut err = ValidationError::new("theme_color_format");
        err.message = Some("Theme color must be a hex color like #1a2b3c".into());
        Err(err)
    }
}

/// Validates the manager email list: at most three entries, each a
/// well-formed email address, no duplicates after lowercasing.
pub fn validate_manager_emails(emails: &Vec<String>) -> Result<(), ValidationError> {
    if emails.len() > MAX_MANAGER_EMAILS {
        let mut err = ValidationError::new("manager_emails_count");
        err.message = Some("A church can have at most 3 manager emails".into());
        return Err(err);
    }

    for email in emails {
        if !EMAIL_RE.is_match(email) {
            let mut err = ValidationError::new("manager_email_format");
            err.message = Some(format!("Invalid manager email: {}", email).into());
            return Err(err);
        }
    }

    let mut seen: Vec<String> = emails.iter().map(|e| e.to_lowercase()).collect();
    seen.sort();
    seen.dedup();
    if seen.len() != emails.len() {
        let mut err = ValidationError::new("manager_emails_duplicate");
        err.message = Some("Manager emails must be unique".into());
        return Err(err);
    }

    Ok(())
}

/// Normalizes an email for storage and comparison.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_theme_color() {
        assert!(validate_theme_color("#1a2b3c").is_ok());
        assert!(validate_theme_color("#FFFFFF").is_ok());
        assert!(validate_theme_color("#fff").is_err());
        assert!(validate_theme_color("1a2b3c").is_err());
        assert!(validate_theme_color("#1a2b3g").is_err());
        assert!(validate_theme_color("").is_err());
    }

    #[test]
    fn test_validate_manager_emails_ok() {
        let emails = vec![
            "a@example.com".to_string(),
            "b@example.com".to_string(),
            "c@example.com".to_string(),
        ];
        assert!(validate_manager_emails(&emails).is_ok());
        assert!(validate_manager_emails(&vec![]).is_ok());
    }

    #[test]
    fn test_validate_manager_emails_too_many() {
        let emails = vec![
            "a@example.com".to_string(),
            "b@example.com".to_string(),
            "c@example.com".to_string(),
            "d@example.com".to_string(),
        ];
        let err = validate_manager_emails(&emails).unwrap_err();
        assert_eq!(err.code, "manager_emails_count");
    }

    #[test]
    fn test_validate_manager_emails_malformed() {
        let emails = vec!["not-an-email".to_string()];
        let err = validate_manager_emails(&emails).unwrap_err();
        assert_eq!(err.code, "manager_email_format");
    }

    #[test]
    fn test_validate_manager_emails_duplicate_case_insensitive() {
        let emails = vec!["A@Example.com".to_string(), "a@example.com".to_string()];
        let err = validate_manager_emails(&emails).unwrap_err();
        assert_eq!(err.code, "manager_emails_duplicate");
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Pastor@Example.COM "), "pastor@example.com");
    }
}
