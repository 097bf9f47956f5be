//! Email delivery for login codes and operator invitations.
//!
//! Supported providers:
//! - `console`: Logs emails to console (development)
//! - `resend`: Sends via the Resend HTTP API

use crate::config::EmailConfig;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

/// Errors that can occur during email operations.
#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Email service not configured")]
    NotConfigured,

    #[error("Failed to send email: {0}")]
    SendFailed(String),

    #[error("Provider error: {0}")]
    ProviderError(String),
}

/// Email message to be sent.
#[derive(Debug, Clone)]
pub struct EmailMessage {
    /// Recipient email address
    pub to: String,
    /// Email subject
    pub subject: String,
    /// Plain text body
    pub body_text: String,
    /// Optional HTML body
    pub body_html: Option<String>,
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    config: Arc<EmailConfig>,
}

impl EmailService {
    pub fn new(config: EmailConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Check if email service is enabled.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Send an email message.
    pub async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
        if !self.config.enabled {
            debug!(
                to = %message.to,
                subject = %message.subject,
                "Email service disabled, skipping send"
            );
            return Ok(());
        }

        match self.config.provider.as_str() {
            "console" => self.send_console(message).await,
            "resend" => self.send_resend(message).await,
            provider => {
                error!(provider = %provider, "Unknown email provider");
                Err(EmailError::NotConfigured)
            }
        }
    }

    /// Send a six-digit login code.
    pub async fn send_login_code(
        &self,
        to_email: &str,
        code: &str,
        expires_minutes: i64,
    ) -> Result<(), EmailError> {
        let subject = format!("{} is your ChurchDonate login code", code);

        let body_text = format!(
            r#"Hello,

Your ChurchDonate login code is:

{code}

The code expires in {minutes} minutes. If you did not try to sign in, you can safely ignore this email.

Best regards,
The ChurchDonate Team"#,
            code = code,
            minutes = expires_minutes
        );

        let body_html = format!(
            r#"<p>Hello,</p>
<p>Your ChurchDonate login code is:</p>
<p style="font-size:28px;font-weight:bold;letter-spacing:4px">{code}</p>
<p>The code expires in {minutes} minutes. If you did not try to sign in, you can safely ignore this email.</p>
<p>Best regards,<br>The ChurchDonate Team</p>"#,
            code = code,
            minutes = expires_minutes
        );

        self.send(EmailMessage {
            to: to_email.to_string(),
            subject,
            body_text,
            body_html: Some(body_html),
        })
        .await
    }

    /// Send an operator invitation with its acceptance link.
    pub async fn send_invitation(
        &self,
        to_email: &str,
        to_name: &str,
        invite_token: &str,
    ) -> Result<(), EmailError> {
        let invite_url = format!("{}/accept-invite?token={}", self.config.base_url, invite_token);

        let subject = "You have been invited to ChurchDonate";

        let body_text = format!(
            r#"Hi {name},

You have been invited to manage ChurchDonate as an operator. Set your password by opening the link below:

{url}

This invitation expires in 7 days.

Best regards,
The ChurchDonate Team"#,
            name = to_name,
            url = invite_url
        );

        let body_html = format!(
            r#"<p>Hi {name},</p>
<p>You have been invited to manage ChurchDonate as an operator. Set your password by opening the link below:</p>
<p><a href="{url}">{url}</a></p>
<p>This invitation expires in 7 days.</p>
<p>Best regards,<br>The ChurchDonate Team</p>"#,
            name = to_name,
            url = invite_url
        );

        self.send(EmailMessage {
            to: to_email.to_string(),
            subject: subject.to_string(),
            body_text,
            body_html: Some(body_html),
        })
        .await
    }

    /// Notify the platform admin that a church asked to join.
    pub async fn send_get_started(
        &self,
        admin_email: &str,
        name: &str,
        contact_email: &str,
        church_name: &str,
        location: &str,
        phone: Option<&str>,
        message: Option<&str>,
    ) -> Result<(), EmailError> {
        let subject = format!("New ChurchDonate request: {}", church_name);

        let phone_line = phone.unwrap_or("not provided");
        let message_line = message.unwrap_or("(none)");

        let body_text = format!(
            r#"A new church has asked to get started on ChurchDonate.

Church: {church}
Location: {location}
Contact: {name} <{email}>
Phone: {phone}

Message:
{message}"#,
            church = church_name,
            location = location,
            name = name,
            email = contact_email,
            phone = phone_line,
            message = message_line
        );

        let body_html = format!(
            r#"<p>A new church has asked to get started on ChurchDonate.</p>
<ul>
<li><strong>Church:</strong> {church}</li>
<li><strong>Location:</strong> {location}</li>
<li><strong>Contact:</strong> {name} &lt;{email}&gt;</li>
<li><strong>Phone:</strong> {phone}</li>
</ul>
<p><strong>Message:</strong><br>{message}</p>"#,
            church = church_name,
            location = location,
            name = name,
            email = contact_email,
            phone = phone_line,
            message = message_line
        );

        self.send(EmailMessage {
            to: admin_email.to_string(),
            subject,
            body_text,
            body_html: Some(body_html),
        })
        .await
    }

    /// Console provider - logs email to console (for development).
    async fn send_console(&self, message: EmailMessage) -> Result<(), EmailError> {
        info!(
            to = %message.to,
            subject = %message.subject,
            from = %self.config.sender_email,
            from_name = %self.config.sender_name,
            "Email (console provider)"
        );

        info!(
            body_text = %message.body_text,
            "Email body"
        );

        Ok(())
    }

    /// Resend provider - sends via the Resend HTTP API.
    async fn send_resend(&self, message: EmailMessage) -> Result<(), EmailError> {
        if self.config.api_key.is_empty() {
            return Err(EmailError::NotConfigured);
        }

        let client = reqwest::Client::new();

        let mut body = serde_json::json!({
            "from": format!("{} <{}>", self.config.sender_name, self.config.sender_email),
            "to": [message.to],
            "subject": message.subject,
            "text": message.body_text,
        });
        if let Some(html) = &message.body_html {
            body["html"] = serde_json::json!(html);
        }

        let response = client
            .post(&self.config.api_url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| EmailError::SendFailed(format!("Resend request failed: {}", e)))?;

        if response.status().is_success() {
            info!(subject = %body["subject"], "Email sent via Resend");
            Ok(())
        } else {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            error!(
                status = %status,
                error = %error_body,
                "Resend API error"
            );
            Err(EmailError::ProviderError(format!(
                "Resend returned {}: {}",
                status, error_body
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> EmailConfig {
        EmailConfig {
            enabled: true,
            provider: "console".to_string(),
            api_url: "https://api.resend.com/emails".to_string(),
            api_key: String::new(),
            sender_email: "test@example.com".to_string(),
            sender_name: "Test".to_string(),
            base_url: "https://app.example.com".to_string(),
        }
    }

    #[test]
    fn test_email_service_creation() {
        let service = EmailService::new(test_config());
        assert!(service.is_enabled());
    }

    #[test]
    fn test_email_service_disabled() {
        let mut config = test_config();
        config.enabled = false;
        let service = EmailService::new(config);
        assert!(!service.is_enabled());
    }

    #[tokio::test]
    async fn test_send_console_email() {
        let service = EmailService::new(test_config());

        let message = EmailMessage {
            to: "user@example.com".to_string(),
            subject: "Test Subject".to_string(),
            body_text: "Test body".to_string(),
            body_html: None,
        };

        assert!(service.send(message).await.is_ok());
    }

    #[tokio::test]
    async fn test_send_disabled_silently_succeeds() {
        let mut config = test_config();
        config.enabled = false;
        let service = EmailService::new(config);

        let message = EmailMessage {
            to: "user@example.com".to_string(),
            subject: "Test".to_string(),
            body_text: "Test".to_string(),
            body_html: None,
        };

        assert!(service.send(message).await.is_ok());
    }

    #[tokio::test]
    async fn test_send_login_code() {
        let service = EmailService::new(test_config());
        let result = service
            .send_login_code("user@example.com", "004217", 10)
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_send_get_started() {
        let service = EmailService::new(test_config());
        let result = service
            .send_get_started(
                "admin@example.com",
                "Jordan Smith",
                "jordan@example.com",
                "Grace Chapel",
                "Bristol, UK",
                None,
                Some("We would like a donation page."),
            )
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_send_invitation() {
        let service = EmailService::new(test_config());
        let result = service
            .send_invitation("user@example.com", "Test User", "token-123")
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_resend_without_api_key_fails() {
        let mut config = test_config();
        config.provider = "resend".to_string();
        let service = EmailService::new(config);

        let message = EmailMessage {
            to: "user@example.com".to_string(),
            subject: "Test".to_string(),
            body_text: "Test".to_string(),
            body_html: None,
        };

        assert!(matches!(
            service.send(message).await,
            Err(EmailError::NotConfigured)
        ));
    }
}
