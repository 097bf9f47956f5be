//! Two-phase login flow shared by the operator and manager domains.
//!
//! Phase 1 (`start`) checks credentials, emails a six-digit code and hands
//! back a short-lived pre-auth token. Phase 2 (`verify`) exchanges that
//! token plus the code for a session token. Each domain gets its own
//! [`LoginFlow`] with its own signing secret, code store and rate windows,
//! so nothing minted on one side is honored by the other.

use crate::config::AuthDomainConfig;
use crate::error::ApiError;
use crate::services::email::EmailService;
use crate::services::otp::{OtpError, OtpService, OtpStore};
use crate::services::rate_limit::{FixedWindowLimiter, RateLimitStore};
use async_trait::async_trait;
use persistence::repositories::{ChurchRepository, OperatorRepository};
use shared::jwt::{TokenError, TokenKind, TokenSigner};
use shared::password::verify_password;
use shared::validation::normalize_email;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum LoginError {
    #[error("Rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: i64 },

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Code error: {0}")]
    Code(#[from] OtpError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<LoginError> for ApiError {
    fn from(err: LoginError) -> Self {
        match err {
            LoginError::RateLimited { retry_after_secs } => {
                ApiError::RateLimited { retry_after_secs }
            }
            LoginError::InvalidCredentials => {
                ApiError::Unauthorized("Invalid credentials".into())
            }
            LoginError::InvalidToken => {
                ApiError::Unauthorized("Invalid or expired login token".into())
            }
            LoginError::Code(OtpError::NotFound) => {
                ApiError::Unauthorized("No pending verification code. Start the login again.".into())
            }
            LoginError::Code(OtpError::Expired) => {
                ApiError::Unauthorized("Verification code has expired. Start the login again.".into())
            }
            LoginError::Code(OtpError::TooManyAttempts) => {
                ApiError::Unauthorized("Too many incorrect codes. Start the login again.".into())
            }
            LoginError::Code(OtpError::InvalidCode) => {
                ApiError::Unauthorized("Incorrect verification code".into())
            }
            LoginError::Internal(msg) => ApiError::Internal(msg),
        }
    }
}

/// Domain-specific credential check performed during phase 1.
///
/// Operators prove a password; managers prove membership in some church's
/// manager list. Either failure collapses to `InvalidCredentials` so the
/// response never discloses whether the identity exists.
#[async_trait]
pub trait CredentialPolicy: Send + Sync {
    async fn authenticate(&self, email: &str, password: Option<&str>) -> Result<(), LoginError>;
}

/// Password check against the operators table. Unknown emails, pending
/// accounts and wrong passwords all look the same to the caller.
pub struct OperatorCredentials {
    operators: OperatorRepository,
}

impl OperatorCredentials {
    pub fn new(operators: OperatorRepository) -> Self {
        Self { operators }
    }
}

#[async_trait]
impl CredentialPolicy for OperatorCredentials {
    async fn authenticate(&self, email: &str, password: Option<&str>) -> Result<(), LoginError> {
        let password = password.ok_or(LoginError::InvalidCredentials)?;

        let operator = self
            .operators
            .find_by_email(email)
            .await
            .map_err(|e| LoginError::Internal(format!("operator lookup failed: {}", e)))?
            .ok_or(LoginError::InvalidCredentials)?
            .into_model()
            .map_err(|e| LoginError::Internal(format!("operator row decode failed: {}", e)))?;

        if !operator.is_active() {
            return Err(LoginError::InvalidCredentials);
        }

        let hash = operator
            .password_hash
            .as_deref()
            .ok_or(LoginError::InvalidCredentials)?;

        let matches = verify_password(password, hash)
            .map_err(|e| LoginError::Internal(format!("password verification failed: {}", e)))?;

        if matches {
            Ok(())
        } else {
            Err(LoginError::InvalidCredentials)
        }
    }
}

/// Manager identity check: the email must appear in at least one church's
/// manager list. Passwords play no part in this domain.
pub struct ManagerCredentials {
    churches: ChurchRepository,
}

impl ManagerCredentials {
    pub fn new(churches: ChurchRepository) -> Self {
        Self { churches }
    }
}

#[async_trait]
impl CredentialPolicy for ManagerCredentials {
    async fn authenticate(&self, email: &str, _password: Option<&str>) -> Result<(), LoginError> {
        let churches = self
            .churches
            .list_by_manager_email(email)
            .await
            .map_err(|e| LoginError::Internal(format!("church lookup failed: {}", e)))?;

        if churches.is_empty() {
            return Err(LoginError::InvalidCredentials);
        }

        Ok(())
    }
}

/// Successful phase 1: the pre-auth token the client must echo in phase 2.
#[derive(Debug)]
pub struct LoginStarted {
    pub email: String,
    pub temp_token: String,
}

/// Successful phase 2: a session token for the flow's domain.
#[derive(Debug)]
pub struct SessionIssued {
    pub email: String,
    pub token: String,
}

/// One identity domain's login pipeline.
#[derive(Clone)]
pub struct LoginFlow {
    domain: &'static str,
    signer: TokenSigner,
    otp: OtpService,
    login_limiter: FixedWindowLimiter,
    verify_limiter: FixedWindowLimiter,
    credentials: Arc<dyn CredentialPolicy>,
    email: EmailService,
    otp_expiry_secs: i64,
}

impl LoginFlow {
    pub fn new(
        domain: &'static str,
        config: &AuthDomainConfig,
        otp_store: Arc<dyn OtpStore>,
        rate_store: Arc<dyn RateLimitStore>,
        credentials: Arc<dyn CredentialPolicy>,
        email: EmailService,
    ) -> Self {
        let signer = TokenSigner::with_leeway(
            &config.jwt_secret,
            config.pre_auth_ttl_secs,
            config.session_ttl_secs,
            config.leeway_secs,
        );

        Self {
            domain,
            signer,
            otp: OtpService::new(otp_store, config.otp_expiry_secs, config.otp_max_attempts),
            login_limiter: FixedWindowLimiter::new(
                rate_store.clone(),
                config.login_max_attempts,
                config.login_window_secs,
            ),
            verify_limiter: FixedWindowLimiter::new(
                rate_store,
                config.verify_max_attempts,
                config.verify_window_secs,
            ),
            credentials,
            email: email.clone(),
            otp_expiry_secs: config.otp_expiry_secs,
        }
    }

    /// Token signer for this domain. Session middleware verifies against it.
    pub fn signer(&self) -> &TokenSigner {
        &self.signer
    }

    /// Phase 1: check credentials, email a code, mint a pre-auth token.
    ///
    /// The rate window is consumed before the credential check so failed
    /// passwords count against it.
    pub async fn start(
        &self,
        raw_email: &str,
        password: Option<&str>,
        client_ip: &str,
    ) -> Result<LoginStarted, LoginError> {
        let email = normalize_email(raw_email);

        let login_key = format!("{}:login:{}:{}", self.domain, email, client_ip);
        self.login_limiter
            .hit(&login_key)
            .map_err(|retry_after_secs| LoginError::RateLimited { retry_after_secs })?;

        self.credentials.authenticate(&email, password).await?;

        let code = self.otp.issue(&email);

        // Best-effort delivery; a lost email just means the code expires
        // unredeemed and the user starts over.
        let mailer = self.email.clone();
        let recipient = email.clone();
        let expires_minutes = self.otp_expiry_secs / 60;
        let domain = self.domain;
        tokio::spawn(async move {
            if let Err(e) = mailer
                .send_login_code(&recipient, &code, expires_minutes)
                .await
            {
                warn!(domain, email = %recipient, error = %e, "Login code email failed");
            }
        });

        let temp_token = self
            .signer
            .mint_pre_auth(&email)
            .map_err(|e| LoginError::Internal(format!("failed to mint pre-auth token: {}", e)))?;

        info!(domain = self.domain, email = %email, "Login started, code sent");

        Ok(LoginStarted { email, temp_token })
    }

    /// Phase 2: exchange the pre-auth token and code for a session token.
    ///
    /// Rate limited per origin only, since the pre-auth token already pins
    /// the identity.
    pub async fn verify(
        &self,
        temp_token: &str,
        code: &str,
        client_ip: &str,
    ) -> Result<SessionIssued, LoginError> {
        let verify_key = format!("{}:verify:{}", self.domain, client_ip);
        self.verify_limiter
            .hit(&verify_key)
            .map_err(|retry_after_secs| LoginError::RateLimited { retry_after_secs })?;

        let claims = self.signer.verify(temp_token).map_err(|e| match e {
            TokenError::Expired | TokenError::Invalid => LoginError::InvalidToken,
            TokenError::Encoding(msg) => LoginError::Internal(msg),
        })?;

        // A session token replayed here must not restart verification.
        if claims.kind != TokenKind::PreAuth {
            warn!(domain = self.domain, "Session token presented for code verification");
            return Err(LoginError::InvalidToken);
        }

        let email = claims.sub;
        self.otp.verify(&email, code)?;

        // Successful login releases the phase-1 window for this identity.
        self.login_limiter
            .reset(&format!("{}:login:{}:{}", self.domain, email, client_ip));

        let token = self
            .signer
            .mint_session(&email)
            .map_err(|e| LoginError::Internal(format!("failed to mint session token: {}", e)))?;

        info!(domain = self.domain, email = %email, "Session issued");

        Ok(SessionIssued { email, token })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::services::otp::InMemoryOtpStore;
    use crate::services::rate_limit::InMemoryRateLimitStore;

    struct AlwaysOk;

    #[async_trait]
    impl CredentialPolicy for AlwaysOk {
        async fn authenticate(&self, _email: &str, _password: Option<&str>) -> Result<(), LoginError> {
            Ok(())
        }
    }

    struct AlwaysDenied;

    #[async_trait]
    impl CredentialPolicy for AlwaysDenied {
        async fn authenticate(&self, _email: &str, _password: Option<&str>) -> Result<(), LoginError> {
            Err(LoginError::InvalidCredentials)
        }
    }

    fn flow(credentials: Arc<dyn CredentialPolicy>) -> LoginFlow {
        let config = Config::load_for_test(&[]).expect("test config");
        LoginFlow::new(
            "operator",
            &config.auth.operator,
            Arc::new(InMemoryOtpStore::new()),
            Arc::new(InMemoryRateLimitStore::new()),
            credentials,
            EmailService::new(config.email.clone()),
        )
    }

    #[tokio::test]
    async fn test_start_normalizes_email_and_mints_pre_auth() {
        let flow = flow(Arc::new(AlwaysOk));
        let started = flow
            .start("  Pastor@Example.COM ", Some("secret"), "1.2.3.4")
            .await
            .expect("start should succeed");

        assert_eq!(started.email, "pastor@example.com");
        let claims = flow.signer().verify(&started.temp_token).expect("valid token");
        assert_eq!(claims.kind, TokenKind::PreAuth);
        assert_eq!(claims.sub, "pastor@example.com");
    }

    #[tokio::test]
    async fn test_start_rejects_bad_credentials() {
        let flow = flow(Arc::new(AlwaysDenied));
        let result = flow.start("pastor@example.com", Some("wrong"), "1.2.3.4").await;
        assert!(matches!(result, Err(LoginError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_start_rate_limits_after_ceiling() {
        let flow = flow(Arc::new(AlwaysDenied));
        // Default window allows 5 phase-1 attempts
        for _ in 0..5 {
            let result = flow.start("pastor@example.com", Some("wrong"), "1.2.3.4").await;
            assert!(matches!(result, Err(LoginError::InvalidCredentials)));
        }
        let result = flow.start("pastor@example.com", Some("wrong"), "1.2.3.4").await;
        assert!(matches!(result, Err(LoginError::RateLimited { .. })));

        // A different origin is unaffected
        let result = flow.start("pastor@example.com", Some("wrong"), "5.6.7.8").await;
        assert!(matches!(result, Err(LoginError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_verify_rejects_garbage_token() {
        let flow = flow(Arc::new(AlwaysOk));
        let result = flow.verify("not-a-token", "123456", "1.2.3.4").await;
        assert!(matches!(result, Err(LoginError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_verify_rejects_session_token() {
        let flow = flow(Arc::new(AlwaysOk));
        let session = flow
            .signer()
            .mint_session("pastor@example.com")
            .expect("mint");
        let result = flow.verify(&session, "123456", "1.2.3.4").await;
        assert!(matches!(result, Err(LoginError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_verify_wrong_code() {
        let flow = flow(Arc::new(AlwaysOk));
        let started = flow
            .start("pastor@example.com", None, "1.2.3.4")
            .await
            .expect("start");
        let result = flow.verify(&started.temp_token, "000000", "1.2.3.4").await;
        // Either the random code happened to be 000000 (one in a million) or
        // this is an invalid-code failure.
        if let Err(e) = result {
            assert!(matches!(e, LoginError::Code(OtpError::InvalidCode)));
        }
    }

    #[tokio::test]
    async fn test_verify_without_pending_code() {
        let flow = flow(Arc::new(AlwaysOk));
        let temp = flow.signer().mint_pre_auth("pastor@example.com").expect("mint");
        let result = flow.verify(&temp, "123456", "1.2.3.4").await;
        assert!(matches!(result, Err(LoginError::Code(OtpError::NotFound))));
    }

    #[test]
    fn test_login_error_maps_to_api_error() {
        use axum::response::IntoResponse;

        let api: ApiError = LoginError::RateLimited {
            retry_after_secs: 60,
        }
        .into();
        let response = api.into_response();
        assert_eq!(response.status(), axum::http::StatusCode::TOO_MANY_REQUESTS);

        let api: ApiError = LoginError::InvalidCredentials.into();
        let response = api.into_response();
        assert_eq!(response.status(), axum::http::StatusCode::UNAUTHORIZED);

        let api: ApiError = LoginError::Code(OtpError::Expired).into();
        let response = api.into_response();
        assert_eq!(response.status(), axum::http::StatusCode::UNAUTHORIZED);
    }
}
