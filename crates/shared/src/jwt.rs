//! JWT bearer tokens for the two-phase login flow.
//!
//! Tokens are signed with HS256. Each identity domain (operator, manager)
//! gets its own [`TokenSigner`] built from its own secret, so a token minted
//! for one domain can never verify in the other.
//!
//! The signer is deliberately kind-agnostic: [`TokenSigner::verify`] returns
//! the claims without checking [`Claims::kind`]. Enforcing that a pre-auth
//! token is not used where a session token is required (and vice versa) is
//! the caller's responsibility (the login flow and the auth middleware).

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Error type for token operations.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Failed to encode token: {0}")]
    Encoding(String),

    #[error("Token has expired")]
    Expired,

    #[error("Invalid token")]
    Invalid,
}

/// Which phase of the login flow a token belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenKind {
    /// Short-lived, proves phase-1 success; only valid for completing
    /// code verification.
    PreAuth,
    /// Proves full authentication; required for protected operations.
    Session,
}

/// Token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the authenticated email address, lowercase.
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Unique token identifier
    pub jti: String,
    /// Token kind discriminator
    pub kind: TokenKind,
}

/// Mints and verifies tokens for one identity domain.
#[derive(Clone)]
pub struct TokenSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    /// Pre-auth token lifetime in seconds.
    pub pre_auth_ttl_secs: i64,
    /// Session token lifetime in seconds.
    pub session_ttl_secs: i64,
    /// Clock-skew tolerance in seconds.
    pub leeway_secs: u64,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("pre_auth_ttl_secs", &self.pre_auth_ttl_secs)
            .field("session_ttl_secs", &self.session_ttl_secs)
            .field("leeway_secs", &self.leeway_secs)
            .field("encoding_key", &"[REDACTED]")
            .field("decoding_key", &"[REDACTED]")
            .finish()
    }
}

/// Default leeway in seconds for clock skew tolerance
pub const DEFAULT_LEEWAY_SECS: u64 = 30;

impl TokenSigner {
    /// Creates a signer from a shared secret and per-kind lifetimes.
    pub fn new(secret: &str, pre_auth_ttl_secs: i64, session_ttl_secs: i64) -> Self {
        Self::with_leeway(
            secret,
            pre_auth_ttl_secs,
            session_ttl_secs,
            DEFAULT_LEEWAY_SECS,
        )
    }

    /// Creates a signer with a custom clock-skew leeway.
    pub fn with_leeway(
        secret: &str,
        pre_auth_ttl_secs: i64,
        session_ttl_secs: i64,
        leeway_secs: u64,
    ) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            pre_auth_ttl_secs,
            session_ttl_secs,
            leeway_secs,
        }
    }

    /// Mints a pre-auth token for the given identity.
    pub fn mint_pre_auth(&self, email: &str) -> Result<String, TokenError> {
        self.mint(email, TokenKind::PreAuth, self.pre_auth_ttl_secs)
    }

    /// Mints a session token for the given identity.
    pub fn mint_session(&self, email: &str) -> Result<String, TokenError> {
        self.mint(email, TokenKind::Session, self.session_ttl_secs)
    }

    fn mint(&self, email: &str, kind: TokenKind, ttl_secs: i64) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            sub: email.to_lowercase(),
            exp: (now + Duration::seconds(ttl_secs)).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
            kind,
        };

        let header = Header::new(Algorithm::HS256);
        encode(&header, &claims, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// Verifies signature and expiry and returns the claims.
    ///
    /// Does NOT check the token kind; callers must compare
    /// [`Claims::kind`] against the kind they expect.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = self.leeway_secs;

        let token_data =
            decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration as StdDuration;

    fn create_test_signer() -> TokenSigner {
        // Zero leeway so expiry tests are deterministic
        TokenSigner::with_leeway("test_secret_key_for_token_testing_12345", 600, 3600, 0)
    }

    #[test]
    fn test_mint_pre_auth_token() {
        let signer = create_test_signer();
        let token = signer.mint_pre_auth("pastor@example.com").unwrap();

        assert!(!token.is_empty());
        assert!(token.contains('.'), "JWT should have dots separating parts");
    }

    #[test]
    fn test_verify_returns_claims() {
        let signer = create_test_signer();
        let token = signer.mint_session("Pastor@Example.com").unwrap();
        let claims = signer.verify(&token).unwrap();

        assert_eq!(claims.sub, "pastor@example.com", "subject is lowercased");
        assert_eq!(claims.kind, TokenKind::Session);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_kind_is_preserved_not_enforced() {
        // The signer reports the kind; it is up to the caller to reject
        // a pre-auth token where a session token is required.
        let signer = create_test_signer();
        let token = signer.mint_pre_auth("admin@example.com").unwrap();
        let claims = signer.verify(&token).unwrap();

        assert_eq!(claims.kind, TokenKind::PreAuth);
    }

    #[test]
    fn test_expired_token() {
        let mut signer = create_test_signer();
        signer.pre_auth_ttl_secs = 1;

        let token = signer.mint_pre_auth("admin@example.com").unwrap();
        sleep(StdDuration::from_secs(2));

        let result = signer.verify(&token);
        assert!(
            matches!(result, Err(TokenError::Expired)),
            "Expected Expired, got: {:?}",
            result
        );
    }

    #[test]
    fn test_cross_domain_rejection() {
        // Two signers with different secrets: tokens must not cross over.
        let operator = TokenSigner::new("operator-secret-aaaaaaaaaaaaaaaa", 600, 604800);
        let manager = TokenSigner::new("manager-secret-bbbbbbbbbbbbbbbbb", 600, 3600);

        let token = operator.mint_session("admin@example.com").unwrap();
        assert!(matches!(manager.verify(&token), Err(TokenError::Invalid)));
    }

    #[test]
    fn test_invalid_token() {
        let signer = create_test_signer();
        assert!(matches!(
            signer.verify("invalid.token.here"),
            Err(TokenError::Invalid)
        ));
        assert!(signer.verify("not_a_jwt").is_err());
    }

    #[test]
    fn test_unique_jti_per_token() {
        let signer = create_test_signer();
        let a = signer.mint_session("admin@example.com").unwrap();
        let b = signer.mint_session("admin@example.com").unwrap();

        let jti_a = signer.verify(&a).unwrap().jti;
        let jti_b = signer.verify(&b).unwrap().jti;
        assert_ne!(jti_a, jti_b, "Each token should have a unique jti");
    }

    #[test]
    fn test_token_kind_serialization() {
        assert_eq!(
            serde_json::to_string(&TokenKind::PreAuth).unwrap(),
            "\"pre-auth\""
        );
        assert_eq!(
            serde_json::to_string(&TokenKind::Session).unwrap(),
            "\"session\""
        );
    }
}
