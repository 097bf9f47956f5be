//! Operator account administration: first-run setup, invitations and
//! account removal safeguards.

use crate::error::ApiError;
use crate::services::email::EmailService;
use chrono::{Duration, Utc};
use domain::models::operator::{InviteCheckResponse, Operator, OperatorSummary};
use persistence::repositories::OperatorRepository;
use shared::crypto::{generate_invite_token, sha256_hex};
use shared::password::hash_password;
use shared::validation::normalize_email;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

/// Invitations stay redeemable for a week.
const INVITE_TTL_DAYS: i64 = 7;

#[derive(Debug, Error)]
pub enum OperatorError {
    #[error("Operator not found")]
    NotFound,

    #[error("An operator account already exists for this email")]
    AlreadyActive,

    #[error("Setup has already been completed")]
    SetupAlreadyDone,

    #[error("The primary operator account cannot be deleted")]
    ProtectedAccount,

    #[error("Cannot delete the last active operator account")]
    LastAccountStanding,

    #[error("Invitation not found or expired")]
    InvalidInvite,

    #[error("Operators may only delete their own account")]
    NotOwnAccount,

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<OperatorError> for ApiError {
    fn from(err: OperatorError) -> Self {
        match err {
            OperatorError::NotFound => ApiError::NotFound("Operator not found".into()),
            OperatorError::AlreadyActive => {
                ApiError::Conflict("An operator account already exists for this email".into())
            }
            OperatorError::SetupAlreadyDone => {
                ApiError::Conflict("Setup has already been completed".into())
            }
            OperatorError::ProtectedAccount => {
                ApiError::Forbidden("The primary operator account cannot be deleted".into())
            }
            OperatorError::LastAccountStanding => {
                ApiError::Conflict("Cannot delete the last active operator account".into())
            }
            OperatorError::InvalidInvite => {
                ApiError::NotFound("Invitation not found or expired".into())
            }
            OperatorError::NotOwnAccount => {
                ApiError::Forbidden("Operators may only delete their own account".into())
            }
            OperatorError::Database(e) => e.into(),
            OperatorError::Internal(msg) => ApiError::Internal(msg),
        }
    }
}

/// Administration of operator accounts.
#[derive(Clone)]
pub struct OperatorService {
    operators: OperatorRepository,
    email: EmailService,
    primary_email: String,
}

impl OperatorService {
    pub fn new(operators: OperatorRepository, email: EmailService, primary_email: &str) -> Self {
        Self {
            operators,
            email,
            primary_email: normalize_email(primary_email),
        }
    }

    /// Whether `email` is the one account allowed to administer operators.
    pub fn is_primary(&self, email: &str) -> bool {
        normalize_email(email) == self.primary_email
    }

    /// Whether any operator account exists yet. Drives first-run setup.
    pub async fn any_operator_exists(&self) -> Result<bool, OperatorError> {
        Ok(self.operators.count().await? > 0)
    }

    /// First-run setup: create the initial active operator.
    ///
    /// Rejected once any account exists, so the endpoint is inert on a
    /// provisioned system.
    pub async fn create_first_operator(
        &self,
        email: &str,
        name: &str,
        password: &str,
    ) -> Result<Operator, OperatorError> {
        if self.any_operator_exists().await? {
            return Err(OperatorError::SetupAlreadyDone);
        }

        let email = normalize_email(email);
        let password_hash = hash_password(password)
            .map_err(|e| OperatorError::Internal(format!("password hashing failed: {}", e)))?;

        let operator = self
            .operators
            .create_active(&email, name, &password_hash)
            .await?
            .into_model()?;

        info!(email = %email, "Initial operator created");
        Ok(operator)
    }

    /// Direct creation of an active account with a password, bypassing the
    /// invitation flow.
    pub async fn create(
        &self,
        email: &str,
        name: &str,
        password: &str,
    ) -> Result<Operator, OperatorError> {
        let email = normalize_email(email);

        if self.operators.find_by_email(&email).await?.is_some() {
            return Err(OperatorError::AlreadyActive);
        }

        let password_hash = hash_password(password)
            .map_err(|e| OperatorError::Internal(format!("password hashing failed: {}", e)))?;

        let operator = self
            .operators
            .create_active(&email, name, &password_hash)
            .await?
            .into_model()?;

        info!(email = %email, "Operator created");
        Ok(operator)
    }

    pub async fn list(&self) -> Result<Vec<OperatorSummary>, OperatorError> {
        let entities = self.operators.list().await?;
        let mut summaries = Vec::with_capacity(entities.len());
        for entity in entities {
            let op = entity.into_model()?;
            let is_primary = self.is_primary(&op.email);
            summaries.push(OperatorSummary {
                id: op.id,
                email: op.email,
                name: op.name,
                status: op.status,
                is_primary,
                created_at: op.created_at,
            });
        }
        Ok(summaries)
    }

    /// Invite a new operator, or re-issue the invitation of a still-pending
    /// one. The raw token goes out by email; only its hash is stored.
    pub async fn invite(&self, email: &str, name: &str) -> Result<(), OperatorError> {
        let email = normalize_email(email);

        let token = generate_invite_token();
        let token_hash = sha256_hex(&token);
        let expires_at = Utc::now() + Duration::days(INVITE_TTL_DAYS);

        match self.operators.find_by_email(&email).await? {
            Some(existing) => {
                let existing = existing.into_model()?;
                if existing.is_active() {
                    return Err(OperatorError::AlreadyActive);
                }
                self.operators
                    .reissue_invite(existing.id, &token_hash, expires_at)
                    .await?;
                info!(email = %email, "Invitation re-issued for pending operator");
            }
            None => {
                self.operators
                    .create_pending(&email, name, &token_hash, expires_at)
                    .await?;
                info!(email = %email, "Operator invited");
            }
        }

        // Best-effort delivery; the invitation can be re-issued if it never
        // arrives.
        let mailer = self.email.clone();
        let recipient = email.clone();
        let invited_name = name.to_string();
        tokio::spawn(async move {
            if let Err(e) = mailer
                .send_invitation(&recipient, &invited_name, &token)
                .await
            {
                warn!(email = %recipient, error = %e, "Invitation email failed");
            }
        });

        Ok(())
    }

    /// Look up an invitation by raw token without redeeming it. Used by the
    /// acceptance page to prefill the form.
    pub async fn check_invite(&self, token: &str) -> Result<InviteCheckResponse, OperatorError> {
        let token_hash = sha256_hex(token);

        let entity = self
            .operators
            .find_by_invite_token_hash(&token_hash)
            .await?;

        match entity {
            Some(entity) => {
                let op = entity.into_model()?;
                if op.invite_is_live(Utc::now()) {
                    Ok(InviteCheckResponse {
                        valid: true,
                        email: Some(op.email),
                        name: Some(op.name),
                    })
                } else {
                    Ok(InviteCheckResponse {
                        valid: false,
                        email: None,
                        name: None,
                    })
                }
            }
            None => Ok(InviteCheckResponse {
                valid: false,
                email: None,
                name: None,
            }),
        }
    }

    /// Redeem an invitation: set the password and activate the account.
    pub async fn accept_invite(
        &self,
        token: &str,
        password: &str,
    ) -> Result<Operator, OperatorError> {
        let token_hash = sha256_hex(token);

        let pending = self
            .operators
            .find_by_invite_token_hash(&token_hash)
            .await?
            .ok_or(OperatorError::InvalidInvite)?
            .into_model()?;

        if !pending.invite_is_live(Utc::now()) {
            return Err(OperatorError::InvalidInvite);
        }

        let password_hash = hash_password(password)
            .map_err(|e| OperatorError::Internal(format!("password hashing failed: {}", e)))?;

        // The activation update is guarded on pending status, so a token
        // raced past us loses here instead of double-activating.
        let operator = self
            .operators
            .activate(pending.id, &password_hash)
            .await?
            .ok_or(OperatorError::InvalidInvite)?
            .into_model()?;

        info!(email = %operator.email, "Operator invitation accepted");
        Ok(operator)
    }

    /// Delete an operator account.
    ///
    /// The primary account can never be removed, the last remaining active
    /// account is protected so the system cannot lock itself out, and a
    /// non-primary caller may only remove their own account.
    pub async fn delete(&self, caller_email: &str, id: Uuid) -> Result<(), OperatorError> {
        let target = self
            .operators
            .find_by_id(id)
            .await?
            .ok_or(OperatorError::NotFound)?
            .into_model()?;

        if self.is_primary(&target.email) {
            return Err(OperatorError::ProtectedAccount);
        }

        let caller = normalize_email(caller_email);
        if !self.is_primary(&caller) && caller != target.email {
            return Err(OperatorError::NotOwnAccount);
        }

        if target.is_active() {
            let mut active = 0usize;
            for entity in self.operators.list().await? {
                if entity.into_model()?.is_active() {
                    active += 1;
                }
            }
            if active <= 1 {
                return Err(OperatorError::LastAccountStanding);
            }
        }

        if !self.operators.delete(id).await? {
            return Err(OperatorError::NotFound);
        }

        info!(email = %target.email, "Operator deleted");
        Ok(())
    }
}
