//! Repository for operator database operations.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::OperatorEntity;
use crate::metrics::QueryTimer;

const OPERATOR_COLUMNS: &str = "id, email, name, password_hash, status, invite_token_hash, \
     invite_expires_at, created_at, updated_at";

/// Repository for operator operations.
#[derive(Clone)]
pub struct OperatorRepository {
    pool: PgPool,
}

impl OperatorRepository {
    /// Creates a new operator repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Lists all operators, oldest first.
    pub async fn list(&self) -> Result<Vec<OperatorEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_operators");
        let result = sqlx::query_as::<_, OperatorEntity>(&format!(
            "SELECT {} FROM operators ORDER BY created_at ASC",
            OPERATOR_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Counts all operator accounts, pending included.
    pub async fn count(&self) -> Result<i64, sqlx::Error> {
        let timer = QueryTimer::new("count_operators");
        let result = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM operators")
            .fetch_one(&self.pool)
            .await;
        timer.record();
        result
    }

    /// Finds an operator by internal id.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<OperatorEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_operator_by_id");
        let result = sqlx::query_as::<_, OperatorEntity>(&format!(
            "SELECT {} FROM operators WHERE id = $1",
            OPERATOR_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Finds an operator by email. The caller must lowercase first.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<OperatorEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_operator_by_email");
        let result = sqlx::query_as::<_, OperatorEntity>(&format!(
            "SELECT {} FROM operators WHERE email = $1",
            OPERATOR_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Finds a pending operator by the SHA-256 of an invite token.
    pub async fn find_by_invite_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<OperatorEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_operator_by_invite_token");
        let result = sqlx::query_as::<_, OperatorEntity>(&format!(
            "SELECT {} FROM operators WHERE invite_token_hash = $1 AND status = 'pending'",
            OPERATOR_COLUMNS
        ))
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Creates an active operator with a password hash.
    pub async fn create_active(
        &self,
        email: &str,
        name: &str,
        password_hash: &str,
    ) -> Result<OperatorEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_operator");
        let result = sqlx::query_as::<_, OperatorEntity>(&format!(
            r#"
            INSERT INTO operators (email, name, password_hash, status)
            VALUES ($1, $2, $3, 'active')
            RETURNING {}
            "#,
            OPERATOR_COLUMNS
        ))
        .bind(email)
        .bind(name)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Creates a pending operator holding a hashed invite token.
    pub async fn create_pending(
        &self,
        email: &str,
        name: &str,
        invite_token_hash: &str,
        invite_expires_at: DateTime<Utc>,
    ) -> Result<OperatorEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_pending_operator");
        let result = sqlx::query_as::<_, OperatorEntity>(&format!(
            r#"
            INSERT INTO operators (email, name, status, invite_token_hash, invite_expires_at)
            VALUES ($1, $2, 'pending', $3, $4)
            RETURNING {}
            "#,
            OPERATOR_COLUMNS
        ))
        .bind(email)
        .bind(name)
        .bind(invite_token_hash)
        .bind(invite_expires_at)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Replaces the invite token on a pending operator (re-invitation).
    pub async fn reissue_invite(
        &self,
        id: Uuid,
        invite_token_hash: &str,
        invite_expires_at: DateTime<Utc>,
    ) -> Result<Option<OperatorEntity>, sqlx::Error> {
        let timer = QueryTimer::new("reissue_operator_invite");
        let result = sqlx::query_as::<_, OperatorEntity>(&format!(
            r#"
            UPDATE operators
            SET invite_token_hash = $2, invite_expires_at = $3, updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING {}
            "#,
            OPERATOR_COLUMNS
        ))
        .bind(id)
        .bind(invite_token_hash)
        .bind(invite_expires_at)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Activates a pending operator: sets the password, clears the invite.
    ///
    /// The status guard makes redemption race-safe; a second concurrent
    /// accept sees zero rows.
    pub async fn activate(
        &self,
        id: Uuid,
        password_hash: &str,
    ) -> Result<Option<OperatorEntity>, sqlx::Error> {
        let timer = QueryTimer::new("activate_operator");
        let result = sqlx::query_as::<_, OperatorEntity>(&format!(
            r#"
            UPDATE operators
            SET password_hash = $2, status = 'active',
                invite_token_hash = NULL, invite_expires_at = NULL, updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING {}
            "#,
            OPERATOR_COLUMNS
        ))
        .bind(id)
        .bind(password_hash)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Deletes an operator. Returns `true` if a row was removed.
    pub async fn delete(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("delete_operator");
        let result = sqlx::query("DELETE FROM operators WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await;
        timer.record();
        Ok(result?.rows_affected() > 0)
    }
}
