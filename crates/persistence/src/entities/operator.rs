//! Operator entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::operator::{Operator, OperatorStatus};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the operators table.
///
/// Status is stored as TEXT and parsed on conversion so the schema stays
/// free of database-side enum types.
#[derive(Debug, Clone, FromRow)]
pub struct OperatorEntity {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub password_hash: Option<String>,
    pub status: String,
    pub invite_token_hash: Option<String>,
    pub invite_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OperatorEntity {
    /// Converts the row into the domain model.
    ///
    /// Fails with a decode error if the stored status is not a known value.
    pub fn into_model(self) -> Result<Operator, sqlx::Error> {
        let status = OperatorStatus::parse(&self.status).ok_or_else(|| {
            sqlx::Error::Decode(format!("unknown operator status: {}", self.status).into())
        })?;

        Ok(Operator {
            id: self.id,
            email: self.email,
            name: self.name,
            password_hash: self.password_hash,
            status,
            invite_token_hash: self.invite_token_hash,
            invite_expires_at: self.invite_expires_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
