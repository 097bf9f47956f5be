//! Repository for church database operations.

use domain::models::church::{Church, VisitSource};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::ChurchEntity;
use crate::metrics::QueryTimer;

const CHURCH_COLUMNS: &str = "id, name, nickname, slug, public_id, country, address, description, \
     logo, theme_color, manager_emails, bank_name, account_name, iban, account_number, \
     sort_code, swift_code, routing_number, revolut_link, additional_info, \
     qr_code_url, page_views, qr_scans, created_at, updated_at";

/// Repository for church operations.
#[derive(Clone)]
pub struct ChurchRepository {
    pool: PgPool,
}

impl ChurchRepository {
    /// Creates a new church repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Lists all churches, newest first.
    pub async fn list(&self) -> Result<Vec<ChurchEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_churches");
        let result = sqlx::query_as::<_, ChurchEntity>(&format!(
            "SELECT {} FROM churches ORDER BY created_at DESC",
            CHURCH_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Finds a church by its internal id.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<ChurchEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_church_by_id");
        let result = sqlx::query_as::<_, ChurchEntity>(&format!(
            "SELECT {} FROM churches WHERE id = $1",
            CHURCH_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Finds a church by the public identifier printed on its QR code.
    pub async fn find_by_public_id(
        &self,
        public_id: &str,
    ) -> Result<Option<ChurchEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_church_by_public_id");
        let result = sqlx::query_as::<_, ChurchEntity>(&format!(
            "SELECT {} FROM churches WHERE public_id = $1",
            CHURCH_COLUMNS
        ))
        .bind(public_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Lists churches whose manager list contains the given email.
    ///
    /// Emails are stored lowercase, so the caller must normalize first.
    pub async fn list_by_manager_email(
        &self,
        email: &str,
    ) -> Result<Vec<ChurchEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_churches_by_manager_email");
        let result = sqlx::query_as::<_, ChurchEntity>(&format!(
            "SELECT {} FROM churches WHERE $1 = ANY(manager_emails) ORDER BY created_at DESC",
            CHURCH_COLUMNS
        ))
        .bind(email)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Inserts a fully-populated church record.
    pub async fn create(&self, church: &Church) -> Result<ChurchEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_church");
        let result = sqlx::query_as::<_, ChurchEntity>(&format!(
            r#"
            INSERT INTO churches (
                id, name, nickname, slug, public_id, country, address, description,
                logo, theme_color, manager_emails, bank_name, account_name, iban,
                account_number, sort_code, swift_code, routing_number, revolut_link,
                additional_info, qr_code_url
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                    $15, $16, $17, $18, $19, $20, $21)
            RETURNING {}
            "#,
            CHURCH_COLUMNS
        ))
        .bind(church.id)
        .bind(&church.name)
        .bind(&church.nickname)
        .bind(&church.slug)
        .bind(&church.public_id)
        .bind(&church.country)
        .bind(&church.address)
        .bind(&church.description)
        .bind(&church.logo)
        .bind(&church.theme_color)
        .bind(&church.manager_emails)
        .bind(&church.bank_details.bank_name)
        .bind(&church.bank_details.account_name)
        .bind(&church.bank_details.iban)
        .bind(&church.bank_details.account_number)
        .bind(&church.bank_details.sort_code)
        .bind(&church.bank_details.swift_code)
        .bind(&church.bank_details.routing_number)
        .bind(&church.bank_details.revolut_link)
        .bind(&church.bank_details.additional_info)
        .bind(&church.qr_code_url)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Writes back every mutable column of a church.
    ///
    /// Public ID and the QR reference are immutable by design and are not
    /// part of the update. Returns `None` if the row no longer exists.
    pub async fn update(&self, church: &Church) -> Result<Option<ChurchEntity>, sqlx::Error> {
        let timer = QueryTimer::new("update_church");
        let result = sqlx::query_as::<_, ChurchEntity>(&format!(
            r#"
            UPDATE churches
            SET name = $2, nickname = $3, slug = $4, country = $5, address = $6,
                description = $7, logo = $8, theme_color = $9, manager_emails = $10,
                bank_name = $11, account_name = $12, iban = $13, account_number = $14,
                sort_code = $15, swift_code = $16, routing_number = $17,
                revolut_link = $18, additional_info = $19, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            CHURCH_COLUMNS
        ))
        .bind(church.id)
        .bind(&church.name)
        .bind(&church.nickname)
        .bind(&church.slug)
        .bind(&church.country)
        .bind(&church.address)
        .bind(&church.description)
        .bind(&church.logo)
        .bind(&church.theme_color)
        .bind(&church.manager_emails)
        .bind(&church.bank_details.bank_name)
        .bind(&church.bank_details.account_name)
        .bind(&church.bank_details.iban)
        .bind(&church.bank_details.account_number)
        .bind(&church.bank_details.sort_code)
        .bind(&church.bank_details.swift_code)
        .bind(&church.bank_details.routing_number)
        .bind(&church.bank_details.revolut_link)
        .bind(&church.bank_details.additional_info)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Deletes a church. Returns `true` if a row was removed.
    pub async fn delete(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("delete_church");
        let result = sqlx::query("DELETE FROM churches WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await;
        timer.record();
        Ok(result?.rows_affected() > 0)
    }

    /// Atomically bumps the visit counter matching the source.
    ///
    /// Returns `true` if the church existed.
    pub async fn record_visit(
        &self,
        public_id: &str,
        source: VisitSource,
    ) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("record_church_visit");
        let sql = match source {
            VisitSource::Page => {
                "UPDATE churches SET page_views = page_views + 1 WHERE public_id = $1"
            }
            VisitSource::Qr => "UPDATE churches SET qr_scans = qr_scans + 1 WHERE public_id = $1",
        };
        let result = sqlx::query(sql).bind(public_id).execute(&self.pool).await;
        timer.record();
        Ok(result?.rows_affected() > 0)
    }
}
