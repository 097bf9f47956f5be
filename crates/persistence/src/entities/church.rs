//! Church entity (database row mapping).
//!
//! Bank details are stored as flat columns on the churches table; the
//! entity reassembles them into the nested domain shape.

use chrono::{DateTime, Utc};
use domain::models::church::{BankDetails, Church};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the churches table.
#[derive(Debug, Clone, FromRow)]
pub struct ChurchEntity {
    pub id: Uuid,
    pub name: String,
    pub nickname: Option<String>,
    pub slug: String,
    pub public_id: String,
    pub country: String,
    pub address: String,
    pub description: String,
    pub logo: Option<String>,
    pub theme_color: Option<String>,
    pub manager_emails: Vec<String>,
    pub bank_name: String,
    pub account_name: String,
    pub iban: Option<String>,
    pub account_number: Option<String>,
    pub sort_code: Option<String>,
    pub swift_code: Option<String>,
    pub routing_number: Option<String>,
    pub revolut_link: Option<String>,
    pub additional_info: Option<String>,
    pub qr_code_url: String,
    pub page_views: i64,
    pub qr_scans: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChurchEntity {
    /// Converts the row into the domain model.
    pub fn into_model(self) -> Church {
        Church {
            id: self.id,
            name: self.name,
            nickname: self.nickname,
            slug: self.slug,
            public_id: self.public_id,
            country: self.country,
            address: self.address,
            description: self.description,
            logo: self.logo,
            theme_color: self.theme_color,
            manager_emails: self.manager_emails,
            bank_details: BankDetails {
                bank_name: self.bank_name,
                account_name: self.account_name,
                iban: self.iban,
                account_number: self.account_number,
                sort_code: self.sort_code,
                swift_code: self.swift_code,
                routing_number: self.routing_number,
                revolut_link: self.revolut_link,
                additional_info: self.additional_info,
            },
            qr_code_url: self.qr_code_url,
            page_views: self.page_views,
            qr_scans: self.qr_scans,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
