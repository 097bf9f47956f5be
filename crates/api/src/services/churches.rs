//! Church profile management for both the operator and manager surfaces.

use crate::error::ApiError;
use crate::services::media::{MediaError, MediaService};
use chrono::Utc;
use domain::models::church::{
    Church, CreateChurchRequest, PublicChurchView, UpdateChurchRequest, VisitSource,
};
use persistence::repositories::ChurchRepository;
use shared::ids::{generate_public_id, generate_unique_slug};
use shared::validation::normalize_email;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

/// Attempts to dodge slug and public ID collisions before giving up.
const CREATE_ATTEMPTS: u32 = 3;

#[derive(Debug, Error)]
pub enum ChurchError {
    #[error("Church not found")]
    NotFound,

    #[error("Not a manager of this church")]
    NotManager,

    #[error("Managers cannot remove their own email")]
    SelfRemoval,

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl From<ChurchError> for ApiError {
    fn from(err: ChurchError) -> Self {
        match err {
            ChurchError::NotFound => ApiError::NotFound("Church not found".into()),
            ChurchError::NotManager => {
                ApiError::Forbidden("You do not manage this church".into())
            }
            ChurchError::SelfRemoval => {
                ApiError::Validation("You cannot remove your own email from the manager list".into())
            }
            ChurchError::Media(e) => ApiError::Internal(format!("Media service: {}", e)),
            ChurchError::Database(e) => e.into(),
        }
    }
}

/// Church CRUD plus the public donation page lookups.
#[derive(Clone)]
pub struct ChurchService {
    churches: ChurchRepository,
    media: MediaService,
}

impl ChurchService {
    pub fn new(churches: ChurchRepository, media: MediaService) -> Self {
        Self { churches, media }
    }

    pub async fn list(&self) -> Result<Vec<Church>, ChurchError> {
        let entities = self.churches.list().await?;
        Ok(entities.into_iter().map(|e| e.into_model()).collect())
    }

    pub async fn get(&self, id: Uuid) -> Result<Church, ChurchError> {
        let entity = self
            .churches
            .find_by_id(id)
            .await?
            .ok_or(ChurchError::NotFound)?;
        Ok(entity.into_model())
    }

    pub async fn list_for_manager(&self, manager_email: &str) -> Result<Vec<Church>, ChurchError> {
        let email = normalize_email(manager_email);
        let entities = self.churches.list_by_manager_email(&email).await?;
        Ok(entities.into_iter().map(|e| e.into_model()).collect())
    }

    /// Create a church: mint a public ID and slug, render its QR code, and
    /// persist the profile. Identifier collisions are retried with fresh
    /// values rather than surfaced.
    pub async fn create(&self, req: CreateChurchRequest) -> Result<Church, ChurchError> {
        let manager_emails: Vec<String> =
            req.manager_emails.iter().map(|e| normalize_email(e)).collect();

        let mut last_err = None;
        for attempt in 0..CREATE_ATTEMPTS {
            let public_id = generate_public_id();
            let slug = generate_unique_slug(&req.name);
            let qr_code_url = self.media.generate_qr_code(&public_id).await?;

            let now = Utc::now();
            let church = Church {
                id: Uuid::new_v4(),
                name: req.name.clone(),
                nickname: req.nickname.clone(),
                slug,
                public_id: public_id.clone(),
                country: req.country.clone(),
                address: req.address.clone(),
                description: req.description.clone(),
                logo: req.logo.clone(),
                theme_color: req.theme_color.clone(),
                manager_emails: manager_emails.clone(),
                bank_details: req.bank_details.clone(),
                qr_code_url,
                page_views: 0,
                qr_scans: 0,
                created_at: now,
                updated_at: now,
            };

            match self.churches.create(&church).await {
                Ok(entity) => {
                    info!(public_id = %public_id, name = %church.name, "Church created");
                    return Ok(entity.into_model());
                }
                Err(e) if is_unique_violation(&e) && attempt + 1 < CREATE_ATTEMPTS => {
                    warn!(public_id = %public_id, "Identifier collision on church create, retrying");
                    self.media.delete_qr_code(&public_id).await;
                    last_err = Some(e);
                }
                Err(e) => {
                    self.media.delete_qr_code(&public_id).await;
                    return Err(e.into());
                }
            }
        }

        Err(last_err
            .map(ChurchError::Database)
            .unwrap_or(ChurchError::NotFound))
    }

    /// Operator-side update. A name change regenerates the slug; everything
    /// else on the profile is freely writable.
    pub async fn operator_update(
        &self,
        id: Uuid,
        req: UpdateChurchRequest,
    ) -> Result<Church, ChurchError> {
        let mut church = self.get(id).await?;

        if let Some(name) = &req.name {
            if *name != church.name {
                church.slug = generate_unique_slug(name);
            }
            church.name = name.clone();
        }

        apply_shared_fields(&mut church, &req);

        if let Some(emails) = &req.manager_emails {
            church.manager_emails = emails.iter().map(|e| normalize_email(e)).collect();
        }

        self.persist_update(church).await
    }

    /// Manager-side update. The caller must be on the church's manager
    /// list, may not drop their own email, and can never change the slug
    /// (a renamed church keeps its links until an operator steps in).
    pub async fn manager_update(
        &self,
        id: Uuid,
        manager_email: &str,
        req: UpdateChurchRequest,
    ) -> Result<Church, ChurchError> {
        let email = normalize_email(manager_email);
        let mut church = self.get(id).await?;

        if !church.manager_emails.contains(&email) {
            return Err(ChurchError::NotManager);
        }

        if let Some(emails) = &req.manager_emails {
            let normalized: Vec<String> = emails.iter().map(|e| normalize_email(e)).collect();
            if !normalized.contains(&email) {
                return Err(ChurchError::SelfRemoval);
            }
            church.manager_emails = normalized;
        }

        if let Some(name) = &req.name {
            church.name = name.clone();
        }

        apply_shared_fields(&mut church, &req);

        self.persist_update(church).await
    }

    /// Manager-side single lookup, restricted to listed managers.
    pub async fn manager_get(&self, id: Uuid, manager_email: &str) -> Result<Church, ChurchError> {
        let email = normalize_email(manager_email);
        let church = self.get(id).await?;

        if !church.manager_emails.contains(&email) {
            return Err(ChurchError::NotManager);
        }

        Ok(church)
    }

    /// Manager-side logo upload, restricted to listed managers.
    pub async fn manager_upload_logo(
        &self,
        id: Uuid,
        manager_email: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<Church, ChurchError> {
        self.manager_get(id, manager_email).await?;
        self.upload_logo(id, bytes, content_type).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), ChurchError> {
        let church = self.get(id).await?;

        if !self.churches.delete(id).await? {
            return Err(ChurchError::NotFound);
        }

        // Hosted media cleanup is best effort; an orphaned image is not
        // worth failing the delete over.
        self.media.delete_qr_code(&church.public_id).await;
        if church.logo.is_some() {
            self.media.delete_logo(&church.public_id).await;
        }

        info!(public_id = %church.public_id, "Church deleted");
        Ok(())
    }

    /// Store a logo image and record its hosted URL on the profile.
    pub async fn upload_logo(
        &self,
        id: Uuid,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<Church, ChurchError> {
        let mut church = self.get(id).await?;

        let url = self
            .media
            .upload_logo(&church.public_id, bytes, content_type)
            .await?;
        church.logo = Some(url);

        self.persist_update(church).await
    }

    /// Public donation page lookup. Counts the visit against the page or
    /// QR counter depending on how the visitor arrived.
    pub async fn public_view(
        &self,
        public_id: &str,
        source: VisitSource,
    ) -> Result<PublicChurchView, ChurchError> {
        let entity = self
            .churches
            .find_by_public_id(public_id)
            .await?
            .ok_or(ChurchError::NotFound)?;

        // A lost count must never take the donation page down.
        if let Err(e) = self.churches.record_visit(public_id, source).await {
            warn!(public_id, error = %e, "Failed to record visit");
        }

        Ok(entity.into_model().into())
    }

    async fn persist_update(&self, church: Church) -> Result<Church, ChurchError> {
        let entity = self
            .churches
            .update(&church)
            .await?
            .ok_or(ChurchError::NotFound)?;
        Ok(entity.into_model())
    }
}

/// Fields writable on both the operator and manager paths.
fn apply_shared_fields(church: &mut Church, req: &UpdateChurchRequest) {
    if let Some(nickname) = &req.nickname {
        church.nickname = Some(nickname.clone());
    }
    if let Some(country) = &req.country {
        church.country = country.clone();
    }
    if let Some(address) = &req.address {
        church.address = address.clone();
    }
    if let Some(description) = &req.description {
        church.description = description.clone();
    }
    if let Some(logo) = &req.logo {
        church.logo = Some(logo.clone());
    }
    if let Some(color) = &req.theme_color {
        church.theme_color = Some(color.clone());
    }
    if let Some(bank_details) = &req.bank_details {
        church.bank_details = bank_details.clone();
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_failure_maps_to_internal() {
        let err: ApiError = ChurchError::Media(MediaError::UploadFailed("boom".into())).into();
        assert!(matches!(err, ApiError::Internal(_)));

        use axum::response::IntoResponse;
        let response = err.into_response();
        assert_eq!(
            response.status(),
            axum::http::StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_apply_shared_fields_keeps_absent_values() {
        let mut church = sample_church();
        apply_shared_fields(&mut church, &UpdateChurchRequest::default());
        assert_eq!(church.name, "Grace Chapel");
        assert_eq!(church.country, "GB");
        assert_eq!(church.theme_color, Some("#336699".to_string()));
    }

    #[test]
    fn test_apply_shared_fields_overwrites_present_values() {
        let mut church = sample_church();
        let req = UpdateChurchRequest {
            address: Some("2 New Street".to_string()),
            theme_color: Some("#aabbcc".to_string()),
            ..UpdateChurchRequest::default()
        };
        apply_shared_fields(&mut church, &req);
        assert_eq!(church.address, "2 New Street");
        assert_eq!(church.theme_color, Some("#aabbcc".to_string()));
        // Untouched fields survive
        assert_eq!(church.description, "A church");
    }

    fn sample_church() -> Church {
        Church {
            id: Uuid::new_v4(),
            name: "Grace Chapel".to_string(),
            nickname: None,
            slug: "grace-chapel-a1b2c3".to_string(),
            public_id: "ab12c-de34f-gh56i-jk78l".to_string(),
            country: "GB".to_string(),
            address: "1 Old Street".to_string(),
            description: "A church".to_string(),
            logo: None,
            theme_color: Some("#336699".to_string()),
            manager_emails: vec!["pastor@example.com".to_string()],
            bank_details: domain::models::church::BankDetails {
                bank_name: "First National".to_string(),
                account_name: "Grace Chapel".to_string(),
                iban: Some("GB29NWBK60161331926819".to_string()),
                account_number: None,
                sort_code: None,
                swift_code: None,
                routing_number: None,
                revolut_link: None,
                additional_info: None,
            },
            qr_code_url: "https://media.example.com/churchdonate/qrcodes/x.png".to_string(),
            page_views: 0,
            qr_scans: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}
