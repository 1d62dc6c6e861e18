use std::sync::Arc;

use tracing::info;

use super::domain::{License, LicenseRenewal};
use super::form::{Attachment, LicenseForm};
use crate::backend::{BlobStore, Collection, DocumentId, RecordStore, TenantScope};
use crate::workflows::records::encode;
use crate::workflows::{Confirmation, DashboardError, DeleteOutcome, ValidationError};

/// License commands for one tenant: add, renew in place, delete on
/// confirmation.
pub struct LicenseService<S, B> {
    store: Arc<S>,
    blobs: Arc<B>,
    scope: TenantScope,
}

impl<S, B> LicenseService<S, B>
where
    S: RecordStore + 'static,
    B: BlobStore + 'static,
{
    pub fn new(store: Arc<S>, blobs: Arc<B>, scope: TenantScope) -> Self {
        Self {
            store,
            blobs,
            scope,
        }
    }

    /// Creates a license. `existing` is the tenant's current license list and
    /// is used to keep names unique.
    pub async fn add(
        &self,
        form: LicenseForm,
        existing: &[License],
    ) -> Result<License, DashboardError> {
        let validated = form.validate()?;
        let key = validated.name.to_lowercase();
        if existing
            .iter()
            .any(|license| license.name.trim().to_lowercase() == key)
        {
            return Err(ValidationError::DuplicateLicenseName(validated.name).into());
        }

        let (file_url, file_name) = match validated.attachment {
            Some(attachment) => self.upload(attachment).await?,
            None => (String::new(), String::new()),
        };

        let mut license = License {
            id: String::new(),
            name: validated.name,
            expiry_date: Some(validated.expiry_date),
            license_number: validated.license_number,
            issuing_authority: validated.issuing_authority,
            notes: validated.notes,
            file_url,
            file_name,
        };

        let path = self.scope.collection(Collection::Licenses);
        let id = self.store.insert(&path, encode(&license)?).await?;
        license.id = id.0;

        info!(license_id = %license.id, name = %license.name, "license added");
        Ok(license)
    }

    /// Renews a license in place. The name cannot change; the attachment is
    /// replaced only when the form carries a new file.
    pub async fn renew(
        &self,
        license_id: &str,
        form: LicenseForm,
        existing: &[License],
    ) -> Result<License, DashboardError> {
        let current = existing
            .iter()
            .find(|license| license.id == license_id)
            .ok_or_else(|| ValidationError::UnknownLicense(license_id.to_string()))?;

        let validated = form.validate()?;
        if validated.name != current.name.trim() {
            return Err(ValidationError::LicenseRenamed {
                existing: current.name.clone(),
                requested: validated.name,
            }
            .into());
        }

        let (file_url, file_name) = match validated.attachment {
            Some(attachment) => self.upload(attachment).await?,
            None => (current.file_url.clone(), current.file_name.clone()),
        };

        let renewal = LicenseRenewal {
            expiry_date: validated.expiry_date,
            license_number: validated.license_number,
            issuing_authority: validated.issuing_authority,
            notes: validated.notes,
            file_url,
            file_name,
        };

        let path = self.scope.collection(Collection::Licenses);
        self.store
            .update(&path, &DocumentId::new(license_id), encode(&renewal)?)
            .await?;

        info!(license_id, expiry = %renewal.expiry_date, "license renewed");
        Ok(License {
            id: current.id.clone(),
            name: current.name.clone(),
            expiry_date: Some(renewal.expiry_date),
            license_number: renewal.license_number,
            issuing_authority: renewal.issuing_authority,
            notes: renewal.notes,
            file_url: renewal.file_url,
            file_name: renewal.file_name,
        })
    }

    pub async fn delete(
        &self,
        license_id: &str,
        confirmation: Confirmation,
    ) -> Result<DeleteOutcome, DashboardError> {
        if confirmation == Confirmation::Declined {
            return Ok(DeleteOutcome::Cancelled);
        }

        let path = self.scope.collection(Collection::Licenses);
        self.store
            .delete(&path, &DocumentId::new(license_id))
            .await?;
        info!(license_id, "license deleted");
        Ok(DeleteOutcome::Deleted)
    }

    async fn upload(&self, attachment: Attachment) -> Result<(String, String), DashboardError> {
        let Attachment { file_name, bytes } = attachment;
        let path = self.scope.license_attachment(&file_name);
        let content_type = mime_guess::from_path(&file_name).first_or_octet_stream();

        let handle = self.blobs.upload(&path, bytes, content_type).await?;
        let url = self.blobs.public_url(&handle).await?;
        info!(%path, size = handle.size, "license document uploaded");
        Ok((url, file_name))
    }
}
