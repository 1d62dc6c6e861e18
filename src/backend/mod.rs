//! Collaborator interfaces for the managed backend: a tenant-scoped document
//! store with live subscriptions, a blob store for license attachments, and an
//! identity provider.
//!
//! Nothing in `workflows` talks to a concrete backend; services receive these
//! traits explicitly. `memory` carries in-process implementations used by the
//! service binary, the demo, and the tests.

pub mod memory;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// Raw field map of a stored document.
pub type Fields = serde_json::Map<String, serde_json::Value>;

/// Identifier assigned by the record store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub String);

impl DocumentId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stored document as delivered by a subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: DocumentId,
    pub fields: Fields,
}

/// The per-tenant collections the dashboard reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Licenses,
    Staff,
    LeaveRecords,
    Attendance,
    Admins,
}

impl Collection {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::Licenses,
            Self::Staff,
            Self::LeaveRecords,
            Self::Attendance,
            Self::Admins,
        ]
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Licenses => "licenses",
            Self::Staff => "staff",
            Self::LeaveRecords => "leaveRecords",
            Self::Attendance => "attendance",
            Self::Admins => "admins",
        }
    }
}

/// Fully-qualified, tenant-scoped collection path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionPath(String);

impl CollectionPath {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The signed-in identity every path is partitioned by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantScope {
    pub app_id: String,
    pub user_id: String,
}

impl TenantScope {
    pub fn new(app_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            user_id: user_id.into(),
        }
    }

    pub fn collection(&self, collection: Collection) -> CollectionPath {
        CollectionPath(format!(
            "artifacts/{}/users/{}/{}",
            self.app_id,
            self.user_id,
            collection.name()
        ))
    }

    pub fn license_attachment(&self, file_name: &str) -> BlobPath {
        BlobPath(format!("licenses/{}/{}", self.user_id, file_name))
    }
}

/// A live view of one collection.
///
/// Holds the latest snapshot pushed by the store. Dropping the subscription
/// releases it; the store stops tracking it on its next push. Clones share
/// the same feed and each must be dropped.
#[derive(Debug, Clone)]
pub struct Subscription {
    path: CollectionPath,
    receiver: watch::Receiver<Arc<Vec<Document>>>,
}

impl Subscription {
    pub fn new(path: CollectionPath, receiver: watch::Receiver<Arc<Vec<Document>>>) -> Self {
        Self { path, receiver }
    }

    pub fn path(&self) -> &CollectionPath {
        &self.path
    }

    /// Latest snapshot, marking it as seen.
    pub fn latest(&mut self) -> Arc<Vec<Document>> {
        self.receiver.borrow_and_update().clone()
    }

    /// Waits for the next snapshot after the one last seen.
    pub async fn changed(&mut self) -> Result<(), StoreError> {
        self.receiver
            .changed()
            .await
            .map_err(|_| StoreError::SubscriptionClosed(self.path.to_string()))
    }

    pub fn into_stream(self) -> WatchStream<Arc<Vec<Document>>> {
        WatchStream::new(self.receiver)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("document {id} not found in {path}")]
    NotFound { path: String, id: String },
    #[error("permission denied for {0}")]
    PermissionDenied(String),
    #[error("record store unavailable: {0}")]
    Unavailable(String),
    #[error("subscription to {0} closed")]
    SubscriptionClosed(String),
    #[error("document could not be encoded: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Document database exposing per-tenant collections.
#[async_trait]
pub trait RecordStore: Send + Sync {
    fn subscribe(&self, path: &CollectionPath) -> Result<Subscription, StoreError>;

    async fn insert(&self, path: &CollectionPath, fields: Fields)
        -> Result<DocumentId, StoreError>;

    /// Patches the named fields of an existing document.
    async fn update(
        &self,
        path: &CollectionPath,
        id: &DocumentId,
        fields: Fields,
    ) -> Result<(), StoreError>;

    async fn delete(&self, path: &CollectionPath, id: &DocumentId) -> Result<(), StoreError>;

    /// Creates the document if needed and merges the named fields into it,
    /// leaving every other field untouched.
    async fn merge_set(
        &self,
        path: &CollectionPath,
        id: &DocumentId,
        fields: Fields,
    ) -> Result<(), StoreError>;
}

/// Storage location of an uploaded blob.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobPath(String);

impl BlobPath {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlobPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobHandle {
    pub path: BlobPath,
    pub content_type: mime::Mime,
    pub size: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("blob {0} not found")]
    NotFound(String),
    #[error("blob storage unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(
        &self,
        path: &BlobPath,
        bytes: Vec<u8>,
        content_type: mime::Mime,
    ) -> Result<BlobHandle, BlobError>;

    async fn public_url(&self, handle: &BlobHandle) -> Result<String, BlobError>;
}

/// Identity returned by the provider once signed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub uid: String,
    pub email: String,
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("an account already exists for {0}")]
    EmailInUse(String),
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("no account found for {0}")]
    UnknownAccount(String),
    #[error("password must be at least {0} characters")]
    WeakPassword(usize),
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> Result<UserIdentity, IdentityError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<UserIdentity, IdentityError>;

    async fn sign_out(&self) -> Result<(), IdentityError>;

    async fn send_password_reset(&self, email: &str) -> Result<(), IdentityError>;

    /// Observable auth state; `None` while signed out.
    fn auth_state(&self) -> watch::Receiver<Option<UserIdentity>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tenant_paths_are_partitioned_by_user() {
        let scope = TenantScope::new("default-app-id", "uid-42");
        assert_eq!(
            scope.collection(Collection::Licenses).as_str(),
            "artifacts/default-app-id/users/uid-42/licenses"
        );
        assert_eq!(
            scope.collection(Collection::LeaveRecords).as_str(),
            "artifacts/default-app-id/users/uid-42/leaveRecords"
        );
        assert_eq!(
            scope.license_attachment("fssai.pdf").as_str(),
            "licenses/uid-42/fssai.pdf"
        );

        let other = TenantScope::new("default-app-id", "uid-7");
        assert_ne!(
            scope.collection(Collection::Staff),
            other.collection(Collection::Staff)
        );
    }
}
