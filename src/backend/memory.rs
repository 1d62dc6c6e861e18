use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::debug;

use super::{
    BlobError, BlobHandle, BlobPath, BlobStore, CollectionPath, Document, DocumentId, Fields,
    IdentityError, IdentityProvider, RecordStore, StoreError, Subscription, UserIdentity,
};

const MIN_PASSWORD_LEN: usize = 6;

struct CollectionState {
    documents: BTreeMap<DocumentId, Fields>,
    sender: watch::Sender<Arc<Vec<Document>>>,
}

impl CollectionState {
    fn new() -> Self {
        let (sender, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            documents: BTreeMap::new(),
            sender,
        }
    }

    fn publish(&self) {
        let snapshot: Vec<Document> = self
            .documents
            .iter()
            .map(|(id, fields)| Document {
                id: id.clone(),
                fields: fields.clone(),
            })
            .collect();
        self.sender.send_replace(Arc::new(snapshot));
    }
}

/// Process-local record store with field-level merge and live snapshots.
#[derive(Default, Clone)]
pub struct InMemoryRecordStore {
    collections: Arc<Mutex<HashMap<CollectionPath, CollectionState>>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryRecordStore {
    /// Makes every write fail with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::Release);
    }

    /// Number of live subscriptions on a collection.
    pub fn active_subscriptions(&self, path: &CollectionPath) -> usize {
        self.lock()
            .ok()
            .and_then(|guard| guard.get(path).map(|state| state.sender.receiver_count()))
            .unwrap_or(0)
    }

    pub fn document(&self, path: &CollectionPath, id: &DocumentId) -> Option<Fields> {
        self.lock()
            .ok()
            .and_then(|guard| guard.get(path).and_then(|state| state.documents.get(id).cloned()))
    }

    pub fn len(&self, path: &CollectionPath) -> usize {
        self.lock()
            .ok()
            .and_then(|guard| guard.get(path).map(|state| state.documents.len()))
            .unwrap_or(0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<CollectionPath, CollectionState>>, StoreError> {
        self.collections
            .lock()
            .map_err(|_| StoreError::Unavailable("record store mutex poisoned".to_string()))
    }

    fn ensure_writable(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::Acquire) {
            return Err(StoreError::Unavailable("simulated outage".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    fn subscribe(&self, path: &CollectionPath) -> Result<Subscription, StoreError> {
        let mut guard = self.lock()?;
        let state = guard
            .entry(path.clone())
            .or_insert_with(CollectionState::new);
        debug!(%path, "subscription opened");
        Ok(Subscription::new(path.clone(), state.sender.subscribe()))
    }

    async fn insert(
        &self,
        path: &CollectionPath,
        fields: Fields,
    ) -> Result<DocumentId, StoreError> {
        self.ensure_writable()?;
        let mut guard = self.lock()?;
        let state = guard
            .entry(path.clone())
            .or_insert_with(CollectionState::new);
        let id = DocumentId(uuid::Uuid::new_v4().simple().to_string());
        state.documents.insert(id.clone(), fields);
        state.publish();
        Ok(id)
    }

    async fn update(
        &self,
        path: &CollectionPath,
        id: &DocumentId,
        fields: Fields,
    ) -> Result<(), StoreError> {
        self.ensure_writable()?;
        let mut guard = self.lock()?;
        let state = guard.get_mut(path).ok_or_else(|| StoreError::NotFound {
            path: path.to_string(),
            id: id.to_string(),
        })?;
        let document = state
            .documents
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound {
                path: path.to_string(),
                id: id.to_string(),
            })?;
        document.extend(fields);
        state.publish();
        Ok(())
    }

    async fn delete(&self, path: &CollectionPath, id: &DocumentId) -> Result<(), StoreError> {
        self.ensure_writable()?;
        let mut guard = self.lock()?;
        if let Some(state) = guard.get_mut(path) {
            if state.documents.remove(id).is_some() {
                state.publish();
            }
        }
        Ok(())
    }

    async fn merge_set(
        &self,
        path: &CollectionPath,
        id: &DocumentId,
        fields: Fields,
    ) -> Result<(), StoreError> {
        self.ensure_writable()?;
        let mut guard = self.lock()?;
        let state = guard
            .entry(path.clone())
            .or_insert_with(CollectionState::new);
        state
            .documents
            .entry(id.clone())
            .or_default()
            .extend(fields);
        state.publish();
        Ok(())
    }
}

/// Blob store keeping uploads in memory and handing out `memory://` URLs.
#[derive(Default, Clone)]
pub struct InMemoryBlobStore {
    blobs: Arc<Mutex<HashMap<BlobPath, (Vec<u8>, mime::Mime)>>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryBlobStore {
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::Release);
    }

    pub fn contents(&self, path: &BlobPath) -> Option<Vec<u8>> {
        self.blobs
            .lock()
            .ok()
            .and_then(|guard| guard.get(path).map(|(bytes, _)| bytes.clone()))
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn upload(
        &self,
        path: &BlobPath,
        bytes: Vec<u8>,
        content_type: mime::Mime,
    ) -> Result<BlobHandle, BlobError> {
        if self.unavailable.load(Ordering::Acquire) {
            return Err(BlobError::Unavailable("simulated outage".to_string()));
        }
        let size = bytes.len();
        let mut guard = self
            .blobs
            .lock()
            .map_err(|_| BlobError::Unavailable("blob store mutex poisoned".to_string()))?;
        guard.insert(path.clone(), (bytes, content_type.clone()));
        Ok(BlobHandle {
            path: path.clone(),
            content_type,
            size,
        })
    }

    async fn public_url(&self, handle: &BlobHandle) -> Result<String, BlobError> {
        let guard = self
            .blobs
            .lock()
            .map_err(|_| BlobError::Unavailable("blob store mutex poisoned".to_string()))?;
        if !guard.contains_key(&handle.path) {
            return Err(BlobError::NotFound(handle.path.to_string()));
        }
        Ok(format!("memory://blobs/{}", handle.path))
    }
}

struct Account {
    uid: String,
    password: String,
}

/// Email/password identity provider held in memory.
#[derive(Clone)]
pub struct InMemoryIdentityProvider {
    accounts: Arc<Mutex<HashMap<String, Account>>>,
    resets: Arc<Mutex<Vec<String>>>,
    state: Arc<watch::Sender<Option<UserIdentity>>>,
}

impl Default for InMemoryIdentityProvider {
    fn default() -> Self {
        let (state, _) = watch::channel(None);
        Self {
            accounts: Arc::new(Mutex::new(HashMap::new())),
            resets: Arc::new(Mutex::new(Vec::new())),
            state: Arc::new(state),
        }
    }
}

impl InMemoryIdentityProvider {
    /// Addresses password reset mail was sent to, in order.
    pub fn password_resets(&self) -> Vec<String> {
        self.resets
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    fn accounts(&self) -> Result<MutexGuard<'_, HashMap<String, Account>>, IdentityError> {
        self.accounts
            .lock()
            .map_err(|_| IdentityError::Unavailable("account mutex poisoned".to_string()))
    }
}

fn account_key(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn sign_up(&self, email: &str, password: &str) -> Result<UserIdentity, IdentityError> {
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(IdentityError::WeakPassword(MIN_PASSWORD_LEN));
        }
        let key = account_key(email);
        let identity = {
            let mut accounts = self.accounts()?;
            if accounts.contains_key(&key) {
                return Err(IdentityError::EmailInUse(key));
            }
            let uid = uuid::Uuid::new_v4().simple().to_string();
            accounts.insert(
                key.clone(),
                Account {
                    uid: uid.clone(),
                    password: password.to_string(),
                },
            );
            UserIdentity { uid, email: key }
        };
        self.state.send_replace(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<UserIdentity, IdentityError> {
        let key = account_key(email);
        let identity = {
            let accounts = self.accounts()?;
            match accounts.get(&key) {
                Some(account) if account.password == password => UserIdentity {
                    uid: account.uid.clone(),
                    email: key,
                },
                _ => return Err(IdentityError::InvalidCredentials),
            }
        };
        self.state.send_replace(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        self.state.send_replace(None);
        Ok(())
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), IdentityError> {
        let key = account_key(email);
        if !self.accounts()?.contains_key(&key) {
            return Err(IdentityError::UnknownAccount(key));
        }
        self.resets
            .lock()
            .map_err(|_| IdentityError::Unavailable("reset mutex poisoned".to_string()))?
            .push(key);
        Ok(())
    }

    fn auth_state(&self) -> watch::Receiver<Option<UserIdentity>> {
        self.state.subscribe()
    }
}
