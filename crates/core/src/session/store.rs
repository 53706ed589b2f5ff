//! Session store
//!
//! Owns the authenticated identity and the in-memory cache of visible
//! requests for one session. The store is constructed by the embedding
//! application and passed by reference to whatever needs it; there is no
//! global session singleton. The identity snapshot is mirrored to
//! durable local storage so a restart can restore the session without
//! re-authenticating.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::account::{Account, Role};
use crate::credential::verify_secret;
use crate::request::ServiceRequest;
use crate::session::LocalStorage;
use crate::store::DataStore;
use crate::{Error, Result};

/// Storage key holding the serialized identity snapshot.
pub const SESSION_KEY: &str = "dsp.session";

/// Minimal identity snapshot persisted across reloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub account_id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub role: Role,
    pub dealership_id: Uuid,
}

impl From<&Account> for Identity {
    fn from(account: &Account) -> Self {
        Self {
            account_id: account.id,
            email: account.email.clone(),
            display_name: account.display_name.clone(),
            role: account.role,
            dealership_id: account.dealership_id,
        }
    }
}

/// Authentication state of a session.
#[derive(Debug, Clone)]
pub enum SessionState {
    Anonymous,
    Authenticated(Identity),
}

/// One client session: identity plus the visible request cache.
pub struct SessionStore {
    store: Arc<dyn DataStore>,
    storage: LocalStorage,
    state: RwLock<SessionState>,
    requests: RwLock<Vec<ServiceRequest>>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn DataStore>, storage: LocalStorage) -> Self {
        Self {
            store,
            storage,
            state: RwLock::new(SessionState::Anonymous),
            requests: RwLock::new(Vec::new()),
        }
    }

    /// Authenticate against the credential store.
    ///
    /// The email lookup is global (not dealership-scoped). An unknown
    /// email and a digest mismatch surface the same error so the caller
    /// cannot tell which check failed; only the inactive-account case is
    /// distinguished. Transport failures surface as `LoginFailed`.
    pub async fn login(&self, email: &str, secret: &str) -> Result<Identity> {
        let account = self
            .store
            .find_account_by_email(email)
            .await
            .map_err(|err| Error::LoginFailed(err.to_string()))?
            .ok_or(Error::InvalidCredentials)?;

        if !account.active {
            warn!(email, "Login attempt for inactive account");
            return Err(Error::AccountInactive);
        }
        if !verify_secret(secret, &account.password_digest) {
            warn!(email, "Invalid password attempt");
            return Err(Error::InvalidCredentials);
        }

        let identity = Identity::from(&account);
        {
            let mut state = self.state.write().await;
            *state = SessionState::Authenticated(identity.clone());
        }
        let snapshot = serde_json::to_string(&identity)?;
        self.storage.set(SESSION_KEY, &snapshot)?;
        self.load_requests(&identity).await;

        info!(email, role = identity.role.as_str(), "Login successful");
        Ok(identity)
    }

    /// End the session: clear the identity, the durable snapshot and
    /// the request cache. Other open tabs discover the change on their
    /// own next restore.
    pub async fn logout(&self) -> Result<()> {
        {
            let mut state = self.state.write().await;
            *state = SessionState::Anonymous;
        }
        self.requests.write().await.clear();
        self.storage.remove(SESSION_KEY)?;
        info!("Logged out");
        Ok(())
    }

    /// Restore a session from the durable snapshot, if one exists.
    ///
    /// Run once at process start. The credential is not re-validated.
    /// A malformed snapshot is discarded and treated as anonymous.
    pub async fn restore(&self) -> Result<Option<Identity>> {
        let Some(snapshot) = self.storage.get(SESSION_KEY) else {
            return Ok(None);
        };
        let identity: Identity = match serde_json::from_str(&snapshot) {
            Ok(identity) => identity,
            Err(err) => {
                warn!("Discarding malformed session snapshot: {}", err);
                self.storage.remove(SESSION_KEY)?;
                return Ok(None);
            }
        };

        {
            let mut state = self.state.write().await;
            *state = SessionState::Authenticated(identity.clone());
        }
        self.load_requests(&identity).await;

        info!(email = %identity.email, "Session restored");
        Ok(Some(identity))
    }

    /// The authenticated identity, if any.
    pub async fn identity(&self) -> Option<Identity> {
        match &*self.state.read().await {
            SessionState::Authenticated(identity) => Some(identity.clone()),
            SessionState::Anonymous => None,
        }
    }

    /// Snapshot of the cached visible requests, newest first.
    pub async fn visible_requests(&self) -> Vec<ServiceRequest> {
        self.requests.read().await.clone()
    }

    /// Reload the visible request cache from the data store.
    pub async fn refresh(&self) -> Result<()> {
        let Some(identity) = self.identity().await else {
            return Ok(());
        };
        let requests = self.fetch_visible(&identity).await?;
        *self.requests.write().await = requests;
        Ok(())
    }

    async fn fetch_visible(&self, identity: &Identity) -> Result<Vec<ServiceRequest>> {
        let all = self.store.list_requests(identity.dealership_id).await?;
        Ok(all
            .into_iter()
            .filter(|request| request.visible_to(identity.role, &identity.email))
            .collect())
    }

    /// Fill the cache after login/restore. A failed load degrades to an
    /// empty cache; the session itself stays authenticated.
    async fn load_requests(&self, identity: &Identity) {
        match self.fetch_visible(identity).await {
            Ok(requests) => *self.requests.write().await = requests,
            Err(err) => {
                warn!("Failed to load requests for session: {}", err);
                self.requests.write().await.clear();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;
    use tempfile::TempDir;

    use super::*;
    use crate::account::SecurityQuestion;
    use crate::credential::hash_secret;
    use crate::request::{RequestDraft, RequestStatus};
    use crate::store::FileStore;

    async fn build_session() -> (SessionStore, Arc<FileStore>, Uuid, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(FileStore::new(temp_dir.path().join("portal")).await.unwrap());
        let dealership = Uuid::new_v4();
        let session = SessionStore::new(store.clone(), LocalStorage::in_memory());
        (session, store, dealership, temp_dir)
    }

    async fn seed_account(
        store: &FileStore,
        dealership: Uuid,
        email: &str,
        secret: &str,
        role: Role,
        active: bool,
    ) -> Account {
        store
            .insert_account(Account {
                id: Uuid::new_v4(),
                dealership_id: dealership,
                email: email.to_string(),
                display_name: Some("Test User".to_string()),
                role,
                password_digest: hash_secret(secret),
                active,
                security_question: Some(SecurityQuestion::FirstPetName),
                security_answer: Some("fluffy".to_string()),
                created_at: Utc::now(),
            })
            .await
            .unwrap()
    }

    fn draft(dealership: Uuid, requested_by: &str) -> RequestDraft {
        RequestDraft {
            dealership_id: dealership,
            requested_by: requested_by.to_string(),
            manager: None,
            stock_number: "STK-100".to_string(),
            po_number: None,
            description: "Full detail before delivery".to_string(),
            year: None,
            make: None,
            model: None,
            color: None,
            date_requested: Utc::now().date_naive(),
            due_date: None,
            due_time: None,
            main_services: vec!["Full Detail".to_string()],
            additional_services: vec![],
            price: Decimal::from(150),
            status: RequestStatus::Pending,
            notes: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn login_succeeds_with_correct_credentials() {
        let (session, store, dealership, _temp) = build_session().await;
        seed_account(&store, dealership, "a@x.com", "pw-123456", Role::Admin, true).await;

        let identity = session.login("a@x.com", "pw-123456").await.unwrap();
        assert_eq!(identity.email, "a@x.com");
        assert_eq!(identity.role, Role::Admin);
        assert_eq!(identity.dealership_id, dealership);
        assert!(session.identity().await.is_some());
    }

    #[tokio::test]
    async fn wrong_secret_and_unknown_email_look_the_same() {
        let (session, store, dealership, _temp) = build_session().await;
        seed_account(&store, dealership, "a@x.com", "pw-123456", Role::Admin, true).await;

        let wrong_secret = session.login("a@x.com", "nope").await.unwrap_err();
        let unknown_email = session.login("b@x.com", "pw-123456").await.unwrap_err();
        assert!(matches!(wrong_secret, Error::InvalidCredentials));
        assert!(matches!(unknown_email, Error::InvalidCredentials));
        assert!(session.identity().await.is_none());
    }

    #[tokio::test]
    async fn inactive_account_is_distinguished() {
        let (session, store, dealership, _temp) = build_session().await;
        seed_account(&store, dealership, "a@x.com", "pw-123456", Role::Admin, false).await;

        let err = session.login("a@x.com", "pw-123456").await.unwrap_err();
        assert!(matches!(err, Error::AccountInactive));
    }

    #[tokio::test]
    async fn restore_rebuilds_identity_without_revalidation() {
        let (session, store, dealership, _temp) = build_session().await;
        seed_account(&store, dealership, "a@x.com", "pw-123456", Role::Manager, true).await;

        let identity = session.login("a@x.com", "pw-123456").await.unwrap();

        // A second session over the same storage, as after a reload.
        let reloaded = SessionStore::new(store.clone(), session.storage.clone());
        let restored = reloaded.restore().await.unwrap().unwrap();
        assert_eq!(restored, identity);
    }

    #[tokio::test]
    async fn restore_after_logout_stays_anonymous() {
        let (session, store, dealership, _temp) = build_session().await;
        seed_account(&store, dealership, "a@x.com", "pw-123456", Role::Manager, true).await;

        session.login("a@x.com", "pw-123456").await.unwrap();
        session.logout().await.unwrap();

        let reloaded = SessionStore::new(store.clone(), session.storage.clone());
        assert!(reloaded.restore().await.unwrap().is_none());
        assert!(reloaded.identity().await.is_none());
    }

    #[tokio::test]
    async fn malformed_snapshot_is_discarded() {
        let (session, _store, _dealership, _temp) = build_session().await;
        session.storage.set(SESSION_KEY, "{not json").unwrap();

        assert!(session.restore().await.unwrap().is_none());
        // The bad snapshot is gone for the next restore too.
        assert!(session.storage.get(SESSION_KEY).is_none());
    }

    #[tokio::test]
    async fn login_loads_role_visible_requests() {
        let (session, store, dealership, _temp) = build_session().await;
        seed_account(&store, dealership, "rep@x.com", "pw-123456", Role::SalesRep, true).await;
        seed_account(&store, dealership, "boss@x.com", "pw-123456", Role::Admin, true).await;
        store.insert_request(draft(dealership, "rep@x.com")).await.unwrap();
        store.insert_request(draft(dealership, "boss@x.com")).await.unwrap();

        // The rep's cache holds only their own request.
        session.login("rep@x.com", "pw-123456").await.unwrap();
        let visible = session.visible_requests().await;
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].requested_by, "rep@x.com");

        // An admin session over the same store sees both.
        let admin_session = SessionStore::new(store.clone(), LocalStorage::in_memory());
        admin_session.login("boss@x.com", "pw-123456").await.unwrap();
        assert_eq!(admin_session.visible_requests().await.len(), 2);
    }

    #[tokio::test]
    async fn refresh_picks_up_requests_created_after_login() {
        let (session, store, dealership, _temp) = build_session().await;
        seed_account(&store, dealership, "boss@x.com", "pw-123456", Role::Admin, true).await;

        session.login("boss@x.com", "pw-123456").await.unwrap();
        assert!(session.visible_requests().await.is_empty());

        store.insert_request(draft(dealership, "rep@x.com")).await.unwrap();
        session.refresh().await.unwrap();
        assert_eq!(session.visible_requests().await.len(), 1);
    }

    #[tokio::test]
    async fn logout_clears_request_cache() {
        let (session, store, dealership, _temp) = build_session().await;
        seed_account(&store, dealership, "a@x.com", "pw-123456", Role::Admin, true).await;

        session.login("a@x.com", "pw-123456").await.unwrap();
        session.logout().await.unwrap();
        assert!(session.visible_requests().await.is_empty());
    }
}
