//! File-backed data store
//!
//! Keeps both collections in memory behind a single `RwLock` and mirrors
//! every mutation to a JSON file, so state survives a restart. Request
//! numbering happens inside the write lock: the max-suffix scan and the
//! insert are one atomic step, which makes concurrent creates safe.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::account::Account;
use crate::request::{RequestDraft, ServiceRequest};
use crate::store::DataStore;
use crate::{Error, Result};

const STORE_FILE: &str = "store.json";
const DEFAULT_DATA_DIR: &str = "data";
const REQUEST_NUMBER_PREFIX: &str = "REQ-";

#[derive(Debug, Default)]
struct StoreState {
    accounts: HashMap<Uuid, Account>,
    requests: HashMap<i64, ServiceRequest>,
    next_request_id: i64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredState {
    accounts: Vec<Account>,
    requests: Vec<ServiceRequest>,
    next_request_id: i64,
}

impl From<StoredState> for StoreState {
    fn from(value: StoredState) -> Self {
        Self {
            accounts: value
                .accounts
                .into_iter()
                .map(|item| (item.id, item))
                .collect(),
            requests: value
                .requests
                .into_iter()
                .map(|item| (item.id, item))
                .collect(),
            next_request_id: value.next_request_id,
        }
    }
}

impl From<&StoreState> for StoredState {
    fn from(value: &StoreState) -> Self {
        Self {
            accounts: value.accounts.values().cloned().collect(),
            requests: value.requests.values().cloned().collect(),
            next_request_id: value.next_request_id,
        }
    }
}

/// File-backed implementation of [`DataStore`].
pub struct FileStore {
    state: RwLock<StoreState>,
    file_path: PathBuf,
}

impl FileStore {
    /// Open a store under the given directory, creating it if needed.
    pub async fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        tokio::fs::create_dir_all(&base_dir)
            .await
            .map_err(|err| Error::Storage(format!("Failed to create data directory: {}", err)))?;
        let file_path = base_dir.join(STORE_FILE);
        let state = load_state(&file_path).await?;
        Ok(Self {
            state: RwLock::new(state),
            file_path,
        })
    }

    /// Open a store under `DSP_DATA_DIR` (default `data`).
    pub async fn from_env() -> Result<Self> {
        let base_dir = std::env::var("DSP_DATA_DIR")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string());
        Self::new(base_dir).await
    }
}

#[async_trait]
impl DataStore for FileStore {
    async fn insert_account(&self, account: Account) -> Result<Account> {
        let mut state = self.state.write().await;
        let duplicate = state.accounts.values().any(|existing| {
            existing.dealership_id == account.dealership_id && existing.email == account.email
        });
        if duplicate {
            return Err(Error::DuplicateEmail(account.email));
        }
        state.accounts.insert(account.id, account.clone());
        persist_state(&self.file_path, &state).await?;
        Ok(account)
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>> {
        let state = self.state.read().await;
        Ok(state
            .accounts
            .values()
            .find(|account| account.email == email)
            .cloned())
    }

    async fn get_account(&self, id: Uuid) -> Result<Option<Account>> {
        let state = self.state.read().await;
        Ok(state.accounts.get(&id).cloned())
    }

    async fn list_accounts(&self, dealership_id: Uuid) -> Result<Vec<Account>> {
        let state = self.state.read().await;
        let mut accounts: Vec<Account> = state
            .accounts
            .values()
            .filter(|account| account.dealership_id == dealership_id)
            .cloned()
            .collect();
        accounts.sort_by(|left, right| left.email.cmp(&right.email));
        Ok(accounts)
    }

    async fn update_account_digest(&self, id: Uuid, digest: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let account = state
            .accounts
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("Account {}", id)))?;
        account.password_digest = digest.to_string();
        persist_state(&self.file_path, &state).await
    }

    async fn update_account_active(&self, id: Uuid, active: bool) -> Result<()> {
        let mut state = self.state.write().await;
        let account = state
            .accounts
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("Account {}", id)))?;
        account.active = active;
        persist_state(&self.file_path, &state).await
    }

    async fn delete_account(&self, id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        let removed = state.accounts.remove(&id).is_some();
        if removed {
            persist_state(&self.file_path, &state).await?;
        }
        Ok(removed)
    }

    async fn insert_request(&self, draft: RequestDraft) -> Result<ServiceRequest> {
        let mut state = self.state.write().await;

        let id = state.next_request_id.max(1);
        state.next_request_id = id + 1;
        let request_number = next_request_number(&state, draft.dealership_id);

        let request = ServiceRequest {
            id,
            dealership_id: draft.dealership_id,
            request_number,
            requested_by: draft.requested_by,
            manager: draft.manager,
            stock_number: draft.stock_number,
            po_number: draft.po_number,
            description: draft.description,
            year: draft.year,
            make: draft.make,
            model: draft.model,
            color: draft.color,
            date_requested: draft.date_requested,
            due_date: draft.due_date,
            due_time: draft.due_time,
            start_date: None,
            start_time: None,
            completion_date: None,
            completion_time: None,
            main_services: draft.main_services,
            additional_services: draft.additional_services,
            price: draft.price,
            status: draft.status,
            notes: draft.notes,
            created_at: draft.created_at,
        };
        state.requests.insert(request.id, request.clone());
        persist_state(&self.file_path, &state).await?;
        Ok(request)
    }

    async fn get_request(&self, id: i64) -> Result<Option<ServiceRequest>> {
        let state = self.state.read().await;
        Ok(state.requests.get(&id).cloned())
    }

    async fn list_requests(&self, dealership_id: Uuid) -> Result<Vec<ServiceRequest>> {
        let state = self.state.read().await;
        let mut requests: Vec<ServiceRequest> = state
            .requests
            .values()
            .filter(|request| request.dealership_id == dealership_id)
            .cloned()
            .collect();
        requests.sort_by(|left, right| {
            right
                .created_at
                .cmp(&left.created_at)
                .then(right.id.cmp(&left.id))
        });
        Ok(requests)
    }

    async fn update_request(&self, request: ServiceRequest) -> Result<ServiceRequest> {
        let mut state = self.state.write().await;
        if !state.requests.contains_key(&request.id) {
            return Err(Error::NotFound(format!("Request {}", request.id)));
        }
        state.requests.insert(request.id, request.clone());
        persist_state(&self.file_path, &state).await?;
        Ok(request)
    }
}

/// Next `REQ-NNN` number for a dealership. Caller must hold the write
/// lock so the scan and the subsequent insert are atomic.
fn next_request_number(state: &StoreState, dealership_id: Uuid) -> String {
    let highest = state
        .requests
        .values()
        .filter(|request| request.dealership_id == dealership_id)
        .filter_map(|request| {
            request
                .request_number
                .strip_prefix(REQUEST_NUMBER_PREFIX)
                .and_then(|suffix| suffix.parse::<u32>().ok())
        })
        .max()
        .unwrap_or(0);
    format!("{}{:03}", REQUEST_NUMBER_PREFIX, highest + 1)
}

async fn load_state(path: &Path) -> Result<StoreState> {
    if !path.exists() {
        return Ok(StoreState::default());
    }
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|err| Error::Storage(format!("Failed to read store file: {}", err)))?;
    if content.trim().is_empty() {
        return Ok(StoreState::default());
    }
    let stored: StoredState = serde_json::from_str(&content)
        .map_err(|err| Error::Storage(format!("Failed to parse store file: {}", err)))?;
    Ok(stored.into())
}

async fn persist_state(path: &Path, state: &StoreState) -> Result<()> {
    let content = serde_json::to_string_pretty(&StoredState::from(state))
        .map_err(|err| Error::Storage(format!("Failed to serialize store state: {}", err)))?;
    tokio::fs::write(path, content)
        .await
        .map_err(|err| Error::Storage(format!("Failed to write store file: {}", err)))?;
    Ok(())
}
