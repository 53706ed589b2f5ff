//! Data-store interface
//!
//! The portal core talks to its backing relational store through this
//! trait: filtered reads over the `accounts` and `service_requests`
//! collections, inserts with generated ids, partial updates and deletes,
//! all scoped by dealership.

mod file_store;

use async_trait::async_trait;
use uuid::Uuid;

use crate::account::Account;
use crate::request::{RequestDraft, ServiceRequest};
use crate::Result;

pub use file_store::FileStore;

/// Query/mutation interface over the backing data store.
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Insert an account. Fails with `DuplicateEmail` when the email is
    /// already taken within the account's dealership.
    async fn insert_account(&self, account: Account) -> Result<Account>;

    /// Look up an account by exact email, across all dealerships.
    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>>;

    /// Get an account by id.
    async fn get_account(&self, id: Uuid) -> Result<Option<Account>>;

    /// List all accounts in a dealership, ordered by email.
    async fn list_accounts(&self, dealership_id: Uuid) -> Result<Vec<Account>>;

    /// Overwrite an account's credential digest. Nothing else changes.
    async fn update_account_digest(&self, id: Uuid, digest: &str) -> Result<()>;

    /// Set an account's active flag.
    async fn update_account_active(&self, id: Uuid, active: bool) -> Result<()>;

    /// Hard-delete an account. Returns false when no row matched.
    async fn delete_account(&self, id: Uuid) -> Result<bool>;

    /// Insert a service request, assigning the numeric id and the next
    /// `REQ-NNN` number for the dealership in one atomic step.
    async fn insert_request(&self, draft: RequestDraft) -> Result<ServiceRequest>;

    /// Get a request by id.
    async fn get_request(&self, id: i64) -> Result<Option<ServiceRequest>>;

    /// List all requests in a dealership, newest first.
    async fn list_requests(&self, dealership_id: Uuid) -> Result<Vec<ServiceRequest>>;

    /// Replace a request record by id.
    async fn update_request(&self, request: ServiceRequest) -> Result<ServiceRequest>;
}
