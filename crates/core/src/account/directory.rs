//! Admin-facing account directory
//!
//! CRUD surface over member accounts, scoped to the caller's
//! dealership. Every operation requires the admin role.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::account::{Account, Role, SecurityQuestion};
use crate::credential::{generate_secret, hash_secret, normalize_answer};
use crate::session::Identity;
use crate::store::DataStore;
use crate::{Error, Result};

/// Input for provisioning a member account.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub display_name: Option<String>,
    pub role: Role,
    /// Chosen secret; one is generated when absent.
    pub secret: Option<String>,
    pub security_question: SecurityQuestion,
    pub security_answer: String,
}

/// A freshly provisioned account with its plaintext secret.
///
/// The secret is returned exactly once for display/copy; it is never
/// persisted and cannot be retrieved again.
#[derive(Debug, Clone)]
pub struct CreatedAccount {
    pub account: Account,
    pub secret: String,
}

/// Account directory operations.
pub struct AccountDirectory {
    store: Arc<dyn DataStore>,
}

impl AccountDirectory {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    /// Provision an account in the caller's dealership.
    pub async fn create_account(
        &self,
        actor: &Identity,
        new: NewAccount,
    ) -> Result<CreatedAccount> {
        self.require_admin(actor)?;
        if new.email.trim().is_empty() {
            return Err(Error::ValidationFailed("Email is required".to_string()));
        }
        let answer = normalize_answer(&new.security_answer);
        if answer.is_empty() {
            return Err(Error::ValidationFailed(
                "Security answer is required".to_string(),
            ));
        }

        let secret = new.secret.unwrap_or_else(generate_secret);
        let account = Account {
            id: Uuid::new_v4(),
            dealership_id: actor.dealership_id,
            email: new.email,
            display_name: new.display_name,
            role: new.role,
            password_digest: hash_secret(&secret),
            active: true,
            security_question: Some(new.security_question),
            security_answer: Some(answer),
            created_at: Utc::now(),
        };

        let account = self
            .store
            .insert_account(account)
            .await
            .map_err(Error::into_mutation_failure)?;

        info!(email = %account.email, role = account.role.as_str(), "Account created");
        Ok(CreatedAccount { account, secret })
    }

    /// All accounts in the caller's dealership.
    ///
    /// A store failure degrades to an empty list with a diagnostic;
    /// this read path is not critical.
    pub async fn list_accounts(&self, actor: &Identity) -> Result<Vec<Account>> {
        self.require_admin(actor)?;
        match self.store.list_accounts(actor.dealership_id).await {
            Ok(accounts) => Ok(accounts),
            Err(err) => {
                warn!("Failed to list accounts: {}", err);
                Ok(Vec::new())
            }
        }
    }

    /// Generate a new secret for an account and overwrite its digest.
    ///
    /// Returns the plaintext exactly once; it is not retrievable after
    /// this call returns.
    pub async fn reset_password(&self, actor: &Identity, account_id: Uuid) -> Result<String> {
        self.require_admin(actor)?;
        self.get_scoped_account(actor, account_id).await?;

        let secret = generate_secret();
        self.store
            .update_account_digest(account_id, &hash_secret(&secret))
            .await
            .map_err(Error::into_mutation_failure)?;

        info!(%account_id, "Password reset by admin");
        Ok(secret)
    }

    /// Activate or deactivate an account. Inactive accounts are
    /// rejected at login even with correct credentials.
    pub async fn set_active(&self, actor: &Identity, account_id: Uuid, active: bool) -> Result<()> {
        self.require_admin(actor)?;
        self.get_scoped_account(actor, account_id).await?;
        self.store
            .update_account_active(account_id, active)
            .await
            .map_err(Error::into_mutation_failure)?;
        info!(%account_id, active, "Account active flag changed");
        Ok(())
    }

    /// Hard-delete an account. Irreversible. Service requests created
    /// by the account keep their now-orphaned `requested_by` email.
    pub async fn delete_account(&self, actor: &Identity, account_id: Uuid) -> Result<()> {
        self.require_admin(actor)?;
        self.get_scoped_account(actor, account_id).await?;
        let removed = self
            .store
            .delete_account(account_id)
            .await
            .map_err(Error::into_mutation_failure)?;
        if !removed {
            return Err(Error::NotFound(format!("Account {}", account_id)));
        }
        info!(%account_id, "Account deleted");
        Ok(())
    }

    fn require_admin(&self, actor: &Identity) -> Result<()> {
        if !actor.role.can_manage_accounts() {
            return Err(Error::Forbidden(
                "Only admins can manage accounts".to_string(),
            ));
        }
        Ok(())
    }

    async fn get_scoped_account(&self, actor: &Identity, account_id: Uuid) -> Result<Account> {
        self.store
            .get_account(account_id)
            .await?
            .filter(|account| account.dealership_id == actor.dealership_id)
            .ok_or_else(|| Error::NotFound(format!("Account {}", account_id)))
    }
}
