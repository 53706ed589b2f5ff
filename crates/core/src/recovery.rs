//! Password recovery flow
//!
//! Three-step state machine: find the account by email, verify the
//! security answer, then set a new password. Steps must run in order;
//! once the password is reset the flow is terminal and a new flow must
//! be started from the beginning.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::account::SecurityQuestion;
use crate::credential::{hash_secret, normalize_answer};
use crate::store::DataStore;
use crate::{Error, Result};

const MIN_SECRET_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecoveryState {
    Start,
    Questioned { account_id: Uuid },
    Verified { account_id: Uuid },
    Complete,
}

/// One in-progress password recovery.
pub struct PasswordRecovery {
    store: Arc<dyn DataStore>,
    state: RecoveryState,
}

impl PasswordRecovery {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self {
            store,
            state: RecoveryState::Start,
        }
    }

    /// Step 1: locate the account and return its security question.
    pub async fn find_account(&mut self, email: &str) -> Result<SecurityQuestion> {
        if self.state != RecoveryState::Start {
            return Err(out_of_order());
        }
        let account = self
            .store
            .find_account_by_email(email)
            .await?
            .ok_or_else(|| Error::NotFound(format!("No account for '{}'", email)))?;
        let question = account.security_question.ok_or(Error::NoRecoverySetup)?;
        if account.security_answer.is_none() {
            return Err(Error::NoRecoverySetup);
        }

        self.state = RecoveryState::Questioned {
            account_id: account.id,
        };
        Ok(question)
    }

    /// Step 2: check the security answer, trimmed and
    /// case-insensitively.
    pub async fn verify_answer(&mut self, answer: &str) -> Result<()> {
        let RecoveryState::Questioned { account_id } = self.state else {
            return Err(out_of_order());
        };
        let account = self
            .store
            .get_account(account_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Account {}", account_id)))?;
        let stored = account.security_answer.ok_or(Error::NoRecoverySetup)?;

        if normalize_answer(answer) != stored {
            return Err(Error::WrongAnswer);
        }
        self.state = RecoveryState::Verified { account_id };
        Ok(())
    }

    /// Step 3: set the new password. The secrets must match and be at
    /// least six characters; on failure the stored digest is untouched
    /// and the flow stays at this step. Success is terminal.
    pub async fn reset_password(&mut self, new_secret: &str, confirm_secret: &str) -> Result<()> {
        let RecoveryState::Verified { account_id } = self.state else {
            return Err(out_of_order());
        };
        if new_secret != confirm_secret {
            return Err(Error::ValidationFailed(
                "Passwords do not match".to_string(),
            ));
        }
        if new_secret.len() < MIN_SECRET_LEN {
            return Err(Error::ValidationFailed(format!(
                "Password must be at least {} characters",
                MIN_SECRET_LEN
            )));
        }

        self.store
            .update_account_digest(account_id, &hash_secret(new_secret))
            .await
            .map_err(Error::into_mutation_failure)?;
        self.state = RecoveryState::Complete;

        info!(%account_id, "Password reset via recovery flow");
        Ok(())
    }
}

fn out_of_order() -> Error {
    Error::ValidationFailed("Recovery steps must be completed in order".to_string())
}
