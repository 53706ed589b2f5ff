//! Session state and client-local durable storage

mod local;
mod store;

pub use local::{LocalStorage, StorageEvent};
pub use store::{Identity, SessionState, SessionStore, SESSION_KEY};
