//! Core library for the dealer service portal
//!
//! This crate contains the portal's session and service-request
//! lifecycle core, including:
//! - Credential hashing and account management
//! - Session persistence and restore
//! - Service request lifecycle, role-scoped visibility and statistics
//! - Cross-session notifications

pub mod account;
pub mod credential;
pub mod error;
pub mod notify;
pub mod recovery;
pub mod request;
pub mod session;
pub mod store;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;
