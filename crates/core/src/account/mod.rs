//! Member accounts and the admin-facing account directory

mod directory;
mod model;

pub use directory::{AccountDirectory, CreatedAccount, NewAccount};
pub use model::*;
