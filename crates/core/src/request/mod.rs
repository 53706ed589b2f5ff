//! Service requests: models, lifecycle operations and statistics

mod catalog;
mod model;
mod service;

pub use catalog::{validate_selection, ADDITIONAL_SERVICES, MAIN_SERVICES};
pub use model::*;
pub use service::RequestService;
