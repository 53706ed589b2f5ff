//! Enumerated catalog of service names
//!
//! Service selections on a request are sets of names drawn from these
//! lists. Insertion order is preserved for display but carries no
//! meaning.

use crate::{Error, Result};

/// Primary services offered by the dealership.
pub const MAIN_SERVICES: &[&str] = &[
    "Full Detail",
    "Interior Detail",
    "Exterior Detail",
    "Wash & Vacuum",
    "Paint Correction",
    "Ceramic Coating",
    "Engine Bay Cleaning",
];

/// Add-on services that can accompany a main service.
pub const ADDITIONAL_SERVICES: &[&str] = &[
    "Odor Removal",
    "Headlight Restoration",
    "Scratch Removal",
    "Pet Hair Removal",
    "Wheel & Tire Detail",
    "Clay Bar Treatment",
    "Window Tinting",
];

/// Validate a selection against a catalog list.
///
/// Unknown names are rejected; duplicates are dropped with the first
/// occurrence kept, preserving insertion order.
pub fn validate_selection(names: &[String], catalog: &[&str]) -> Result<Vec<String>> {
    let mut selected = Vec::with_capacity(names.len());
    for name in names {
        if !catalog.contains(&name.as_str()) {
            return Err(Error::ValidationFailed(format!(
                "Unknown service '{}'",
                name
            )));
        }
        if !selected.contains(name) {
            selected.push(name.clone());
        }
    }
    Ok(selected)
}
