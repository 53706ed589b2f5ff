//! Service request model definitions

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::account::Role;

/// Status of a service request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    InProgress,
    Completed,
}

impl Default for RequestStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl RequestStatus {
    /// Human-facing label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
        }
    }
}

/// Single decision point for status transitions.
///
/// Every transition is currently permitted: manual override is required
/// in practice, so the model imposes no ordering. A future ordering
/// policy changes only this function.
pub fn transition_allowed(from: RequestStatus, to: RequestStatus) -> bool {
    let _ = (from, to);
    true
}

/// A service request within one dealership.
///
/// `request_number` is human-facing (`REQ-NNN`), unique within the
/// dealership, assigned at creation and never reassigned or reused.
/// `date_requested` is set at creation and immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceRequest {
    pub id: i64,
    pub dealership_id: Uuid,
    pub request_number: String,
    pub requested_by: String,
    pub manager: Option<String>,
    pub stock_number: String,
    pub po_number: Option<String>,
    pub description: String,
    pub year: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub color: Option<String>,
    pub date_requested: NaiveDate,
    pub due_date: Option<String>,
    pub due_time: Option<String>,
    pub start_date: Option<String>,
    pub start_time: Option<String>,
    pub completion_date: Option<String>,
    pub completion_time: Option<String>,
    pub main_services: Vec<String>,
    pub additional_services: Vec<String>,
    pub price: Decimal,
    pub status: RequestStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ServiceRequest {
    /// Whether this request is visible to a caller with the given role
    /// and email. Admins and managers see everything in the dealership;
    /// sales reps see only requests they authored.
    pub fn visible_to(&self, role: Role, email: &str) -> bool {
        role.can_view_all_requests() || self.requested_by == email
    }
}

/// Input for creating a service request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewServiceRequest {
    pub stock_number: String,
    pub po_number: Option<String>,
    pub description: String,
    pub manager: Option<String>,
    pub year: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub color: Option<String>,
    pub due_date: Option<String>,
    pub due_time: Option<String>,
    pub main_services: Vec<String>,
    pub additional_services: Vec<String>,
    pub price: Decimal,
    pub notes: Option<String>,
}

/// Fully validated request fields handed to the data store for insert.
///
/// The store assigns the numeric id and the `REQ-NNN` number.
#[derive(Debug, Clone)]
pub struct RequestDraft {
    pub dealership_id: Uuid,
    pub requested_by: String,
    pub manager: Option<String>,
    pub stock_number: String,
    pub po_number: Option<String>,
    pub description: String,
    pub year: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub color: Option<String>,
    pub date_requested: NaiveDate,
    pub due_date: Option<String>,
    pub due_time: Option<String>,
    pub main_services: Vec<String>,
    pub additional_services: Vec<String>,
    pub price: Decimal,
    pub status: RequestStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Partial update of the schedule fields.
///
/// Only provided, non-empty sub-fields are applied; an absent or
/// empty-string value leaves the prior value intact. There is no way to
/// clear a previously set field through this update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DateUpdate {
    pub due_date: Option<String>,
    pub due_time: Option<String>,
    pub start_date: Option<String>,
    pub start_time: Option<String>,
    pub completion_date: Option<String>,
    pub completion_time: Option<String>,
}

impl DateUpdate {
    /// Merge this update into a request, additively.
    pub fn apply_to(&self, request: &mut ServiceRequest) {
        merge_field(&mut request.due_date, &self.due_date);
        merge_field(&mut request.due_time, &self.due_time);
        merge_field(&mut request.start_date, &self.start_date);
        merge_field(&mut request.start_time, &self.start_time);
        merge_field(&mut request.completion_date, &self.completion_date);
        merge_field(&mut request.completion_time, &self.completion_time);
    }
}

fn merge_field(target: &mut Option<String>, value: &Option<String>) {
    if let Some(value) = value {
        if !value.is_empty() {
            *target = Some(value.clone());
        }
    }
}

/// Aggregate statistics over a visible set of requests.
///
/// Recomputed on every read, never stored. `amount_due` sums prices of
/// requests still pending or in progress; `amount_paid` sums completed
/// ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestStats {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub amount_due: Decimal,
    pub amount_paid: Decimal,
}

impl RequestStats {
    /// Compute statistics over a set of requests.
    pub fn compute(requests: &[ServiceRequest]) -> Self {
        let mut stats = Self {
            total: requests.len(),
            pending: 0,
            in_progress: 0,
            completed: 0,
            amount_due: Decimal::ZERO,
            amount_paid: Decimal::ZERO,
        };
        for request in requests {
            match request.status {
                RequestStatus::Pending => {
                    stats.pending += 1;
                    stats.amount_due += request.price;
                }
                RequestStatus::InProgress => {
                    stats.in_progress += 1;
                    stats.amount_due += request.price;
                }
                RequestStatus::Completed => {
                    stats.completed += 1;
                    stats.amount_paid += request.price;
                }
            }
        }
        stats
    }
}
