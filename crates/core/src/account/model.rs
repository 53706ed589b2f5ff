//! Account model definitions

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Error;

/// Role assigned to a member account.
///
/// Determines visibility and mutation rights over service requests and
/// the account directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SalesRep,
    Manager,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SalesRep => "sales_rep",
            Self::Manager => "manager",
            Self::Admin => "admin",
        }
    }

    /// Admins and managers see every request in the dealership; sales
    /// reps see only their own.
    pub fn can_view_all_requests(self) -> bool {
        matches!(self, Self::Admin | Self::Manager)
    }

    /// Status, price and date mutations require a privileged role.
    pub fn can_manage_requests(self) -> bool {
        matches!(self, Self::Admin | Self::Manager)
    }

    /// Account provisioning, reset and delete are admin only.
    pub fn can_manage_accounts(self) -> bool {
        matches!(self, Self::Admin)
    }

    /// The unread notification counter is shown to admins.
    pub fn sees_notifications(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "sales_rep" => Ok(Self::SalesRep),
            "manager" => Ok(Self::Manager),
            "admin" => Ok(Self::Admin),
            _ => Err(Error::ValidationFailed(format!(
                "Unsupported role '{}'",
                value
            ))),
        }
    }
}

/// Fixed set of security questions offered at account creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityQuestion {
    FirstPetName,
    MothersMaidenName,
    CityOfBirth,
    FirstCar,
    HighSchoolName,
    ChildhoodNickname,
}

impl SecurityQuestion {
    /// Human-readable prompt shown during account setup and recovery.
    pub fn prompt(self) -> &'static str {
        match self {
            Self::FirstPetName => "What was the name of your first pet?",
            Self::MothersMaidenName => "What is your mother's maiden name?",
            Self::CityOfBirth => "In what city were you born?",
            Self::FirstCar => "What was the make and model of your first car?",
            Self::HighSchoolName => "What high school did you attend?",
            Self::ChildhoodNickname => "What was your childhood nickname?",
        }
    }

    /// Every question in the catalog, in display order.
    pub fn all() -> &'static [SecurityQuestion] {
        &[
            Self::FirstPetName,
            Self::MothersMaidenName,
            Self::CityOfBirth,
            Self::FirstCar,
            Self::HighSchoolName,
            Self::ChildhoodNickname,
        ]
    }
}

/// A member account within one dealership.
///
/// The credential is stored only as a hex digest; the security answer is
/// stored normalized (trimmed, lowercased). Emails are case-sensitive as
/// stored and unique within the dealership.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub dealership_id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub role: Role,
    pub password_digest: String,
    pub active: bool,
    pub security_question: Option<SecurityQuestion>,
    pub security_answer: Option<String>,
    pub created_at: DateTime<Utc>,
}
