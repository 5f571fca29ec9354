//! User accounts, roles and account status

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered user of the platform
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub status: UserStatus,
    pub plan_type: PlanType,
    /// Short shareable code used to find this user (e.g. "PM-3F9A1C")
    pub unique_code: String,
    pub connected_farmers: Vec<Uuid>,
    pub connected_dealers: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Role of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(type_name = "user_role", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Farmer,
    Dealer,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Farmer => "farmer",
            UserRole::Dealer => "dealer",
            UserRole::Admin => "admin",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "farmer" => Some(UserRole::Farmer),
            "dealer" => Some(UserRole::Dealer),
            "admin" => Some(UserRole::Admin),
            _ => None,
        }
    }
}

/// Account status, controlled by administrators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(type_name = "user_status", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Pending,
    Active,
    Suspended,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Pending => "pending",
            UserStatus::Active => "active",
            UserStatus::Suspended => "suspended",
        }
    }

    /// Whether an administrator may move an account from `self` to `next`
    pub fn can_transition_to(&self, next: UserStatus) -> bool {
        matches!(
            (self, next),
            (UserStatus::Pending, UserStatus::Active)
                | (UserStatus::Pending, UserStatus::Suspended)
                | (UserStatus::Active, UserStatus::Suspended)
                | (UserStatus::Suspended, UserStatus::Active)
        )
    }
}

/// Subscription plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(type_name = "plan_type", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PlanType {
    #[default]
    Free,
    Premium,
}

/// One side of a farmer/dealer relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(type_name = "party", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum Party {
    Farmer,
    Dealer,
}

impl Party {
    /// Party a role trades as; admins are not a party to trades
    pub fn from_role(role: UserRole) -> Option<Self> {
        match role {
            UserRole::Farmer => Some(Party::Farmer),
            UserRole::Dealer => Some(Party::Dealer),
            UserRole::Admin => None,
        }
    }

    pub fn counterpart(&self) -> Party {
        match self {
            Party::Farmer => Party::Dealer,
            Party::Dealer => Party::Farmer,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Party::Farmer => "farmer",
            Party::Dealer => "dealer",
        }
    }
}

impl std::fmt::Display for Party {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status a freshly signed-up account starts in
pub fn signup_status(is_auto_admin: bool, has_invitation: bool) -> UserStatus {
    if is_auto_admin || has_invitation {
        UserStatus::Active
    } else {
        UserStatus::Pending
    }
}

/// Generate the shareable user code from the account id
pub fn generate_user_code(id: Uuid) -> String {
    let hex = id.simple().to_string().to_uppercase();
    format!("PM-{}", &hex[..6])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        assert!(UserStatus::Pending.can_transition_to(UserStatus::Active));
        assert!(UserStatus::Pending.can_transition_to(UserStatus::Suspended));
        assert!(UserStatus::Active.can_transition_to(UserStatus::Suspended));
        assert!(UserStatus::Suspended.can_transition_to(UserStatus::Active));

        assert!(!UserStatus::Active.can_transition_to(UserStatus::Pending));
        assert!(!UserStatus::Suspended.can_transition_to(UserStatus::Pending));
        assert!(!UserStatus::Active.can_transition_to(UserStatus::Active));
    }

    #[test]
    fn test_signup_status() {
        assert_eq!(signup_status(false, false), UserStatus::Pending);
        assert_eq!(signup_status(true, false), UserStatus::Active);
        assert_eq!(signup_status(false, true), UserStatus::Active);
    }

    #[test]
    fn test_party_from_role() {
        assert_eq!(Party::from_role(UserRole::Farmer), Some(Party::Farmer));
        assert_eq!(Party::from_role(UserRole::Dealer), Some(Party::Dealer));
        assert_eq!(Party::from_role(UserRole::Admin), None);
        assert_eq!(Party::Farmer.counterpart(), Party::Dealer);
    }

    #[test]
    fn test_user_code_format() {
        let id = Uuid::parse_str("3f9a1c52-0000-4000-8000-000000000000").unwrap();
        assert_eq!(generate_user_code(id), "PM-3F9A1C");
        assert!(crate::validation::validate_user_code(&generate_user_code(Uuid::new_v4())).is_ok());
    }

    #[test]
    fn test_role_round_trip() {
        for role in [UserRole::Farmer, UserRole::Dealer, UserRole::Admin] {
            assert_eq!(UserRole::from_str(role.as_str()), Some(role));
        }
        assert_eq!(UserRole::from_str("owner"), None);
    }
}
