//! User-related entity definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier.
    pub id: i64,
    /// Unique login name.
    pub username: String,
    /// Unique email address.
    pub email: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Password credential, opaque to everything but the auth layer.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Whether the account has been verified.
    pub is_verified: bool,
    /// When the user last made an authenticated request.
    pub last_active: Option<DateTime<Utc>>,
    /// When the account was created.
    pub date_joined: DateTime<Utc>,
}

impl User {
    /// Returns the user's full name as shown in notifications.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Fields required to register a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Unique login name.
    pub username: String,
    /// Unique email address.
    pub email: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Already-hashed password credential.
    pub password_hash: String,
}

/// Partial profile update; `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    /// New given name.
    pub first_name: Option<String>,
    /// New family name.
    pub last_name: Option<String>,
}

/// A user as embedded in trip views and member lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    /// Unique identifier.
    pub id: i64,
    /// Login name.
    pub username: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        }
    }
}

/// Aggregate user counts for the analytics endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    /// Total number of registered users.
    pub total: u64,
    /// Users active within the configured window.
    pub active: u64,
    /// Verified users.
    pub verified: u64,
    /// Users both active and verified.
    pub active_verified: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_name() {
        let user = User {
            id: 1,
            username: "amelie".to_string(),
            email: "amelie@example.com".to_string(),
            first_name: "Amelie".to_string(),
            last_name: "Poulain".to_string(),
            password_hash: "x".to_string(),
            is_verified: false,
            last_active: None,
            date_joined: Utc::now(),
        };

        assert_eq!(user.full_name(), "Amelie Poulain");
    }

    #[test]
    fn test_summary_from_user() {
        let user = User {
            id: 7,
            username: "marco".to_string(),
            email: "marco@example.com".to_string(),
            first_name: "Marco".to_string(),
            last_name: "Polo".to_string(),
            password_hash: "x".to_string(),
            is_verified: true,
            last_active: None,
            date_joined: Utc::now(),
        };

        let summary = UserSummary::from(&user);
        assert_eq!(summary.id, 7);
        assert_eq!(summary.username, "marco");
    }
}
