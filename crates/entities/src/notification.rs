//! Notification entity definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// General-purpose notification.
    #[default]
    Common,
    /// Trip membership event.
    Trip,
}

impl NotificationKind {
    /// Stable string form used in storage.
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::Common => "common",
            NotificationKind::Trip => "trip",
        }
    }

    /// Parses the stable string form back into a kind.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "common" => Some(NotificationKind::Common),
            "trip" => Some(NotificationKind::Trip),
            _ => None,
        }
    }
}

/// A directed notification from an initiator to a destined user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// Unique identifier.
    pub id: i64,
    /// User who caused the notification.
    pub initiator_id: i64,
    /// User the notification is addressed to.
    pub destined_id: i64,
    /// Human-readable message.
    pub text: String,
    /// Kind of notification.
    pub kind: NotificationKind,
    /// Whether the destined user has read it.
    pub is_read: bool,
    /// When the notification was created.
    pub created_at: DateTime<Utc>,
}

/// Fields required to record a notification.
#[derive(Debug, Clone)]
pub struct NewNotification {
    /// User who caused the notification.
    pub initiator_id: i64,
    /// User the notification is addressed to.
    pub destined_id: i64,
    /// Human-readable message.
    pub text: String,
    /// Kind of notification.
    pub kind: NotificationKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trip() {
        for kind in [NotificationKind::Common, NotificationKind::Trip] {
            assert_eq!(NotificationKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(NotificationKind::parse("bogus"), None);
    }

    #[test]
    fn test_kind_serde_names() {
        assert_eq!(
            serde_json::to_value(NotificationKind::Trip).unwrap(),
            serde_json::json!("trip")
        );
    }
}
