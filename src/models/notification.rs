use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum NotificationKind {
    Booking,
    Payment,
    Refund,
    Withdraw,
    Reminder,
    System,
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationKind::Booking => write!(f, "booking"),
            NotificationKind::Payment => write!(f, "payment"),
            NotificationKind::Refund => write!(f, "refund"),
            NotificationKind::Withdraw => write!(f, "withdraw"),
            NotificationKind::Reminder => write!(f, "reminder"),
            NotificationKind::System => write!(f, "system"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "notification_id")]
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    pub kind: NotificationKind,
    pub action_url: Option<String>,
    pub acknowledged: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        user_id: Uuid,
        title: String,
        content: String,
        kind: NotificationKind,
        action_url: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            title,
            content,
            kind,
            action_url,
            acknowledged: false,
            created_at: Utc::now(),
        }
    }
}
