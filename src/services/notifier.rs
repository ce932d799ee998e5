use anyhow::Result;
use uuid::Uuid;

use crate::models::notification::{Notification, NotificationKind};
use crate::services::database::DatabaseService;

/// Fire-and-forget dispatcher: the persisted row is the delivery. Domain
/// flows never fail because a notification could not be written.
#[derive(Clone)]
pub struct NotificationService {
    db: DatabaseService,
}

impl NotificationService {
    pub fn new(db: DatabaseService) -> Self {
        Self { db }
    }

    pub async fn send(
        &self,
        user_id: Uuid,
        title: &str,
        content: &str,
        kind: NotificationKind,
        action_url: Option<String>,
    ) {
        let notification = Notification::new(
            user_id,
            title.to_string(),
            content.to_string(),
            kind,
            action_url,
        );

        if let Err(err) = self.db.create_notification(&notification).await {
            log::warn!(
                "Failed to deliver {} notification to user {}: {}",
                kind,
                user_id,
                err
            );
        }
    }

    pub async fn list_for_user(&self, user_id: &Uuid) -> Result<Vec<Notification>> {
        self.db.get_notifications_by_user(user_id).await
    }

    pub async fn acknowledge(&self, notification_id: &Uuid) -> Result<Option<Notification>> {
        self.db.acknowledge_notification(notification_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_list_acknowledge() {
        let db = DatabaseService::new("memory://").await.unwrap();
        let notifier = NotificationService::new(db);
        let user_id = Uuid::new_v4();

        notifier
            .send(
                user_id,
                "Booking confirmed",
                "Your session on Monday is paid.",
                NotificationKind::Booking,
                Some("/slots/123".to_string()),
            )
            .await;

        let listed = notifier.list_for_user(&user_id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(!listed[0].acknowledged);
        assert_eq!(listed[0].title, "Booking confirmed");

        let acked = notifier.acknowledge(&listed[0].id).await.unwrap().unwrap();
        assert!(acked.acknowledged);
    }
}
