use chrono::{DateTime, Duration, Utc};

use crate::config::AppConfig;
use crate::error::AppError;
use crate::models::notification::NotificationKind;
use crate::models::refund::{FileComplaintRequest, RefundKind, RefundRequest};
use crate::models::slot::{BookingSlot, ConfirmJoinRequest, SlotStatus};
use crate::services::database::DatabaseService;
use crate::services::notifier::NotificationService;

#[derive(Clone)]
pub struct AttendanceService {
    db: DatabaseService,
    notifier: NotificationService,
    app: AppConfig,
}

impl AttendanceService {
    pub fn new(db: DatabaseService, notifier: NotificationService, app: AppConfig) -> Self {
        Self { db, notifier, app }
    }

    /// A participant reports they joined the session. A tutor confirming
    /// after a no-show complaint answers that complaint in the same stroke.
    pub async fn confirm_join(&self, request: ConfirmJoinRequest) -> Result<BookingSlot, AppError> {
        let slot = self
            .db
            .get_slot(&request.slot_id)
            .await?
            .ok_or_else(|| AppError::not_found("booking slot", request.slot_id))?;

        if slot.status != SlotStatus::Paid {
            return Err(AppError::State(format!(
                "slot is {}, attendance applies to paid sessions",
                slot.status
            )));
        }

        let now = Utc::now();

        if request.user_id == slot.tutor_id {
            let updated = self
                .db
                .record_tutor_join(&slot.id, request.evidence_url.clone(), now)
                .await?
                .ok_or_else(|| AppError::State("slot is no longer paid".to_string()))?;

            if let Some(mut complaint) = self.db.get_open_complaint_for_slot(&slot.id).await? {
                complaint.record_tutor_attendance(true, now);
                self.db.update_refund(&complaint).await?;
                log::info!(
                    "Tutor {} answered complaint {} by joining slot {}",
                    slot.tutor_id,
                    complaint.id,
                    slot.id
                );
            }

            Ok(updated)
        } else if slot.learner_id == Some(request.user_id) {
            self.db
                .record_learner_join(&slot.id, request.evidence_url.clone(), now)
                .await?
                .ok_or_else(|| AppError::State("slot is no longer paid".to_string()))
        } else {
            Err(AppError::Authorization(
                "only the slot participants can confirm attendance".to_string(),
            ))
        }
    }

    /// Learner disputes the session. The refund amount is the full slot
    /// price; if the tutor already confirmed attendance the complaint starts
    /// with that answer on record and the tutor is not pinged again.
    pub async fn file_complaint(&self, request: FileComplaintRequest) -> Result<RefundRequest, AppError> {
        let slot = self
            .db
            .get_slot(&request.slot_id)
            .await?
            .ok_or_else(|| AppError::not_found("booking slot", request.slot_id))?;

        if slot.status != SlotStatus::Paid {
            return Err(AppError::State(format!(
                "slot is {}, complaints apply to paid sessions",
                slot.status
            )));
        }
        if slot.learner_id != Some(request.learner_id) {
            return Err(AppError::Authorization(
                "only the booked learner can file a complaint".to_string(),
            ));
        }
        if self.db.get_non_rejected_refund_for_slot(&slot.id).await?.is_some() {
            return Err(AppError::Conflict(
                "a refund case already exists for this slot".to_string(),
            ));
        }

        let now = Utc::now();
        let mut refund = RefundRequest::new(
            RefundKind::Complaint,
            Some(slot.id),
            Some(slot.plan_id),
            slot.payment_id,
            request.learner_id,
            slot.tutor_id,
            slot.price,
            request.reason,
            request.evidence_url,
        );

        if slot.tutor_join {
            refund.record_tutor_attendance(true, now);
        }

        let refund = self.db.create_refund(&refund).await?;

        if !slot.tutor_join {
            self.notifier
                .send(
                    slot.tutor_id,
                    "Complaint filed",
                    &format!(
                        "A learner reported a problem with the session at {}. Confirm whether you attended.",
                        slot.start_time
                    ),
                    NotificationKind::Refund,
                    Some(format!("/refunds/{}", refund.id)),
                )
                .await;
        }
        self.notifier
            .send(
                request.learner_id,
                "Complaint received",
                "Submit your payout details so the refund can be processed.",
                NotificationKind::Refund,
                Some(format!("/refunds/{}", refund.id)),
            )
            .await;

        log::info!(
            "Complaint {} filed for slot {} over {}",
            refund.id,
            slot.id,
            refund.amount
        );
        Ok(refund)
    }

    /// Sweep: a finished session where the tutor showed up and no complaint
    /// is open counts as attended by the learner.
    pub async fn auto_confirm_learner_join(&self, now: DateTime<Utc>) -> Result<usize, AppError> {
        let candidates = self.db.get_auto_confirm_candidate_slots().await?;
        let mut confirmed = 0;

        for slot in candidates {
            if now <= slot.end_time {
                continue;
            }
            if self.db.get_open_complaint_for_slot(&slot.id).await?.is_some() {
                continue;
            }
            if self.db.record_learner_join(&slot.id, None, now).await?.is_some() {
                confirmed += 1;
                log::info!("Auto-confirmed learner attendance for slot {}", slot.id);
            }
        }

        Ok(confirmed)
    }

    /// Sweep: a tutor who ignores a complaint past the response window is
    /// recorded as absent, letting the refund proceed without their input.
    pub async fn auto_mark_tutor_absent(&self, now: DateTime<Utc>) -> Result<usize, AppError> {
        let complaints = self.db.get_pending_complaints().await?;
        let response_window = Duration::hours(self.app.complaint_response_hours);
        let mut marked = 0;

        for complaint in complaints {
            if complaint.tutor_attend.is_some() {
                continue;
            }
            if now - complaint.created_at <= response_window {
                continue;
            }
            self.db.record_tutor_absent(&complaint.id, now).await?;
            marked += 1;
            log::info!(
                "Tutor {} never responded to complaint {}, marked absent",
                complaint.tutor_id,
                complaint.id
            );
        }

        Ok(marked)
    }

    /// Sweep: remind both parties shortly before a paid session starts.
    pub async fn send_session_reminders(&self, now: DateTime<Utc>) -> Result<usize, AppError> {
        let slots = self.db.get_unreminded_paid_slots().await?;
        let window = Duration::minutes(self.app.reminder_window_minutes);
        let mut sent = 0;

        for slot in slots {
            if slot.start_time <= now {
                // Too late to remind; stop rescanning this slot.
                self.db.mark_reminder_sent(&slot.id, now).await?;
                continue;
            }
            if slot.start_time > now + window {
                continue;
            }

            let message = format!("Your session starts at {}.", slot.start_time);
            if let Some(learner_id) = slot.learner_id {
                self.notifier
                    .send(
                        learner_id,
                        "Upcoming session",
                        &message,
                        NotificationKind::Reminder,
                        slot.meeting_url.clone(),
                    )
                    .await;
            }
            self.notifier
                .send(
                    slot.tutor_id,
                    "Upcoming session",
                    &message,
                    NotificationKind::Reminder,
                    slot.meeting_url.clone(),
                )
                .await;

            self.db.mark_reminder_sent(&slot.id, now).await?;
            sent += 1;
        }

        Ok(sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::refund::RefundStatus;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    async fn test_service() -> (AttendanceService, DatabaseService) {
        let db = DatabaseService::new("memory://").await.unwrap();
        let notifier = NotificationService::new(db.clone());
        let service = AttendanceService::new(db.clone(), notifier, AppConfig::default());
        (service, db)
    }

    /// A paid slot running from `start_offset` to `start_offset + 1h`
    /// relative to now.
    async fn paid_slot(db: &DatabaseService, start_offset: Duration) -> BookingSlot {
        let start = Utc::now() + start_offset;
        let mut slot = BookingSlot::new_locked(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            start,
            start + Duration::hours(1),
            Decimal::new(200_000_00, 2),
            None,
            Duration::minutes(15),
        );
        slot.mark_paid("https://meet.example/s/1".to_string(), Utc::now())
            .unwrap();
        db.create_slot(&slot).await.unwrap()
    }

    fn complaint_for(slot: &BookingSlot) -> FileComplaintRequest {
        FileComplaintRequest {
            learner_id: slot.learner_id.unwrap(),
            slot_id: slot.id,
            reason: "tutor never joined the call".to_string(),
            evidence_url: None,
        }
    }

    #[tokio::test]
    async fn test_confirm_join_by_each_participant() {
        let (service, db) = test_service().await;
        let slot = paid_slot(&db, Duration::hours(-2)).await;

        let updated = service
            .confirm_join(ConfirmJoinRequest {
                slot_id: slot.id,
                user_id: slot.tutor_id,
                evidence_url: Some("https://files.example/shot.png".to_string()),
            })
            .await
            .unwrap();
        assert!(updated.tutor_join);
        assert!(updated.tutor_evidence.is_some());
        assert!(!updated.learner_join);

        let updated = service
            .confirm_join(ConfirmJoinRequest {
                slot_id: slot.id,
                user_id: slot.learner_id.unwrap(),
                evidence_url: None,
            })
            .await
            .unwrap();
        assert!(updated.learner_join);

        // A stranger has no say.
        let err = service
            .confirm_join(ConfirmJoinRequest {
                slot_id: slot.id,
                user_id: Uuid::new_v4(),
                evidence_url: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));
    }

    #[tokio::test]
    async fn test_complaint_before_tutor_joins() {
        let (service, db) = test_service().await;
        let slot = paid_slot(&db, Duration::hours(-2)).await;

        let refund = service.file_complaint(complaint_for(&slot)).await.unwrap();
        assert_eq!(refund.status, RefundStatus::Pending);
        assert_eq!(refund.amount, slot.price);
        assert_eq!(refund.tutor_attend, None);

        // The tutor is asked to respond.
        assert_eq!(db.get_notifications_by_user(&slot.tutor_id).await.unwrap().len(), 1);

        // Only one open case per slot.
        let err = service.file_complaint(complaint_for(&slot)).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_complaint_after_tutor_joined_is_preseeded() {
        let (service, db) = test_service().await;
        let slot = paid_slot(&db, Duration::hours(-2)).await;

        service
            .confirm_join(ConfirmJoinRequest {
                slot_id: slot.id,
                user_id: slot.tutor_id,
                evidence_url: None,
            })
            .await
            .unwrap();
        let before = db.get_notifications_by_user(&slot.tutor_id).await.unwrap().len();

        let refund = service.file_complaint(complaint_for(&slot)).await.unwrap();
        assert_eq!(refund.tutor_attend, Some(true));
        assert!(refund.tutor_responded_at.is_some());

        // No response request went out.
        assert_eq!(
            db.get_notifications_by_user(&slot.tutor_id).await.unwrap().len(),
            before
        );
    }

    #[tokio::test]
    async fn test_tutor_join_answers_open_complaint() {
        let (service, db) = test_service().await;
        let slot = paid_slot(&db, Duration::hours(-2)).await;

        let refund = service.file_complaint(complaint_for(&slot)).await.unwrap();
        assert_eq!(refund.tutor_attend, None);

        service
            .confirm_join(ConfirmJoinRequest {
                slot_id: slot.id,
                user_id: slot.tutor_id,
                evidence_url: None,
            })
            .await
            .unwrap();

        let refund = db.get_refund(&refund.id).await.unwrap().unwrap();
        assert_eq!(refund.tutor_attend, Some(true));
        assert!(refund.tutor_responded_at.is_some());
    }

    #[tokio::test]
    async fn test_auto_confirm_after_session_end() {
        let (service, db) = test_service().await;
        let slot = paid_slot(&db, Duration::hours(-2)).await;

        service
            .confirm_join(ConfirmJoinRequest {
                slot_id: slot.id,
                user_id: slot.tutor_id,
                evidence_url: None,
            })
            .await
            .unwrap();

        // Session still running at its midpoint: nothing happens.
        let confirmed = service
            .auto_confirm_learner_join(slot.start_time + Duration::minutes(30))
            .await
            .unwrap();
        assert_eq!(confirmed, 0);

        let confirmed = service
            .auto_confirm_learner_join(slot.end_time + Duration::minutes(1))
            .await
            .unwrap();
        assert_eq!(confirmed, 1);

        let slot = db.get_slot(&slot.id).await.unwrap().unwrap();
        assert!(slot.learner_join);
    }

    #[tokio::test]
    async fn test_auto_confirm_blocked_by_open_complaint() {
        let (service, db) = test_service().await;
        let slot = paid_slot(&db, Duration::hours(-2)).await;

        service
            .confirm_join(ConfirmJoinRequest {
                slot_id: slot.id,
                user_id: slot.tutor_id,
                evidence_url: None,
            })
            .await
            .unwrap();
        service.file_complaint(complaint_for(&slot)).await.unwrap();

        let confirmed = service
            .auto_confirm_learner_join(slot.end_time + Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(confirmed, 0);

        let slot = db.get_slot(&slot.id).await.unwrap().unwrap();
        assert!(!slot.learner_join);
    }

    #[tokio::test]
    async fn test_unanswered_complaint_marks_tutor_absent() {
        let (service, db) = test_service().await;
        let slot = paid_slot(&db, Duration::hours(-30)).await;

        let refund = service.file_complaint(complaint_for(&slot)).await.unwrap();

        // Backdate the complaint so the response window can lapse.
        let mut aged = refund.clone();
        aged.created_at = Utc::now() - Duration::hours(25);
        db.update_refund(&aged).await.unwrap();

        let marked = service
            .auto_mark_tutor_absent(aged.created_at + Duration::hours(23))
            .await
            .unwrap();
        assert_eq!(marked, 0);

        let marked = service.auto_mark_tutor_absent(Utc::now()).await.unwrap();
        assert_eq!(marked, 1);

        let refund = db.get_refund(&refund.id).await.unwrap().unwrap();
        assert_eq!(refund.tutor_attend, Some(false));
        // Non-response is not a response.
        assert!(refund.tutor_responded_at.is_none());
    }

    #[tokio::test]
    async fn test_session_reminders_fire_once_inside_window() {
        let (service, db) = test_service().await;
        let soon = paid_slot(&db, Duration::minutes(20)).await;
        let later = paid_slot(&db, Duration::hours(3)).await;

        let sent = service.send_session_reminders(Utc::now()).await.unwrap();
        assert_eq!(sent, 1);

        let soon = db.get_slot(&soon.id).await.unwrap().unwrap();
        assert!(soon.reminder_sent);
        let later = db.get_slot(&later.id).await.unwrap().unwrap();
        assert!(!later.reminder_sent);

        assert_eq!(
            db.get_notifications_by_user(&soon.learner_id.unwrap()).await.unwrap().len(),
            1
        );
        assert_eq!(db.get_notifications_by_user(&soon.tutor_id).await.unwrap().len(), 1);

        // Second pass finds nothing new in the window.
        let sent = service.send_session_reminders(Utc::now()).await.unwrap();
        assert_eq!(sent, 0);
    }
}
