use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::models::common::{PaginatedResponse, PaginationQuery};
use crate::models::notification::NotificationKind;
use crate::models::payment::{
    net_of_commission, CheckoutResponse, CreatePaymentRequest, Enrollment, Payment, PaymentKind,
    PaymentStatus, GATEWAY_SUCCESS_CODE,
};
use crate::models::slot::{BookingSlot, SlotStatus};
use crate::services::database::DatabaseService;
use crate::services::gateway::PayLinkService;
use crate::services::notifier::NotificationService;
use crate::services::settings::SettingsStore;
use crate::services::slots::SlotService;

#[derive(Clone)]
pub struct PaymentService {
    db: DatabaseService,
    gateway: PayLinkService,
    settings: SettingsStore,
    slots: SlotService,
    notifier: NotificationService,
    app: AppConfig,
}

impl PaymentService {
    pub fn new(
        db: DatabaseService,
        gateway: PayLinkService,
        settings: SettingsStore,
        slots: SlotService,
        notifier: NotificationService,
        app: AppConfig,
    ) -> Self {
        Self {
            db,
            gateway,
            settings,
            slots,
            notifier,
            app,
        }
    }

    pub async fn create_payment(
        &self,
        request: CreatePaymentRequest,
    ) -> Result<CheckoutResponse, AppError> {
        self.db
            .get_user(&request.user_id)
            .await?
            .ok_or_else(|| AppError::not_found("user", request.user_id))?;

        match request.kind {
            PaymentKind::Booking => self.create_booking_payment(request).await,
            PaymentKind::Course => self.create_course_payment(request).await,
        }
    }

    /// Booking checkout: persist the Pending payment, hold the slots under
    /// its id, then ask the gateway for a link. A gateway refusal rolls the
    /// holds back and cancels the payment before surfacing.
    async fn create_booking_payment(
        &self,
        request: CreatePaymentRequest,
    ) -> Result<CheckoutResponse, AppError> {
        let plan_id = request
            .plan_id
            .ok_or_else(|| AppError::Validation("plan_id is required for booking payments".to_string()))?;
        let ranges = request.time_ranges.unwrap_or_default();
        if ranges.is_empty() {
            return Err(AppError::Validation(
                "at least one time range is required".to_string(),
            ));
        }

        let plan = self
            .db
            .get_plan(&plan_id)
            .await?
            .filter(|plan| !plan.deleted)
            .ok_or_else(|| AppError::not_found("booking plan", plan_id))?;

        let mut amount = Decimal::ZERO;
        for range in &ranges {
            amount += plan.price_for_minutes((range.end_time - range.start_time).num_minutes());
        }

        let description = request
            .description
            .unwrap_or_else(|| "Tutoring session booking".to_string());
        let expires_at = Utc::now() + Duration::minutes(self.app.lock_ttl_minutes);

        let payment = Payment::new(
            request.user_id,
            plan.tutor_id,
            PaymentKind::Booking,
            Some(plan.id),
            None,
            amount,
            description.clone(),
            Some(expires_at),
        );
        let payment = self.db.create_payment(&payment).await?;

        let reserved = match self
            .slots
            .reserve_slots(&plan, request.user_id, &ranges, Some(payment.id))
            .await
        {
            Ok(reserved) => reserved,
            Err(err) => {
                self.db
                    .update_payment_status_guarded(
                        &payment.id,
                        PaymentStatus::Pending,
                        PaymentStatus::Cancelled,
                        Utc::now(),
                    )
                    .await?;
                return Err(err);
            }
        };
        let slot_ids: Vec<Uuid> = reserved.iter().map(|slot| slot.id).collect();

        let link = match self
            .gateway
            .create_payment_link(payment.order_code, amount, &description, expires_at)
            .await
        {
            Ok(link) => link,
            Err(err) => {
                log::error!("Gateway rejected order {}: {}", payment.order_code, err);
                self.rollback_failed_checkout(&payment, &reserved).await?;
                return Err(AppError::Gateway(err.to_string()));
            }
        };

        let mut payment = payment;
        payment.set_link(
            link.checkout_url,
            link.qr_code_url,
            Some(link.payment_link_id),
            Some(link.expires_at),
        );
        let payment = self.db.update_payment(&payment).await?;

        Ok(payment.to_checkout_response(slot_ids))
    }

    async fn create_course_payment(
        &self,
        request: CreatePaymentRequest,
    ) -> Result<CheckoutResponse, AppError> {
        let course_id = request
            .course_id
            .ok_or_else(|| AppError::Validation("course_id is required for course payments".to_string()))?;
        let tutor_id = request
            .tutor_id
            .ok_or_else(|| AppError::Validation("tutor_id is required for course payments".to_string()))?;
        let amount = request
            .amount
            .ok_or_else(|| AppError::Validation("amount is required for course payments".to_string()))?;
        if amount <= Decimal::ZERO {
            return Err(AppError::Validation("amount must be positive".to_string()));
        }

        let description = request
            .description
            .unwrap_or_else(|| "Course enrollment".to_string());
        let expires_at = Utc::now() + Duration::minutes(self.app.lock_ttl_minutes);

        let payment = Payment::new(
            request.user_id,
            tutor_id,
            PaymentKind::Course,
            None,
            Some(course_id),
            amount,
            description.clone(),
            Some(expires_at),
        );
        let payment = self.db.create_payment(&payment).await?;

        let link = match self
            .gateway
            .create_payment_link(payment.order_code, amount, &description, expires_at)
            .await
        {
            Ok(link) => link,
            Err(err) => {
                log::error!("Gateway rejected order {}: {}", payment.order_code, err);
                self.db
                    .update_payment_status_guarded(
                        &payment.id,
                        PaymentStatus::Pending,
                        PaymentStatus::Cancelled,
                        Utc::now(),
                    )
                    .await?;
                return Err(AppError::Gateway(err.to_string()));
            }
        };

        let mut payment = payment;
        payment.set_link(
            link.checkout_url,
            link.qr_code_url,
            Some(link.payment_link_id),
            Some(link.expires_at),
        );
        let payment = self.db.update_payment(&payment).await?;

        Ok(payment.to_checkout_response(Vec::new()))
    }

    async fn rollback_failed_checkout(
        &self,
        payment: &Payment,
        reserved: &[BookingSlot],
    ) -> Result<(), AppError> {
        for slot in reserved {
            self.db.delete_slot_if_locked(&slot.id).await?;
        }
        self.db
            .update_payment_status_guarded(
                &payment.id,
                PaymentStatus::Pending,
                PaymentStatus::Cancelled,
                Utc::now(),
            )
            .await?;
        Ok(())
    }

    /// Apply one gateway outcome to one order. Safe under replays and under
    /// any interleaving with user cancellation: every transition is a
    /// conditional update, and a terminal payment is never reopened.
    pub async fn reconcile(&self, order_code: i64, gateway_code: &str) -> Result<(), AppError> {
        let Some(payment) = self.db.get_payment_by_order_code(order_code).await? else {
            log::warn!("Webhook for unknown order code {}", order_code);
            return Ok(());
        };

        if payment.status == PaymentStatus::Cancelled {
            // The cancellation stands; just make sure the hosted link dies.
            if let Some(link_id) = payment.payment_link_id.as_deref() {
                self.gateway
                    .cancel_payment_link(link_id, "payment was cancelled")
                    .await;
            }
            return Ok(());
        }
        if payment.status.is_terminal() {
            return Ok(());
        }

        let now = Utc::now();
        let slots = if payment.kind == PaymentKind::Booking {
            self.db.get_slots_by_payment(&payment.id).await?
        } else {
            Vec::new()
        };

        if slots.iter().any(|slot| slot.status == SlotStatus::Rejected) {
            log::warn!(
                "Order {} owns a rejected slot, forcing cancellation despite gateway code {}",
                order_code,
                gateway_code
            );
            if self
                .db
                .update_payment_status_guarded(
                    &payment.id,
                    PaymentStatus::Pending,
                    PaymentStatus::Cancelled,
                    now,
                )
                .await?
                .is_some()
            {
                for slot in &slots {
                    if slot.status == SlotStatus::Locked {
                        self.db.delete_slot_if_locked(&slot.id).await?;
                    }
                }
                if let Some(link_id) = payment.payment_link_id.as_deref() {
                    self.gateway
                        .cancel_payment_link(link_id, "booking no longer valid")
                        .await;
                }
            }
            return Ok(());
        }

        if gateway_code == GATEWAY_SUCCESS_CODE {
            self.settle_success(payment, slots, now).await
        } else {
            self.settle_failure(payment, slots, gateway_code, now).await
        }
    }

    async fn settle_success(
        &self,
        payment: Payment,
        slots: Vec<BookingSlot>,
        now: chrono::DateTime<Utc>,
    ) -> Result<(), AppError> {
        let snapshot = self.settings.snapshot().await;
        let rate = snapshot.rate_for(payment.kind);
        let net = net_of_commission(payment.amount, rate);

        let Some(paid) = self.db.mark_payment_paid(&payment.id, net, rate, now).await? else {
            return Ok(()); // another delivery settled it first
        };

        log::info!(
            "Payment {} settled: amount {}, net {} at rate {} (schedule v{})",
            paid.id,
            paid.amount,
            net,
            rate,
            snapshot.version
        );

        match paid.kind {
            PaymentKind::Booking => {
                for slot in &slots {
                    if slot.status != SlotStatus::Locked {
                        continue;
                    }
                    let meeting_url = format!("{}/{}", self.app.meeting_base_url, slot.id);
                    if self.db.mark_slot_paid(&slot.id, &meeting_url, now).await?.is_none() {
                        log::warn!(
                            "Slot {} was no longer Locked when payment {} settled",
                            slot.id,
                            paid.id
                        );
                    }
                }
                self.notifier
                    .send(
                        paid.user_id,
                        "Booking confirmed",
                        &format!(
                            "Your payment of {} was received; your session links are ready.",
                            paid.amount
                        ),
                        NotificationKind::Payment,
                        None,
                    )
                    .await;
                self.notifier
                    .send(
                        paid.tutor_id,
                        "New booking paid",
                        &format!("A learner completed payment for {} session(s).", slots.len()),
                        NotificationKind::Booking,
                        None,
                    )
                    .await;
            }
            PaymentKind::Course => {
                if let Some(course_id) = paid.course_id {
                    let enrollment = Enrollment::new(paid.user_id, course_id, paid.id);
                    self.db.create_enrollment(&enrollment).await?;
                }
                self.notifier
                    .send(
                        paid.user_id,
                        "Enrollment active",
                        "Your course payment was received.",
                        NotificationKind::Payment,
                        None,
                    )
                    .await;
            }
        }

        Ok(())
    }

    async fn settle_failure(
        &self,
        payment: Payment,
        slots: Vec<BookingSlot>,
        gateway_code: &str,
        now: chrono::DateTime<Utc>,
    ) -> Result<(), AppError> {
        let Some(failed) = self
            .db
            .update_payment_status_guarded(&payment.id, PaymentStatus::Pending, PaymentStatus::Failed, now)
            .await?
        else {
            return Ok(());
        };

        log::info!("Payment {} failed with gateway code {}", failed.id, gateway_code);

        for slot in &slots {
            if slot.status == SlotStatus::Locked {
                self.db.delete_slot_if_locked(&slot.id).await?;
            }
        }

        self.notifier
            .send(
                failed.user_id,
                "Payment failed",
                "Your payment did not complete; the held slots were released.",
                NotificationKind::Payment,
                None,
            )
            .await;

        Ok(())
    }

    /// Learner-initiated cancel. Immediate, idempotent, and never able to
    /// overturn a settled payment.
    pub async fn cancel_payment(&self, user_id: &Uuid, payment_id: &Uuid) -> Result<Payment, AppError> {
        let payment = self
            .db
            .get_payment(payment_id)
            .await?
            .ok_or_else(|| AppError::not_found("payment", payment_id))?;

        if payment.user_id != *user_id {
            return Err(AppError::Authorization(
                "only the paying learner can cancel this payment".to_string(),
            ));
        }

        match payment.status {
            PaymentStatus::Cancelled => Ok(payment),
            PaymentStatus::Pending => {
                self.cancel_pending_payment(&payment, "cancelled by learner").await?;
                let current = self
                    .db
                    .get_payment(payment_id)
                    .await?
                    .ok_or_else(|| AppError::not_found("payment", payment_id))?;
                if current.status == PaymentStatus::Cancelled {
                    Ok(current)
                } else {
                    Err(AppError::State(format!(
                        "payment is {}, cannot cancel",
                        current.status
                    )))
                }
            }
            other => Err(AppError::State(format!("payment is {}, cannot cancel", other))),
        }
    }

    /// CAS cancel of one Pending payment plus release of its held slots and
    /// its hosted link. Shared by the cancel endpoint and plan cascades.
    pub async fn cancel_pending_payment(&self, payment: &Payment, reason: &str) -> Result<bool, AppError> {
        let now = Utc::now();
        if self
            .db
            .update_payment_status_guarded(
                &payment.id,
                PaymentStatus::Pending,
                PaymentStatus::Cancelled,
                now,
            )
            .await?
            .is_none()
        {
            return Ok(false);
        }

        let slots = self.db.get_slots_by_payment(&payment.id).await?;
        for slot in &slots {
            if slot.status == SlotStatus::Locked {
                self.db.delete_slot_if_locked(&slot.id).await?;
            }
        }

        if let Some(link_id) = payment.payment_link_id.as_deref() {
            self.gateway.cancel_payment_link(link_id, reason).await;
        }

        self.notifier
            .send(
                payment.user_id,
                "Payment cancelled",
                &format!("Payment for order {} was cancelled: {}.", payment.order_code, reason),
                NotificationKind::Payment,
                None,
            )
            .await;

        log::info!("Payment {} cancelled ({})", payment.id, reason);
        Ok(true)
    }

    pub async fn get_payment(&self, payment_id: &Uuid) -> Result<Payment, AppError> {
        self.db
            .get_payment(payment_id)
            .await?
            .ok_or_else(|| AppError::not_found("payment", payment_id))
    }

    pub async fn list_for_user(
        &self,
        user_id: &Uuid,
        pagination: Option<PaginationQuery>,
    ) -> Result<PaginatedResponse<Payment>, AppError> {
        Ok(self.db.get_payments_by_user(user_id, pagination).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CommissionConfig, GatewayConfig};
    use crate::models::plan::{BookingPlan, CreatePlanRequest, DayLabel};
    use crate::models::slot::TimeRange;
    use crate::models::user::{User, UserRole};
    use crate::services::locks::KeyedLocks;
    use chrono::TimeZone;

    struct Stack {
        db: DatabaseService,
        payments: PaymentService,
        settings: SettingsStore,
        slots: SlotService,
    }

    async fn stack() -> Stack {
        let db = DatabaseService::new("memory://").await.unwrap();
        let locks = KeyedLocks::new();
        let app = AppConfig::default();
        let notifier = NotificationService::new(db.clone());
        let slots = SlotService::new(db.clone(), locks, app.clone());
        let settings = SettingsStore::new(&CommissionConfig::default());
        let gateway = PayLinkService::new(GatewayConfig {
            base_url: "https://gateway.example".to_string(),
            client_id: String::new(),
            api_key: String::new(),
            checksum_key: String::new(),
            return_url: "https://app.example/return".to_string(),
            cancel_url: "https://app.example/cancel".to_string(),
        });
        let payments = PaymentService::new(
            db.clone(),
            gateway,
            settings.clone(),
            slots.clone(),
            notifier,
            app,
        );
        Stack {
            db,
            payments,
            settings,
            slots,
        }
    }

    async fn seed_learner(db: &DatabaseService) -> Uuid {
        let user = User::new(
            "Linh Tran".to_string(),
            format!("{}@example.com", Uuid::new_v4().simple()),
            UserRole::Learner,
        );
        db.create_user(&user).await.unwrap().id
    }

    async fn seed_plan(db: &DatabaseService) -> BookingPlan {
        let plan = BookingPlan::new(CreatePlanRequest {
            tutor_id: Uuid::new_v4(),
            day_label: DayLabel::Monday,
            start_min: 540,
            end_min: 720,
            slot_duration_min: 60,
            hourly_price: Decimal::new(200_000, 0),
        });
        db.create_plan(&plan).await.unwrap()
    }

    fn range(hour: u32) -> TimeRange {
        TimeRange {
            start_time: Utc.with_ymd_and_hms(2030, 1, 7, hour, 0, 0).unwrap(),
            end_time: Utc.with_ymd_and_hms(2030, 1, 7, hour + 1, 0, 0).unwrap(),
        }
    }

    fn booking_request(user_id: Uuid, plan_id: Uuid, hours: &[u32]) -> CreatePaymentRequest {
        CreatePaymentRequest {
            user_id,
            kind: PaymentKind::Booking,
            plan_id: Some(plan_id),
            time_ranges: Some(hours.iter().map(|&h| range(h)).collect()),
            course_id: None,
            tutor_id: None,
            amount: None,
            description: None,
        }
    }

    #[tokio::test]
    async fn test_success_settles_payment_and_slots() {
        let stack = stack().await;
        let learner = seed_learner(&stack.db).await;
        let plan = seed_plan(&stack.db).await;

        let checkout = stack
            .payments
            .create_payment(booking_request(learner, plan.id, &[10]))
            .await
            .unwrap();
        assert_eq!(checkout.amount, Decimal::new(200_000_00, 2));
        assert_eq!(checkout.slot_ids.len(), 1);
        assert!(checkout.checkout_url.is_some());

        stack
            .payments
            .reconcile(checkout.order_code, "00")
            .await
            .unwrap();

        let payment = stack.db.get_payment(&checkout.payment_id).await.unwrap().unwrap();
        assert_eq!(payment.status, PaymentStatus::Paid);
        assert_eq!(payment.net_amount, Some(Decimal::new(170_000_00, 2)));
        assert_eq!(payment.commission_rate, Some(Decimal::new(15, 2)));
        assert!(payment.paid_at.is_some());

        let slot = stack.db.get_slot(&checkout.slot_ids[0]).await.unwrap().unwrap();
        assert_eq!(slot.status, SlotStatus::Paid);
        let meeting_url = slot.meeting_url.unwrap();
        assert!(meeting_url.contains(&slot.id.to_string()));
        assert!(slot.expires_at.is_none());

        // Both parties were told.
        assert!(!stack.db.get_notifications_by_user(&learner).await.unwrap().is_empty());
        assert!(!stack.db.get_notifications_by_user(&plan.tutor_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_replayed_webhooks_keep_first_snapshot() {
        let stack = stack().await;
        let learner = seed_learner(&stack.db).await;
        let plan = seed_plan(&stack.db).await;

        let checkout = stack
            .payments
            .create_payment(booking_request(learner, plan.id, &[9]))
            .await
            .unwrap();

        stack.payments.reconcile(checkout.order_code, "00").await.unwrap();

        // The schedule changes between deliveries.
        stack
            .settings
            .replace(Decimal::new(30, 2), Decimal::new(30, 2))
            .await;

        stack.payments.reconcile(checkout.order_code, "00").await.unwrap();
        stack.payments.reconcile(checkout.order_code, "01").await.unwrap();

        let payment = stack.db.get_payment(&checkout.payment_id).await.unwrap().unwrap();
        assert_eq!(payment.status, PaymentStatus::Paid);
        assert_eq!(payment.net_amount, Some(Decimal::new(170_000_00, 2)));
        assert_eq!(payment.commission_rate, Some(Decimal::new(15, 2)));
    }

    #[tokio::test]
    async fn test_failure_releases_held_slots() {
        let stack = stack().await;
        let learner = seed_learner(&stack.db).await;
        let plan = seed_plan(&stack.db).await;

        let checkout = stack
            .payments
            .create_payment(booking_request(learner, plan.id, &[9, 10]))
            .await
            .unwrap();
        assert_eq!(checkout.amount, Decimal::new(400_000_00, 2));

        stack.payments.reconcile(checkout.order_code, "07").await.unwrap();

        let payment = stack.db.get_payment(&checkout.payment_id).await.unwrap().unwrap();
        assert_eq!(payment.status, PaymentStatus::Failed);
        assert!(payment.net_amount.is_none());

        // The ranges are free again for someone else.
        assert!(stack.db.get_slots_by_tutor(&plan.tutor_id).await.unwrap().is_empty());
        let retry = stack
            .slots
            .reserve_slots(&plan, Uuid::new_v4(), &[range(9)], None)
            .await
            .unwrap();
        assert_eq!(retry.len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_beats_late_success() {
        let stack = stack().await;
        let learner = seed_learner(&stack.db).await;
        let plan = seed_plan(&stack.db).await;

        let checkout = stack
            .payments
            .create_payment(booking_request(learner, plan.id, &[11]))
            .await
            .unwrap();

        // A stranger cannot cancel it.
        let err = stack
            .payments
            .cancel_payment(&Uuid::new_v4(), &checkout.payment_id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));

        let cancelled = stack
            .payments
            .cancel_payment(&learner, &checkout.payment_id)
            .await
            .unwrap();
        assert_eq!(cancelled.status, PaymentStatus::Cancelled);
        assert!(stack.db.get_slots_by_tutor(&plan.tutor_id).await.unwrap().is_empty());

        // Cancelling again is a quiet no-op.
        stack
            .payments
            .cancel_payment(&learner, &checkout.payment_id)
            .await
            .unwrap();

        // The success webhook arrives too late to matter.
        stack.payments.reconcile(checkout.order_code, "00").await.unwrap();
        let payment = stack.db.get_payment(&checkout.payment_id).await.unwrap().unwrap();
        assert_eq!(payment.status, PaymentStatus::Cancelled);
        assert!(payment.net_amount.is_none());
    }

    #[tokio::test]
    async fn test_success_beats_late_cancel() {
        let stack = stack().await;
        let learner = seed_learner(&stack.db).await;
        let plan = seed_plan(&stack.db).await;

        let checkout = stack
            .payments
            .create_payment(booking_request(learner, plan.id, &[9]))
            .await
            .unwrap();

        stack.payments.reconcile(checkout.order_code, "00").await.unwrap();

        let err = stack
            .payments
            .cancel_payment(&learner, &checkout.payment_id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::State(_)));

        let slot = stack.db.get_slot(&checkout.slot_ids[0]).await.unwrap().unwrap();
        assert_eq!(slot.status, SlotStatus::Paid);
    }

    #[tokio::test]
    async fn test_rejected_slot_forces_cancellation() {
        let stack = stack().await;
        let learner = seed_learner(&stack.db).await;
        let plan = seed_plan(&stack.db).await;

        let checkout = stack
            .payments
            .create_payment(booking_request(learner, plan.id, &[9]))
            .await
            .unwrap();

        // The slot is invalidated out-of-band before the webhook lands.
        let mut slot = stack.db.get_slot(&checkout.slot_ids[0]).await.unwrap().unwrap();
        slot.status = SlotStatus::Rejected;
        stack.db.update_slot(&slot).await.unwrap();

        stack.payments.reconcile(checkout.order_code, "00").await.unwrap();

        let payment = stack.db.get_payment(&checkout.payment_id).await.unwrap().unwrap();
        assert_eq!(payment.status, PaymentStatus::Cancelled);
        assert!(payment.net_amount.is_none());
    }

    #[tokio::test]
    async fn test_course_payment_creates_enrollment() {
        let stack = stack().await;
        let learner = seed_learner(&stack.db).await;
        let course_id = Uuid::new_v4();

        let checkout = stack
            .payments
            .create_payment(CreatePaymentRequest {
                user_id: learner,
                kind: PaymentKind::Course,
                plan_id: None,
                time_ranges: None,
                course_id: Some(course_id),
                tutor_id: Some(Uuid::new_v4()),
                amount: Some(Decimal::new(500_000, 0)),
                description: Some("IELTS foundation".to_string()),
            })
            .await
            .unwrap();

        stack.payments.reconcile(checkout.order_code, "00").await.unwrap();

        let payment = stack.db.get_payment(&checkout.payment_id).await.unwrap().unwrap();
        assert_eq!(payment.status, PaymentStatus::Paid);
        assert_eq!(payment.net_amount, Some(Decimal::new(400_000_00, 2)));

        let enrollment = stack
            .db
            .get_enrollment_by_payment(&checkout.payment_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(enrollment.course_id, course_id);
        assert_eq!(enrollment.user_id, learner);
    }

    #[tokio::test]
    async fn test_unknown_order_code_is_ignored() {
        let stack = stack().await;
        stack.payments.reconcile(999_999_999, "00").await.unwrap();
    }
}
