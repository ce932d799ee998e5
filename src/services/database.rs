use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use surrealdb::engine::local::{Db, Mem};
use surrealdb::Surreal;
use uuid::Uuid;

use crate::models::{
    common::{PaginatedResponse, PaginationQuery},
    notification::Notification,
    payment::{Enrollment, Payment, PaymentStatus},
    plan::BookingPlan,
    refund::RefundRequest,
    slot::BookingSlot,
    user::User,
    withdraw::{WithdrawMoney, WithdrawStatus},
};

const USERS: &str = "users";
const PLANS: &str = "booking_plans";
const SLOTS: &str = "booking_slots";
const PAYMENTS: &str = "payments";
const REFUNDS: &str = "refund_requests";
const WITHDRAWALS: &str = "withdrawals";
const NOTIFICATIONS: &str = "notifications";
const ENROLLMENTS: &str = "enrollments";

#[derive(Clone)]
pub struct DatabaseService {
    db: Surreal<Db>,
}

impl DatabaseService {
    pub async fn new(database_url: &str) -> Result<Self> {
        let db = if database_url.starts_with("memory://") {
            Surreal::new::<Mem>(()).await?
        } else {
            return Err(anyhow!("Unsupported database URL: {}", database_url));
        };

        db.use_ns("tutorbook").use_db("main").await?;

        let service = Self { db };
        service.initialize_schema().await?;

        Ok(service)
    }

    /// Tables stay schemaless (the Rust types are the schema); indexes back
    /// the idempotency-sensitive keys and the hot foreign-key lookups.
    async fn initialize_schema(&self) -> Result<()> {
        self.db
            .query(
                "
            DEFINE TABLE users SCHEMALESS;
            DEFINE INDEX unique_email ON users COLUMNS email UNIQUE;

            DEFINE TABLE booking_plans SCHEMALESS;
            DEFINE INDEX plan_tutor ON booking_plans COLUMNS tutor_id;

            DEFINE TABLE booking_slots SCHEMALESS;
            DEFINE INDEX slot_tutor ON booking_slots COLUMNS tutor_id;
            DEFINE INDEX slot_payment ON booking_slots COLUMNS payment_id;

            DEFINE TABLE payments SCHEMALESS;
            DEFINE INDEX unique_order_code ON payments COLUMNS order_code UNIQUE;

            DEFINE TABLE refund_requests SCHEMALESS;
            DEFINE INDEX refund_slot ON refund_requests COLUMNS slot_id;

            DEFINE TABLE withdrawals SCHEMALESS;
            DEFINE INDEX withdraw_tutor ON withdrawals COLUMNS tutor_id;

            DEFINE TABLE notifications SCHEMALESS;
            DEFINE INDEX notification_user ON notifications COLUMNS user_id;

            DEFINE TABLE enrollments SCHEMALESS;
            DEFINE INDEX enrollment_payment ON enrollments COLUMNS payment_id;
        ",
            )
            .await?;

        log::info!("Database schema initialized");
        Ok(())
    }

    // User operations

    pub async fn create_user(&self, user: &User) -> Result<User> {
        let existing: Option<User> = self
            .db
            .query("SELECT * FROM users WHERE email = $email")
            .bind(("email", &user.email))
            .await?
            .take(0)?;

        if existing.is_some() {
            return Err(anyhow!("User with email {} already exists", user.email));
        }

        let created: Option<User> = self
            .db
            .create((USERS, user.id.to_string()))
            .content(user)
            .await?;

        created.ok_or_else(|| anyhow!("Failed to create user"))
    }

    pub async fn get_user(&self, user_id: &Uuid) -> Result<Option<User>> {
        let user: Option<User> = self
            .db
            .query("SELECT * FROM users WHERE user_id = $user_id")
            .bind(("user_id", *user_id))
            .await?
            .take(0)?;
        Ok(user)
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let user: Option<User> = self
            .db
            .query("SELECT * FROM users WHERE email = $email")
            .bind(("email", email.to_lowercase()))
            .await?
            .take(0)?;
        Ok(user)
    }

    // Booking plan operations

    pub async fn create_plan(&self, plan: &BookingPlan) -> Result<BookingPlan> {
        let created: Option<BookingPlan> = self
            .db
            .create((PLANS, plan.id.to_string()))
            .content(plan)
            .await?;

        created.ok_or_else(|| anyhow!("Failed to create booking plan"))
    }

    pub async fn get_plan(&self, plan_id: &Uuid) -> Result<Option<BookingPlan>> {
        let plan: Option<BookingPlan> = self
            .db
            .query("SELECT * FROM booking_plans WHERE plan_id = $plan_id")
            .bind(("plan_id", *plan_id))
            .await?
            .take(0)?;
        Ok(plan)
    }

    /// Live (not soft-deleted) plans of one tutor.
    pub async fn get_plans_by_tutor(&self, tutor_id: &Uuid) -> Result<Vec<BookingPlan>> {
        let plans: Vec<BookingPlan> = self
            .db
            .query("SELECT * FROM booking_plans WHERE tutor_id = $tutor_id AND deleted = false ORDER BY created_at DESC")
            .bind(("tutor_id", *tutor_id))
            .await?
            .take(0)?;
        Ok(plans)
    }

    pub async fn update_plan(&self, plan: &BookingPlan) -> Result<BookingPlan> {
        let updated: Option<BookingPlan> = self
            .db
            .update((PLANS, plan.id.to_string()))
            .content(plan)
            .await?;

        updated.ok_or_else(|| anyhow!("Failed to update booking plan"))
    }

    // Booking slot operations

    pub async fn create_slot(&self, slot: &BookingSlot) -> Result<BookingSlot> {
        let created: Option<BookingSlot> = self
            .db
            .create((SLOTS, slot.id.to_string()))
            .content(slot)
            .await?;

        created.ok_or_else(|| anyhow!("Failed to create booking slot"))
    }

    pub async fn get_slot(&self, slot_id: &Uuid) -> Result<Option<BookingSlot>> {
        let slot: Option<BookingSlot> = self
            .db
            .query("SELECT * FROM booking_slots WHERE slot_id = $slot_id")
            .bind(("slot_id", *slot_id))
            .await?
            .take(0)?;
        Ok(slot)
    }

    pub async fn get_slots_by_tutor(&self, tutor_id: &Uuid) -> Result<Vec<BookingSlot>> {
        let slots: Vec<BookingSlot> = self
            .db
            .query("SELECT * FROM booking_slots WHERE tutor_id = $tutor_id ORDER BY start_time ASC")
            .bind(("tutor_id", *tutor_id))
            .await?
            .take(0)?;
        Ok(slots)
    }

    /// Every slot that still occupies its time range: Available, Locked or
    /// Paid. Rejected slots no longer block the calendar.
    pub async fn get_active_slots_by_tutor(&self, tutor_id: &Uuid) -> Result<Vec<BookingSlot>> {
        let slots: Vec<BookingSlot> = self
            .db
            .query("SELECT * FROM booking_slots WHERE tutor_id = $tutor_id AND status != 'Rejected'")
            .bind(("tutor_id", *tutor_id))
            .await?
            .take(0)?;
        Ok(slots)
    }

    pub async fn get_slots_by_plan(&self, plan_id: &Uuid) -> Result<Vec<BookingSlot>> {
        let slots: Vec<BookingSlot> = self
            .db
            .query("SELECT * FROM booking_slots WHERE plan_id = $plan_id")
            .bind(("plan_id", *plan_id))
            .await?
            .take(0)?;
        Ok(slots)
    }

    pub async fn get_slots_by_payment(&self, payment_id: &Uuid) -> Result<Vec<BookingSlot>> {
        let slots: Vec<BookingSlot> = self
            .db
            .query("SELECT * FROM booking_slots WHERE payment_id = $payment_id")
            .bind(("payment_id", *payment_id))
            .await?
            .take(0)?;
        Ok(slots)
    }

    pub async fn get_locked_slots(&self) -> Result<Vec<BookingSlot>> {
        let slots: Vec<BookingSlot> = self
            .db
            .query("SELECT * FROM booking_slots WHERE status = 'Locked'")
            .await?
            .take(0)?;
        Ok(slots)
    }

    /// Paid slots where the tutor showed up but the learner never confirmed.
    pub async fn get_auto_confirm_candidate_slots(&self) -> Result<Vec<BookingSlot>> {
        let slots: Vec<BookingSlot> = self
            .db
            .query("SELECT * FROM booking_slots WHERE status = 'Paid' AND tutor_join = true AND learner_join = false")
            .await?
            .take(0)?;
        Ok(slots)
    }

    pub async fn get_unreminded_paid_slots(&self) -> Result<Vec<BookingSlot>> {
        let slots: Vec<BookingSlot> = self
            .db
            .query("SELECT * FROM booking_slots WHERE status = 'Paid' AND reminder_sent = false")
            .await?
            .take(0)?;
        Ok(slots)
    }

    pub async fn update_slot(&self, slot: &BookingSlot) -> Result<BookingSlot> {
        let updated: Option<BookingSlot> = self
            .db
            .update((SLOTS, slot.id.to_string()))
            .content(slot)
            .await?;

        updated.ok_or_else(|| anyhow!("Failed to update booking slot"))
    }

    /// Conditional Available → Locked claim. Returns None when the slot was
    /// no longer Available.
    pub async fn claim_slot(
        &self,
        slot_id: &Uuid,
        learner_id: &Uuid,
        payment_id: Option<Uuid>,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Option<BookingSlot>> {
        let claimed: Option<BookingSlot> = self
            .db
            .query(
                "UPDATE booking_slots SET status = 'Locked', learner_id = $learner_id, \
                 locked_at = $now, expires_at = $expires_at, payment_id = $payment_id, \
                 updated_at = $now \
                 WHERE slot_id = $slot_id AND status = 'Available' RETURN AFTER",
            )
            .bind(("slot_id", *slot_id))
            .bind(("learner_id", *learner_id))
            .bind(("payment_id", payment_id))
            .bind(("expires_at", expires_at))
            .bind(("now", now))
            .await?
            .take(0)?;
        Ok(claimed)
    }

    /// Conditional Locked → Paid flip, the only path by which a slot gains
    /// its meeting link.
    pub async fn mark_slot_paid(
        &self,
        slot_id: &Uuid,
        meeting_url: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<BookingSlot>> {
        let updated: Option<BookingSlot> = self
            .db
            .query(
                "UPDATE booking_slots SET status = 'Paid', meeting_url = $meeting_url, \
                 expires_at = NONE, updated_at = $now \
                 WHERE slot_id = $slot_id AND status = 'Locked' RETURN AFTER",
            )
            .bind(("slot_id", *slot_id))
            .bind(("meeting_url", meeting_url.to_string()))
            .bind(("now", now))
            .await?
            .take(0)?;
        Ok(updated)
    }

    /// Conditional Paid → Rejected. Paid and Rejected rows are permanent.
    pub async fn reject_slot(&self, slot_id: &Uuid, now: DateTime<Utc>) -> Result<Option<BookingSlot>> {
        let updated: Option<BookingSlot> = self
            .db
            .query(
                "UPDATE booking_slots SET status = 'Rejected', updated_at = $now \
                 WHERE slot_id = $slot_id AND status = 'Paid' RETURN AFTER",
            )
            .bind(("slot_id", *slot_id))
            .bind(("now", now))
            .await?
            .take(0)?;
        Ok(updated)
    }

    pub async fn record_tutor_join(
        &self,
        slot_id: &Uuid,
        evidence: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Option<BookingSlot>> {
        let updated: Option<BookingSlot> = self
            .db
            .query(
                "UPDATE booking_slots SET tutor_join = true, tutor_evidence = $evidence, \
                 updated_at = $now \
                 WHERE slot_id = $slot_id AND status = 'Paid' RETURN AFTER",
            )
            .bind(("slot_id", *slot_id))
            .bind(("evidence", evidence))
            .bind(("now", now))
            .await?
            .take(0)?;
        Ok(updated)
    }

    pub async fn record_learner_join(
        &self,
        slot_id: &Uuid,
        evidence: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Option<BookingSlot>> {
        let updated: Option<BookingSlot> = self
            .db
            .query(
                "UPDATE booking_slots SET learner_join = true, learner_evidence = $evidence, \
                 updated_at = $now \
                 WHERE slot_id = $slot_id AND status = 'Paid' RETURN AFTER",
            )
            .bind(("slot_id", *slot_id))
            .bind(("evidence", evidence))
            .bind(("now", now))
            .await?
            .take(0)?;
        Ok(updated)
    }

    pub async fn mark_reminder_sent(&self, slot_id: &Uuid, now: DateTime<Utc>) -> Result<()> {
        self.db
            .query(
                "UPDATE booking_slots SET reminder_sent = true, updated_at = $now \
                 WHERE slot_id = $slot_id AND status = 'Paid'",
            )
            .bind(("slot_id", *slot_id))
            .bind(("now", now))
            .await?;
        Ok(())
    }

    pub async fn delete_slot(&self, slot_id: &Uuid) -> Result<()> {
        let _: Option<BookingSlot> = self.db.delete((SLOTS, slot_id.to_string())).await?;
        Ok(())
    }

    /// Guarded delete: removes the slot only while it is still Locked, so a
    /// concurrent Paid flip always wins over a sweep or rollback.
    pub async fn delete_slot_if_locked(&self, slot_id: &Uuid) -> Result<Option<BookingSlot>> {
        let deleted: Option<BookingSlot> = self
            .db
            .query("DELETE FROM booking_slots WHERE slot_id = $slot_id AND status = 'Locked' RETURN BEFORE")
            .bind(("slot_id", *slot_id))
            .await?
            .take(0)?;
        Ok(deleted)
    }

    // Payment operations

    pub async fn create_payment(&self, payment: &Payment) -> Result<Payment> {
        let created: Option<Payment> = self
            .db
            .create((PAYMENTS, payment.id.to_string()))
            .content(payment)
            .await?;

        created.ok_or_else(|| anyhow!("Failed to create payment"))
    }

    pub async fn get_payment(&self, payment_id: &Uuid) -> Result<Option<Payment>> {
        let payment: Option<Payment> = self
            .db
            .query("SELECT * FROM payments WHERE payment_id = $payment_id")
            .bind(("payment_id", *payment_id))
            .await?
            .take(0)?;
        Ok(payment)
    }

    pub async fn get_payment_by_order_code(&self, order_code: i64) -> Result<Option<Payment>> {
        let payment: Option<Payment> = self
            .db
            .query("SELECT * FROM payments WHERE order_code = $order_code")
            .bind(("order_code", order_code))
            .await?
            .take(0)?;
        Ok(payment)
    }

    pub async fn get_payments_by_user(
        &self,
        user_id: &Uuid,
        pagination: Option<PaginationQuery>,
    ) -> Result<PaginatedResponse<Payment>> {
        let pagination = pagination.unwrap_or_default();
        let page = pagination.page.unwrap_or(1).max(1);
        let limit = pagination.limit.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * limit;

        let total_result: Vec<serde_json::Value> = self
            .db
            .query("SELECT count() FROM payments WHERE user_id = $user_id GROUP ALL")
            .bind(("user_id", *user_id))
            .await?
            .take(0)?;

        let total = total_result
            .first()
            .and_then(|value| value.get("count"))
            .and_then(|value| value.as_u64())
            .unwrap_or(0) as u32;

        let payments: Vec<Payment> = self
            .db
            .query(
                "SELECT * FROM payments WHERE user_id = $user_id \
                 ORDER BY created_at DESC LIMIT $limit START $offset",
            )
            .bind(("user_id", *user_id))
            .bind(("limit", limit))
            .bind(("offset", offset))
            .await?
            .take(0)?;

        Ok(PaginatedResponse {
            data: payments,
            total,
            page,
            limit,
            total_pages: (total + limit - 1) / limit,
        })
    }

    pub async fn get_paid_payments_by_tutor(&self, tutor_id: &Uuid) -> Result<Vec<Payment>> {
        let payments: Vec<Payment> = self
            .db
            .query("SELECT * FROM payments WHERE tutor_id = $tutor_id AND status = 'Paid'")
            .bind(("tutor_id", *tutor_id))
            .await?
            .take(0)?;
        Ok(payments)
    }

    pub async fn update_payment(&self, payment: &Payment) -> Result<Payment> {
        let updated: Option<Payment> = self
            .db
            .update((PAYMENTS, payment.id.to_string()))
            .content(payment)
            .await?;

        updated.ok_or_else(|| anyhow!("Failed to update payment"))
    }

    /// Conditional Pending → Paid flip that freezes the commission snapshot
    /// in the same statement. Returns None when the payment had already left
    /// Pending, in which case nothing was written.
    pub async fn mark_payment_paid(
        &self,
        payment_id: &Uuid,
        net_amount: Decimal,
        commission_rate: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Option<Payment>> {
        let updated: Option<Payment> = self
            .db
            .query(
                "UPDATE payments SET status = 'Paid', paid_at = $now, net_amount = $net_amount, \
                 commission_rate = $commission_rate, updated_at = $now \
                 WHERE payment_id = $payment_id AND status = 'Pending' RETURN AFTER",
            )
            .bind(("payment_id", *payment_id))
            .bind(("net_amount", net_amount))
            .bind(("commission_rate", commission_rate))
            .bind(("now", now))
            .await?
            .take(0)?;
        Ok(updated)
    }

    /// Generic status CAS for the Failed / Cancelled transitions.
    pub async fn update_payment_status_guarded(
        &self,
        payment_id: &Uuid,
        expected: PaymentStatus,
        new_status: PaymentStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Payment>> {
        let updated: Option<Payment> = self
            .db
            .query(
                "UPDATE payments SET status = $new_status, updated_at = $now \
                 WHERE payment_id = $payment_id AND status = $expected RETURN AFTER",
            )
            .bind(("payment_id", *payment_id))
            .bind(("expected", expected))
            .bind(("new_status", new_status))
            .bind(("now", now))
            .await?
            .take(0)?;
        Ok(updated)
    }

    // Refund operations

    pub async fn create_refund(&self, refund: &RefundRequest) -> Result<RefundRequest> {
        let created: Option<RefundRequest> = self
            .db
            .create((REFUNDS, refund.id.to_string()))
            .content(refund)
            .await?;

        created.ok_or_else(|| anyhow!("Failed to create refund request"))
    }

    pub async fn get_refund(&self, refund_id: &Uuid) -> Result<Option<RefundRequest>> {
        let refund: Option<RefundRequest> = self
            .db
            .query("SELECT * FROM refund_requests WHERE refund_id = $refund_id")
            .bind(("refund_id", *refund_id))
            .await?
            .take(0)?;
        Ok(refund)
    }

    pub async fn get_refunds_by_learner(&self, learner_id: &Uuid) -> Result<Vec<RefundRequest>> {
        let refunds: Vec<RefundRequest> = self
            .db
            .query("SELECT * FROM refund_requests WHERE learner_id = $learner_id ORDER BY created_at DESC")
            .bind(("learner_id", *learner_id))
            .await?
            .take(0)?;
        Ok(refunds)
    }

    /// Duplicate guard lookup: any refund for the slot that is not Rejected
    /// blocks a new one.
    pub async fn get_non_rejected_refund_for_slot(
        &self,
        slot_id: &Uuid,
    ) -> Result<Option<RefundRequest>> {
        let refund: Option<RefundRequest> = self
            .db
            .query("SELECT * FROM refund_requests WHERE slot_id = $slot_id AND status != 'Rejected' LIMIT 1")
            .bind(("slot_id", *slot_id))
            .await?
            .take(0)?;
        Ok(refund)
    }

    /// An undecided complaint, the thing that blocks auto-confirmation and
    /// time-based release.
    pub async fn get_open_complaint_for_slot(&self, slot_id: &Uuid) -> Result<Option<RefundRequest>> {
        let refund: Option<RefundRequest> = self
            .db
            .query(
                "SELECT * FROM refund_requests WHERE slot_id = $slot_id \
                 AND kind = 'Complaint' AND status IN ['Pending', 'Submitted'] LIMIT 1",
            )
            .bind(("slot_id", *slot_id))
            .await?
            .take(0)?;
        Ok(refund)
    }

    pub async fn get_pending_complaints(&self) -> Result<Vec<RefundRequest>> {
        let refunds: Vec<RefundRequest> = self
            .db
            .query("SELECT * FROM refund_requests WHERE kind = 'Complaint' AND status = 'Pending'")
            .await?
            .take(0)?;
        Ok(refunds)
    }

    pub async fn update_refund(&self, refund: &RefundRequest) -> Result<RefundRequest> {
        let updated: Option<RefundRequest> = self
            .db
            .update((REFUNDS, refund.id.to_string()))
            .content(refund)
            .await?;

        updated.ok_or_else(|| anyhow!("Failed to update refund request"))
    }

    pub async fn submit_refund_payout(
        &self,
        refund_id: &Uuid,
        bank_account_number: &str,
        bank_owner_name: &str,
        bank_name: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<RefundRequest>> {
        let updated: Option<RefundRequest> = self
            .db
            .query(
                "UPDATE refund_requests SET status = 'Submitted', \
                 bank_account_number = $account, bank_owner_name = $owner, bank_name = $bank, \
                 updated_at = $now \
                 WHERE refund_id = $refund_id AND status = 'Pending' RETURN AFTER",
            )
            .bind(("refund_id", *refund_id))
            .bind(("account", bank_account_number.to_string()))
            .bind(("owner", bank_owner_name.to_string()))
            .bind(("bank", bank_name.to_string()))
            .bind(("now", now))
            .await?
            .take(0)?;
        Ok(updated)
    }

    pub async fn approve_refund_guarded(
        &self,
        refund_id: &Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<RefundRequest>> {
        let updated: Option<RefundRequest> = self
            .db
            .query(
                "UPDATE refund_requests SET status = 'Approved', decided_at = $now, updated_at = $now \
                 WHERE refund_id = $refund_id AND status = 'Submitted' RETURN AFTER",
            )
            .bind(("refund_id", *refund_id))
            .bind(("now", now))
            .await?
            .take(0)?;
        Ok(updated)
    }

    pub async fn reject_refund_guarded(
        &self,
        refund_id: &Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<RefundRequest>> {
        let updated: Option<RefundRequest> = self
            .db
            .query(
                "UPDATE refund_requests SET status = 'Rejected', decided_at = $now, updated_at = $now \
                 WHERE refund_id = $refund_id AND status IN ['Pending', 'Submitted'] RETURN AFTER",
            )
            .bind(("refund_id", *refund_id))
            .bind(("now", now))
            .await?
            .take(0)?;
        Ok(updated)
    }

    pub async fn record_tutor_absent(&self, refund_id: &Uuid, now: DateTime<Utc>) -> Result<()> {
        self.db
            .query(
                "UPDATE refund_requests SET tutor_attend = false, updated_at = $now \
                 WHERE refund_id = $refund_id AND status = 'Pending'",
            )
            .bind(("refund_id", *refund_id))
            .bind(("now", now))
            .await?;
        Ok(())
    }

    // Withdrawal operations

    pub async fn create_withdraw(&self, withdraw: &WithdrawMoney) -> Result<WithdrawMoney> {
        let created: Option<WithdrawMoney> = self
            .db
            .create((WITHDRAWALS, withdraw.id.to_string()))
            .content(withdraw)
            .await?;

        created.ok_or_else(|| anyhow!("Failed to create withdrawal"))
    }

    pub async fn get_withdraw(&self, withdraw_id: &Uuid) -> Result<Option<WithdrawMoney>> {
        let withdraw: Option<WithdrawMoney> = self
            .db
            .query("SELECT * FROM withdrawals WHERE withdraw_id = $withdraw_id")
            .bind(("withdraw_id", *withdraw_id))
            .await?
            .take(0)?;
        Ok(withdraw)
    }

    pub async fn get_withdraws_by_tutor(&self, tutor_id: &Uuid) -> Result<Vec<WithdrawMoney>> {
        let withdraws: Vec<WithdrawMoney> = self
            .db
            .query("SELECT * FROM withdrawals WHERE tutor_id = $tutor_id ORDER BY created_at DESC")
            .bind(("tutor_id", *tutor_id))
            .await?
            .take(0)?;
        Ok(withdraws)
    }

    /// Approved withdrawals are the only debit against derived income.
    pub async fn get_approved_withdraws_by_tutor(&self, tutor_id: &Uuid) -> Result<Vec<WithdrawMoney>> {
        let withdraws: Vec<WithdrawMoney> = self
            .db
            .query("SELECT * FROM withdrawals WHERE tutor_id = $tutor_id AND status = 'Approved'")
            .bind(("tutor_id", *tutor_id))
            .await?
            .take(0)?;
        Ok(withdraws)
    }

    pub async fn decide_withdraw_guarded(
        &self,
        withdraw_id: &Uuid,
        new_status: WithdrawStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<WithdrawMoney>> {
        let updated: Option<WithdrawMoney> = self
            .db
            .query(
                "UPDATE withdrawals SET status = $new_status, decided_at = $now, updated_at = $now \
                 WHERE withdraw_id = $withdraw_id AND status = 'Pending' RETURN AFTER",
            )
            .bind(("withdraw_id", *withdraw_id))
            .bind(("new_status", new_status))
            .bind(("now", now))
            .await?
            .take(0)?;
        Ok(updated)
    }

    // Notification operations

    pub async fn create_notification(&self, notification: &Notification) -> Result<Notification> {
        let created: Option<Notification> = self
            .db
            .create((NOTIFICATIONS, notification.id.to_string()))
            .content(notification)
            .await?;

        created.ok_or_else(|| anyhow!("Failed to create notification"))
    }

    pub async fn get_notifications_by_user(&self, user_id: &Uuid) -> Result<Vec<Notification>> {
        let notifications: Vec<Notification> = self
            .db
            .query("SELECT * FROM notifications WHERE user_id = $user_id ORDER BY created_at DESC")
            .bind(("user_id", *user_id))
            .await?
            .take(0)?;
        Ok(notifications)
    }

    pub async fn acknowledge_notification(&self, notification_id: &Uuid) -> Result<Option<Notification>> {
        let updated: Option<Notification> = self
            .db
            .query(
                "UPDATE notifications SET acknowledged = true \
                 WHERE notification_id = $notification_id RETURN AFTER",
            )
            .bind(("notification_id", *notification_id))
            .await?
            .take(0)?;
        Ok(updated)
    }

    // Enrollment operations

    pub async fn create_enrollment(&self, enrollment: &Enrollment) -> Result<Enrollment> {
        let created: Option<Enrollment> = self
            .db
            .create((ENROLLMENTS, enrollment.id.to_string()))
            .content(enrollment)
            .await?;

        created.ok_or_else(|| anyhow!("Failed to create enrollment"))
    }

    pub async fn get_enrollment_by_payment(&self, payment_id: &Uuid) -> Result<Option<Enrollment>> {
        let enrollment: Option<Enrollment> = self
            .db
            .query("SELECT * FROM enrollments WHERE payment_id = $payment_id")
            .bind(("payment_id", *payment_id))
            .await?
            .take(0)?;
        Ok(enrollment)
    }

    pub async fn health_check(&self) -> Result<()> {
        self.db.health().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::payment::PaymentKind;
    use crate::models::plan::{CreatePlanRequest, DayLabel};
    use crate::models::user::UserRole;
    use chrono::{Duration, TimeZone};

    async fn test_db() -> DatabaseService {
        DatabaseService::new("memory://").await.unwrap()
    }

    fn test_plan(tutor_id: Uuid) -> BookingPlan {
        BookingPlan::new(CreatePlanRequest {
            tutor_id,
            day_label: DayLabel::Monday,
            start_min: 540,
            end_min: 720,
            slot_duration_min: 60,
            hourly_price: Decimal::new(200_000, 0),
        })
    }

    fn test_payment(tutor_id: Uuid) -> Payment {
        Payment::new(
            Uuid::new_v4(),
            tutor_id,
            PaymentKind::Booking,
            Some(Uuid::new_v4()),
            None,
            Decimal::new(200_000, 0),
            "booking".to_string(),
            None,
        )
    }

    #[tokio::test]
    async fn test_user_operations() {
        let db = test_db().await;

        let user = User::new(
            "Mai Pham".to_string(),
            "mai@example.com".to_string(),
            UserRole::Learner,
        );
        let created = db.create_user(&user).await.unwrap();
        assert_eq!(created.email, "mai@example.com");

        let retrieved = db.get_user(&user.id).await.unwrap().unwrap();
        assert_eq!(retrieved.id, user.id);
        assert_eq!(retrieved.role, UserRole::Learner);

        // Duplicate email is rejected.
        let duplicate = User::new(
            "Other".to_string(),
            "mai@example.com".to_string(),
            UserRole::Tutor,
        );
        assert!(db.create_user(&duplicate).await.is_err());
    }

    #[tokio::test]
    async fn test_slot_claim_cas() {
        let db = test_db().await;
        let tutor_id = Uuid::new_v4();
        let plan = test_plan(tutor_id);
        db.create_plan(&plan).await.unwrap();

        let start = Utc.with_ymd_and_hms(2025, 1, 20, 10, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 1, 20, 11, 0, 0).unwrap();
        let slot = BookingSlot::new_available(plan.id, tutor_id, start, end, plan.slot_price());
        db.create_slot(&slot).await.unwrap();

        let learner = Uuid::new_v4();
        let now = Utc::now();
        let claimed = db
            .claim_slot(&slot.id, &learner, None, now + Duration::minutes(15), now)
            .await
            .unwrap();
        assert!(claimed.is_some());
        assert_eq!(claimed.unwrap().learner_id, Some(learner));

        // Second claim loses the CAS.
        let second = db
            .claim_slot(&slot.id, &Uuid::new_v4(), None, now + Duration::minutes(15), now)
            .await
            .unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn test_payment_status_guards() {
        let db = test_db().await;
        let tutor_id = Uuid::new_v4();
        let payment = test_payment(tutor_id);
        db.create_payment(&payment).await.unwrap();

        let found = db
            .get_payment_by_order_code(payment.order_code)
            .await
            .unwrap();
        assert!(found.is_some());

        let now = Utc::now();
        let paid = db
            .mark_payment_paid(&payment.id, Decimal::new(170_000, 0), Decimal::new(15, 2), now)
            .await
            .unwrap();
        assert!(paid.is_some());
        let paid = paid.unwrap();
        assert_eq!(paid.status, PaymentStatus::Paid);
        assert_eq!(paid.net_amount, Some(Decimal::new(170_000, 0)));

        // Late cancel cannot overwrite the settled payment.
        let cancelled = db
            .update_payment_status_guarded(&payment.id, PaymentStatus::Pending, PaymentStatus::Cancelled, now)
            .await
            .unwrap();
        assert!(cancelled.is_none());

        // Re-delivering the success is a no-op as well.
        let again = db
            .mark_payment_paid(&payment.id, Decimal::new(1, 0), Decimal::new(99, 2), now)
            .await
            .unwrap();
        assert!(again.is_none());

        let stored = db.get_payment(&payment.id).await.unwrap().unwrap();
        assert_eq!(stored.net_amount, Some(Decimal::new(170_000, 0)));
    }

    #[tokio::test]
    async fn test_order_code_unique_index() {
        let db = test_db().await;
        let payment = test_payment(Uuid::new_v4());
        db.create_payment(&payment).await.unwrap();

        let mut duplicate = test_payment(Uuid::new_v4());
        duplicate.order_code = payment.order_code;
        assert!(db.create_payment(&duplicate).await.is_err());
    }

    #[tokio::test]
    async fn test_user_payment_history_pagination() {
        let db = test_db().await;
        let user_id = Uuid::new_v4();

        for i in 0..5 {
            let mut payment = test_payment(Uuid::new_v4());
            payment.user_id = user_id;
            payment.order_code = 1000 + i;
            db.create_payment(&payment).await.unwrap();
        }

        let first = db
            .get_payments_by_user(
                &user_id,
                Some(PaginationQuery {
                    page: Some(1),
                    limit: Some(2),
                }),
            )
            .await
            .unwrap();
        assert_eq!(first.total, 5);
        assert_eq!(first.data.len(), 2);
        assert_eq!(first.total_pages, 3);

        let last = db
            .get_payments_by_user(
                &user_id,
                Some(PaginationQuery {
                    page: Some(3),
                    limit: Some(2),
                }),
            )
            .await
            .unwrap();
        assert_eq!(last.data.len(), 1);

        // Defaults fit everything on one page.
        let all = db.get_payments_by_user(&user_id, None).await.unwrap();
        assert_eq!(all.data.len(), 5);
        assert_eq!(all.page, 1);
    }

    #[tokio::test]
    async fn test_guarded_slot_delete_spares_paid() {
        let db = test_db().await;
        let tutor_id = Uuid::new_v4();
        let plan = test_plan(tutor_id);
        db.create_plan(&plan).await.unwrap();

        let start = Utc.with_ymd_and_hms(2025, 1, 20, 9, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 1, 20, 10, 0, 0).unwrap();
        let slot = BookingSlot::new_locked(
            plan.id,
            tutor_id,
            Uuid::new_v4(),
            start,
            end,
            plan.slot_price(),
            None,
            Duration::minutes(15),
        );
        db.create_slot(&slot).await.unwrap();

        let now = Utc::now();
        let paid = db.mark_slot_paid(&slot.id, "https://meet.example/s/1", now).await.unwrap();
        assert!(paid.is_some());

        // Guarded delete refuses to touch a Paid slot.
        let deleted = db.delete_slot_if_locked(&slot.id).await.unwrap();
        assert!(deleted.is_none());
        assert!(db.get_slot(&slot.id).await.unwrap().is_some());
    }
}
