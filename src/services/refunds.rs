use chrono::Utc;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::notification::NotificationKind;
use crate::models::refund::{RefundKind, RefundRequest, RefundStatus, SubmitPayoutInfoRequest};
use crate::models::slot::BookingSlot;
use crate::services::database::DatabaseService;
use crate::services::locks::KeyedLocks;
use crate::services::notifier::NotificationService;
use crate::services::wallet::WalletService;

/// Refund workflow: Pending → Submitted (learner supplies payout details) →
/// Approved/Rejected. Approval debits nothing directly; it flips the slot to
/// Rejected, which removes the money from the tutor's derived income.
#[derive(Clone)]
pub struct RefundService {
    db: DatabaseService,
    wallet: WalletService,
    notifier: NotificationService,
    locks: KeyedLocks,
}

impl RefundService {
    pub fn new(
        db: DatabaseService,
        wallet: WalletService,
        notifier: NotificationService,
        locks: KeyedLocks,
    ) -> Self {
        Self {
            db,
            wallet,
            notifier,
            locks,
        }
    }

    /// Open a system-initiated refund for a paid slot (tutor reschedule, plan
    /// deletion). Duplicate and ownerless slots are skipped, not errors: the
    /// callers are cascades that must keep going.
    pub async fn raise_for_slot(
        &self,
        slot: &BookingSlot,
        kind: RefundKind,
        reason: &str,
    ) -> Result<Option<RefundRequest>, AppError> {
        if let Some(existing) = self.db.get_non_rejected_refund_for_slot(&slot.id).await? {
            log::info!(
                "Slot {} already has refund {} ({}), not raising another",
                slot.id,
                existing.id,
                existing.status
            );
            return Ok(None);
        }

        let learner_id = match slot.learner_id {
            Some(id) => id,
            None => {
                log::warn!("Slot {} has no learner, cannot raise refund", slot.id);
                return Ok(None);
            }
        };

        let refund = RefundRequest::new(
            kind,
            Some(slot.id),
            Some(slot.plan_id),
            slot.payment_id,
            learner_id,
            slot.tutor_id,
            slot.price,
            reason.to_string(),
            None,
        );
        let refund = self.db.create_refund(&refund).await?;

        self.notifier
            .send(
                learner_id,
                "Refund opened",
                &format!(
                    "A refund of {} was opened for your session. Please submit your payout details.",
                    refund.amount
                ),
                NotificationKind::Refund,
                Some(format!("/refunds/{}", refund.id)),
            )
            .await;

        log::info!(
            "Refund {} ({:?}) raised for slot {}, amount {}",
            refund.id,
            kind,
            slot.id,
            refund.amount
        );
        Ok(Some(refund))
    }

    /// Learner attaches the bank account the payout should go to.
    pub async fn submit_payout_info(
        &self,
        refund_id: &Uuid,
        request: SubmitPayoutInfoRequest,
    ) -> Result<RefundRequest, AppError> {
        let refund = self
            .db
            .get_refund(refund_id)
            .await?
            .ok_or_else(|| AppError::not_found("refund request", refund_id))?;

        if refund.learner_id != request.learner_id {
            return Err(AppError::Authorization(
                "only the learner who owns the refund can submit payout details".to_string(),
            ));
        }

        self.db
            .submit_refund_payout(
                refund_id,
                &request.bank.bank_account_number,
                &request.bank.bank_owner_name,
                &request.bank.bank_name,
                Utc::now(),
            )
            .await?
            .ok_or_else(|| {
                AppError::State(format!(
                    "refund is {}, not awaiting payout details",
                    refund.status
                ))
            })
    }

    /// Moderation approves the payout. Requires submitted bank details and
    /// enough derived balance to cover the amount; on success the slot flips
    /// to Rejected so the money leaves the tutor's income.
    pub async fn approve(&self, refund_id: &Uuid) -> Result<RefundRequest, AppError> {
        let refund = self
            .db
            .get_refund(refund_id)
            .await?
            .ok_or_else(|| AppError::not_found("refund request", refund_id))?;

        match refund.status {
            RefundStatus::Submitted => {}
            RefundStatus::Pending => {
                return Err(AppError::State(
                    "refund cannot be approved before payout details are submitted".to_string(),
                ));
            }
            _ => {
                return Err(AppError::State(format!(
                    "refund is {}, already decided",
                    refund.status
                )));
            }
        }

        let _guard = self.locks.acquire(refund.tutor_id).await;

        let now = Utc::now();
        let available = self.wallet.current_balance(&refund.tutor_id, now).await?;
        if refund.amount > available {
            return Err(AppError::InsufficientBalance {
                requested: refund.amount,
                available,
            });
        }

        let approved = self
            .db
            .approve_refund_guarded(refund_id, now)
            .await?
            .ok_or_else(|| AppError::State("refund was already decided".to_string()))?;

        if let Some(slot_id) = approved.slot_id {
            if self.db.reject_slot(&slot_id, now).await?.is_none() {
                log::warn!(
                    "Refund {} approved but slot {} was not in Paid state",
                    approved.id,
                    slot_id
                );
            }
        }

        self.notifier
            .send(
                approved.learner_id,
                "Refund approved",
                &format!("Your refund of {} was approved and will be paid out.", approved.amount),
                NotificationKind::Refund,
                Some(format!("/refunds/{}", approved.id)),
            )
            .await;

        log::info!("Refund {} approved, amount {}", approved.id, approved.amount);
        Ok(approved)
    }

    pub async fn reject(&self, refund_id: &Uuid) -> Result<RefundRequest, AppError> {
        let refund = self
            .db
            .get_refund(refund_id)
            .await?
            .ok_or_else(|| AppError::not_found("refund request", refund_id))?;

        let rejected = self
            .db
            .reject_refund_guarded(refund_id, Utc::now())
            .await?
            .ok_or_else(|| AppError::State(format!("refund is {}, already decided", refund.status)))?;

        self.notifier
            .send(
                rejected.learner_id,
                "Refund rejected",
                "Your refund request was reviewed and rejected.",
                NotificationKind::Refund,
                Some(format!("/refunds/{}", rejected.id)),
            )
            .await;

        log::info!("Refund {} rejected", rejected.id);
        Ok(rejected)
    }

    pub async fn get_refund(&self, refund_id: &Uuid) -> Result<RefundRequest, AppError> {
        self.db
            .get_refund(refund_id)
            .await?
            .ok_or_else(|| AppError::not_found("refund request", refund_id))
    }

    pub async fn list_for_learner(&self, learner_id: &Uuid) -> Result<Vec<RefundRequest>, AppError> {
        Ok(self.db.get_refunds_by_learner(learner_id).await?)
    }
}
