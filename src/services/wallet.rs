use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::common::round_money;
use crate::models::notification::NotificationKind;
use crate::models::payment::{net_of_commission, PaymentKind};
use crate::models::slot::{BookingSlot, SlotStatus};
use crate::models::withdraw::{RequestWithdrawRequest, WalletBalance, WithdrawMoney, WithdrawStatus};
use crate::services::database::DatabaseService;
use crate::services::locks::KeyedLocks;
use crate::services::notifier::NotificationService;
use crate::services::settings::SettingsStore;

/// Balances are derived on every read; nothing here stores a running total.
/// Income counts a Paid payment once all of its surviving slots are released,
/// and only Approved withdrawals debit it.
#[derive(Clone)]
pub struct WalletService {
    db: DatabaseService,
    notifier: NotificationService,
    locks: KeyedLocks,
    settings: SettingsStore,
}

impl WalletService {
    pub fn new(
        db: DatabaseService,
        notifier: NotificationService,
        locks: KeyedLocks,
        settings: SettingsStore,
    ) -> Self {
        Self {
            db,
            notifier,
            locks,
            settings,
        }
    }

    /// Earned-and-released income across the tutor's Paid payments.
    pub async fn net_income(&self, tutor_id: &Uuid, now: DateTime<Utc>) -> Result<Decimal, AppError> {
        let payments = self.db.get_paid_payments_by_tutor(tutor_id).await?;
        let snapshot = self.settings.snapshot().await;
        let mut income = Decimal::ZERO;

        for payment in payments {
            // Rows settled before rate versioning existed carry no snapshot;
            // they fall back to the current schedule.
            let net = payment
                .net_amount
                .unwrap_or_else(|| net_of_commission(payment.amount, snapshot.rate_for(payment.kind)));

            match payment.kind {
                PaymentKind::Course => income += net,
                PaymentKind::Booking => {
                    let slots = self.db.get_slots_by_payment(&payment.id).await?;
                    let paid_slots: Vec<&BookingSlot> = slots
                        .iter()
                        .filter(|slot| slot.status == SlotStatus::Paid)
                        .collect();
                    if paid_slots.is_empty() {
                        continue;
                    }

                    let mut all_released = true;
                    for slot in &paid_slots {
                        if !self.slot_released(slot, now).await? {
                            all_released = false;
                            break;
                        }
                    }
                    if all_released {
                        income += net;
                    }
                }
            }
        }

        Ok(round_money(income))
    }

    /// A Paid slot releases its money when the tutor attended and either the
    /// learner confirmed or the session ended with no complaint open.
    async fn slot_released(&self, slot: &BookingSlot, now: DateTime<Utc>) -> Result<bool, AppError> {
        if !slot.tutor_join {
            return Ok(false);
        }
        if slot.learner_join {
            return Ok(true);
        }
        if now < slot.end_time {
            return Ok(false);
        }
        Ok(self.db.get_open_complaint_for_slot(&slot.id).await?.is_none())
    }

    pub async fn current_balance(&self, tutor_id: &Uuid, now: DateTime<Utc>) -> Result<Decimal, AppError> {
        let income = self.net_income(tutor_id, now).await?;
        let withdrawn = self.total_withdrawn(tutor_id).await?;
        Ok(round_money(income - withdrawn))
    }

    async fn total_withdrawn(&self, tutor_id: &Uuid) -> Result<Decimal, AppError> {
        let withdrawals = self.db.get_approved_withdraws_by_tutor(tutor_id).await?;
        Ok(withdrawals.iter().map(|withdraw| withdraw.amount).sum())
    }

    pub async fn balance(&self, tutor_id: &Uuid, now: DateTime<Utc>) -> Result<WalletBalance, AppError> {
        let net_income = self.net_income(tutor_id, now).await?;
        let withdrawn = self.total_withdrawn(tutor_id).await?;
        Ok(WalletBalance {
            tutor_id: *tutor_id,
            net_income,
            withdrawn,
            current_balance: round_money(net_income - withdrawn),
        })
    }

    /// File a withdrawal against the live balance. The stored balance figure
    /// is a display snapshot; approval re-checks the real number.
    pub async fn request_withdraw(
        &self,
        request: RequestWithdrawRequest,
    ) -> Result<WithdrawMoney, AppError> {
        if request.amount <= Decimal::ZERO {
            return Err(AppError::Validation("withdrawal amount must be positive".to_string()));
        }

        let _guard = self.locks.acquire(request.tutor_id).await;

        let now = Utc::now();
        let available = self.current_balance(&request.tutor_id, now).await?;
        if request.amount > available {
            return Err(AppError::InsufficientBalance {
                requested: request.amount,
                available,
            });
        }

        let withdraw = WithdrawMoney::new(request.tutor_id, request.amount, available, request.bank);
        let withdraw = self.db.create_withdraw(&withdraw).await?;

        self.notifier
            .send(
                request.tutor_id,
                "Withdrawal requested",
                &format!("Your withdrawal of {} is awaiting review.", withdraw.amount),
                NotificationKind::Withdraw,
                None,
            )
            .await;

        log::info!(
            "Withdrawal {} requested by tutor {} for {}",
            withdraw.id,
            withdraw.tutor_id,
            withdraw.amount
        );
        Ok(withdraw)
    }

    /// Approval re-validates against the live balance inside the same
    /// critical section that refund approvals use, so concurrent decisions
    /// cannot overdraw the wallet.
    pub async fn approve_withdraw(&self, withdraw_id: &Uuid) -> Result<WithdrawMoney, AppError> {
        let withdraw = self
            .db
            .get_withdraw(withdraw_id)
            .await?
            .ok_or_else(|| AppError::not_found("withdrawal", withdraw_id))?;

        if withdraw.status != WithdrawStatus::Pending {
            return Err(AppError::State(format!(
                "withdrawal is {}, already decided",
                withdraw.status
            )));
        }

        let _guard = self.locks.acquire(withdraw.tutor_id).await;

        let now = Utc::now();
        let available = self.current_balance(&withdraw.tutor_id, now).await?;
        if withdraw.amount > available {
            return Err(AppError::InsufficientBalance {
                requested: withdraw.amount,
                available,
            });
        }

        let approved = self
            .db
            .decide_withdraw_guarded(withdraw_id, WithdrawStatus::Approved, now)
            .await?
            .ok_or_else(|| AppError::State("withdrawal was already decided".to_string()))?;

        self.notifier
            .send(
                approved.tutor_id,
                "Withdrawal approved",
                &format!("Your withdrawal of {} was approved.", approved.amount),
                NotificationKind::Withdraw,
                None,
            )
            .await;

        log::info!("Withdrawal {} approved for {}", approved.id, approved.amount);
        Ok(approved)
    }

    pub async fn reject_withdraw(&self, withdraw_id: &Uuid) -> Result<WithdrawMoney, AppError> {
        let withdraw = self
            .db
            .get_withdraw(withdraw_id)
            .await?
            .ok_or_else(|| AppError::not_found("withdrawal", withdraw_id))?;

        let rejected = self
            .db
            .decide_withdraw_guarded(&withdraw.id, WithdrawStatus::Rejected, Utc::now())
            .await?
            .ok_or_else(|| AppError::State(format!("withdrawal is {}, already decided", withdraw.status)))?;

        self.notifier
            .send(
                rejected.tutor_id,
                "Withdrawal rejected",
                &format!("Your withdrawal of {} was rejected.", rejected.amount),
                NotificationKind::Withdraw,
                None,
            )
            .await;

        Ok(rejected)
    }

    pub async fn list_withdrawals(&self, tutor_id: &Uuid) -> Result<Vec<WithdrawMoney>, AppError> {
        Ok(self.db.get_withdraws_by_tutor(tutor_id).await?)
    }
}
