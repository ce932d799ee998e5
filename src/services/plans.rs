use std::collections::HashSet;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::payment::PaymentStatus;
use crate::models::plan::{
    validate_window, BookingPlan, CreatePlanRequest, DayLabel, UpdatePlanRequest,
    MAX_ACTIVE_DAY_LABELS,
};
use crate::models::refund::RefundKind;
use crate::models::slot::{BookingSlot, SlotStatus};
use crate::services::database::DatabaseService;
use crate::services::payments::PaymentService;
use crate::services::refunds::RefundService;
use crate::services::slots::SlotService;

/// Weekly availability plans. Editing or deleting a plan cascades onto the
/// slots already carved from it: strictly-future slots that no longer fit are
/// removed (unclaimed), cancelled with their payment (locked), or escalated
/// to the refund workflow (paid). Slots dated today or earlier are never
/// touched.
#[derive(Clone)]
pub struct PlanService {
    db: DatabaseService,
    slots: SlotService,
    payments: PaymentService,
    refunds: RefundService,
}

impl PlanService {
    pub fn new(
        db: DatabaseService,
        slots: SlotService,
        payments: PaymentService,
        refunds: RefundService,
    ) -> Self {
        Self {
            db,
            slots,
            payments,
            refunds,
        }
    }

    pub async fn create_plan(&self, request: CreatePlanRequest) -> Result<BookingPlan, AppError> {
        validate_window(request.start_min, request.end_min, request.slot_duration_min)
            .map_err(AppError::Validation)?;
        if request.hourly_price <= Decimal::ZERO {
            return Err(AppError::Validation("hourly price must be positive".to_string()));
        }

        let candidate = BookingPlan::new(request);
        let peers = self.db.get_plans_by_tutor(&candidate.tutor_id).await?;
        let active: Vec<&BookingPlan> = peers.iter().filter(|p| p.active).collect();

        self.check_day_cap(&active, candidate.day_label)?;
        if let Some(clash) = active.iter().find(|p| p.window_overlaps(&candidate)) {
            return Err(AppError::Conflict(format!(
                "window overlaps existing {} plan {}",
                clash.day_label, clash.id
            )));
        }

        let plan = self.db.create_plan(&candidate).await?;
        log::info!(
            "Plan {} created for tutor {}: {} {}-{} every {} min",
            plan.id,
            plan.tutor_id,
            plan.day_label,
            plan.start_min,
            plan.end_min,
            plan.slot_duration_min
        );
        Ok(plan)
    }

    pub async fn update_plan(
        &self,
        plan_id: &Uuid,
        request: UpdatePlanRequest,
    ) -> Result<BookingPlan, AppError> {
        validate_window(request.start_min, request.end_min, request.slot_duration_min)
            .map_err(AppError::Validation)?;
        if request.hourly_price <= Decimal::ZERO {
            return Err(AppError::Validation("hourly price must be positive".to_string()));
        }

        let plan = self.get_plan(plan_id).await?;
        let mut candidate = plan.clone();
        candidate.apply_update(&request);

        let peers = self.db.get_plans_by_tutor(&plan.tutor_id).await?;
        let active: Vec<&BookingPlan> = peers
            .iter()
            .filter(|p| p.active && p.id != plan.id)
            .collect();

        if candidate.active {
            self.check_day_cap(&active, candidate.day_label)?;
        }
        if let Some(clash) = active.iter().find(|p| p.window_overlaps(&candidate)) {
            return Err(AppError::Conflict(format!(
                "window overlaps existing {} plan {}",
                clash.day_label, clash.id
            )));
        }

        let _guard = self.slots.lock_tutor(plan.tutor_id).await;

        let retired = self
            .retire_future_slots(
                &plan,
                |slot| candidate.fits_range(&slot.start_time, &slot.end_time),
                RefundKind::TutorReschedule,
                "the tutor changed this availability window",
            )
            .await?;

        let updated = self.db.update_plan(&candidate).await?;
        log::info!(
            "Plan {} updated ({} future slots no longer fit)",
            updated.id,
            retired
        );
        Ok(updated)
    }

    /// Soft delete. Every strictly-future slot of the plan is retired; the
    /// plan row stays for history.
    pub async fn delete_plan(&self, plan_id: &Uuid) -> Result<BookingPlan, AppError> {
        let mut plan = match self.db.get_plan(plan_id).await? {
            Some(plan) => plan,
            None => return Err(AppError::not_found("booking plan", plan_id)),
        };
        if plan.deleted {
            return Ok(plan);
        }

        let _guard = self.slots.lock_tutor(plan.tutor_id).await;

        let retired = self
            .retire_future_slots(
                &plan,
                |_| false,
                RefundKind::PlanDeletion,
                "the tutor removed this availability plan",
            )
            .await?;

        plan.soft_delete();
        let plan = self.db.update_plan(&plan).await?;
        log::info!("Plan {} deleted, {} future slots retired", plan.id, retired);
        Ok(plan)
    }

    pub async fn publish_day(
        &self,
        plan_id: &Uuid,
        tutor_id: &Uuid,
        date: NaiveDate,
    ) -> Result<Vec<BookingSlot>, AppError> {
        let plan = self.get_plan(plan_id).await?;
        if plan.tutor_id != *tutor_id {
            return Err(AppError::Authorization(
                "only the owning tutor can publish slots for a plan".to_string(),
            ));
        }
        self.slots.publish_slots(&plan, date).await
    }

    pub async fn get_plan(&self, plan_id: &Uuid) -> Result<BookingPlan, AppError> {
        self.db
            .get_plan(plan_id)
            .await?
            .filter(|plan| !plan.deleted)
            .ok_or_else(|| AppError::not_found("booking plan", plan_id))
    }

    pub async fn list_for_tutor(&self, tutor_id: &Uuid) -> Result<Vec<BookingPlan>, AppError> {
        Ok(self.db.get_plans_by_tutor(tutor_id).await?)
    }

    fn check_day_cap(&self, active: &[&BookingPlan], day_label: DayLabel) -> Result<(), AppError> {
        let labels: HashSet<DayLabel> = active.iter().map(|p| p.day_label).collect();
        if !labels.contains(&day_label) && labels.len() >= MAX_ACTIVE_DAY_LABELS {
            return Err(AppError::Conflict(format!(
                "tutors may offer at most {} distinct weekly days",
                MAX_ACTIVE_DAY_LABELS
            )));
        }
        Ok(())
    }

    /// Retire the plan's strictly-future slots that `keep` does not accept.
    /// Caller holds the tutor lock.
    async fn retire_future_slots(
        &self,
        plan: &BookingPlan,
        keep: impl Fn(&BookingSlot) -> bool,
        refund_kind: RefundKind,
        reason: &str,
    ) -> Result<usize, AppError> {
        let today = Utc::now().date_naive();
        let slots = self.db.get_slots_by_plan(&plan.id).await?;
        let mut retired = 0;

        for slot in slots {
            if slot.start_time.date_naive() <= today {
                continue;
            }
            if keep(&slot) {
                continue;
            }

            match slot.status {
                SlotStatus::Available => {
                    self.db.delete_slot(&slot.id).await?;
                    retired += 1;
                }
                SlotStatus::Locked => {
                    let payment = match slot.payment_id {
                        Some(payment_id) => self.db.get_payment(&payment_id).await?,
                        None => None,
                    };
                    match payment {
                        Some(p) if p.status == PaymentStatus::Pending => {
                            if self.payments.cancel_pending_payment(&p, reason).await? {
                                retired += 1;
                            } else {
                                log::warn!(
                                    "Slot {} is held by payment {} that settled mid-cascade",
                                    slot.id,
                                    p.id
                                );
                            }
                        }
                        Some(p) if p.status == PaymentStatus::Paid => {
                            log::warn!(
                                "Slot {} is locked under already-paid payment {}, leaving it for reconciliation",
                                slot.id,
                                p.id
                            );
                        }
                        _ => {
                            if self.db.delete_slot_if_locked(&slot.id).await?.is_some() {
                                retired += 1;
                            }
                        }
                    }
                }
                SlotStatus::Paid => {
                    self.refunds.raise_for_slot(&slot, refund_kind, reason).await?;
                    retired += 1;
                }
                SlotStatus::Rejected => {}
            }
        }

        Ok(retired)
    }
}
