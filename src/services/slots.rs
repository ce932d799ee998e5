use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::models::payment::PaymentStatus;
use crate::models::plan::{BookingPlan, DayLabel, MINUTES_PER_DAY};
use crate::models::slot::{BookingSlot, SlotStatus, SlotSummary, TimeRange};
use crate::services::database::DatabaseService;
use crate::services::locks::KeyedLocks;

#[derive(Clone)]
pub struct SlotService {
    db: DatabaseService,
    locks: KeyedLocks,
    app: AppConfig,
}

impl SlotService {
    pub fn new(db: DatabaseService, locks: KeyedLocks, app: AppConfig) -> Self {
        Self { db, locks, app }
    }

    fn lock_ttl(&self) -> Duration {
        Duration::minutes(self.app.lock_ttl_minutes)
    }

    /// The per-tutor advisory lock. Reservation takes it internally; plan
    /// cascades and wallet decisions take it here to serialize against
    /// concurrent bookings. Never acquire it twice on one call path.
    pub async fn lock_tutor(&self, tutor_id: Uuid) -> OwnedMutexGuard<()> {
        self.locks.acquire(tutor_id).await
    }

    /// Reserve the requested ranges for one learner, all-or-nothing. An
    /// exact-match Available slot is claimed in place; a free range becomes a
    /// new Locked slot; any overlap with the live calendar fails the whole
    /// request before anything is written.
    pub async fn reserve_slots(
        &self,
        plan: &BookingPlan,
        learner_id: Uuid,
        ranges: &[TimeRange],
        payment_id: Option<Uuid>,
    ) -> Result<Vec<BookingSlot>, AppError> {
        if !plan.is_bookable() {
            return Err(AppError::State("booking plan is not open for booking".to_string()));
        }
        if ranges.is_empty() {
            return Err(AppError::Validation("at least one time range is required".to_string()));
        }

        let now = Utc::now();
        for range in ranges {
            if range.start_time <= now {
                return Err(AppError::Validation(format!(
                    "cannot reserve a slot in the past ({})",
                    range.start_time
                )));
            }
            if !plan.fits_range(&range.start_time, &range.end_time) {
                return Err(AppError::Validation(format!(
                    "range {} - {} does not fit the plan schedule",
                    range.start_time, range.end_time
                )));
            }
        }
        for (i, first) in ranges.iter().enumerate() {
            for second in &ranges[i + 1..] {
                if first.overlaps(second) {
                    return Err(AppError::Conflict(
                        "requested time ranges overlap each other".to_string(),
                    ));
                }
            }
        }

        let _guard = self.locks.acquire(plan.tutor_id).await;

        let active = self.db.get_active_slots_by_tutor(&plan.tutor_id).await?;

        // Split into claims and creations; every collision aborts up front.
        let mut to_claim: Vec<Uuid> = Vec::new();
        let mut to_create: Vec<&TimeRange> = Vec::new();
        for range in ranges {
            let mut claimable = None;
            for slot in &active {
                if !slot.overlaps(&range.start_time, &range.end_time) {
                    continue;
                }
                if slot.status == SlotStatus::Available
                    && slot.start_time == range.start_time
                    && slot.end_time == range.end_time
                {
                    claimable = Some(slot.id);
                } else {
                    return Err(AppError::Conflict(format!(
                        "time range {} - {} is no longer available",
                        range.start_time, range.end_time
                    )));
                }
            }
            match claimable {
                Some(slot_id) => to_claim.push(slot_id),
                None => to_create.push(range),
            }
        }

        let expires_at = now + self.lock_ttl();
        let mut reserved: Vec<BookingSlot> = Vec::new();

        for slot_id in to_claim {
            match self
                .db
                .claim_slot(&slot_id, &learner_id, payment_id, expires_at, now)
                .await?
            {
                Some(locked) => reserved.push(locked),
                None => {
                    self.release_partial(&reserved).await;
                    return Err(AppError::Conflict(
                        "slot was claimed by another learner".to_string(),
                    ));
                }
            }
        }

        for range in to_create {
            let slot = BookingSlot::new_locked(
                plan.id,
                plan.tutor_id,
                learner_id,
                range.start_time,
                range.end_time,
                plan.slot_price(),
                payment_id,
                self.lock_ttl(),
            );
            match self.db.create_slot(&slot).await {
                Ok(created) => reserved.push(created),
                Err(err) => {
                    self.release_partial(&reserved).await;
                    return Err(AppError::Database(err));
                }
            }
        }

        reserved.sort_by_key(|slot| slot.start_time);
        log::info!(
            "Reserved {} slot(s) on plan {} for learner {}",
            reserved.len(),
            plan.id,
            learner_id
        );
        Ok(reserved)
    }

    async fn release_partial(&self, slots: &[BookingSlot]) {
        for slot in slots {
            if let Err(err) = self.db.delete_slot_if_locked(&slot.id).await {
                log::warn!(
                    "Failed to release slot {} after aborted reservation: {}",
                    slot.id,
                    err
                );
            }
        }
    }

    /// Materialize one calendar day of a plan into Available slots. Ranges
    /// already occupied (or already started) are skipped, so republishing a
    /// day is harmless.
    pub async fn publish_slots(
        &self,
        plan: &BookingPlan,
        date: NaiveDate,
    ) -> Result<Vec<BookingSlot>, AppError> {
        if !plan.is_bookable() {
            return Err(AppError::State("booking plan is not open for booking".to_string()));
        }
        if DayLabel::from(date.weekday()) != plan.day_label {
            return Err(AppError::Validation(format!(
                "{} does not fall on {}",
                date, plan.day_label
            )));
        }

        let now = Utc::now();
        if date < now.date_naive() {
            return Err(AppError::Validation(
                "cannot publish slots for a past date".to_string(),
            ));
        }

        let _guard = self.locks.acquire(plan.tutor_id).await;

        let active = self.db.get_active_slots_by_tutor(&plan.tutor_id).await?;

        let mut published = Vec::new();
        let mut cursor = plan.start_min;
        while cursor + plan.slot_duration_min <= plan.end_min {
            let slot_end = cursor + plan.slot_duration_min;
            let (Some(start), Some(end)) = (datetime_at(date, cursor), datetime_at(date, slot_end))
            else {
                cursor = slot_end;
                continue;
            };
            cursor = slot_end;

            if start <= now {
                continue;
            }
            if active.iter().any(|slot| slot.overlaps(&start, &end)) {
                continue;
            }

            let slot = BookingSlot::new_available(plan.id, plan.tutor_id, start, end, plan.slot_price());
            published.push(self.db.create_slot(&slot).await?);
        }

        log::info!(
            "Published {} slot(s) for plan {} on {}",
            published.len(),
            plan.id,
            date
        );
        Ok(published)
    }

    /// Release expired reservation locks. A Locked slot whose payment already
    /// settled is left alone so reconciliation can flip it to Paid.
    pub async fn sweep_expired_locks(&self, now: DateTime<Utc>) -> Result<usize, AppError> {
        let locked = self.db.get_locked_slots().await?;
        let mut released = 0;

        for slot in locked {
            if !slot.is_lock_expired(now) {
                continue;
            }

            if let Some(payment_id) = slot.payment_id {
                if let Some(payment) = self.db.get_payment(&payment_id).await? {
                    if payment.status == PaymentStatus::Paid {
                        continue;
                    }
                }
            }

            if self.db.delete_slot_if_locked(&slot.id).await?.is_some() {
                log::info!(
                    "Released expired lock on slot {} ({} - {})",
                    slot.id,
                    slot.start_time,
                    slot.end_time
                );
                released += 1;
            }
        }

        Ok(released)
    }

    pub async fn reject_slot(&self, slot_id: &Uuid, now: DateTime<Utc>) -> Result<BookingSlot, AppError> {
        match self.db.reject_slot(slot_id, now).await? {
            Some(slot) => Ok(slot),
            None => Err(AppError::State("only a paid slot can be rejected".to_string())),
        }
    }

    pub async fn get_slot(&self, slot_id: &Uuid) -> Result<BookingSlot, AppError> {
        self.db
            .get_slot(slot_id)
            .await?
            .ok_or_else(|| AppError::not_found("booking slot", slot_id))
    }

    pub async fn tutor_slot_summaries(&self, tutor_id: &Uuid) -> Result<Vec<SlotSummary>, AppError> {
        let slots = self.db.get_slots_by_tutor(tutor_id).await?;
        Ok(slots.iter().map(BookingSlot::to_summary).collect())
    }
}

fn datetime_at(date: NaiveDate, minute: u32) -> Option<DateTime<Utc>> {
    // Minute 1440 wraps to midnight of the next day.
    let days = minute / MINUTES_PER_DAY;
    let within = minute % MINUTES_PER_DAY;
    let time = NaiveTime::from_num_seconds_from_midnight_opt(within * 60, 0)?;
    let date = date.checked_add_days(Days::new(u64::from(days)))?;
    Some(Utc.from_utc_datetime(&date.and_time(time)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::payment::{Payment, PaymentKind};
    use crate::models::plan::CreatePlanRequest;
    use rust_decimal::Decimal;

    async fn test_service() -> (SlotService, DatabaseService) {
        let db = DatabaseService::new("memory://").await.unwrap();
        let service = SlotService::new(db.clone(), KeyedLocks::new(), AppConfig::default());
        (service, db)
    }

    async fn monday_plan(db: &DatabaseService) -> BookingPlan {
        let plan = BookingPlan::new(CreatePlanRequest {
            tutor_id: Uuid::new_v4(),
            day_label: DayLabel::Monday,
            start_min: 540, // 09:00
            end_min: 720,   // 12:00
            slot_duration_min: 60,
            hourly_price: Decimal::new(200_000, 0),
        });
        db.create_plan(&plan).await.unwrap()
    }

    // 2030-01-07 is a Monday comfortably in the future.
    fn monday(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 1, 7, hour, 0, 0).unwrap()
    }

    fn range(start_hour: u32) -> TimeRange {
        TimeRange {
            start_time: monday(start_hour),
            end_time: monday(start_hour + 1),
        }
    }

    #[tokio::test]
    async fn test_reserve_creates_locked_slots() {
        let (service, _db) = test_service().await;
        let plan = monday_plan(&service.db).await;
        let learner = Uuid::new_v4();

        let reserved = service
            .reserve_slots(&plan, learner, &[range(9), range(10)], None)
            .await
            .unwrap();

        assert_eq!(reserved.len(), 2);
        for slot in &reserved {
            assert_eq!(slot.status, SlotStatus::Locked);
            assert_eq!(slot.learner_id, Some(learner));
            assert_eq!(slot.price, Decimal::new(200_000_00, 2));
            assert!(slot.expires_at.is_some());
        }
    }

    #[tokio::test]
    async fn test_reserve_claims_published_slot() {
        let (service, db) = test_service().await;
        let plan = monday_plan(&service.db).await;

        let published = service
            .publish_slots(&plan, NaiveDate::from_ymd_opt(2030, 1, 7).unwrap())
            .await
            .unwrap();
        assert_eq!(published.len(), 3);

        let learner = Uuid::new_v4();
        let reserved = service
            .reserve_slots(&plan, learner, &[range(9)], None)
            .await
            .unwrap();

        // The existing Available slot was claimed, not duplicated.
        assert_eq!(reserved[0].id, published[0].id);
        assert_eq!(reserved[0].status, SlotStatus::Locked);
        assert_eq!(db.get_slots_by_tutor(&plan.tutor_id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_reserve_is_all_or_nothing_on_overlap() {
        let (service, db) = test_service().await;
        let plan = monday_plan(&service.db).await;

        service
            .reserve_slots(&plan, Uuid::new_v4(), &[range(10)], None)
            .await
            .unwrap();

        // Second learner wants 09:00 (free) and 10:00 (taken).
        let err = service
            .reserve_slots(&plan, Uuid::new_v4(), &[range(9), range(10)], None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // The free range was not locked as a side effect.
        let slots = db.get_slots_by_tutor(&plan.tutor_id).await.unwrap();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].start_time, monday(10));
    }

    #[tokio::test]
    async fn test_reserve_rejects_off_grid_ranges() {
        let (service, _db) = test_service().await;
        let plan = monday_plan(&service.db).await;

        // 09:30-10:30 is inside the window but off the 60-minute grid.
        let off_grid = TimeRange {
            start_time: Utc.with_ymd_and_hms(2030, 1, 7, 9, 30, 0).unwrap(),
            end_time: Utc.with_ymd_and_hms(2030, 1, 7, 10, 30, 0).unwrap(),
        };
        let err = service
            .reserve_slots(&plan, Uuid::new_v4(), &[off_grid], None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_expired_lock_frees_the_range() {
        let (service, db) = test_service().await;
        let plan = monday_plan(&service.db).await;

        service
            .reserve_slots(&plan, Uuid::new_v4(), &[range(9)], None)
            .await
            .unwrap();

        // At +14 minutes the lock still holds.
        let swept = service
            .sweep_expired_locks(Utc::now() + Duration::minutes(14))
            .await
            .unwrap();
        assert_eq!(swept, 0);

        // At +16 minutes it is released and the range is bookable again.
        let swept = service
            .sweep_expired_locks(Utc::now() + Duration::minutes(16))
            .await
            .unwrap();
        assert_eq!(swept, 1);
        assert!(db.get_slots_by_tutor(&plan.tutor_id).await.unwrap().is_empty());

        let again = service
            .reserve_slots(&plan, Uuid::new_v4(), &[range(9)], None)
            .await
            .unwrap();
        assert_eq!(again.len(), 1);
    }

    #[tokio::test]
    async fn test_sweep_spares_slot_of_settled_payment() {
        let (service, db) = test_service().await;
        let plan = monday_plan(&service.db).await;
        let learner = Uuid::new_v4();

        let mut payment = Payment::new(
            learner,
            plan.tutor_id,
            PaymentKind::Booking,
            Some(plan.id),
            None,
            Decimal::new(200_000, 0),
            "booking".to_string(),
            None,
        );
        payment.mark_paid(Decimal::new(15, 2), Utc::now()).unwrap();
        db.create_payment(&payment).await.unwrap();

        let slot = BookingSlot::new_locked(
            plan.id,
            plan.tutor_id,
            learner,
            monday(9),
            monday(10),
            plan.slot_price(),
            Some(payment.id),
            Duration::minutes(15),
        );
        db.create_slot(&slot).await.unwrap();

        let swept = service
            .sweep_expired_locks(Utc::now() + Duration::minutes(30))
            .await
            .unwrap();
        assert_eq!(swept, 0);
        assert!(db.get_slot(&slot.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_publish_skips_occupied_and_is_idempotent() {
        let (service, _db) = test_service().await;
        let plan = monday_plan(&service.db).await;
        let date = NaiveDate::from_ymd_opt(2030, 1, 7).unwrap();

        service
            .reserve_slots(&plan, Uuid::new_v4(), &[range(10)], None)
            .await
            .unwrap();

        let published = service.publish_slots(&plan, date).await.unwrap();
        let starts: Vec<_> = published.iter().map(|slot| slot.start_time).collect();
        assert_eq!(starts, vec![monday(9), monday(11)]);

        // Republishing finds every range occupied.
        let republished = service.publish_slots(&plan, date).await.unwrap();
        assert!(republished.is_empty());
    }

    #[tokio::test]
    async fn test_publish_rejects_wrong_weekday() {
        let (service, _db) = test_service().await;
        let plan = monday_plan(&service.db).await;

        // 2030-01-08 is a Tuesday.
        let err = service
            .publish_slots(&plan, NaiveDate::from_ymd_opt(2030, 1, 8).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
