use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SlotStatus {
    Available,
    Locked,
    Paid,
    Rejected,
}

impl SlotStatus {
    /// Paid and Rejected rows are permanent history and are never deleted.
    pub fn is_settled(&self) -> bool {
        matches!(self, SlotStatus::Paid | SlotStatus::Rejected)
    }
}

impl std::fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SlotStatus::Available => write!(f, "Available"),
            SlotStatus::Locked => write!(f, "Locked"),
            SlotStatus::Paid => write!(f, "Paid"),
            SlotStatus::Rejected => write!(f, "Rejected"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingSlot {
    #[serde(rename = "slot_id")]
    pub id: Uuid,
    pub plan_id: Uuid,
    pub tutor_id: Uuid,
    pub learner_id: Option<Uuid>,
    /// Half-open interval `[start_time, end_time)`.
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: SlotStatus,
    /// Amount charged for this slot, fixed when the slot is cut from its plan.
    pub price: Decimal,
    pub locked_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub payment_id: Option<Uuid>,
    pub tutor_join: bool,
    pub learner_join: bool,
    pub tutor_evidence: Option<String>,
    pub learner_evidence: Option<String>,
    pub meeting_url: Option<String>,
    pub reminder_sent: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimeRange {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl TimeRange {
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start_time < other.end_time && other.start_time < self.end_time
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReserveSlotsRequest {
    pub plan_id: Uuid,
    pub learner_id: Uuid,

    #[validate(length(min = 1, message = "At least one time range is required"))]
    pub time_ranges: Vec<TimeRange>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PublishSlotsRequest {
    pub tutor_id: Uuid,
    /// Calendar date to materialize, e.g. "2025-01-20".
    pub date: chrono::NaiveDate,
}

/// Either participant reporting they joined the session.
#[derive(Debug, Deserialize, Validate)]
pub struct ConfirmJoinRequest {
    pub slot_id: Uuid,
    pub user_id: Uuid,

    #[validate(url(message = "Evidence must be a valid URL"))]
    pub evidence_url: Option<String>,
}

/// Slot shape handed to the UI; the meeting link only exists once paid for.
#[derive(Debug, Serialize)]
pub struct SlotSummary {
    pub slot_id: Uuid,
    pub tutor_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: SlotStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meeting_url: Option<String>,
}

impl BookingSlot {
    pub fn new_available(
        plan_id: Uuid,
        tutor_id: Uuid,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        price: Decimal,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            plan_id,
            tutor_id,
            learner_id: None,
            start_time,
            end_time,
            status: SlotStatus::Available,
            price,
            locked_at: None,
            expires_at: None,
            payment_id: None,
            tutor_join: false,
            learner_join: false,
            tutor_evidence: None,
            learner_evidence: None,
            meeting_url: None,
            reminder_sent: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn new_locked(
        plan_id: Uuid,
        tutor_id: Uuid,
        learner_id: Uuid,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        price: Decimal,
        payment_id: Option<Uuid>,
        lock_ttl: Duration,
    ) -> Self {
        let mut slot = Self::new_available(plan_id, tutor_id, start_time, end_time, price);
        let now = slot.created_at;
        slot.learner_id = Some(learner_id);
        slot.status = SlotStatus::Locked;
        slot.locked_at = Some(now);
        slot.expires_at = Some(now + lock_ttl);
        slot.payment_id = payment_id;
        slot
    }

    pub fn overlaps(&self, start: &DateTime<Utc>, end: &DateTime<Utc>) -> bool {
        self.start_time < *end && *start < self.end_time
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes()
    }

    /// Reservation claim on a published slot.
    pub fn claim(
        &mut self,
        learner_id: Uuid,
        payment_id: Option<Uuid>,
        lock_ttl: Duration,
    ) -> Result<(), String> {
        if self.status != SlotStatus::Available {
            return Err(format!("slot is {}, not Available", self.status));
        }
        let now = Utc::now();
        self.status = SlotStatus::Locked;
        self.learner_id = Some(learner_id);
        self.locked_at = Some(now);
        self.expires_at = Some(now + lock_ttl);
        self.payment_id = payment_id;
        self.updated_at = now;
        Ok(())
    }

    /// Confirmed webhook outcome; the only way into Paid.
    pub fn mark_paid(&mut self, meeting_url: String, now: DateTime<Utc>) -> Result<(), String> {
        if self.status != SlotStatus::Locked {
            return Err(format!("slot is {}, not Locked", self.status));
        }
        self.status = SlotStatus::Paid;
        self.meeting_url = Some(meeting_url);
        self.expires_at = None;
        self.updated_at = now;
        Ok(())
    }

    /// Approved refund or forced cancellation.
    pub fn reject(&mut self, now: DateTime<Utc>) -> Result<(), String> {
        if self.status != SlotStatus::Paid {
            return Err(format!("slot is {}, not Paid", self.status));
        }
        self.status = SlotStatus::Rejected;
        self.updated_at = now;
        Ok(())
    }

    pub fn is_lock_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == SlotStatus::Locked
            && self.expires_at.map_or(false, |expires| expires < now)
    }

    pub fn to_summary(&self) -> SlotSummary {
        SlotSummary {
            slot_id: self.id,
            tutor_id: self.tutor_id,
            start_time: self.start_time,
            end_time: self.end_time,
            status: self.status,
            meeting_url: if self.status == SlotStatus::Paid {
                self.meeting_url.clone()
            } else {
                None
            },
        }
    }
}
