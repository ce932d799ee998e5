use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::common::round_money;

/// Ceiling on distinct weekdays a tutor may keep active plans on.
pub const MAX_ACTIVE_DAY_LABELS: usize = 4;
pub const MIN_SLOT_MINUTES: u32 = 15;
pub const MAX_SLOT_MINUTES: u32 = 240;
pub const MINUTES_PER_DAY: u32 = 24 * 60;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DayLabel {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl std::fmt::Display for DayLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            DayLabel::Monday => "MONDAY",
            DayLabel::Tuesday => "TUESDAY",
            DayLabel::Wednesday => "WEDNESDAY",
            DayLabel::Thursday => "THURSDAY",
            DayLabel::Friday => "FRIDAY",
            DayLabel::Saturday => "SATURDAY",
            DayLabel::Sunday => "SUNDAY",
        };
        write!(f, "{}", label)
    }
}

impl From<Weekday> for DayLabel {
    fn from(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Mon => DayLabel::Monday,
            Weekday::Tue => DayLabel::Tuesday,
            Weekday::Wed => DayLabel::Wednesday,
            Weekday::Thu => DayLabel::Thursday,
            Weekday::Fri => DayLabel::Friday,
            Weekday::Sat => DayLabel::Saturday,
            Weekday::Sun => DayLabel::Sunday,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingPlan {
    #[serde(rename = "plan_id")]
    pub id: Uuid,
    pub tutor_id: Uuid,
    pub day_label: DayLabel,
    /// Window bounds as minutes from midnight, half-open `[start_min, end_min)`.
    pub start_min: u32,
    pub end_min: u32,
    pub slot_duration_min: u32,
    pub hourly_price: Decimal,
    pub active: bool,
    pub open: bool,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePlanRequest {
    pub tutor_id: Uuid,
    pub day_label: DayLabel,

    #[validate(range(min = 0, max = 1439))]
    pub start_min: u32,

    #[validate(range(min = 1, max = 1440))]
    pub end_min: u32,

    pub slot_duration_min: u32,
    pub hourly_price: Decimal,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePlanRequest {
    pub day_label: DayLabel,

    #[validate(range(min = 0, max = 1439))]
    pub start_min: u32,

    #[validate(range(min = 1, max = 1440))]
    pub end_min: u32,

    pub slot_duration_min: u32,
    pub hourly_price: Decimal,
    pub open: Option<bool>,
}

/// Pure window rules: ordering, bounds, divisibility. Checked before any
/// state change; the weekly day-label cap is a store-backed check and lives
/// in the plan service.
pub fn validate_window(start_min: u32, end_min: u32, slot_duration_min: u32) -> Result<(), String> {
    if end_min > MINUTES_PER_DAY {
        return Err(format!("window end {} exceeds minutes in a day", end_min));
    }
    if start_min >= end_min {
        return Err(format!(
            "window start {} must be before window end {}",
            start_min, end_min
        ));
    }
    if !(MIN_SLOT_MINUTES..=MAX_SLOT_MINUTES).contains(&slot_duration_min) {
        return Err(format!(
            "slot duration {} must be between {} and {} minutes",
            slot_duration_min, MIN_SLOT_MINUTES, MAX_SLOT_MINUTES
        ));
    }
    if (end_min - start_min) % slot_duration_min != 0 {
        return Err(format!(
            "window length {} is not divisible by slot duration {}",
            end_min - start_min,
            slot_duration_min
        ));
    }
    Ok(())
}

pub fn minute_of_day(t: &DateTime<Utc>) -> u32 {
    t.hour() * 60 + t.minute()
}

impl BookingPlan {
    pub fn new(request: CreatePlanRequest) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tutor_id: request.tutor_id,
            day_label: request.day_label,
            start_min: request.start_min,
            end_min: request.end_min,
            slot_duration_min: request.slot_duration_min,
            hourly_price: request.hourly_price,
            active: true,
            open: true,
            deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply_update(&mut self, request: &UpdatePlanRequest) {
        self.day_label = request.day_label;
        self.start_min = request.start_min;
        self.end_min = request.end_min;
        self.slot_duration_min = request.slot_duration_min;
        self.hourly_price = request.hourly_price;
        if let Some(open) = request.open {
            self.open = open;
        }
        self.updated_at = Utc::now();
    }

    pub fn soft_delete(&mut self) {
        self.deleted = true;
        self.active = false;
        self.open = false;
        self.updated_at = Utc::now();
    }

    pub fn is_bookable(&self) -> bool {
        self.active && self.open && !self.deleted
    }

    /// Same weekday and overlapping `[start_min, end_min)` windows.
    pub fn window_overlaps(&self, other: &BookingPlan) -> bool {
        self.day_label == other.day_label
            && self.start_min < other.end_min
            && other.start_min < self.end_min
    }

    /// Whether `[start, end)` is a valid slot of this plan: right weekday,
    /// inside the window, exactly one slot long, aligned to the slot grid.
    pub fn fits_range(&self, start: &DateTime<Utc>, end: &DateTime<Utc>) -> bool {
        if start.date_naive() != end.date_naive() {
            return false;
        }
        if start.second() != 0 || start.nanosecond() != 0 || end.second() != 0 || end.nanosecond() != 0 {
            return false;
        }
        if DayLabel::from(start.weekday()) != self.day_label {
            return false;
        }

        let start_min = minute_of_day(start);
        let end_min = minute_of_day(end);
        if end_min <= start_min {
            return false;
        }

        start_min >= self.start_min
            && end_min <= self.end_min
            && end_min - start_min == self.slot_duration_min
            && (start_min - self.start_min) % self.slot_duration_min == 0
    }

    pub fn price_for_minutes(&self, minutes: i64) -> Decimal {
        round_money(self.hourly_price * Decimal::from(minutes) / Decimal::from(60))
    }

    /// Price of one full slot of this plan.
    pub fn slot_price(&self) -> Decimal {
        self.price_for_minutes(self.slot_duration_min as i64)
    }
}
