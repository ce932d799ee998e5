use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::CommissionConfig;
use crate::models::payment::PaymentKind;

/// Immutable view of the commission schedule at one version. Reconciliation
/// reads a snapshot once and freezes its rate into the payment row, so later
/// schedule changes never move settled money.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CommissionSnapshot {
    pub version: u32,
    pub course_rate: Decimal,
    pub booking_rate: Decimal,
}

impl CommissionSnapshot {
    pub fn rate_for(&self, kind: PaymentKind) -> Decimal {
        match kind {
            PaymentKind::Course => self.course_rate,
            PaymentKind::Booking => self.booking_rate,
        }
    }
}

#[derive(Clone)]
pub struct SettingsStore {
    current: Arc<RwLock<CommissionSnapshot>>,
}

impl SettingsStore {
    pub fn new(config: &CommissionConfig) -> Self {
        Self {
            current: Arc::new(RwLock::new(CommissionSnapshot {
                version: config.version,
                course_rate: config.course_rate,
                booking_rate: config.booking_rate,
            })),
        }
    }

    pub async fn snapshot(&self) -> CommissionSnapshot {
        *self.current.read().await
    }

    /// Installs a new schedule under the next version number. Rows settled
    /// under earlier versions keep their frozen rates.
    pub async fn replace(&self, course_rate: Decimal, booking_rate: Decimal) -> CommissionSnapshot {
        let mut current = self.current.write().await;
        *current = CommissionSnapshot {
            version: current.version + 1,
            course_rate,
            booking_rate,
        };
        log::info!(
            "Commission schedule replaced: version {} (course {}, booking {})",
            current.version,
            current.course_rate,
            current.booking_rate
        );
        *current
    }
}
