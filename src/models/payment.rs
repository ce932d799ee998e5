use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use validator::Validate;

use crate::models::common::round_money;
use crate::models::slot::TimeRange;

/// Gateway data code reported for a settled checkout.
pub const GATEWAY_SUCCESS_CODE: &str = "00";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Cancelled,
}

impl PaymentStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }

    pub fn from_gateway_code(code: &str) -> Self {
        if code == GATEWAY_SUCCESS_CODE {
            PaymentStatus::Paid
        } else {
            PaymentStatus::Failed
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "Pending"),
            PaymentStatus::Paid => write!(f, "Paid"),
            PaymentStatus::Failed => write!(f, "Failed"),
            PaymentStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PaymentKind {
    Booking,
    Course,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    #[serde(rename = "payment_id")]
    pub id: Uuid,
    pub user_id: Uuid,
    pub tutor_id: Uuid,
    pub kind: PaymentKind,
    pub plan_id: Option<Uuid>,
    pub course_id: Option<Uuid>,
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub order_code: i64,
    pub checkout_url: Option<String>,
    pub qr_code_url: Option<String>,
    pub payment_link_id: Option<String>,
    /// Commission snapshot, frozen exactly once at the first successful
    /// reconciliation and never recomputed afterward.
    pub net_amount: Option<Decimal>,
    pub commission_rate: Option<Decimal>,
    pub description: String,
    pub paid_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePaymentRequest {
    pub user_id: Uuid,
    pub kind: PaymentKind,

    /// Booking payments: the plan being booked plus the requested ranges.
    pub plan_id: Option<Uuid>,
    pub time_ranges: Option<Vec<TimeRange>>,

    /// Course payments: the course, its tutor and the catalog price.
    pub course_id: Option<Uuid>,
    pub tutor_id: Option<Uuid>,
    pub amount: Option<Decimal>,

    #[validate(length(max = 200, message = "Description must be at most 200 characters"))]
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub payment_id: Uuid,
    pub order_code: i64,
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub checkout_url: Option<String>,
    pub qr_code_url: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub slot_ids: Vec<Uuid>,
}

/// Webhook body the gateway posts: an outer result envelope, a `data` object
/// describing the checkout, and an HMAC signature over `data`.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    pub code: String,
    pub desc: String,
    #[serde(default)]
    pub success: bool,
    pub data: WebhookData,
    #[serde(default)]
    pub signature: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookData {
    pub order_code: i64,
    pub code: String,
    pub desc: String,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub payment_link_id: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub transaction_date_time: Option<String>,
}

/// Created by a successful Course reconciliation; the payment's one
/// downstream enrollment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enrollment {
    #[serde(rename = "enrollment_id")]
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub payment_id: Uuid,
    pub enrolled_at: DateTime<Utc>,
}

impl Enrollment {
    pub fn new(user_id: Uuid, course_id: Uuid, payment_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            course_id,
            payment_id,
            enrolled_at: Utc::now(),
        }
    }
}

impl Payment {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_id: Uuid,
        tutor_id: Uuid,
        kind: PaymentKind,
        plan_id: Option<Uuid>,
        course_id: Option<Uuid>,
        amount: Decimal,
        description: String,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            tutor_id,
            kind,
            plan_id,
            course_id,
            amount,
            status: PaymentStatus::Pending,
            order_code: generate_order_code(),
            checkout_url: None,
            qr_code_url: None,
            payment_link_id: None,
            net_amount: None,
            commission_rate: None,
            description,
            paid_at: None,
            expires_at,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn set_link(
        &mut self,
        checkout_url: String,
        qr_code_url: Option<String>,
        payment_link_id: Option<String>,
        expires_at: Option<DateTime<Utc>>,
    ) {
        self.checkout_url = Some(checkout_url);
        self.qr_code_url = qr_code_url;
        self.payment_link_id = payment_link_id;
        if expires_at.is_some() {
            self.expires_at = expires_at;
        }
        self.updated_at = Utc::now();
    }

    /// Flip to Paid and freeze the commission snapshot. Freezing happens at
    /// most once; a second call with the snapshot already set keeps it.
    pub fn mark_paid(&mut self, commission_rate: Decimal, now: DateTime<Utc>) -> Result<(), String> {
        if self.status != PaymentStatus::Pending {
            return Err(format!("payment is {}, not Pending", self.status));
        }
        self.status = PaymentStatus::Paid;
        self.paid_at = Some(now);
        if self.net_amount.is_none() {
            self.commission_rate = Some(commission_rate);
            self.net_amount = Some(net_of_commission(self.amount, commission_rate));
        }
        self.updated_at = now;
        Ok(())
    }

    pub fn mark_failed(&mut self, now: DateTime<Utc>) -> Result<(), String> {
        if self.status != PaymentStatus::Pending {
            return Err(format!("payment is {}, not Pending", self.status));
        }
        self.status = PaymentStatus::Failed;
        self.updated_at = now;
        Ok(())
    }

    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<(), String> {
        match self.status {
            PaymentStatus::Cancelled => Ok(()), // idempotent
            PaymentStatus::Pending => {
                self.status = PaymentStatus::Cancelled;
                self.updated_at = now;
                Ok(())
            }
            other => Err(format!("payment is {}, cannot cancel", other)),
        }
    }

    pub fn to_checkout_response(&self, slot_ids: Vec<Uuid>) -> CheckoutResponse {
        CheckoutResponse {
            payment_id: self.id,
            order_code: self.order_code,
            amount: self.amount,
            status: self.status,
            checkout_url: self.checkout_url.clone(),
            qr_code_url: self.qr_code_url.clone(),
            expires_at: self.expires_at,
            slot_ids,
        }
    }
}

pub fn net_of_commission(amount: Decimal, commission_rate: Decimal) -> Decimal {
    round_money(amount * (Decimal::ONE - commission_rate))
}

/// Merchant-side order code the gateway echoes back in webhooks. Millisecond
/// timestamp with a random 3-digit suffix keeps it unique and sortable while
/// staying inside the gateway's 53-bit integer bound.
pub fn generate_order_code() -> i64 {
    let suffix = (Uuid::new_v4().as_u128() % 1000) as i64;
    Utc::now().timestamp_millis() * 1000 + suffix
}

impl WebhookPayload {
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// The `data` object as a JSON map, for signature verification against
    /// exactly the fields the gateway signed.
    pub fn data_object(raw: &str) -> Option<serde_json::Map<String, Value>> {
        let value: Value = serde_json::from_str(raw).ok()?;
        value.get("data")?.as_object().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_payment(amount: Decimal) -> Payment {
        Payment::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            PaymentKind::Booking,
            Some(Uuid::new_v4()),
            None,
            amount,
            "1-hour session".to_string(),
            None,
        )
    }

    #[test]
    fn test_status_from_gateway_code() {
        assert_eq!(PaymentStatus::from_gateway_code("00"), PaymentStatus::Paid);
        assert_eq!(PaymentStatus::from_gateway_code("01"), PaymentStatus::Failed);
        assert_eq!(PaymentStatus::from_gateway_code("231"), PaymentStatus::Failed);
    }

    #[test]
    fn test_snapshot_frozen_once() {
        let mut payment = test_payment(Decimal::new(200_000, 0));
        payment
            .mark_paid(Decimal::new(15, 2), Utc::now())
            .unwrap();

        assert_eq!(payment.net_amount, Some(Decimal::new(170_000_00, 2)));
        assert_eq!(payment.commission_rate, Some(Decimal::new(15, 2)));

        // A rate change after the fact never touches the frozen snapshot.
        assert!(payment.mark_paid(Decimal::new(50, 2), Utc::now()).is_err());
        assert_eq!(payment.net_amount, Some(Decimal::new(170_000_00, 2)));
    }

    #[test]
    fn test_cancel_is_idempotent_and_terminal() {
        let mut payment = test_payment(Decimal::new(100_000, 0));
        payment.cancel(Utc::now()).unwrap();
        assert_eq!(payment.status, PaymentStatus::Cancelled);
        payment.cancel(Utc::now()).unwrap(); // no-op

        // A late success can no longer flip it.
        assert!(payment.mark_paid(Decimal::new(15, 2), Utc::now()).is_err());
        assert_eq!(payment.status, PaymentStatus::Cancelled);
    }

    #[test]
    fn test_order_codes_stay_in_gateway_bounds() {
        for _ in 0..32 {
            let code = generate_order_code();
            assert!(code > 0);
            assert!(code < (1 << 53));
        }
    }

    #[test]
    fn test_webhook_payload_parsing() {
        let raw = r#"{
            "code": "00",
            "desc": "success",
            "success": true,
            "data": {
                "orderCode": 1737367200123456,
                "code": "00",
                "desc": "Thành công",
                "amount": 200000,
                "paymentLinkId": "abcdef123456",
                "reference": "FT123"
            },
            "signature": "deadbeef"
        }"#;

        let payload = WebhookPayload::parse(raw).unwrap();
        assert_eq!(payload.data.order_code, 1737367200123456);
        assert_eq!(payload.data.code, "00");
        assert_eq!(payload.data.payment_link_id.as_deref(), Some("abcdef123456"));

        let data = WebhookPayload::data_object(raw).unwrap();
        assert!(data.contains_key("orderCode"));
        assert!(data.contains_key("reference"));
    }
}
