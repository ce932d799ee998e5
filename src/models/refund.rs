use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::common::BankDetails;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RefundStatus {
    Pending,
    Submitted,
    Approved,
    Rejected,
}

impl RefundStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RefundStatus::Approved | RefundStatus::Rejected)
    }

    /// Open cases block a second refund on the same slot.
    pub fn is_open(&self) -> bool {
        matches!(self, RefundStatus::Pending | RefundStatus::Submitted)
    }
}

impl std::fmt::Display for RefundStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefundStatus::Pending => write!(f, "Pending"),
            RefundStatus::Submitted => write!(f, "Submitted"),
            RefundStatus::Approved => write!(f, "Approved"),
            RefundStatus::Rejected => write!(f, "Rejected"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RefundKind {
    Complaint,
    TutorReschedule,
    PlanDeletion,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundRequest {
    #[serde(rename = "refund_id")]
    pub id: Uuid,
    pub kind: RefundKind,
    pub status: RefundStatus,
    pub slot_id: Option<Uuid>,
    pub plan_id: Option<Uuid>,
    pub payment_id: Option<Uuid>,
    pub learner_id: Uuid,
    pub tutor_id: Uuid,
    pub amount: Decimal,
    pub reason: String,
    pub evidence_url: Option<String>,
    /// Tri-state: None until the tutor responds (or the non-response sweep
    /// decides for them).
    pub tutor_attend: Option<bool>,
    pub tutor_responded_at: Option<DateTime<Utc>>,
    pub bank_account_number: Option<String>,
    pub bank_owner_name: Option<String>,
    pub bank_name: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct FileComplaintRequest {
    pub learner_id: Uuid,
    pub slot_id: Uuid,

    #[validate(length(min = 5, max = 1000, message = "Reason must be between 5 and 1000 characters"))]
    pub reason: String,

    #[validate(url(message = "Evidence must be a valid URL"))]
    pub evidence_url: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitPayoutInfoRequest {
    pub learner_id: Uuid,

    #[validate]
    pub bank: BankDetails,
}

impl RefundRequest {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        kind: RefundKind,
        slot_id: Option<Uuid>,
        plan_id: Option<Uuid>,
        payment_id: Option<Uuid>,
        learner_id: Uuid,
        tutor_id: Uuid,
        amount: Decimal,
        reason: String,
        evidence_url: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            kind,
            status: RefundStatus::Pending,
            slot_id,
            plan_id,
            payment_id,
            learner_id,
            tutor_id,
            amount,
            reason,
            evidence_url,
            tutor_attend: None,
            tutor_responded_at: None,
            bank_account_number: None,
            bank_owner_name: None,
            bank_name: None,
            decided_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Learner supplies payout details; Pending → Submitted.
    pub fn submit(&mut self, bank: BankDetails) -> Result<(), String> {
        if self.status != RefundStatus::Pending {
            return Err(format!("refund is {}, not Pending", self.status));
        }
        self.status = RefundStatus::Submitted;
        self.bank_account_number = Some(bank.bank_account_number);
        self.bank_owner_name = Some(bank.bank_owner_name);
        self.bank_name = Some(bank.bank_name);
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn approve(&mut self, now: DateTime<Utc>) -> Result<(), String> {
        if self.status != RefundStatus::Submitted {
            return Err(format!("refund is {}, payout details not submitted", self.status));
        }
        self.status = RefundStatus::Approved;
        self.decided_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    pub fn reject(&mut self, now: DateTime<Utc>) -> Result<(), String> {
        if self.status.is_terminal() {
            return Err(format!("refund is already {}", self.status));
        }
        self.status = RefundStatus::Rejected;
        self.decided_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    pub fn record_tutor_attendance(&mut self, attended: bool, now: DateTime<Utc>) {
        self.tutor_attend = Some(attended);
        self.tutor_responded_at = Some(now);
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_refund() -> RefundRequest {
        RefundRequest::new(
            RefundKind::Complaint,
            Some(Uuid::new_v4()),
            None,
            Some(Uuid::new_v4()),
            Uuid::new_v4(),
            Uuid::new_v4(),
            Decimal::new(200_000_00, 2),
            "tutor never joined".to_string(),
            None,
        )
    }

    fn test_bank() -> BankDetails {
        BankDetails {
            bank_account_number: "0011223344".to_string(),
            bank_owner_name: "Nguyen Van A".to_string(),
            bank_name: "Vietcombank".to_string(),
        }
    }

    #[test]
    fn test_full_workflow() {
        let mut refund = test_refund();
        assert_eq!(refund.status, RefundStatus::Pending);
        assert!(refund.status.is_open());

        // Approval needs payout details first.
        assert!(refund.approve(Utc::now()).is_err());

        refund.submit(test_bank()).unwrap();
        assert_eq!(refund.status, RefundStatus::Submitted);
        assert!(refund.bank_account_number.is_some());

        // Submitting twice fails.
        assert!(refund.submit(test_bank()).is_err());

        refund.approve(Utc::now()).unwrap();
        assert_eq!(refund.status, RefundStatus::Approved);
        assert!(refund.decided_at.is_some());
        assert!(refund.status.is_terminal());

        // Decisions are final.
        assert!(refund.reject(Utc::now()).is_err());
    }

    #[test]
    fn test_reject_from_pending() {
        let mut refund = test_refund();
        refund.reject(Utc::now()).unwrap();
        assert_eq!(refund.status, RefundStatus::Rejected);
        assert!(!refund.status.is_open());
    }

    #[test]
    fn test_tutor_attendance_tri_state() {
        let mut refund = test_refund();
        assert_eq!(refund.tutor_attend, None);

        refund.record_tutor_attendance(false, Utc::now());
        assert_eq!(refund.tutor_attend, Some(false));
        assert!(refund.tutor_responded_at.is_some());
    }
}
