use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::common::BankDetails;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum WithdrawStatus {
    Pending,
    Approved,
    Rejected,
}

impl std::fmt::Display for WithdrawStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WithdrawStatus::Pending => write!(f, "Pending"),
            WithdrawStatus::Approved => write!(f, "Approved"),
            WithdrawStatus::Rejected => write!(f, "Rejected"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawMoney {
    #[serde(rename = "withdraw_id")]
    pub id: Uuid,
    pub tutor_id: Uuid,
    pub amount: Decimal,
    /// Balance at request time. Display only; approval re-validates against
    /// the live balance.
    pub total_balance: Decimal,
    pub bank_account_number: String,
    pub bank_owner_name: String,
    pub bank_name: String,
    pub status: WithdrawStatus,
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RequestWithdrawRequest {
    pub tutor_id: Uuid,
    pub amount: Decimal,

    #[validate]
    pub bank: BankDetails,
}

#[derive(Debug, Serialize)]
pub struct WithdrawResponse {
    pub withdraw_id: Uuid,
    pub status: WithdrawStatus,
    pub amount: Decimal,
    pub total_balance: Decimal,
}

#[derive(Debug, Serialize)]
pub struct WalletBalance {
    pub tutor_id: Uuid,
    pub net_income: Decimal,
    pub withdrawn: Decimal,
    pub current_balance: Decimal,
}

impl WithdrawMoney {
    pub fn new(tutor_id: Uuid, amount: Decimal, total_balance: Decimal, bank: BankDetails) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tutor_id,
            amount,
            total_balance,
            bank_account_number: bank.bank_account_number,
            bank_owner_name: bank.bank_owner_name,
            bank_name: bank.bank_name,
            status: WithdrawStatus::Pending,
            decided_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn approve(&mut self, now: DateTime<Utc>) -> Result<(), String> {
        if self.status != WithdrawStatus::Pending {
            return Err(format!("withdrawal is {}, not Pending", self.status));
        }
        self.status = WithdrawStatus::Approved;
        self.decided_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    pub fn reject(&mut self, now: DateTime<Utc>) -> Result<(), String> {
        if self.status != WithdrawStatus::Pending {
            return Err(format!("withdrawal is {}, not Pending", self.status));
        }
        self.status = WithdrawStatus::Rejected;
        self.decided_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    pub fn to_response(&self) -> WithdrawResponse {
        WithdrawResponse {
            withdraw_id: self.id,
            status: self.status,
            amount: self.amount,
            total_balance: self.total_balance,
        }
    }
}
