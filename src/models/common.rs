use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            error: None,
        }
    }

    pub fn success_with_message(data: T, message: String) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message),
            error: None,
        }
    }

    pub fn error(error: String) -> Self {
        Self {
            success: false,
            data: None,
            message: None,
            error: Some(error),
        }
    }
}

/// Round a monetary amount to 2 decimal places, half-up.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BankDetails {
    #[validate(custom = "validate_account_number")]
    pub bank_account_number: String,

    #[validate(length(min = 2, max = 100, message = "Owner name must be between 2 and 100 characters"))]
    pub bank_owner_name: String,

    #[validate(length(min = 2, max = 100, message = "Bank name must be between 2 and 100 characters"))]
    pub bank_name: String,
}

pub fn validate_account_number(value: &str) -> Result<(), ValidationError> {
    let re = Regex::new(r"^[0-9]{6,20}$").map_err(|_| ValidationError::new("bank_account_number"))?;
    if re.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::new("bank_account_number"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl Default for PaginationQuery {
    fn default() -> Self {
        Self {
            page: Some(1),
            limit: Some(20),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total: u32,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_money_half_up() {
        assert_eq!(
            round_money(Decimal::new(277_775, 3)), // 277.775
            Decimal::new(277_78, 2)
        );
        assert_eq!(
            round_money(Decimal::new(499_5, 1)), // 499.5
            Decimal::new(499_50, 2)
        );
        assert_eq!(
            round_money(Decimal::new(100_004, 3)), // 100.004
            Decimal::new(100_00, 2)
        );
    }

    #[test]
    fn test_bank_account_number_shape() {
        assert!(validate_account_number("123456789").is_ok());
        assert!(validate_account_number("12345").is_err());
        assert!(validate_account_number("12345678901234567890123").is_err());
        assert!(validate_account_number("12a4567890").is_err());
    }

    #[test]
    fn test_bank_details_validation() {
        let details = BankDetails {
            bank_account_number: "0011223344".to_string(),
            bank_owner_name: "Nguyen Van A".to_string(),
            bank_name: "Vietcombank".to_string(),
        };
        assert!(details.validate().is_ok());

        let bad = BankDetails {
            bank_account_number: "not-a-number".to_string(),
            bank_owner_name: "Nguyen Van A".to_string(),
            bank_name: "Vietcombank".to_string(),
        };
        assert!(bad.validate().is_err());
    }

}
