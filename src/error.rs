use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::common::ApiResponse;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid state: {0}")]
    State(String),

    #[error("forbidden: {0}")]
    Authorization(String),

    #[error("{0} not found: {1}")]
    NotFound(&'static str, String),

    #[error("payment gateway error: {0}")]
    Gateway(String),

    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance {
        requested: Decimal,
        available: Decimal,
    },

    #[error(transparent)]
    Database(#[from] anyhow::Error),
}

impl AppError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        AppError::NotFound(entity, id.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

impl actix_web::ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) | AppError::State(_) => StatusCode::CONFLICT,
            AppError::Authorization(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_, _) => StatusCode::NOT_FOUND,
            AppError::Gateway(_) => StatusCode::BAD_GATEWAY,
            AppError::InsufficientBalance { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            // Storage errors carry internals; log them and answer generically.
            AppError::Database(e) => {
                log::error!("database error: {:#}", e);
                "internal error".to_string()
            }
            other => other.to_string(),
        };

        HttpResponse::build(self.status_code()).json(ApiResponse::<()>::error(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::ResponseError;

    #[test]
    fn test_status_code_mapping() {
        assert_eq!(
            AppError::Validation("bad".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Conflict("slot unavailable".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Authorization("not the owner".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::not_found("payment", "abc").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Gateway("timeout".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::InsufficientBalance {
                requested: Decimal::new(150_000_00, 2),
                available: Decimal::new(100_000_00, 2),
            }
            .status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_insufficient_balance_message() {
        let err = AppError::InsufficientBalance {
            requested: Decimal::new(150_000_00, 2),
            available: Decimal::new(100_000_00, 2),
        };
        let text = err.to_string();
        assert!(text.contains("150000.00"));
        assert!(text.contains("100000.00"));
    }
}
