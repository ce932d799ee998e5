use actix_web::web::{Data, Json, Path};
use actix_web::{get, post, HttpResponse};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;
use crate::models::common::ApiResponse;
use crate::models::withdraw::RequestWithdrawRequest;
use crate::services::wallet::WalletService;

#[post("/withdrawals")]
pub async fn request_withdraw(
    wallet: Data<WalletService>,
    payload: Json<RequestWithdrawRequest>,
) -> Result<HttpResponse, AppError> {
    payload.validate()?;
    let withdraw = wallet.request_withdraw(payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(ApiResponse::success(withdraw.to_response())))
}

#[get("/withdrawals/tutor/{tutor_id}")]
pub async fn get_tutor_withdrawals(
    wallet: Data<WalletService>,
    path: Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let tutor_id = path.into_inner();
    let list = wallet.list_withdrawals(&tutor_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(list)))
}

#[post("/withdrawals/{withdraw_id}/approve")]
pub async fn approve_withdraw(
    wallet: Data<WalletService>,
    path: Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let withdraw_id = path.into_inner();
    let withdraw = wallet.approve_withdraw(&withdraw_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(withdraw.to_response())))
}

#[post("/withdrawals/{withdraw_id}/reject")]
pub async fn reject_withdraw(
    wallet: Data<WalletService>,
    path: Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let withdraw_id = path.into_inner();
    let withdraw = wallet.reject_withdraw(&withdraw_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(withdraw.to_response())))
}

/// Derived on demand from settled payments and approved withdrawals; there is
/// no stored balance to drift.
#[get("/{tutor_id}")]
pub async fn get_balance(
    wallet: Data<WalletService>,
    path: Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let tutor_id = path.into_inner();
    let balance = wallet.balance(&tutor_id, Utc::now()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(balance)))
}
