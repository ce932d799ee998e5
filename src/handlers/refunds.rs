use actix_web::web::{Data, Json, Path};
use actix_web::{get, post, HttpResponse};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;
use crate::models::common::ApiResponse;
use crate::models::refund::SubmitPayoutInfoRequest;
use crate::services::refunds::RefundService;

#[get("/{refund_id}")]
pub async fn get_refund(
    refunds: Data<RefundService>,
    path: Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let refund_id = path.into_inner();
    let refund = refunds.get_refund(&refund_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(refund)))
}

#[post("/{refund_id}/payout-info")]
pub async fn submit_payout_info(
    refunds: Data<RefundService>,
    path: Path<Uuid>,
    payload: Json<SubmitPayoutInfoRequest>,
) -> Result<HttpResponse, AppError> {
    payload.validate()?;
    let refund_id = path.into_inner();
    let refund = refunds
        .submit_payout_info(&refund_id, payload.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(refund)))
}

#[post("/{refund_id}/approve")]
pub async fn approve_refund(
    refunds: Data<RefundService>,
    path: Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let refund_id = path.into_inner();
    let refund = refunds.approve(&refund_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(refund)))
}

#[post("/{refund_id}/reject")]
pub async fn reject_refund(
    refunds: Data<RefundService>,
    path: Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let refund_id = path.into_inner();
    let refund = refunds.reject(&refund_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(refund)))
}

#[get("/learner/{learner_id}")]
pub async fn get_learner_refunds(
    refunds: Data<RefundService>,
    path: Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let learner_id = path.into_inner();
    let list = refunds.list_for_learner(&learner_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(list)))
}
