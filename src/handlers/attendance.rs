use actix_web::web::{Data, Json};
use actix_web::{post, HttpResponse};
use validator::Validate;

use crate::error::AppError;
use crate::models::common::ApiResponse;
use crate::models::refund::FileComplaintRequest;
use crate::models::slot::ConfirmJoinRequest;
use crate::services::attendance::AttendanceService;

#[post("/join-confirmation")]
pub async fn confirm_join(
    attendance: Data<AttendanceService>,
    payload: Json<ConfirmJoinRequest>,
) -> Result<HttpResponse, AppError> {
    payload.validate()?;
    let slot = attendance.confirm_join(payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(slot)))
}

#[post("/complaints")]
pub async fn file_complaint(
    attendance: Data<AttendanceService>,
    payload: Json<FileComplaintRequest>,
) -> Result<HttpResponse, AppError> {
    payload.validate()?;
    let refund = attendance.file_complaint(payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(ApiResponse::success(refund)))
}
