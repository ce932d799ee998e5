use actix_web::web::{Data, Json, Path};
use actix_web::{get, post, HttpResponse};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;
use crate::models::common::ApiResponse;
use crate::models::slot::ReserveSlotsRequest;
use crate::services::plans::PlanService;
use crate::services::slots::SlotService;

/// Reserve slots directly, without a payment attached. The locks still expire
/// on the usual TTL if nothing settles them.
#[post("/reserve")]
pub async fn reserve_slots(
    slots: Data<SlotService>,
    plans: Data<PlanService>,
    payload: Json<ReserveSlotsRequest>,
) -> Result<HttpResponse, AppError> {
    payload.validate()?;
    let request = payload.into_inner();
    let plan = plans.get_plan(&request.plan_id).await?;
    let reserved = slots
        .reserve_slots(&plan, request.learner_id, &request.time_ranges, None)
        .await?;
    Ok(HttpResponse::Created().json(ApiResponse::success(reserved)))
}

#[get("/tutor/{tutor_id}")]
pub async fn get_tutor_slots(
    slots: Data<SlotService>,
    path: Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let tutor_id = path.into_inner();
    let summaries = slots.tutor_slot_summaries(&tutor_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(summaries)))
}

#[get("/{slot_id}")]
pub async fn get_slot(
    slots: Data<SlotService>,
    path: Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let slot_id = path.into_inner();
    let slot = slots.get_slot(&slot_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(slot)))
}
