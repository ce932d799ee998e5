use actix_web::web::{Data, Json, Path};
use actix_web::{delete, get, post, put, HttpResponse};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;
use crate::models::common::ApiResponse;
use crate::models::plan::{CreatePlanRequest, UpdatePlanRequest};
use crate::models::slot::PublishSlotsRequest;
use crate::services::plans::PlanService;

#[post("")]
pub async fn create_plan(
    plans: Data<PlanService>,
    payload: Json<CreatePlanRequest>,
) -> Result<HttpResponse, AppError> {
    payload.validate()?;
    let plan = plans.create_plan(payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(ApiResponse::success(plan)))
}

#[put("/{plan_id}")]
pub async fn update_plan(
    plans: Data<PlanService>,
    path: Path<Uuid>,
    payload: Json<UpdatePlanRequest>,
) -> Result<HttpResponse, AppError> {
    payload.validate()?;
    let plan_id = path.into_inner();
    let plan = plans.update_plan(&plan_id, payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(plan)))
}

#[delete("/{plan_id}")]
pub async fn delete_plan(
    plans: Data<PlanService>,
    path: Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let plan_id = path.into_inner();
    let plan = plans.delete_plan(&plan_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        plan,
        "Plan deleted; future slots were released or escalated".to_string(),
    )))
}

/// Materialize one concrete day of slots from the plan's weekly window.
#[post("/{plan_id}/slots/publish")]
pub async fn publish_slots(
    plans: Data<PlanService>,
    path: Path<Uuid>,
    payload: Json<PublishSlotsRequest>,
) -> Result<HttpResponse, AppError> {
    payload.validate()?;
    let plan_id = path.into_inner();
    let request = payload.into_inner();
    let slots = plans.publish_day(&plan_id, &request.tutor_id, request.date).await?;
    Ok(HttpResponse::Created().json(ApiResponse::success(slots)))
}

#[get("/tutor/{tutor_id}")]
pub async fn get_tutor_plans(
    plans: Data<PlanService>,
    path: Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let tutor_id = path.into_inner();
    let list = plans.list_for_tutor(&tutor_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(list)))
}
