use actix_web::web::{Data, Path};
use actix_web::{get, post, HttpResponse};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::common::ApiResponse;
use crate::services::notifier::NotificationService;

#[get("/user/{user_id}")]
pub async fn get_notifications(
    notifier: Data<NotificationService>,
    path: Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();
    let notifications = notifier.list_for_user(&user_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(notifications)))
}

#[post("/{notification_id}/acknowledge")]
pub async fn acknowledge_notification(
    notifier: Data<NotificationService>,
    path: Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let notification_id = path.into_inner();
    let notification = notifier
        .acknowledge(&notification_id)
        .await?
        .ok_or_else(|| AppError::not_found("notification", notification_id))?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(notification)))
}
