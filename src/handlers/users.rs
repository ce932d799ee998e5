use actix_web::web::{Data, Json, Path};
use actix_web::{get, post, HttpResponse};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;
use crate::models::common::ApiResponse;
use crate::models::user::{CreateUserRequest, User};
use crate::services::database::DatabaseService;

#[post("/register")]
pub async fn register_user(
    db: Data<DatabaseService>,
    payload: Json<CreateUserRequest>,
) -> Result<HttpResponse, AppError> {
    payload.validate()?;
    let request = payload.into_inner();

    if db.get_user_by_email(&request.email).await?.is_some() {
        return Err(AppError::Conflict(format!(
            "email {} is already registered",
            request.email.to_lowercase()
        )));
    }

    let user = User::new(request.name, request.email, request.role);
    let user = db.create_user(&user).await?;
    Ok(HttpResponse::Created().json(ApiResponse::success(user)))
}

#[get("/{user_id}")]
pub async fn get_user(
    db: Data<DatabaseService>,
    path: Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();
    let user = db
        .get_user(&user_id)
        .await?
        .ok_or_else(|| AppError::not_found("user", user_id))?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(user)))
}
