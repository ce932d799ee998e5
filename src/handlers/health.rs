use actix_web::web::Data;
use actix_web::{get, HttpResponse};

use crate::error::AppError;
use crate::services::database::DatabaseService;

#[get("/health")]
pub async fn health(db: Data<DatabaseService>) -> Result<HttpResponse, AppError> {
    db.health_check().await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "status": "ok" })))
}
