use actix_web::web::{Data, Json, Path, Query};
use actix_web::{get, post, HttpResponse};
use bytes::Bytes;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;
use crate::models::common::{ApiResponse, PaginationQuery};
use crate::models::payment::{CreatePaymentRequest, WebhookPayload};
use crate::services::gateway::PayLinkService;
use crate::services::payments::PaymentService;

#[derive(Debug, Deserialize)]
pub struct CancelPaymentRequest {
    pub user_id: Uuid,
}

#[post("/initiate")]
pub async fn initiate_payment(
    payments: Data<PaymentService>,
    payload: Json<CreatePaymentRequest>,
) -> Result<HttpResponse, AppError> {
    payload.validate()?;
    let checkout = payments.create_payment(payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(ApiResponse::success(checkout)))
}

#[post("/{payment_id}/cancel")]
pub async fn cancel_payment(
    payments: Data<PaymentService>,
    path: Path<Uuid>,
    payload: Json<CancelPaymentRequest>,
) -> Result<HttpResponse, AppError> {
    let payment_id = path.into_inner();
    let payment = payments.cancel_payment(&payload.user_id, &payment_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(payment)))
}

#[get("/user/{user_id}")]
pub async fn get_user_payments(
    payments: Data<PaymentService>,
    path: Path<Uuid>,
    pagination: Query<PaginationQuery>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();
    let page = payments
        .list_for_user(&user_id, Some(pagination.into_inner()))
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(page)))
}

#[get("/{payment_id}")]
pub async fn get_payment(
    payments: Data<PaymentService>,
    path: Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let payment_id = path.into_inner();
    let payment = payments.get_payment(&payment_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(payment)))
}

/// Gateway callback. Always answers 200 regardless of outcome so the gateway
/// stops retrying; reconciliation is idempotent, so replays are harmless.
#[post("/webhook")]
pub async fn payment_webhook(
    payments: Data<PaymentService>,
    gateway: Data<PayLinkService>,
    body: Bytes,
) -> HttpResponse {
    let raw = String::from_utf8_lossy(&body);
    log::info!("Payment webhook received: {}", raw);

    let payload = match WebhookPayload::parse(&raw) {
        Ok(payload) => payload,
        Err(e) => {
            log::warn!("Unparseable webhook body, ignoring: {}", e);
            return HttpResponse::Ok().json(serde_json::json!({ "received": true }));
        }
    };

    if let Some(data) = WebhookPayload::data_object(&raw) {
        if !gateway.verify_webhook_signature(&data, &payload.signature) {
            log::warn!(
                "Webhook signature mismatch for order {}, ignoring",
                payload.data.order_code
            );
            return HttpResponse::Ok().json(serde_json::json!({ "received": true }));
        }
    }

    if let Err(e) = payments
        .reconcile(payload.data.order_code, &payload.data.code)
        .await
    {
        log::error!(
            "Webhook reconciliation failed for order {}: {}",
            payload.data.order_code,
            e
        );
    }

    HttpResponse::Ok().json(serde_json::json!({ "received": true }))
}
