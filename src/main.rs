mod config;
mod error;
mod handlers;
mod models;
mod services;
mod tasks;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use std::env;

use services::{
    attendance::AttendanceService, database::DatabaseService, gateway::PayLinkService,
    locks::KeyedLocks, notifier::NotificationService, payments::PaymentService,
    plans::PlanService, refunds::RefundService, settings::SettingsStore, slots::SlotService,
    wallet::WalletService,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = config::Config::from_env().expect("Failed to load configuration");

    let database_service = DatabaseService::new(&config.database_url)
        .await
        .expect("Failed to initialize database");

    // One lock set shared by everything that serializes per tutor.
    let locks = KeyedLocks::new();
    let notifier = NotificationService::new(database_service.clone());
    let settings = SettingsStore::new(&config.commission);
    let gateway = PayLinkService::new(config.gateway.clone());
    let slot_service = SlotService::new(database_service.clone(), locks.clone(), config.app.clone());
    let payment_service = PaymentService::new(
        database_service.clone(),
        gateway.clone(),
        settings.clone(),
        slot_service.clone(),
        notifier.clone(),
        config.app.clone(),
    );
    let attendance_service = AttendanceService::new(
        database_service.clone(),
        notifier.clone(),
        config.app.clone(),
    );
    let wallet_service = WalletService::new(
        database_service.clone(),
        notifier.clone(),
        locks.clone(),
        settings.clone(),
    );
    let refund_service = RefundService::new(
        database_service.clone(),
        wallet_service.clone(),
        notifier.clone(),
        locks,
    );
    let plan_service = PlanService::new(
        database_service.clone(),
        slot_service.clone(),
        payment_service.clone(),
        refund_service.clone(),
    );

    tasks::spawn_sweepers(
        config.scheduler.clone(),
        slot_service.clone(),
        attendance_service.clone(),
    );

    let port = env::var("PORT").unwrap_or_else(|_| "8080".to_string());
    let bind_address = format!("0.0.0.0:{}", port);

    println!("🚀 Starting Tutor Booking & Settlement Server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .supports_credentials(),
            )
            .app_data(web::Data::new(database_service.clone()))
            .app_data(web::Data::new(gateway.clone()))
            .app_data(web::Data::new(notifier.clone()))
            .app_data(web::Data::new(slot_service.clone()))
            .app_data(web::Data::new(payment_service.clone()))
            .app_data(web::Data::new(attendance_service.clone()))
            .app_data(web::Data::new(wallet_service.clone()))
            .app_data(web::Data::new(refund_service.clone()))
            .app_data(web::Data::new(plan_service.clone()))
            .service(
                web::scope("/api/v1")
                    // Availability plans
                    .service(
                        web::scope("/plans")
                            .service(handlers::plans::create_plan)
                            .service(handlers::plans::get_tutor_plans)
                            .service(handlers::plans::publish_slots)
                            .service(handlers::plans::update_plan)
                            .service(handlers::plans::delete_plan),
                    )
                    // Booking slots
                    .service(
                        web::scope("/slots")
                            .service(handlers::slots::reserve_slots)
                            .service(handlers::slots::get_tutor_slots)
                            .service(handlers::slots::get_slot),
                    )
                    // Payment handling
                    .service(
                        web::scope("/payments")
                            .service(handlers::payments::initiate_payment)
                            .service(handlers::payments::payment_webhook)
                            .service(handlers::payments::get_user_payments)
                            .service(handlers::payments::cancel_payment)
                            .service(handlers::payments::get_payment),
                    )
                    // Attendance and complaints
                    .service(
                        web::scope("/attendance")
                            .service(handlers::attendance::confirm_join)
                            .service(handlers::attendance::file_complaint),
                    )
                    // Refund workflow
                    .service(
                        web::scope("/refunds")
                            .service(handlers::refunds::get_learner_refunds)
                            .service(handlers::refunds::submit_payout_info)
                            .service(handlers::refunds::approve_refund)
                            .service(handlers::refunds::reject_refund)
                            .service(handlers::refunds::get_refund),
                    )
                    // Tutor wallet
                    .service(
                        web::scope("/wallet")
                            .service(handlers::wallet::request_withdraw)
                            .service(handlers::wallet::get_tutor_withdrawals)
                            .service(handlers::wallet::approve_withdraw)
                            .service(handlers::wallet::reject_withdraw)
                            .service(handlers::wallet::get_balance),
                    )
                    // Notifications
                    .service(
                        web::scope("/notifications")
                            .service(handlers::notifications::get_notifications)
                            .service(handlers::notifications::acknowledge_notification),
                    )
                    // User management
                    .service(
                        web::scope("/users")
                            .service(handlers::users::register_user)
                            .service(handlers::users::get_user),
                    )
                    // Health check
                    .service(handlers::health::health),
            )
    })
    .bind(&bind_address)?
    .run()
    .await
}
