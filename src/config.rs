use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub gateway: GatewayConfig,
    pub commission: CommissionConfig,
    pub scheduler: SchedulerConfig,
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub base_url: String,
    pub client_id: String,
    pub api_key: String,
    pub checksum_key: String,
    pub return_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommissionConfig {
    pub version: u32,
    pub course_rate: Decimal,
    pub booking_rate: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub lock_sweep_secs: u64,
    pub attendance_sweep_secs: u64,
    pub complaint_sweep_secs: u64,
    pub reminder_sweep_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub lock_ttl_minutes: i64,
    pub reminder_window_minutes: i64,
    pub complaint_response_hours: i64,
    pub meeting_base_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Config {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "memory://".to_string()),

            gateway: GatewayConfig {
                base_url: env::var("GATEWAY_BASE_URL")
                    .unwrap_or_else(|_| "https://api-merchant.paylink.vn".to_string()),
                client_id: env::var("GATEWAY_CLIENT_ID").unwrap_or_default(),
                api_key: env::var("GATEWAY_API_KEY").unwrap_or_default(),
                checksum_key: env::var("GATEWAY_CHECKSUM_KEY").unwrap_or_default(),
                return_url: env::var("GATEWAY_RETURN_URL")
                    .unwrap_or_else(|_| "https://app.tutorbook.example/payment-result".to_string()),
                cancel_url: env::var("GATEWAY_CANCEL_URL")
                    .unwrap_or_else(|_| "https://app.tutorbook.example/payment-cancelled".to_string()),
            },

            commission: CommissionConfig {
                version: env::var("COMMISSION_VERSION")
                    .unwrap_or_else(|_| "1".to_string())
                    .parse()
                    .unwrap_or(1),
                course_rate: env::var("COMMISSION_COURSE_RATE")
                    .unwrap_or_else(|_| "0.20".to_string())
                    .parse()
                    .unwrap_or(Decimal::new(20, 2)),
                booking_rate: env::var("COMMISSION_BOOKING_RATE")
                    .unwrap_or_else(|_| "0.15".to_string())
                    .parse()
                    .unwrap_or(Decimal::new(15, 2)),
            },

            scheduler: SchedulerConfig {
                lock_sweep_secs: env::var("LOCK_SWEEP_SECS")
                    .unwrap_or_else(|_| "60".to_string())
                    .parse()
                    .unwrap_or(60),
                attendance_sweep_secs: env::var("ATTENDANCE_SWEEP_SECS")
                    .unwrap_or_else(|_| "300".to_string())
                    .parse()
                    .unwrap_or(300),
                complaint_sweep_secs: env::var("COMPLAINT_SWEEP_SECS")
                    .unwrap_or_else(|_| "600".to_string())
                    .parse()
                    .unwrap_or(600),
                reminder_sweep_secs: env::var("REMINDER_SWEEP_SECS")
                    .unwrap_or_else(|_| "60".to_string())
                    .parse()
                    .unwrap_or(60),
            },

            app: AppConfig {
                lock_ttl_minutes: env::var("LOCK_TTL_MINUTES")
                    .unwrap_or_else(|_| "15".to_string())
                    .parse()
                    .unwrap_or(15),
                reminder_window_minutes: env::var("REMINDER_WINDOW_MINUTES")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .unwrap_or(30),
                complaint_response_hours: env::var("COMPLAINT_RESPONSE_HOURS")
                    .unwrap_or_else(|_| "24".to_string())
                    .parse()
                    .unwrap_or(24),
                meeting_base_url: env::var("MEETING_BASE_URL")
                    .unwrap_or_else(|_| "https://meet.tutorbook.example/session".to_string()),
            },
        })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            lock_ttl_minutes: 15,
            reminder_window_minutes: 30,
            complaint_response_hours: 24,
            meeting_base_url: "https://meet.tutorbook.example/session".to_string(),
        }
    }
}

impl Default for CommissionConfig {
    fn default() -> Self {
        Self {
            version: 1,
            course_rate: Decimal::new(20, 2),
            booking_rate: Decimal::new(15, 2),
        }
    }
}
