pub mod common;
pub mod notification;
pub mod payment;
pub mod plan;
pub mod refund;
pub mod slot;
pub mod user;
pub mod withdraw;
