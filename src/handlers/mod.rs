pub mod attendance;
pub mod health;
pub mod notifications;
pub mod payments;
pub mod plans;
pub mod refunds;
pub mod slots;
pub mod users;
pub mod wallet;
