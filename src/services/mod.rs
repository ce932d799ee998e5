pub mod attendance;
pub mod database;
pub mod gateway;
pub mod locks;
pub mod notifier;
pub mod payments;
pub mod plans;
pub mod refunds;
pub mod settings;
pub mod slots;
pub mod wallet;
