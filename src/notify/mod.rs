pub mod discord;
pub mod notifier;
