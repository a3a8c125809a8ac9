pub mod core;
pub mod models;
pub mod stores;
pub mod engine;
pub mod report;
pub mod api;
pub mod notify;
pub mod scheduler;
pub mod utils;
