pub mod discord;
pub mod formatter;
