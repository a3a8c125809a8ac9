use crate::core::error::DeliveryError;
use crate::report::formatter::Report;
use async_trait::async_trait;

/// Delivery sink for reports. Failures are reported, never retried here.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, report: &Report) -> Result<(), DeliveryError>;
}
