//! Configuration validation
//!
//! Run knobs never fail validation (they fall back during resolution); only
//! structural exporter settings are checked here.

use super::*;
use anyhow::Result;

/// Largest export queue a bounded channel can hold
pub const MAX_QUEUE_SIZE: usize = tokio::sync::Semaphore::MAX_PERMITS;

/// Validate complete configuration
pub fn validate_config(config: &RunConfig) -> Result<()> {
    validate_exporter(&config.exporter)?;
    Ok(())
}

/// Validate exporter settings
pub fn validate_exporter(exporter: &ExporterSettings) -> Result<()> {
    if exporter.max_queue_size == 0 {
        anyhow::bail!("max_queue_size must be at least 1");
    }

    if exporter.max_queue_size > MAX_QUEUE_SIZE {
        anyhow::bail!(
            "max_queue_size ({}) must not exceed {}",
            exporter.max_queue_size,
            MAX_QUEUE_SIZE
        );
    }

    if exporter.max_export_batch_size == 0 {
        anyhow::bail!("max_export_batch_size must be at least 1");
    }

    if exporter.max_export_batch_size > exporter.max_queue_size {
        anyhow::bail!(
            "max_export_batch_size ({}) must not exceed max_queue_size ({})",
            exporter.max_export_batch_size,
            exporter.max_queue_size
        );
    }

    if exporter.scheduled_delay.is_zero() {
        anyhow::bail!("scheduled_delay_ms must be greater than 0");
    }

    if exporter.export_timeout.is_zero() {
        anyhow::bail!("export_timeout_ms must be greater than 0");
    }

    Ok(())
}
