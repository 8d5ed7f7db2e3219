//! CLI to Config conversion utilities

use crate::config::cli::{Cli, PacingArg};
use crate::config::{PacingMode, RawExporterInput, RawRunInput};
use tracing::warn;

/// Parse a raw integer option leniently
///
/// Returns `None` for text that is not an integer so that the caller falls
/// back to the option's default.
pub fn parse_raw_int(name: &str, s: &str) -> Option<i64> {
    match s.trim().parse::<i64>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(option = name, value = s, "ignoring non-numeric value, using default");
            None
        }
    }
}

/// Convert CLI PacingArg to config PacingMode
pub fn convert_pacing_mode(arg: PacingArg) -> PacingMode {
    match arg {
        PacingArg::Adaptive => PacingMode::Adaptive,
        PacingArg::Sleep => PacingMode::Sleep,
        PacingArg::Spin => PacingMode::Spin,
    }
}

/// Extract the raw run knobs given on the command line
///
/// Options that were not given stay `None` so that a config file or the
/// defaults can fill them.
pub fn raw_run_input(cli: &Cli) -> RawRunInput {
    let int = |name: &str, value: &Option<String>| {
        value.as_deref().and_then(|s| parse_raw_int(name, s))
    };

    RawRunInput {
        events_per_batch: int("events-per-batch", &cli.events_per_batch),
        delay_between_events_ms: int("delay-between-events", &cli.delay_between_events),
        delay_between_batches_ms: int("delay-between-batches", &cli.delay_between_batches),
        iterations: int("iterations", &cli.iterations),
        wait: cli.wait.then_some(true),
        endpoint: cli.endpoint.clone(),
        publish_log_and_trace: int("publish-log-and-trace", &cli.publish_log_and_trace),
        drain_delay_ms: int("drain-delay-ms", &cli.drain_delay_ms),
        pacing: cli.pacing.map(convert_pacing_mode),
    }
}

/// Extract the raw exporter knobs given on the command line
pub fn raw_exporter_input(cli: &Cli) -> RawExporterInput {
    RawExporterInput {
        max_queue_size: cli.max_queue_size,
        max_export_batch_size: cli.max_export_batch_size,
        scheduled_delay_ms: cli.scheduled_delay_ms,
        export_timeout_ms: cli.export_timeout_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RunConfig, StreamSelection};
    use clap::Parser;
    use std::time::Duration;

    #[test]
    fn test_parse_raw_int() {
        assert_eq!(parse_raw_int("x", "42"), Some(42));
        assert_eq!(parse_raw_int("x", " -5 "), Some(-5));
        assert_eq!(parse_raw_int("x", "ten"), None);
        assert_eq!(parse_raw_int("x", ""), None);
    }

    #[test]
    fn test_non_numeric_falls_back_to_default() {
        let cli = Cli::try_parse_from(["otelpulse", "-r", "lots", "-p", "both"]).unwrap();
        let raw = raw_run_input(&cli);
        assert_eq!(raw.events_per_batch, None);
        assert_eq!(raw.publish_log_and_trace, None);

        let config = RunConfig::resolve(&raw, &raw_exporter_input(&cli));
        assert_eq!(config.events_per_batch, 10);
        assert_eq!(config.stream_selection, StreamSelection::Both);
    }

    #[test]
    fn test_cli_to_config() {
        let cli = Cli::try_parse_from([
            "otelpulse",
            "-r",
            "5",
            "-d",
            "2",
            "-b",
            "50",
            "-i",
            "3",
            "-p",
            "2",
            "--pacing",
            "sleep",
            "--max-export-batch-size",
            "100",
        ])
        .unwrap();

        let config = RunConfig::resolve(&raw_run_input(&cli), &raw_exporter_input(&cli));
        assert_eq!(config.events_per_batch, 5);
        assert_eq!(config.delay_between_events, Duration::from_millis(2));
        assert_eq!(config.delay_between_batches, Duration::from_millis(50));
        assert_eq!(config.iterations, 3);
        assert_eq!(config.stream_selection, StreamSelection::TracesOnly);
        assert_eq!(config.pacing, PacingMode::Sleep);
        assert_eq!(config.exporter.max_export_batch_size, 100);
    }

    #[test]
    fn test_wait_flag_absent_is_unset() {
        let cli = Cli::try_parse_from(["otelpulse"]).unwrap();
        assert_eq!(raw_run_input(&cli).wait, None);
    }
}
