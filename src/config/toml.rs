//! TOML configuration file parsing
//!
//! A config file carries the same raw knobs as the command line:
//!
//! ```toml
//! [run]
//! events_per_batch = 2000
//! delay_between_batches_ms = 1000
//! iterations = 100
//! endpoint = "http://localhost:4318"
//! publish_log_and_trace = 3
//!
//! [exporter]
//! max_export_batch_size = 10000
//! ```

use super::*;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Contents of a TOML configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub run: RawRunInput,
    pub exporter: RawExporterInput,
}

/// Parse TOML configuration file
pub fn parse_toml_file(path: &Path) -> Result<FileConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_toml_string(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse TOML configuration from string
pub fn parse_toml_string(contents: &str) -> Result<FileConfig> {
    let config: FileConfig = ::toml::from_str(contents)
        .context("Failed to parse TOML configuration")?;

    Ok(config)
}

/// Merge CLI input with file configuration (CLI takes precedence)
pub fn merge_cli_with_config(
    cli_run: RawRunInput,
    cli_exporter: RawExporterInput,
    file: FileConfig,
) -> (RawRunInput, RawExporterInput) {
    let run = RawRunInput {
        events_per_batch: cli_run.events_per_batch.or(file.run.events_per_batch),
        delay_between_events_ms: cli_run
            .delay_between_events_ms
            .or(file.run.delay_between_events_ms),
        delay_between_batches_ms: cli_run
            .delay_between_batches_ms
            .or(file.run.delay_between_batches_ms),
        iterations: cli_run.iterations.or(file.run.iterations),
        wait: cli_run.wait.or(file.run.wait),
        endpoint: cli_run.endpoint.or(file.run.endpoint),
        publish_log_and_trace: cli_run
            .publish_log_and_trace
            .or(file.run.publish_log_and_trace),
        drain_delay_ms: cli_run.drain_delay_ms.or(file.run.drain_delay_ms),
        pacing: cli_run.pacing.or(file.run.pacing),
    };

    let exporter = RawExporterInput {
        max_queue_size: cli_exporter.max_queue_size.or(file.exporter.max_queue_size),
        max_export_batch_size: cli_exporter
            .max_export_batch_size
            .or(file.exporter.max_export_batch_size),
        scheduled_delay_ms: cli_exporter
            .scheduled_delay_ms
            .or(file.exporter.scheduled_delay_ms),
        export_timeout_ms: cli_exporter
            .export_timeout_ms
            .or(file.exporter.export_timeout_ms),
    };

    (run, exporter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_file() {
        let toml_str = r#"
            [run]
            events_per_batch = 2000
            delay_between_events_ms = 0
            delay_between_batches_ms = 1000
            iterations = 100
            wait = true
            endpoint = "http://localhost:4317;http://localhost:4318"
            publish_log_and_trace = 3
            pacing = "spin"

            [exporter]
            max_export_batch_size = 512
            scheduled_delay_ms = 250
        "#;

        let file = parse_toml_string(toml_str).unwrap();
        assert_eq!(file.run.events_per_batch, Some(2000));
        assert_eq!(file.run.iterations, Some(100));
        assert_eq!(file.run.wait, Some(true));
        assert_eq!(file.run.pacing, Some(PacingMode::Spin));
        assert_eq!(file.exporter.max_export_batch_size, Some(512));
        assert_eq!(file.exporter.scheduled_delay_ms, Some(250));
        assert_eq!(file.exporter.max_queue_size, None);
    }

    #[test]
    fn test_parse_empty_file() {
        let file = parse_toml_string("").unwrap();
        assert_eq!(file, FileConfig::default());
    }

    #[test]
    fn test_unknown_table_rejected() {
        assert!(parse_toml_string("[workload]\nqueue_depth = 4\n").is_err());
    }

    #[test]
    fn test_parse_from_disk() {
        let mut tmp = NamedTempFile::new().unwrap();
        writeln!(tmp, "[run]\niterations = 4\nevents_per_batch = -1").unwrap();

        let file = parse_toml_file(tmp.path()).unwrap();
        let config = RunConfig::resolve(&file.run, &file.exporter);
        assert_eq!(config.iterations, 4);
        assert_eq!(config.events_per_batch, DEFAULT_EVENTS_PER_BATCH);
    }

    #[test]
    fn test_missing_file_is_error() {
        let err = parse_toml_file(Path::new("/nonexistent/otelpulse.toml")).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to read config file"));
    }

    #[test]
    fn test_cli_overrides_file() {
        let file = parse_toml_string(
            "[run]\niterations = 4\nevents_per_batch = 50\nendpoint = \"http://file:1\"\n",
        )
        .unwrap();
        let cli_run = RawRunInput {
            iterations: Some(9),
            ..Default::default()
        };

        let (run, exporter) = merge_cli_with_config(cli_run, RawExporterInput::default(), file);
        assert_eq!(run.iterations, Some(9));
        assert_eq!(run.events_per_batch, Some(50));
        assert_eq!(run.endpoint.as_deref(), Some("http://file:1"));
        assert_eq!(exporter, RawExporterInput::default());
    }
}
