//! otelpulse CLI entry point

use anyhow::{Context, Result};
use otelpulse::config::cli::Cli;
use otelpulse::config::{cli_convert, toml, validator, RunConfig};
use otelpulse::exporter::otlp_http::HttpExporter;
use otelpulse::output::{json, text};
use otelpulse::util::SystemClock;
use otelpulse::Coordinator;
use std::sync::Arc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> Result<()> {
    let cli = Cli::parse_args();
    init_logging(cli.log_level.as_deref())?;

    println!("otelpulse v{}", env!("CARGO_PKG_VERSION"));
    println!("Synthetic OTLP log and trace load generator");
    println!();

    let config = build_config(&cli)?;
    validator::validate_config(&config).context("Configuration validation failed")?;

    text::print_configuration(&config);

    if cli.dry_run {
        println!("Dry run mode - configuration validated successfully");
        return Ok(());
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    let config = Arc::new(config);
    let report = runtime.block_on(async {
        let exporter = HttpExporter::new(config.exporter.clone())
            .context("Failed to create OTLP exporter")?;
        let coordinator = Coordinator::new(config.clone(), Arc::new(exporter), Arc::new(SystemClock));
        coordinator.run().await
    })?;

    text::print_results(&report);

    if let Some(path) = &cli.json_output {
        let document = json::build_report(&report, &config);
        json::write_json_output(path, &document, true)?;
        println!("JSON report written to {}", path.display());
    }

    Ok(())
}

fn init_logging(level: Option<&str>) -> Result<()> {
    let filter = log_filter(level, std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref())?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();

    Ok(())
}

/// Pick the log filter: `--log-level` (or `OTELPULSE_LOG`), then `RUST_LOG`,
/// then `info`. An unparseable directive falls through to the next source.
fn log_filter(level: Option<&str>, rust_log: Option<&str>) -> Result<EnvFilter> {
    [level, rust_log]
        .into_iter()
        .flatten()
        .filter(|directives| !directives.trim().is_empty())
        .find_map(|directives| EnvFilter::try_new(directives).ok())
        .map_or_else(|| EnvFilter::try_new("info"), Ok)
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))
}

/// Resolve the run configuration from the command line and optional file
fn build_config(cli: &Cli) -> Result<RunConfig> {
    let cli_run = cli_convert::raw_run_input(cli);
    let cli_exporter = cli_convert::raw_exporter_input(cli);

    let (run, exporter) = match &cli.config {
        Some(path) => {
            let file = toml::parse_toml_file(path)?;
            toml::merge_cli_with_config(cli_run, cli_exporter, file)
        }
        None => (cli_run, cli_exporter),
    };

    Ok(RunConfig::resolve(&run, &exporter))
}
