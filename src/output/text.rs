//! Human-readable text output

use crate::config::{RunConfig, StreamKind};
use crate::coordinator::{RunReport, StreamReport};
use crate::stats::ExportSnapshot;
use crate::util::time::{calculate_rate, format_duration, format_rate};

/// Print the effective configuration before a run
pub fn print_configuration(config: &RunConfig) {
    println!("═══════════════════════════════════════════════════════════");
    println!("                    OTELPULSE");
    println!("═══════════════════════════════════════════════════════════");
    println!("{}", config);
    println!("Pacing: {}", config.pacing);

    for kind in config.stream_selection.kinds() {
        let label = match kind {
            StreamKind::Log => "Log",
            StreamKind::Trace => "Trace",
        };
        println!(
            "Generating {} events... Endpoint: {}",
            label,
            config.endpoint_for(kind)
        );
    }

    println!(
        "Events per stream: {}",
        format_number(config.events_per_stream())
    );
    println!();
}

/// Print run results to console
pub fn print_results(report: &RunReport) {
    println!("═══════════════════════════════════════════════════════════");
    println!("                    RUN RESULTS");
    println!("═══════════════════════════════════════════════════════════");
    println!();
    println!("Elapsed Time: {:.3}s", report.elapsed.as_secs_f64());
    println!(
        "Total Events: {} ({} events/s)",
        format_number(report.total_events()),
        format_rate(calculate_rate(report.total_events(), report.elapsed))
    );

    for stream in report.streams() {
        println!();
        print_stream(stream);
    }

    println!();
    println!("═══════════════════════════════════════════════════════════");
}

fn print_stream(stream: &StreamReport) {
    let result = &stream.result;
    println!("{} stream:", result.kind);
    println!(
        "  Events:  {} in {} batches - {} events/s",
        format_number(result.events_emitted),
        format_number(result.batches_completed),
        format_rate(result.events_per_second())
    );
    println!("  Elapsed: {:.3}s", result.elapsed.as_secs_f64());

    if let Some(failure) = &result.failure {
        println!("  Failed:  {}", failure);
    }

    if let Some(export) = &stream.export {
        print_export(export);
    }
}

fn print_export(export: &ExportSnapshot) {
    println!("  Export:");
    println!(
        "    Exported: {}  Failed: {}  Dropped: {}",
        format_number(export.exported),
        format_number(export.failed_events),
        format_number(export.dropped)
    );
    println!(
        "    Requests: {} ({} failed)",
        format_number(export.requests),
        format_number(export.failed_requests)
    );

    if let (Some(p50), Some(p99), Some(max)) = (
        export.latency.percentile(50.0),
        export.latency.percentile(99.0),
        export.latency.max(),
    ) {
        println!(
            "    Latency:  p50 {}  p99 {}  max {}",
            format_duration(p50),
            format_duration(p99),
            format_duration(max)
        );
    }
}

/// Format a number with thousands separators
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();

    for (count, c) in s.chars().rev().enumerate() {
        if count > 0 && count % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }

    result.chars().rev().collect()
}
