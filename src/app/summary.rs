use std::time::Duration;

use crate::domain::TestConfiguration;
use crate::metrics::{AggregateStats, ratio_x100};

const RULE_WIDTH: usize = 70;
const HISTOGRAM_BAR_WIDTH: u64 = 50;
const BYTE_UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

pub(crate) fn banner_lines(config: &TestConfiguration) -> Vec<String> {
    let mut lines = Vec::new();
    lines.push("=".repeat(RULE_WIDTH));
    lines.push("LOAD TEST CONFIGURATION".to_owned());
    lines.push("=".repeat(RULE_WIDTH));
    lines.push(format!("Target URL:            {}", config.url));
    lines.push(format!("Method:                {}", config.method.as_str()));
    lines.push(format!("Total Requests:        {}", config.total_requests.get()));
    lines.push(format!(
        "Concurrency:           {}",
        config.effective_concurrency()
    ));
    lines.push(format!(
        "Timeout:               {}",
        format_duration(config.request_timeout)
    ));
    lines.push(format!(
        "Keep-Alive:            {}",
        if config.keep_alive { "enabled" } else { "disabled" }
    ));
    if !config.verify_tls {
        lines.push("TLS Verification:      disabled".to_owned());
    }
    if config.effective_batch_size() < config.total_requests.get() {
        lines.push(format!(
            "Batch Size:            {}",
            config.effective_batch_size()
        ));
        lines.push(format!(
            "Cooldown:              {}",
            format_duration(config.cooldown)
        ));
    }
    lines.push("=".repeat(RULE_WIDTH));
    lines
}

pub(crate) fn print_banner(config: &TestConfiguration) {
    for line in banner_lines(config) {
        println!("{}", line);
    }
    println!();
}

pub(crate) fn report_lines(stats: &AggregateStats) -> Vec<String> {
    let mut lines = Vec::new();
    lines.push("=".repeat(RULE_WIDTH));
    lines.push("TEST RESULTS".to_owned());
    lines.push("=".repeat(RULE_WIDTH));
    lines.push(String::new());

    section(&mut lines, "SUMMARY");
    lines.push(format!("Total Requests:        {}", stats.issued));
    let success_rate = stats.success_rate_x100();
    lines.push(format!(
        "Successful:            {} ({}.{:02}%)",
        stats.succeeded,
        success_rate / 100,
        success_rate % 100
    ));
    let failure_rate = stats.failure_rate_x100();
    lines.push(format!(
        "Failed:                {} ({}.{:02}%)",
        stats.failed,
        failure_rate / 100,
        failure_rate % 100
    ));
    lines.push(format!(
        "Total Time:            {}",
        format_duration(stats.duration)
    ));
    let rps = stats.requests_per_second_x100();
    lines.push(format!(
        "Requests per Second:   {}.{:02}",
        rps / 100,
        rps % 100
    ));
    lines.push(format!(
        "Data Transferred:      {}",
        format_bytes(stats.total_bytes)
    ));
    if stats.batches > 1 {
        lines.push(format!("Batches:               {}", stats.batches));
    }
    if stats.cancelled {
        lines.push(format!(
            "Cancelled:             yes ({} in-flight abandoned)",
            stats.abandoned
        ));
    }
    lines.push(String::new());

    section(&mut lines, "RESPONSE TIMES (milliseconds)");
    let latency = &stats.latency;
    for (label, value) in [
        ("Average:", latency.mean),
        ("Median:", latency.p50),
        ("Min:", latency.min),
        ("Max:", latency.max),
        ("95th Percentile:", latency.p95),
        ("99th Percentile:", latency.p99),
    ] {
        lines.push(format!("{:<22} {} ms", label, format_millis(value)));
    }
    lines.push(String::new());

    if !stats.status_counts.is_empty() {
        section(&mut lines, "STATUS CODES");
        for (code, count) in &stats.status_counts {
            let share = ratio_x100(*count, stats.issued);
            lines.push(format!(
                "{} {:<22} {} ({}.{:02}%)",
                code,
                status_description(*code),
                count,
                share / 100,
                share % 100
            ));
        }
        lines.push(String::new());
    }

    if !stats.error_counts.is_empty() {
        section(&mut lines, "ERRORS");
        let mut errors: Vec<_> = stats.error_counts.iter().collect();
        errors.sort_by(|left, right| right.1.cmp(left.1).then(left.0.cmp(right.0)));
        for (kind, count) in errors {
            let share = ratio_x100(*count, stats.failed);
            lines.push(format!(
                "{:<20} {:<38} {} ({}.{:02}%)",
                kind.as_str(),
                kind.description(),
                count,
                share / 100,
                share % 100
            ));
        }
        lines.push(String::new());
    }

    section(&mut lines, "LATENCY DISTRIBUTION");
    lines.extend(histogram_lines(stats));
    lines.push(String::new());
    lines.push("=".repeat(RULE_WIDTH));
    lines
}

pub(crate) fn print_report(stats: &AggregateStats) {
    println!();
    for line in report_lines(stats) {
        println!("{}", line);
    }
}

fn section(lines: &mut Vec<String>, title: &str) {
    lines.push(title.to_owned());
    lines.push("-".repeat(RULE_WIDTH));
}

fn histogram_lines(stats: &AggregateStats) -> Vec<String> {
    let histogram = &stats.latency.histogram;
    let total = histogram.total();
    let max_count = histogram.iter().map(|(_, count)| count).max().unwrap_or(0);

    histogram
        .iter()
        .map(|(label, count)| {
            let width = u128::from(count)
                .saturating_mul(u128::from(HISTOGRAM_BAR_WIDTH))
                .checked_div(u128::from(max_count))
                .unwrap_or(0);
            let width = usize::try_from(width).unwrap_or(0);
            let share = ratio_x100(count, total);
            format!(
                "{:<12} {:<50} {:>6} ({:>3}.{}%)",
                label,
                "\u{2588}".repeat(width),
                count,
                share / 100,
                (share % 100) / 10
            )
        })
        .collect()
}

/// Human readable HTTP status label, empty for unknown codes.
pub(crate) fn status_description(code: u16) -> &'static str {
    http::StatusCode::from_u16(code)
        .ok()
        .and_then(|status| status.canonical_reason())
        .unwrap_or("")
}

/// Formats a byte count with binary units and two decimals.
pub(crate) fn format_bytes(bytes: u64) -> String {
    let mut scaled_x100 = u128::from(bytes).saturating_mul(100);
    for unit in BYTE_UNITS {
        if scaled_x100 < 102_400 {
            return format!("{}.{:02} {}", scaled_x100 / 100, scaled_x100 % 100, unit);
        }
        scaled_x100 /= 1024;
    }
    format!("{}.{:02} TB", scaled_x100 / 100, scaled_x100 % 100)
}

/// Milliseconds with two decimals.
pub(crate) fn format_millis(duration: Duration) -> String {
    let micros = duration.as_micros();
    format!("{}.{:02}", micros / 1_000, (micros % 1_000) / 10)
}

pub(crate) fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    format!("{}.{:02}s", millis / 1_000, (millis % 1_000) / 10)
}
