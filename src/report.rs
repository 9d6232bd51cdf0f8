//! Terminal and JSON rendering of request outcomes

use std::fmt::Write;

use serde_json::{Value, json};

use crate::courier::Outcome;
use crate::results::SearchResult;

/// Render one request for humans; `None` means the request was cancelled
pub fn render_text(url: &str, outcome: Option<&Outcome>) -> String {
    let mut out = format!("{}\n", url);

    match outcome {
        None => out.push_str("  cancelled\n"),
        Some(Outcome::Errored(e)) => {
            let _ = writeln!(out, "  error: {}", e);
        }
        Some(Outcome::Results(results)) if results.is_empty() => {
            out.push_str("  (no results)\n");
        }
        Some(Outcome::Results(results)) => {
            for (i, result) in results.iter().enumerate() {
                render_result(&mut out, i + 1, result);
            }
        }
    }
    out
}

fn render_result(out: &mut String, index: usize, result: &SearchResult) {
    let _ = writeln!(out, "  {}. {}", index, result.display_name());
    match result.size() {
        Some(size) => {
            let _ = writeln!(out, "     file: {} ({})", result.filename(), format_size(size));
        }
        None => {
            let _ = writeln!(out, "     file: {}", result.filename());
        }
    }
    let _ = writeln!(out, "     url:  {}", result.download_url());
}

/// Render one request as a JSON object
pub fn render_json(url: &str, outcome: Option<&Outcome>) -> Value {
    match outcome {
        None => json!({ "url": url, "status": "cancelled" }),
        Some(Outcome::Errored(e)) => {
            let fault = if e.is_backend_fault() { "backend" } else { "courier" };
            json!({
                "url": url,
                "status": "error",
                "fault": fault,
                "error": e.to_string(),
            })
        }
        Some(Outcome::Results(results)) => json!({
            "url": url,
            "status": "ok",
            "results": results,
        }),
    }
}

/// Human-readable byte count with binary units
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod report_tests;
