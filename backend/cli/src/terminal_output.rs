//! Terminal output: ANSI notes and the human-readable extraction summary.

use docextract_core::ExtractionResult;
use docextract_pipeline::QualityLevel;

pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[2m";

pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const CYAN: &str = "\x1b[36m";

/// Check if the terminal supports color output.
pub fn supports_color() -> bool {
    std::env::var("NO_COLOR").is_err()
        && (std::env::var("COLORTERM").is_ok()
            || std::env::var("TERM")
                .map(|t| t != "dumb")
                .unwrap_or(false))
}

/// Print a formatted INFO note to stderr.
pub fn note_info(msg: &str) {
    if supports_color() {
        eprintln!("{CYAN}{BOLD}i{RESET} {msg}");
    } else {
        eprintln!("INFO: {msg}");
    }
}

/// Print a formatted WARNING note to stderr.
pub fn note_warn(msg: &str) {
    if supports_color() {
        eprintln!("{YELLOW}{BOLD}!{RESET} {msg}");
    } else {
        eprintln!("WARN: {msg}");
    }
}

/// Print a formatted ERROR note to stderr.
pub fn note_error(msg: &str) {
    if supports_color() {
        eprintln!("{RED}{BOLD}x{RESET} {msg}");
    } else {
        eprintln!("ERROR: {msg}");
    }
}

/// One line per attempt: method, outcome, duration, failure message.
pub fn attempt_lines(result: &ExtractionResult) -> Vec<String> {
    result
        .attempts
        .iter()
        .map(|attempt| {
            let status = if attempt.is_success() { "ok" } else { "failed" };
            let detail = attempt
                .failure
                .as_ref()
                .map(|f| f.message.as_str())
                .unwrap_or_default();
            format!(
                "  {:<14}{:<8}{:>7}ms  {}",
                attempt.method.as_str(),
                status,
                attempt.duration_ms,
                detail
            )
            .trim_end()
            .to_string()
        })
        .collect()
}

/// e.g. `1200 chars via vision-ocr in 840ms (quality 0.80, excellent)`.
pub fn summary_line(result: &ExtractionResult) -> String {
    let method = result.method.as_ref().map(|m| m.as_str()).unwrap_or("-");
    format!(
        "{} chars via {method} in {}ms (quality {:.2}, {})",
        result.char_count(),
        result.processing_time_ms,
        result.quality_score,
        QualityLevel::from_score(result.quality_score).as_str()
    )
}

/// Summary on stderr, text on stdout, so the text can be piped.
pub fn print_result(result: &ExtractionResult) {
    let color = supports_color();
    let (on, off) = if color { (DIM, RESET) } else { ("", "") };
    for line in attempt_lines(result) {
        eprintln!("{on}{line}{off}");
    }

    if result.success {
        let summary = summary_line(result);
        if color {
            eprintln!("{GREEN}{BOLD}ok{RESET} {summary}");
        } else {
            eprintln!("OK: {summary}");
        }
        println!("{}", result.text);
    } else {
        note_error(result.error.as_deref().unwrap_or("extraction failed"));
    }
}
