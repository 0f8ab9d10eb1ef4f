use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use tracing_subscriber::{EnvFilter, fmt};

const SLEEP_SLICE: Duration = Duration::from_millis(250);

pub fn setup_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Joins every whitespace run (newlines included) into a single space.
pub fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Keeps the first `max_chars` characters and marks the cut with `...`.
pub fn truncate_chars(input: &str, max_chars: usize) -> String {
    match input.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &input[..cut]),
        None => input.to_string(),
    }
}

pub fn format_timestamp(at: DateTime<Local>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn format_clock(at: DateTime<Local>) -> String {
    at.format("%H:%M").to_string()
}

/// Sleeps for `duration` unless `stop` turns true first.
pub fn sleep_unless(duration: Duration, stop: impl Fn() -> bool) {
    let deadline = Instant::now() + duration;
    while !stop() {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        thread::sleep(SLEEP_SLICE.min(deadline - now));
    }
}
