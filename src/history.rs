use std::cmp::Reverse;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate, TimeZone};
use serde_json::Value;
use tracing::{error, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub session_id: String,
    pub project_path: String,
    pub last_updated: DateTime<Local>,
    pub prompts: Vec<String>,
}

/// Project path to its most recent sessions, newest first.
pub type ProjectGroups = HashMap<String, Vec<SessionRecord>>;

#[derive(Debug, Clone, PartialEq, Eq)]
struct HistoryEntry {
    session_id: String,
    project_path: String,
    at: DateTime<Local>,
}

/// Reads the history log and keeps the sessions touched on `today`.
///
/// Each session id appears once, carrying its latest timestamp. Sessions are
/// grouped by project, sorted newest first and capped at
/// `max_sessions_per_project`. A missing or unreadable log gives an empty map.
pub fn today_sessions(
    history_path: &Path,
    today: NaiveDate,
    max_sessions_per_project: usize,
) -> ProjectGroups {
    if !history_path.exists() {
        warn!(path = %history_path.display(), "history file not found");
        return ProjectGroups::new();
    }

    let mut latest: HashMap<String, HistoryEntry> = HashMap::new();
    if let Err(err) = read_history(history_path, today, &mut latest) {
        error!(path = %history_path.display(), error = %err, "failed to read history file");
    }

    group_by_project(latest.into_values(), max_sessions_per_project)
}

fn read_history(
    history_path: &Path,
    today: NaiveDate,
    latest: &mut HashMap<String, HistoryEntry>,
) -> Result<()> {
    let file = File::open(history_path)
        .with_context(|| format!("failed to open history file {}", history_path.display()))?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let bytes = reader
            .read_until(b'\n', &mut buf)
            .with_context(|| format!("failed to read history file {}", history_path.display()))?;
        if bytes == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        let Some(entry) = parse_history_line(&line) else {
            continue;
        };
        if entry.at.date_naive() != today {
            continue;
        }
        record_latest(latest, entry);
    }
    Ok(())
}

fn parse_history_line(line: &str) -> Option<HistoryEntry> {
    let parsed = serde_json::from_str::<Value>(line.trim()).ok()?;
    let millis = timestamp_millis(parsed.get("timestamp")?)?;
    let project_path = non_empty_str(&parsed, "project")?;
    let session_id = non_empty_str(&parsed, "sessionId")?;
    let at = Local.timestamp_millis_opt(millis).single()?;
    Some(HistoryEntry {
        session_id,
        project_path,
        at,
    })
}

fn timestamp_millis(value: &Value) -> Option<i64> {
    let millis = value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|ms| ms.is_finite() && ms.abs() < i64::MAX as f64)
            .map(|ms| ms as i64)
    })?;
    // Zero is what a missing timestamp is usually defaulted to.
    (millis != 0).then_some(millis)
}

fn non_empty_str(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)?
        .as_str()
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

fn record_latest(latest: &mut HashMap<String, HistoryEntry>, entry: HistoryEntry) {
    match latest.get(&entry.session_id) {
        Some(existing) if existing.at >= entry.at => {}
        _ => {
            latest.insert(entry.session_id.clone(), entry);
        }
    }
}

fn group_by_project(
    entries: impl IntoIterator<Item = HistoryEntry>,
    max_sessions_per_project: usize,
) -> ProjectGroups {
    let mut groups = ProjectGroups::new();
    for entry in entries {
        groups
            .entry(entry.project_path.clone())
            .or_default()
            .push(SessionRecord {
                session_id: entry.session_id,
                project_path: entry.project_path,
                last_updated: entry.at,
                prompts: Vec::new(),
            });
    }

    for sessions in groups.values_mut() {
        sessions.sort_by(|a, b| {
            Reverse(a.last_updated)
                .cmp(&Reverse(b.last_updated))
                .then_with(|| a.session_id.cmp(&b.session_id))
        });
        sessions.truncate(max_sessions_per_project);
    }
    groups
}
