use std::fs;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Local, TimeZone};
use tempfile::TempDir;
use workspace_monitor::app::Monitor;
use workspace_monitor::config::MonitorConfig;

fn local(day: u32, hour: u32, minute: u32) -> DateTime<Local> {
    Local
        .with_ymd_and_hms(2026, 2, day, hour, minute, 0)
        .single()
        .expect("local time")
}

fn history_line(at: DateTime<Local>, project: &str, session: &str) -> String {
    serde_json::json!({
        "display": "whatever was typed",
        "timestamp": at.timestamp_millis(),
        "project": project,
        "sessionId": session,
    })
    .to_string()
}

fn user_line(content: &str) -> String {
    serde_json::json!({
        "type": "user",
        "message": { "role": "user", "content": content },
    })
    .to_string()
}

fn write_session(dir: &Path, session: &str, lines: &[String]) {
    fs::create_dir_all(dir).expect("mkdir project");
    fs::write(dir.join(format!("{session}.jsonl")), lines.join("\n")).expect("write session");
}

fn config_in(dir: &Path) -> MonitorConfig {
    MonitorConfig {
        claude_dir: dir.to_path_buf(),
        output_path: dir.join("notes").join("active_chat.md"),
        state_dir: dir.join("state"),
        poll_interval: Duration::from_secs(60),
        max_prompt_chars: 40,
    }
}

#[test]
fn renders_only_todays_projects_with_filtered_prompts() {
    let tmp = TempDir::new().expect("temp dir");
    let claude = tmp.path();
    let projects = claude.join("projects");

    fs::write(
        claude.join("history.jsonl"),
        [
            history_line(local(9, 9, 0), "/home/dev/web_app", "web-1"),
            history_line(local(9, 11, 30), "/home/dev/web_app", "web-2"),
            history_line(local(9, 10, 0), "/home/dev/web_app", "web-1"),
            history_line(local(8, 16, 0), "/home/dev/api", "api-1"),
            history_line(local(8, 17, 0), "/home/dev/api", "api-2"),
        ]
        .join("\n"),
    )
    .expect("write history");

    write_session(
        &projects.join("-home-dev-web-app"),
        "web-1",
        &[
            r#"{"type":"user","isMeta":true,"message":{"role":"user","content":"Caveat"}}"#
                .to_string(),
            user_line("<command-name>/model</command-name>"),
            user_line("set up the\nlogin   page"),
            user_line("add a very long description of the styling work that follows"),
            user_line("<draft>unfinished"),
            user_line("third"),
            user_line("fourth is never shown"),
        ],
    );
    // Stored under a directory name the derivation does not produce.
    write_session(
        &projects.join("web-app-moved"),
        "web-2",
        &[user_line("deploy preview")],
    );
    write_session(
        &projects.join("-home-dev-api"),
        "api-1",
        &[user_line("yesterday's work")],
    );

    let config = config_in(claude);
    let output = config.output_path.clone();
    let mut monitor = Monitor::new(config);
    let document = monitor.render_at(local(9, 18, 0));

    assert!(document.contains("*Last updated: 2026-02-09 18:00:00*"));
    assert!(document.contains("## /home/dev/web_app"));
    assert!(!document.contains("/home/dev/api"));
    assert!(!document.contains("yesterday's work"));

    let expected = "\
## /home/dev/web_app
**Last updated**: 11:30
**Prompts**:
1. deploy preview

**Last updated**: 10:00
**Prompts**:
1. set up the login page
2. add a very long description of the styli...
3. third
";
    assert!(document.ends_with(expected), "{document}");
    assert_eq!(monitor.cache().len(), 2);

    assert!(monitor.run_cycle_at(local(9, 18, 0)));
    let written = fs::read_to_string(&output).expect("read output");
    assert!(written.ends_with(expected), "{written}");
    assert!(!written.contains("/home/dev/api"));
    assert_eq!(monitor.cache().len(), 2);
}

#[test]
fn sessions_without_files_show_placeholder() {
    let tmp = TempDir::new().expect("temp dir");
    let claude = tmp.path();
    fs::write(
        claude.join("history.jsonl"),
        history_line(local(9, 8, 5), "/srv/tool", "ghost"),
    )
    .expect("write history");

    let mut monitor = Monitor::new(config_in(claude));
    let document = monitor.render_at(local(9, 9, 0));

    assert!(document.contains("## /srv/tool"));
    assert!(document.contains("**Last updated**: 08:05"));
    assert!(document.contains("1. (none)"));
    assert!(monitor.cache().is_empty());
}
