use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_POLL_SECONDS: u64 = 180;
const DEFAULT_MAX_PROMPT_CHARS: usize = 300;
const LOCAL_ENV_FILE: &str = ".env.local";
pub const MAX_PROMPTS_PER_SESSION: usize = 3;
pub const MAX_SESSIONS_PER_PROJECT: usize = 3;

pub const ENV_CLAUDE_DIR: &str = "WORKSPACE_MONITOR_CLAUDE_DIR";
pub const ENV_OUTPUT: &str = "WORKSPACE_MONITOR_OUTPUT";
pub const ENV_INTERVAL: &str = "WORKSPACE_MONITOR_INTERVAL";
pub const ENV_MAX_CHARS: &str = "WORKSPACE_MONITOR_MAX_CHARS";
pub const ENV_STATE_DIR: &str = "WORKSPACE_MONITOR_STATE_DIR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    pub claude_dir: PathBuf,
    pub output_path: PathBuf,
    /// Where the monitor keeps its own lock; never inside `claude_dir`.
    pub state_dir: PathBuf,
    pub poll_interval: Duration,
    pub max_prompt_chars: usize,
}

impl MonitorConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let value = |name: &str| {
            lookup(name)
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
        };

        let claude_dir = value(ENV_CLAUDE_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(default_claude_dir);
        let output_path = value(ENV_OUTPUT)
            .map(PathBuf::from)
            .unwrap_or_else(|| claude_dir.join("active_chat.md"));
        let state_dir = value(ENV_STATE_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(default_state_dir);
        let poll_seconds = positive(value(ENV_INTERVAL)).unwrap_or(DEFAULT_POLL_SECONDS);
        let max_prompt_chars = positive(value(ENV_MAX_CHARS))
            .and_then(|chars| usize::try_from(chars).ok())
            .unwrap_or(DEFAULT_MAX_PROMPT_CHARS);

        Self {
            claude_dir,
            output_path,
            state_dir,
            poll_interval: Duration::from_secs(poll_seconds),
            max_prompt_chars,
        }
    }

    pub fn projects_dir(&self) -> PathBuf {
        self.claude_dir.join("projects")
    }

    pub fn history_path(&self) -> PathBuf {
        self.claude_dir.join("history.jsonl")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.state_dir.join("monitor.lock")
    }

    pub fn instance_meta_path(&self) -> PathBuf {
        self.state_dir.join("instance.json")
    }
}

/// Loads `.env.local` from the working directory, or else from beside the executable.
///
/// Variables that are already set win over the file.
pub fn load_local_env() {
    if dotenvy::from_filename(LOCAL_ENV_FILE).is_ok() {
        return;
    }
    let Some(path) = exe_local_env_path(env::current_exe().ok().as_deref()) else {
        return;
    };
    if path.is_file() {
        let _ = dotenvy::from_path(&path);
    }
}

fn exe_local_env_path(exe: Option<&Path>) -> Option<PathBuf> {
    Some(exe?.parent()?.join(LOCAL_ENV_FILE))
}

fn default_claude_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".claude")
}

fn default_state_dir() -> PathBuf {
    dirs::runtime_dir()
        .or_else(dirs::cache_dir)
        .unwrap_or_else(env::temp_dir)
        .join("workspace-monitor")
}

fn positive(raw: Option<String>) -> Option<u64> {
    raw.and_then(|v| v.parse::<u64>().ok()).filter(|v| *v > 0)
}
