use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("claude directory not found: {}", .0.display())]
    MissingClaudeDir(PathBuf),
    #[error("another workspace-monitor instance is already running{}", pid_suffix(.pid))]
    AlreadyRunning { pid: Option<u32> },
}

fn pid_suffix(pid: &Option<u32>) -> String {
    pid.map(|pid| format!(" (PID {pid})")).unwrap_or_default()
}
