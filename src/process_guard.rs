use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};

use crate::config::MonitorConfig;

pub enum AcquireState {
    Acquired(InstanceGuard),
    AlreadyRunning { pid: Option<u32> },
}

pub enum RunningState {
    NotRunning,
    Running { pid: Option<u32> },
}

/// Exclusive hold on the state-dir lock; released and cleaned up on drop.
///
/// The lock file itself stays empty. Who holds it is recorded in the sibling
/// metadata file, which only the owning process removes.
pub struct InstanceGuard {
    lock: File,
    meta_path: PathBuf,
    owner: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct InstanceMetadata {
    pid: u32,
    output_path: PathBuf,
    started_at: DateTime<Utc>,
}

impl Drop for InstanceGuard {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.lock);
        if owner_pid(&self.meta_path) == Some(self.owner) {
            let _ = fs::remove_file(&self.meta_path);
        }
    }
}

pub fn acquire_single_instance(config: &MonitorConfig) -> Result<AcquireState> {
    fs::create_dir_all(&config.state_dir).with_context(|| {
        format!(
            "failed to create state directory {}",
            config.state_dir.display()
        )
    })?;

    let meta_path = config.instance_meta_path();
    let Some(lock) = try_lock(&config.lock_path())? else {
        return Ok(AcquireState::AlreadyRunning {
            pid: owner_pid(&meta_path),
        });
    };

    let metadata = InstanceMetadata {
        pid: std::process::id(),
        output_path: config.output_path.clone(),
        started_at: Utc::now(),
    };
    let payload = serde_json::to_string_pretty(&metadata)?;
    fs::write(&meta_path, payload)
        .with_context(|| format!("failed to write instance metadata {}", meta_path.display()))?;

    Ok(AcquireState::Acquired(InstanceGuard {
        lock,
        meta_path,
        owner: metadata.pid,
    }))
}

/// Probes the lock without keeping it. Never creates the state directory.
pub fn inspect_running_instance(config: &MonitorConfig) -> Result<RunningState> {
    let lock_path = config.lock_path();
    if !lock_path.is_file() {
        return Ok(RunningState::NotRunning);
    }

    let meta_path = config.instance_meta_path();
    match try_lock(&lock_path)? {
        Some(lock) => {
            // Nobody holds the lock, so any metadata left behind is from a crash.
            let _ = FileExt::unlock(&lock);
            let _ = fs::remove_file(&meta_path);
            Ok(RunningState::NotRunning)
        }
        None => Ok(RunningState::Running {
            pid: owner_pid(&meta_path),
        }),
    }
}

/// Opens the lock file and takes it, or returns `None` when another handle holds it.
fn try_lock(path: &Path) -> Result<Option<File>> {
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)
        .with_context(|| format!("failed to open lock file {}", path.display()))?;
    Ok(file.try_lock_exclusive().ok().map(|()| file))
}

fn owner_pid(meta_path: &Path) -> Option<u32> {
    let raw = fs::read_to_string(meta_path).ok()?;
    serde_json::from_str::<InstanceMetadata>(&raw)
        .ok()
        .map(|metadata| metadata.pid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn config_in(dir: &Path) -> MonitorConfig {
        MonitorConfig {
            claude_dir: dir.join("claude"),
            output_path: dir.join("claude").join("active_chat.md"),
            state_dir: dir.join("state"),
            poll_interval: Duration::from_secs(60),
            max_prompt_chars: 300,
        }
    }

    fn acquired(config: &MonitorConfig) -> InstanceGuard {
        match acquire_single_instance(config).expect("acquire") {
            AcquireState::Acquired(guard) => guard,
            AcquireState::AlreadyRunning { .. } => panic!("expected acquired lock"),
        }
    }

    #[test]
    fn second_acquire_reports_running_pid() {
        let tmp = TempDir::new().expect("temp dir");
        let config = config_in(tmp.path());

        let guard = acquired(&config);
        match acquire_single_instance(&config).expect("second acquire") {
            AcquireState::AlreadyRunning { pid } => assert_eq!(pid, Some(std::process::id())),
            AcquireState::Acquired(_) => panic!("expected lock to be held"),
        }

        drop(guard);
        assert!(!config.instance_meta_path().exists());
        assert!(matches!(
            acquire_single_instance(&config).expect("reacquire"),
            AcquireState::Acquired(_)
        ));
    }

    #[test]
    fn lock_files_stay_out_of_claude_dir() {
        let tmp = TempDir::new().expect("temp dir");
        let config = config_in(tmp.path());
        fs::create_dir_all(&config.claude_dir).expect("mkdir claude");

        let _guard = acquired(&config);

        assert!(config.lock_path().is_file());
        assert!(config.instance_meta_path().is_file());
        let lock_body = fs::read_to_string(config.lock_path()).expect("read lock");
        assert!(lock_body.is_empty());
        let claude_entries = fs::read_dir(&config.claude_dir)
            .expect("list claude dir")
            .count();
        assert_eq!(claude_entries, 0);
    }

    #[test]
    fn inspect_reports_running_while_lock_is_held() {
        let tmp = TempDir::new().expect("temp dir");
        let config = config_in(tmp.path());

        assert!(matches!(
            inspect_running_instance(&config).expect("inspect idle"),
            RunningState::NotRunning
        ));
        assert!(!config.state_dir.exists());

        let guard = acquired(&config);
        match inspect_running_instance(&config).expect("inspect running") {
            RunningState::Running { pid } => assert_eq!(pid, Some(std::process::id())),
            RunningState::NotRunning => panic!("expected running state while lock is held"),
        }

        drop(guard);
        match inspect_running_instance(&config).expect("inspect stopped") {
            RunningState::NotRunning => {}
            RunningState::Running { .. } => panic!("expected not running after lock release"),
        }
    }

    #[test]
    fn inspect_clears_metadata_left_by_a_crash() {
        let tmp = TempDir::new().expect("temp dir");
        let config = config_in(tmp.path());
        fs::create_dir_all(&config.state_dir).expect("mkdir state");
        fs::write(config.lock_path(), "").expect("write lock");
        fs::write(
            config.instance_meta_path(),
            r#"{"pid":1,"output_path":"/x","started_at":"2026-01-01T00:00:00Z"}"#,
        )
        .expect("write metadata");

        assert!(matches!(
            inspect_running_instance(&config).expect("inspect"),
            RunningState::NotRunning
        ));
        assert!(!config.instance_meta_path().exists());
    }
}
