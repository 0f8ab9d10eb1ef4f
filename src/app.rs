use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate};
use tracing::{error, info, warn};

use crate::config::{MAX_PROMPTS_PER_SESSION, MAX_SESSIONS_PER_PROJECT, MonitorConfig};
use crate::error::MonitorError;
use crate::history::{ProjectGroups, today_sessions};
use crate::output::write_atomic;
use crate::process_guard::{self, AcquireState, RunningState};
use crate::render::render_markdown;
use crate::session::{SessionCache, locate_session_file};
use crate::util::sleep_unless;

/// One polling workflow: the config plus the prompt cache that outlives each cycle.
pub struct Monitor {
    config: MonitorConfig,
    cache: SessionCache,
}

impl Monitor {
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            config,
            cache: SessionCache::new(),
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn cache(&self) -> &SessionCache {
        &self.cache
    }

    /// Today's sessions grouped by project, each carrying its leading prompts.
    pub fn collect(&mut self, today: NaiveDate) -> ProjectGroups {
        let mut groups = today_sessions(
            &self.config.history_path(),
            today,
            MAX_SESSIONS_PER_PROJECT,
        );
        let projects_dir = self.config.projects_dir();
        for sessions in groups.values_mut() {
            for session in sessions.iter_mut() {
                let Some(session_file) =
                    locate_session_file(&projects_dir, &session.project_path, &session.session_id)
                else {
                    warn!(session_id = %session.session_id, "session file not found");
                    continue;
                };
                session.prompts = self.cache.get(
                    &session_file,
                    MAX_PROMPTS_PER_SESSION,
                    self.config.max_prompt_chars,
                );
            }
        }
        groups
    }

    pub fn render_at(&mut self, now: DateTime<Local>) -> String {
        let groups = self.collect(now.date_naive());
        info!(projects = groups.len(), "collected today's sessions");
        render_markdown(&groups, now)
    }

    /// Renders and writes the document. Failures are logged, never returned.
    pub fn run_cycle(&mut self) -> bool {
        self.run_cycle_at(Local::now())
    }

    pub fn run_cycle_at(&mut self, now: DateTime<Local>) -> bool {
        info!("updating workspace status");
        let document = self.render_at(now);
        match write_atomic(&self.config.output_path, &document) {
            Ok(()) => {
                info!(path = %self.config.output_path.display(), "updated output");
                true
            }
            Err(err) => {
                error!(
                    path = %self.config.output_path.display(),
                    error = %format!("{err:#}"),
                    "failed to write output"
                );
                false
            }
        }
    }
}

pub fn ensure_claude_dir(config: &MonitorConfig) -> Result<()> {
    if !config.claude_dir.is_dir() {
        return Err(MonitorError::MissingClaudeDir(config.claude_dir.clone()).into());
    }
    Ok(())
}

/// Runs cycles until Ctrl+C.
pub fn run(config: MonitorConfig) -> Result<()> {
    ensure_claude_dir(&config)?;
    let _guard = match process_guard::acquire_single_instance(&config)? {
        AcquireState::Acquired(guard) => guard,
        AcquireState::AlreadyRunning { pid } => {
            return Err(MonitorError::AlreadyRunning { pid }.into());
        }
    };
    let stop = install_stop_signal()?;

    info!(
        interval_secs = config.poll_interval.as_secs(),
        output = %config.output_path.display(),
        "starting workspace monitor"
    );

    let poll_interval = config.poll_interval;
    let mut monitor = Monitor::new(config);
    while !stop.load(Ordering::Relaxed) {
        monitor.run_cycle();
        sleep_unless(poll_interval, || stop.load(Ordering::Relaxed));
    }

    info!("stopped");
    Ok(())
}

pub fn run_once(config: MonitorConfig) -> Result<bool> {
    ensure_claude_dir(&config)?;
    Ok(Monitor::new(config).run_cycle())
}

pub fn print_document(config: MonitorConfig) -> Result<()> {
    ensure_claude_dir(&config)?;
    let document = Monitor::new(config).render_at(Local::now());
    println!("{document}");
    Ok(())
}

pub fn print_status(config: &MonitorConfig) -> Result<()> {
    let running = process_guard::inspect_running_instance(config)?;

    println!("workspace-monitor status");
    match running {
        RunningState::NotRunning => println!("running: false"),
        RunningState::Running { pid } => {
            println!("running: true");
            if let Some(pid) = pid {
                println!("pid: {pid}");
            }
        }
    }
    print_paths(config);
    println!("interval_secs: {}", config.poll_interval.as_secs());
    println!("max_prompt_chars: {}", config.max_prompt_chars);
    Ok(())
}

pub fn doctor(config: &MonitorConfig) -> Result<u8> {
    let mut issues = 0u8;

    println!("workspace-monitor doctor");
    print_paths(config);

    if config.claude_dir.is_dir() {
        println!("[OK] Claude directory exists.");
    } else {
        issues += 1;
        println!("[WARN] Claude directory not found.");
    }

    if config.history_path().is_file() {
        println!("[OK] History file found.");
    } else {
        issues += 1;
        println!("[WARN] History file not found; no sessions will be listed.");
    }

    if config.projects_dir().is_dir() {
        println!("[OK] Projects directory exists.");
    } else {
        issues += 1;
        println!("[WARN] Projects directory not found; prompts will show as none.");
    }

    match output_parent(&config.output_path) {
        Some(parent) if parent.is_dir() => println!("[OK] Output directory exists."),
        Some(_) => println!("[INFO] Output directory will be created on first write."),
        None => {
            issues += 1;
            println!("[WARN] Output path has no parent directory.");
        }
    }

    if issues == 0 {
        println!("Doctor: healthy");
        Ok(0)
    } else {
        println!("Doctor: {issues} issue(s) found");
        Ok(1)
    }
}

fn output_parent(path: &Path) -> Option<&Path> {
    path.parent().filter(|parent| !parent.as_os_str().is_empty())
}

fn print_paths(config: &MonitorConfig) {
    println!("claude_dir: {}", config.claude_dir.display());
    println!("history: {}", config.history_path().display());
    println!("projects: {}", config.projects_dir().display());
    println!("output: {}", config.output_path.display());
    println!("state_dir: {}", config.state_dir.display());
}

fn install_stop_signal() -> Result<Arc<AtomicBool>> {
    let stop = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stop);
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::Relaxed);
    })
    .context("failed to install Ctrl+C handler")?;
    Ok(stop)
}
