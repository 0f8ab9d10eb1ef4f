use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::prompt::parse_user_prompt;

/// Extraction results keyed by session file path, valid while the file's mtime is unchanged.
///
/// Entries never expire on their own; a changed mtime replaces the entry on
/// the next lookup. The cache only holds metadata and extracted text, never
/// open file handles.
#[derive(Debug, Default)]
pub struct SessionCache {
    entries: HashMap<PathBuf, CachedPrompts>,
}

#[derive(Debug, Clone)]
struct CachedPrompts {
    modified: SystemTime,
    prompts: Vec<String>,
}

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(
        &mut self,
        session_file: &Path,
        max_prompts: usize,
        max_chars: usize,
    ) -> Vec<String> {
        self.get_with(session_file, |path| extract_prompts(path, max_prompts, max_chars))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn get_with(
        &mut self,
        session_file: &Path,
        extract: impl FnOnce(&Path) -> Vec<String>,
    ) -> Vec<String> {
        let Some(modified) = fs::metadata(session_file)
            .and_then(|meta| meta.modified())
            .ok()
        else {
            return Vec::new();
        };

        if let Some(cached) = self.entries.get(session_file)
            && cached.modified == modified
        {
            debug!(path = %session_file.display(), "session prompts served from cache");
            return cached.prompts.clone();
        }

        let prompts = extract(session_file);
        self.entries.insert(
            session_file.to_path_buf(),
            CachedPrompts {
                modified,
                prompts: prompts.clone(),
            },
        );
        prompts
    }
}

/// Returns the first `max_prompts` user prompts of a session log, in file order.
///
/// Reading stops as soon as enough prompts are collected. A file that cannot
/// be opened or read yields whatever was gathered before the failure.
pub fn extract_prompts(session_file: &Path, max_prompts: usize, max_chars: usize) -> Vec<String> {
    let mut prompts = Vec::new();
    if max_prompts == 0 {
        return prompts;
    }
    if let Err(err) = read_prompts(session_file, max_prompts, max_chars, &mut prompts) {
        warn!(path = %session_file.display(), error = %err, "failed to read session file");
    }
    prompts
}

fn read_prompts(
    session_file: &Path,
    max_prompts: usize,
    max_chars: usize,
    prompts: &mut Vec<String>,
) -> Result<()> {
    let file = File::open(session_file)
        .with_context(|| format!("failed to open session file {}", session_file.display()))?;
    let mut reader = BufReader::new(file);
    let mut line = String::new();
    while prompts.len() < max_prompts {
        line.clear();
        let bytes = reader
            .read_line(&mut line)
            .with_context(|| format!("failed to read session file {}", session_file.display()))?;
        if bytes == 0 {
            break;
        }
        if let Some(prompt) = parse_user_prompt(&line, max_chars) {
            prompts.push(prompt);
        }
    }
    Ok(())
}

/// Directory name the CLI uses for a project path under `projects/`.
pub fn project_dir_name(project_path: &str) -> String {
    project_path
        .chars()
        .map(|ch| match ch {
            ':' | '\\' | '/' | ' ' | '_' => '-',
            other => other,
        })
        .collect()
}

/// Finds `<session_id>.jsonl` for a project.
///
/// Tries the directory derived from the project path first, then any project
/// directory holding a file with that name. Among several matches the first
/// one the directory walk yields wins.
pub fn locate_session_file(
    projects_dir: &Path,
    project_path: &str,
    session_id: &str,
) -> Option<PathBuf> {
    let file_name = format!("{session_id}.jsonl");
    let direct = projects_dir
        .join(project_dir_name(project_path))
        .join(&file_name);
    if direct.is_file() {
        return Some(direct);
    }

    WalkDir::new(projects_dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_dir())
        .map(|entry| entry.path().join(&file_name))
        .find(|candidate| candidate.is_file())
}
