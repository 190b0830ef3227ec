//! Incremental scan of asset folders for models and their colour metadata.
//!
//! Work is split into small units (list one directory, inspect one model) and
//! drained against a time budget, so a caller can interleave scanning with
//! other work and observe progress through [`ScanQueue::is_running`].

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::metadata::ImportMetadata;

/// File extensions treated as importable models.
pub const MODEL_EXTENSIONS: &[&str] = &["gltf", "glb"];

/// What the scan found for one model.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanStatus {
    NoMetadata,
    Metadata {
        colour_count: usize,
        import_material_colours: Option<bool>,
    },
    /// The sidecar exists but could not be read or parsed.
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanEntry {
    pub path: PathBuf,
    pub status: ScanStatus,
}

#[derive(Debug)]
enum ScanTask {
    Directory(PathBuf),
    Model(PathBuf),
}

/// Queue of pending scan work with its accumulated results.
#[derive(Debug, Default)]
pub struct ScanQueue {
    pending: VecDeque<ScanTask>,
    results: Vec<ScanEntry>,
}

impl ScanQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop any queued work and results, then start scanning `roots`.
    pub fn restart<I>(&mut self, roots: I)
    where
        I: IntoIterator<Item = PathBuf>,
    {
        self.pending.clear();
        self.results.clear();
        for root in roots {
            if root.is_dir() {
                self.pending.push_back(ScanTask::Directory(root));
            } else if is_model_file(&root) {
                self.pending.push_back(ScanTask::Model(root));
            } else {
                warn!("Ignoring scan root {}: not a directory or model", root.display());
            }
        }
    }

    /// Whether work is still queued.
    pub fn is_running(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Process queued units until `budget` has elapsed. At least one unit is
    /// processed per call so every drain makes progress. Returns the number
    /// of units processed.
    pub fn drain(&mut self, budget: Duration) -> usize {
        let started = Instant::now();
        let mut processed = 0;

        while let Some(task) = self.pending.pop_front() {
            self.run(task);
            processed += 1;
            if started.elapsed() >= budget {
                break;
            }
        }

        debug!(
            "Scan drained {} units, {} pending, {} results",
            processed,
            self.pending.len(),
            self.results.len()
        );
        processed
    }

    /// Drain until no work remains.
    pub fn run_to_completion(&mut self, budget_per_drain: Duration) {
        while self.is_running() {
            self.drain(budget_per_drain);
        }
    }

    pub fn results(&self) -> &[ScanEntry] {
        &self.results
    }

    fn run(&mut self, task: ScanTask) {
        match task {
            ScanTask::Directory(dir) => self.list_directory(&dir),
            ScanTask::Model(path) => {
                let status = match ImportMetadata::load_for(&path) {
                    Ok(None) => ScanStatus::NoMetadata,
                    Ok(Some(metadata)) => ScanStatus::Metadata {
                        colour_count: metadata.colours().len(),
                        import_material_colours: metadata.import_material_colours(),
                    },
                    Err(e) => ScanStatus::Invalid(e.to_string()),
                };
                self.results.push(ScanEntry { path, status });
            }
        }
    }

    fn list_directory(&mut self, dir: &Path) {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to read directory {}: {}", dir.display(), e);
                return;
            }
        };

        let mut paths: Vec<PathBuf> = entries.filter_map(|e| e.ok().map(|e| e.path())).collect();
        paths.sort();

        for path in paths {
            if path.is_dir() {
                self.pending.push_back(ScanTask::Directory(path));
            } else if is_model_file(&path) {
                self.pending.push_back(ScanTask::Model(path));
            }
        }
    }
}

/// Whether `path` has one of the [`MODEL_EXTENSIONS`] (case-insensitive).
pub fn is_model_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            MODEL_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}
