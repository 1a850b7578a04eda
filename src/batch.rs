//! Solving instance files, one at a time or many in parallel.

use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::config::SolverConfig;
use crate::error::ModelError;
use crate::models::Instance;
use crate::report::Report;
use crate::utils::json::load_json;

/// Report label for an instance file: its stem, or the whole path.
pub fn label_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub fn load_instance(path: &Path) -> anyhow::Result<Instance> {
    let instance: Instance = load_json(path)?;
    tracing::info!(path = %path.display(), kind = %instance.kind(), "Loaded instance");
    Ok(instance)
}

/// Loads and solves one file. A file that cannot be loaded becomes a failed
/// row instead of an error.
pub fn solve_file(path: &Path, config: &SolverConfig) -> Report {
    match load_instance(path) {
        Ok(instance) => instance.solve(label_of(path), config),
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "Skipping unreadable instance");
            Report::failed(None, label_of(path), ModelError::Unreadable(format!("{err:#}")))
        }
    }
}

/// Solves every file in parallel. Reports keep the order of `paths`.
pub fn solve_files(paths: &[PathBuf], config: &SolverConfig) -> Vec<Report> {
    paths.par_iter().map(|path| solve_file(path, config)).collect()
}
