//! Workflow source discovery.

use std::path::PathBuf;

use tracing::warn;

/// File name looked up next to the executable and in the current directory.
pub const WORKFLOWS_FILE: &str = "workflows.json";

/// Workflow sources in load order; later sources override earlier ones.
///
/// The order is: `workflows.json` beside the executable, `workflows.json`
/// in the current directory, then each of `extra`.
pub fn workflow_sources(extra: &[PathBuf]) -> Vec<PathBuf> {
    let mut sources = Vec::with_capacity(extra.len() + 2);

    match std::env::current_exe() {
        Ok(exe) => {
            if let Some(dir) = exe.parent() {
                sources.push(dir.join(WORKFLOWS_FILE));
            }
        }
        Err(e) => warn!("failed to get own path: {}", e),
    }

    sources.push(PathBuf::from(WORKFLOWS_FILE));
    sources.extend(
        extra
            .iter()
            .filter(|p| !p.as_os_str().is_empty())
            .cloned(),
    );
    sources
}

/// Split a comma-separated list of paths, dropping blanks.
pub fn split_paths(list: &str) -> Vec<PathBuf> {
    list.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .collect()
}
