//! Locating the pre-request script for a request file.

use std::path::{Path, PathBuf};

/// Finds the nearest `script_name` walking up from `start_dir`.
///
/// The walk never leaves `project_root`; the root itself is the last
/// directory checked. A `start_dir` outside the project finds nothing.
pub fn find_pre_request_script(
    start_dir: &Path,
    project_root: &Path,
    script_name: &str,
) -> Option<PathBuf> {
    if !start_dir.starts_with(project_root) {
        log::debug!(
            "{} is outside project {}, no pre-request script",
            start_dir.display(),
            project_root.display()
        );
        return None;
    }

    for dir in start_dir.ancestors() {
        if !dir.starts_with(project_root) {
            break;
        }
        let candidate = dir.join(script_name);
        if candidate.is_file() {
            log::debug!("Using pre-request script {}", candidate.display());
            return Some(candidate);
        }
    }

    None
}
