//! Search boundaries for environment files.

use crate::project::ProjectContext;
use std::path::{Component, Path, PathBuf};

/// Separator between a top-level directory prefix and the environment name,
/// as in `billing:staging`.
pub const ENV_PREFIX_SEPARATOR: char = ':';

/// Which environment files a request file can see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchScope {
    /// Anything under the project content root.
    Project { root: PathBuf },
    /// The project content root plus the scratch area.
    ProjectAndScratch { root: PathBuf, scratch: PathBuf },
    /// Only files directly inside one directory (no subdirectories).
    Directory(PathBuf),
}

impl SearchScope {
    /// Scope for a request file.
    ///
    /// - no file: the project;
    /// - scratch file: project and scratch area;
    /// - file inside the project: the project;
    /// - any other file: its own directory, non-recursive.
    pub fn for_file(project: &ProjectContext, file: Option<&Path>) -> Self {
        let project_scope = || SearchScope::Project {
            root: project.root().to_path_buf(),
        };

        let Some(file) = file else {
            return project_scope();
        };

        if let (true, Some(scratch)) = (project.is_scratch(file), project.scratch_root()) {
            return SearchScope::ProjectAndScratch {
                root: project.root().to_path_buf(),
                scratch: scratch.to_path_buf(),
            };
        }

        if project.contains(file) {
            return project_scope();
        }

        let directory = file.parent().unwrap_or(file);
        SearchScope::Directory(directory.to_path_buf())
    }

    /// Whether an environment file at `path` is visible in this scope.
    pub fn contains(&self, path: &Path) -> bool {
        match self {
            SearchScope::Project { root } => path.starts_with(root),
            SearchScope::ProjectAndScratch { root, scratch } => {
                path.starts_with(root) || path.starts_with(scratch)
            }
            SearchScope::Directory(directory) => path.parent() == Some(directory.as_path()),
        }
    }
}

/// Environment-name prefix for a request file, e.g. `billing:` for
/// `<root>/billing/invoices.http`.
///
/// Files directly at the root, files outside the project, and scratch files
/// get no prefix.
pub fn environment_prefix(project: &ProjectContext, file: &Path) -> Option<String> {
    if !project.contains(file) {
        return None;
    }

    let relative = project.relative(file)?;
    let mut components = relative.components();
    let first = components.next()?;

    // A single component is the file itself, sitting at the root.
    components.next()?;

    match first {
        Component::Normal(segment) => segment
            .to_str()
            .map(|segment| format!("{}{}", segment, ENV_PREFIX_SEPARATOR)),
        _ => None,
    }
}
