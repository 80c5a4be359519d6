//! Project layout: the content root and the optional scratch area.
//!
//! Several decisions depend on where a request file lives relative to the
//! project: which environment files are visible, whether pre-request scripts
//! run, and how far the script search may climb.

use std::path::{Path, PathBuf};

/// The project a batch runs in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectContext {
    root: PathBuf,
    scratch_root: Option<PathBuf>,
}

impl ProjectContext {
    /// Project rooted at `root`, without a scratch area.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            scratch_root: None,
        }
    }

    /// Adds a scratch area; files under it are treated as throwaway buffers.
    pub fn with_scratch_root(mut self, scratch_root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(scratch_root.into());
        self
    }

    /// Project content root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn scratch_root(&self) -> Option<&Path> {
        self.scratch_root.as_deref()
    }

    /// Whether `path` lies in the scratch area.
    pub fn is_scratch(&self, path: &Path) -> bool {
        self.scratch_root
            .as_deref()
            .map_or(false, |scratch| path.starts_with(scratch))
    }

    /// Whether `path` is regular project content (inside the root, not scratch).
    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.root) && !self.is_scratch(path)
    }

    /// `path` relative to the project root, if it is inside it.
    pub fn relative<'a>(&self, path: &'a Path) -> Option<&'a Path> {
        path.strip_prefix(&self.root).ok()
    }
}
