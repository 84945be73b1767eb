//! Workspace path scoping.
//!
//! Tool arguments name paths relative to the workspace root. Resolution
//! rejects `..` components, absolute paths that land outside the root, and
//! symlinks that point out of it.

use std::path::{Component, Path, PathBuf};

/// Error returned when path validation fails.
#[derive(Debug, thiserror::Error)]
pub enum PathValidationError {
    #[error("Path '{path}' is outside the workspace")]
    OutsideWorkspace { path: String },

    #[error("Path traversal detected in '{path}'")]
    PathTraversal { path: String },

    #[error("Path is empty")]
    Empty,

    #[error("Failed to canonicalize path '{path}': {reason}")]
    CanonicalizeFailed { path: String, reason: String },
}

/// A directory every scoped tool operates inside.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Create the root if needed and pin its canonical form.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, PathValidationError> {
        let root = root.as_ref();
        let display = root.display().to_string();
        std::fs::create_dir_all(root).map_err(|e| PathValidationError::CanonicalizeFailed {
            path: display.clone(),
            reason: e.to_string(),
        })?;
        let root = root
            .canonicalize()
            .map_err(|e| PathValidationError::CanonicalizeFailed {
                path: display,
                reason: e.to_string(),
            })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a tool-supplied path to an absolute path inside the workspace.
    ///
    /// The target does not need to exist. The deepest existing ancestor is
    /// canonicalized so a symlink cannot smuggle the result outside.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, PathValidationError> {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return Err(PathValidationError::Empty);
        }

        let input = Path::new(trimmed);
        if input.components().any(|c| matches!(c, Component::ParentDir)) {
            return Err(PathValidationError::PathTraversal { path: path.into() });
        }

        let joined = if input.is_absolute() {
            input.to_path_buf()
        } else {
            self.root.join(input)
        };

        let resolved = canonicalize_existing_prefix(&joined).map_err(|e| {
            PathValidationError::CanonicalizeFailed {
                path: path.into(),
                reason: e.to_string(),
            }
        })?;

        if !resolved.starts_with(&self.root) {
            return Err(PathValidationError::OutsideWorkspace { path: path.into() });
        }
        Ok(resolved)
    }

    /// Same as [`resolve`](Self::resolve), but an empty path means the root.
    pub fn resolve_dir(&self, path: Option<&str>) -> Result<PathBuf, PathValidationError> {
        match path.map(str::trim) {
            None | Some("") | Some(".") => Ok(self.root.clone()),
            Some(p) => self.resolve(p),
        }
    }

    /// Render an absolute path relative to the root for tool output.
    pub fn display_relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| path.display().to_string())
    }
}

/// Symlink hops followed by hand before giving up.
const MAX_LINK_HOPS: usize = 8;

/// Canonicalize the longest existing ancestor and re-append the rest.
///
/// "Existing" means the directory entry exists, so a dangling symlink stops
/// the walk. Its target is then resolved by hand and checked like any other
/// path, instead of being written through blindly.
fn canonicalize_existing_prefix(path: &Path) -> std::io::Result<PathBuf> {
    resolve_prefix(path, 0)
}

fn resolve_prefix(path: &Path, hops: usize) -> std::io::Result<PathBuf> {
    let mut existing = path.to_path_buf();
    let mut tail = Vec::new();
    while existing.symlink_metadata().is_err() {
        match (existing.file_name(), existing.parent()) {
            (Some(name), Some(parent)) => {
                tail.push(name.to_os_string());
                existing = parent.to_path_buf();
            }
            _ => break,
        }
    }

    let mut resolved = match existing.canonicalize() {
        Ok(resolved) => resolved,
        Err(e) => {
            let is_link = existing
                .symlink_metadata()
                .is_ok_and(|m| m.file_type().is_symlink());
            if !is_link || hops >= MAX_LINK_HOPS {
                return Err(e);
            }
            let target = std::fs::read_link(&existing)?;
            if target.components().any(|c| matches!(c, Component::ParentDir)) {
                return Err(std::io::Error::other(format!(
                    "symlink '{}' points through '..'",
                    existing.display()
                )));
            }
            let target = match existing.parent() {
                Some(parent) if target.is_relative() => parent.canonicalize()?.join(target),
                _ => target,
            };
            resolve_prefix(&target, hops + 1)?
        }
    };
    for part in tail.into_iter().rev() {
        resolved.push(part);
    }
    Ok(resolved)
}
