//! Workspace sandbox — filesystem containment to the agent's workspace.
//!
//! Resolves every file-path argument to an absolute path that is a
//! descendant of the workspace root, and rejects everything else:
//! traversal via `..`, symlinks whose target escapes the root, and paths
//! containing null bytes.

use std::path::{Component, Path, PathBuf};

/// Error returned when sandbox resolution fails.
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("Path '{path}' is outside workspace")]
    OutsideWorkspace { path: String },

    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Failed to resolve path '{path}': {reason}")]
    ResolveFailed { path: String, reason: String },
}

/// Per-agent filesystem containment policy.
///
/// The root is created on first use with owner-only permissions and held in
/// canonical form, so the descendant check is a plain prefix comparison on
/// canonicalized paths.
#[derive(Debug, Clone)]
pub struct WorkspaceSandbox {
    root: PathBuf,
}

impl WorkspaceSandbox {
    /// Open (creating if needed) the workspace rooted at `root`.
    pub fn create(root: impl Into<PathBuf>) -> Result<Self, SandboxError> {
        let root = root.into();

        std::fs::create_dir_all(&root).map_err(|e| SandboxError::ResolveFailed {
            path: root.display().to_string(),
            reason: format!("create workspace: {e}"),
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = std::fs::set_permissions(&root, std::fs::Permissions::from_mode(0o700));
        }

        let root = root
            .canonicalize()
            .map_err(|e| SandboxError::ResolveFailed {
                path: root.display().to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self { root })
    }

    /// The canonical workspace root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a path argument for reading: the target must exist, symlinks
    /// are followed, and the final target must stay inside the workspace.
    pub fn resolve_read(&self, raw: &str) -> Result<PathBuf, SandboxError> {
        let joined = self.join(raw)?;
        let canonical = joined
            .canonicalize()
            .map_err(|e| SandboxError::ResolveFailed {
                path: raw.into(),
                reason: e.to_string(),
            })?;
        self.check_contained(raw, &canonical)?;
        Ok(canonical)
    }

    /// Resolve a path argument for writing or deletion: the target may not
    /// exist yet, so the deepest existing ancestor is canonicalized and the
    /// remaining components are appended after rejecting any traversal.
    pub fn resolve_write(&self, raw: &str) -> Result<PathBuf, SandboxError> {
        let joined = self.join(raw)?;

        if joined.exists() {
            let canonical = joined
                .canonicalize()
                .map_err(|e| SandboxError::ResolveFailed {
                    path: raw.into(),
                    reason: e.to_string(),
                })?;
            self.check_contained(raw, &canonical)?;
            return Ok(canonical);
        }

        // Split into existing ancestor + pending suffix.
        let mut ancestor = joined.clone();
        let mut suffix: Vec<std::ffi::OsString> = Vec::new();
        while !ancestor.exists() {
            match (ancestor.parent(), ancestor.file_name()) {
                (Some(parent), Some(name)) => {
                    suffix.push(name.to_os_string());
                    ancestor = parent.to_path_buf();
                }
                _ => {
                    return Err(SandboxError::InvalidPath {
                        path: raw.into(),
                        reason: "no existing ancestor".into(),
                    })
                }
            }
        }

        let mut resolved = ancestor
            .canonicalize()
            .map_err(|e| SandboxError::ResolveFailed {
                path: raw.into(),
                reason: e.to_string(),
            })?;
        for name in suffix.iter().rev() {
            resolved.push(name);
        }

        // The suffix could not be canonicalized, so reject traversal in it
        // lexically.
        if resolved
            .components()
            .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(SandboxError::OutsideWorkspace { path: raw.into() });
        }

        self.check_contained(raw, &resolved)?;
        Ok(resolved)
    }

    fn join(&self, raw: &str) -> Result<PathBuf, SandboxError> {
        if raw.is_empty() {
            return Err(SandboxError::InvalidPath {
                path: raw.into(),
                reason: "empty path".into(),
            });
        }
        if raw.contains('\0') {
            return Err(SandboxError::InvalidPath {
                path: raw.escape_default().to_string(),
                reason: "null byte in path".into(),
            });
        }

        let input = Path::new(raw);
        Ok(if input.is_absolute() {
            input.to_path_buf()
        } else {
            self.root.join(input)
        })
    }

    fn check_contained(&self, raw: &str, canonical: &Path) -> Result<(), SandboxError> {
        if canonical == self.root || canonical.starts_with(&self.root) {
            Ok(())
        } else {
            Err(SandboxError::OutsideWorkspace { path: raw.into() })
        }
    }
}
