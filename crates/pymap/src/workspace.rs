//! Scan/focus roots, candidate-file discovery, and module naming.
//!
//! The scan root defines the full symbol-resolution universe; the focus root
//! is the subset that gets rendered. Both are validated up front - analysis
//! never starts against a bad pair of roots.

use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::{AnalysisError, Result};

/// The validated pair of analysis roots.
///
/// Invariant: both directories exist, both are canonical, and the focus root
/// is the scan root or a descendant of it.
#[derive(Debug, Clone)]
pub struct ScanRoots {
    scan_root: PathBuf,
    focus_root: PathBuf,
}

impl ScanRoots {
    /// Validate and canonicalize the two roots.
    ///
    /// Fails before any file is touched when a root is missing or the focus
    /// root escapes the scan root.
    pub fn new(scan_root: &Path, focus_root: &Path) -> Result<Self> {
        let scan_root = scan_root
            .canonicalize()
            .map_err(|_| AnalysisError::ScanRootNotFound {
                path: scan_root.to_path_buf(),
            })?;
        let focus_root = focus_root
            .canonicalize()
            .map_err(|_| AnalysisError::FocusRootNotFound {
                path: focus_root.to_path_buf(),
            })?;

        if !focus_root.starts_with(&scan_root) {
            return Err(AnalysisError::FocusOutsideScan {
                focus: focus_root,
                scan: scan_root,
            });
        }

        Ok(Self {
            scan_root,
            focus_root,
        })
    }

    pub fn scan_root(&self) -> &Path {
        &self.scan_root
    }

    pub fn focus_root(&self) -> &Path {
        &self.focus_root
    }

    /// Whether a file belongs to the rendered focus subset.
    pub fn is_in_focus(&self, file: &Path) -> bool {
        file.starts_with(&self.focus_root)
    }

    /// Dotted module name of a file relative to the scan root.
    ///
    /// `pkg/sub/module.py` -> `pkg.sub.module`. A package aggregator drops
    /// its `__init__` segment (`pkg/__init__.py` -> `pkg`) except directly at
    /// the scan root, where the stem is kept so the name is never empty.
    pub fn module_name(&self, file: &Path) -> String {
        let rel = file.strip_prefix(&self.scan_root).unwrap_or(file);
        let mut segments: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        if let Some(last) = segments.last_mut() {
            if let Some(stem) = last.strip_suffix(".py") {
                *last = stem.to_string();
            }
        }
        if segments.len() > 1 && segments.last().map(String::as_str) == Some("__init__") {
            segments.pop();
        }
        segments.join(".")
    }

    /// Human-readable module display used in resolved usages, e.g.
    /// `from pkg.sub.module`.
    pub fn module_display(&self, file: &Path) -> String {
        format!("from {}", self.module_name(file))
    }

    /// Artifact key for a file: path relative to the scan root's parent with
    /// normalized separators, so the scan root's own directory name stays
    /// visible in the output.
    pub fn output_key(&self, file: &Path) -> String {
        let base = self.scan_root.parent().unwrap_or(&self.scan_root);
        let rel = file.strip_prefix(base).unwrap_or(file);
        rel.components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Whether a file is a package aggregator (`__init__.py`).
pub fn is_aggregator(file: &Path) -> bool {
    file.file_name()
        .is_some_and(|name| name == "__init__.py")
}

/// Find all Python files under `root`, honoring the configured exclusions
/// and gitignore settings.
///
/// The result is sorted so downstream ordering (symbol occurrence order,
/// artifact keys) is deterministic regardless of directory enumeration order.
pub fn find_python_files(root: &Path, config: &Config) -> Vec<PathBuf> {
    use ignore::overrides::OverrideBuilder;
    use ignore::WalkBuilder;

    let mut files = Vec::new();

    // Build overrides for custom exclusions (these take precedence)
    let mut override_builder = OverrideBuilder::new(root);
    for dir in config.excluded_dirs() {
        let pattern = format!("!{}/", dir);
        if let Err(e) = override_builder.add(&pattern) {
            tracing::warn!("Invalid exclude pattern '{}': {}", pattern, e);
        }
    }
    let overrides = match override_builder.build() {
        Ok(o) => o,
        Err(e) => {
            tracing::warn!("Failed to build overrides: {}", e);
            OverrideBuilder::new(root)
                .build()
                .expect("empty override should succeed")
        }
    };

    let respect_gitignore = config.respect_gitignore;
    let mut builder = WalkBuilder::new(root);
    builder
        .hidden(true) // Skip hidden files/dirs (like .git)
        .git_ignore(respect_gitignore)
        .git_global(respect_gitignore)
        .git_exclude(respect_gitignore)
        .require_git(false) // Still work in non-git directories
        .ignore(respect_gitignore)
        .parents(respect_gitignore)
        .overrides(overrides);

    for entry in builder.build() {
        match entry {
            Ok(entry) => {
                let path = entry.path();
                if path.is_file() && path.extension().is_some_and(|ext| ext == "py") {
                    files.push(path.to_path_buf());
                }
            }
            Err(err) => {
                tracing::warn!("Error walking directory: {}", err);
            }
        }
    }

    files.sort();
    files
}
