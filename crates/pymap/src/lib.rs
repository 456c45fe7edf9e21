//! pymap: Python codebase mapping - definition extraction, symbol indexing,
//! and usage resolution
//!
//! This crate provides the analysis core behind the pymap visualizer:
//! - Per-file definition extraction from Python sources using tree-sitter
//! - Import alias canonicalization and instance-attribute type bindings
//! - A global symbol index built over the full scan universe
//! - Cross-file usage resolution against a rendered focus subset
//! - Assembly of the nested JSON artifact consumed by the front-end

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

pub mod aliases;
pub mod config;
pub mod extract;
pub mod index;
pub mod output;
pub mod parse;
pub mod pipeline;
pub mod resolve;
pub mod workspace;

// Re-export main types
pub use aliases::{AliasEntry, AliasTable};
pub use config::Config;
pub use extract::{analyze_source, BoundClass, FileAnalysis};
pub use index::SymbolIndex;
pub use output::{AnalysisArtifact, DefRecord, FileMeta};
pub use pipeline::{analyze, AnalysisReport};
pub use resolve::ResolvedUsage;
pub use workspace::ScanRoots;

/// A source span in 1-indexed lines.
///
/// Spans cover the `def`/`class` statement itself, not any decorators above
/// it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start_line: u32,
    pub end_line: u32,
}

impl Span {
    pub fn new(start_line: u32, end_line: u32) -> Self {
        Self {
            start_line,
            end_line,
        }
    }
}

/// Raw usage data collected for one definition while its file is walked.
///
/// `names` holds canonicalized load-context identifiers; `base_attrs` maps an
/// attribute-access base (already alias- and binding-resolved) to the set of
/// attribute names accessed on it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageSet {
    pub names: BTreeSet<String>,
    pub base_attrs: BTreeMap<String, BTreeSet<String>>,
}

impl UsageSet {
    pub fn record_name(&mut self, name: impl Into<String>) {
        self.names.insert(name.into());
    }

    pub fn record_attr(&mut self, base: impl Into<String>, attr: impl Into<String>) {
        self.base_attrs
            .entry(base.into())
            .or_default()
            .insert(attr.into());
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty() && self.base_attrs.is_empty()
    }
}

/// A class definition extracted from one file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassDef {
    pub span: Span,
    pub usage: UsageSet,
}

/// A function or method definition extracted from one file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FunctionDef {
    /// Declared parameter names in order, `self` included, splats excluded.
    pub parameters: Vec<String>,
    pub span: Span,
    pub usage: UsageSet,
    /// Set when a decorator chain contains an API-routing keyword.
    pub is_endpoint: bool,
}

/// A definition extracted from a Python file.
///
/// Identity is `(file, qualified name)` where the qualified name is
/// `Class.method` for methods and the bare name otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum Definition {
    Class(ClassDef),
    Function(FunctionDef),
}

impl Definition {
    pub fn span(&self) -> Span {
        match self {
            Definition::Class(c) => c.span,
            Definition::Function(f) => f.span,
        }
    }

    pub fn usage(&self) -> &UsageSet {
        match self {
            Definition::Class(c) => &c.usage,
            Definition::Function(f) => &f.usage,
        }
    }

    pub fn usage_mut(&mut self) -> &mut UsageSet {
        match self {
            Definition::Class(c) => &mut c.usage,
            Definition::Function(f) => &mut f.usage,
        }
    }

    pub fn parameters(&self) -> &[String] {
        match self {
            Definition::Class(_) => &[],
            Definition::Function(f) => &f.parameters,
        }
    }

    pub fn is_class(&self) -> bool {
        matches!(self, Definition::Class(_))
    }
}

/// Errors that can occur while running an analysis.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("Failed to read or write: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Scan root does not exist: {path}")]
    ScanRootNotFound { path: PathBuf },

    #[error("Focus root does not exist: {path}")]
    FocusRootNotFound { path: PathBuf },

    #[error("Focus root {focus} is not inside scan root {scan}")]
    FocusOutsideScan { focus: PathBuf, scan: PathBuf },

    #[error("Failed to serialize analysis output: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
