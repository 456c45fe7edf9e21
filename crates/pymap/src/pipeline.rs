//! The end-to-end analysis pipeline.
//!
//! A bounded, one-shot batch job: enumerate candidate files, extract each one
//! in parallel (extraction is pure per file), synchronize on the symbol
//! index, resolve usages in parallel against the immutable index, and
//! assemble the artifact. There is no cancellation or retry model; a file
//! that fails to parse or read is logged and absent from every downstream
//! structure.

use std::path::PathBuf;

use rayon::prelude::*;

use crate::config::Config;
use crate::extract::{analyze_source, FileAnalysis};
use crate::index::SymbolIndex;
use crate::output::{assemble, AnalysisArtifact};
use crate::resolve::{ResolvedDefs, Resolver};
use crate::workspace::{find_python_files, ScanRoots};
use crate::Result;

/// The artifact plus run counters for the CLI summary.
#[derive(Debug)]
pub struct AnalysisReport {
    pub artifact: AnalysisArtifact,
    pub files_scanned: usize,
    pub files_skipped: usize,
    pub definition_count: usize,
}

/// Run the full analysis over validated roots.
pub fn analyze(roots: &ScanRoots, config: &Config) -> Result<AnalysisReport> {
    let files = find_python_files(roots.scan_root(), config);
    let files_scanned = files.len();
    tracing::debug!("Scanning {} Python files", files_scanned);

    // Extract files in parallel; each file is independent at this stage
    let max_depth = config.max_recursion_depth;
    let analyses: Vec<(PathBuf, FileAnalysis)> = files
        .par_iter()
        .filter_map(|file| match std::fs::read_to_string(file) {
            Ok(source) => {
                analyze_source(file, &source, max_depth).map(|analysis| (file.clone(), analysis))
            }
            Err(e) => {
                tracing::warn!("Skipping unreadable file {}: {}", file.display(), e);
                None
            }
        })
        .collect();
    let files_skipped = files_scanned - analyses.len();
    let definition_count = analyses.iter().map(|(_, a)| a.definitions.len()).sum();

    // Barrier: no resolution may start until every extraction has finished,
    // since any definition may reference a symbol from any other file
    let index = SymbolIndex::build(&analyses, roots);

    // Resolution is per-definition independent and read-only over the index;
    // only focus-set files are rendered, so only they are resolved
    let resolver = Resolver::new(&index, roots);
    let resolved: Vec<(PathBuf, &FileAnalysis, ResolvedDefs)> = analyses
        .par_iter()
        .filter(|(file, _)| roots.is_in_focus(file))
        .map(|(file, analysis)| (file.clone(), analysis, resolver.resolve_file(analysis)))
        .collect();

    let artifact = assemble(roots, &resolved);
    Ok(AnalysisReport {
        artifact,
        files_scanned,
        files_skipped,
        definition_count,
    })
}
