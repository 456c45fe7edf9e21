//! Global symbol index built over the full scan universe.
//!
//! The index is the synchronization barrier of the pipeline: it is built only
//! after every file's extraction has completed, because any definition may
//! reference a symbol defined in any other file. Once built it is immutable,
//! which is what makes per-definition resolution safe to parallelize.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::extract::FileAnalysis;
use crate::workspace::{is_aggregator, ScanRoots};

/// How a name entered the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OccurrenceKind {
    /// A class, function, or method definition.
    Definition,
    /// A package name standing for its `__init__.py` aggregator file.
    Package,
}

/// One place a symbol name is defined.
#[derive(Debug, Clone)]
pub struct Occurrence {
    pub file: PathBuf,
    pub qualified: String,
    /// Display string for resolved usages, e.g. `from pkg.sub.module`.
    pub module_display: String,
    pub kind: OccurrenceKind,
}

/// Symbol name -> every location defining something by that name.
///
/// Multiple files may define the same bare name; all occurrences are kept in
/// sorted-file order and resolution-time policy chooses among them.
#[derive(Debug, Default)]
pub struct SymbolIndex {
    symbols: HashMap<String, Vec<Occurrence>>,
    /// Dotted module name -> defining file, for preferred-file pinning.
    module_files: HashMap<String, PathBuf>,
}

impl SymbolIndex {
    /// Build the index from all per-file analyses.
    ///
    /// `analyses` must already be in sorted-path order; occurrence order (and
    /// therefore resolution of multiply-defined names) follows it.
    pub fn build(analyses: &[(PathBuf, FileAnalysis)], roots: &ScanRoots) -> Self {
        let mut index = Self::default();

        for (file, analysis) in analyses {
            let module = roots.module_name(file);
            let display = roots.module_display(file);
            index.module_files.insert(module.clone(), file.clone());

            // `import package` should land on the aggregator file
            if is_aggregator(file) {
                index.symbols.entry(module.clone()).or_default().push(
                    Occurrence {
                        file: file.clone(),
                        qualified: module.clone(),
                        module_display: display.clone(),
                        kind: OccurrenceKind::Package,
                    },
                );
            }

            for qualified in analysis.definitions.keys() {
                index
                    .symbols
                    .entry(qualified.clone())
                    .or_default()
                    .push(Occurrence {
                        file: file.clone(),
                        qualified: qualified.clone(),
                        module_display: display.clone(),
                        kind: OccurrenceKind::Definition,
                    });

                // Methods are reachable by bare name too
                if let Some((_, method)) = qualified.rsplit_once('.') {
                    index
                        .symbols
                        .entry(method.to_string())
                        .or_default()
                        .push(Occurrence {
                            file: file.clone(),
                            qualified: qualified.clone(),
                            module_display: display.clone(),
                            kind: OccurrenceKind::Definition,
                        });
                }
            }
        }

        index
    }

    /// All places a name is defined, in sorted-file order.
    pub fn occurrences(&self, name: &str) -> &[Occurrence] {
        self.symbols
            .get(name)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// The file defining a dotted module, if it was scanned.
    pub fn file_for_module(&self, module: &str) -> Option<&Path> {
        self.module_files.get(module).map(|p| p.as_path())
    }

    /// Number of distinct indexed names.
    pub fn name_count(&self) -> usize {
        self.symbols.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze_source;
    use tempfile::TempDir;

    fn roots_in(temp: &TempDir) -> ScanRoots {
        ScanRoots::new(temp.path(), temp.path()).unwrap()
    }

    fn analysis_of(source: &str) -> FileAnalysis {
        analyze_source(Path::new("mem.py"), source, 500).unwrap()
    }

    #[test]
    fn indexes_classes_functions_and_methods() {
        let temp = TempDir::new().unwrap();
        let roots = roots_in(&temp);
        let file = roots.scan_root().join("services/auth.py");
        let analysis = analysis_of(
            r#"
class AuthService:
    def login(self, user):
        pass

def check_token(token):
    pass
"#,
        );

        let index = SymbolIndex::build(&[(file.clone(), analysis)], &roots);

        assert_eq!(index.occurrences("AuthService").len(), 1);
        assert_eq!(index.occurrences("AuthService.login").len(), 1);
        assert_eq!(index.occurrences("check_token").len(), 1);
        // Bare method name also resolves
        let bare = index.occurrences("login");
        assert_eq!(bare.len(), 1);
        assert_eq!(bare[0].qualified, "AuthService.login");
        assert_eq!(bare[0].module_display, "from services.auth");
    }

    #[test]
    fn keeps_all_occurrences_of_a_shared_name() {
        let temp = TempDir::new().unwrap();
        let roots = roots_in(&temp);
        let a = roots.scan_root().join("a.py");
        let b = roots.scan_root().join("b.py");
        let source = "def helper():\n    pass\n";

        let index = SymbolIndex::build(
            &[
                (a.clone(), analysis_of(source)),
                (b.clone(), analysis_of(source)),
            ],
            &roots,
        );

        let occs = index.occurrences("helper");
        assert_eq!(occs.len(), 2);
        // Sorted-file order is preserved
        assert_eq!(occs[0].file, a);
        assert_eq!(occs[1].file, b);
    }

    #[test]
    fn registers_package_aggregators() {
        let temp = TempDir::new().unwrap();
        let roots = roots_in(&temp);
        let init = roots.scan_root().join("models/__init__.py");
        let analysis = analysis_of("from models.user import User\n");

        let index = SymbolIndex::build(&[(init.clone(), analysis)], &roots);

        let occs = index.occurrences("models");
        assert_eq!(occs.len(), 1);
        assert_eq!(occs[0].kind, OccurrenceKind::Package);
        assert_eq!(occs[0].file, init);
        assert_eq!(index.file_for_module("models"), Some(init.as_path()));
    }

    #[test]
    fn module_lookup_misses_unknown_modules() {
        let temp = TempDir::new().unwrap();
        let roots = roots_in(&temp);
        let index = SymbolIndex::build(&[], &roots);
        assert!(index.file_for_module("os.path").is_none());
        assert!(index.occurrences("anything").is_empty());
        assert_eq!(index.name_count(), 0);
    }
}
