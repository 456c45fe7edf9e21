//! Usage resolution against the symbol index and focus set.
//!
//! The second phase of the analysis: every definition's raw usage data is
//! folded into a `used_functions` map of resolved cross-file references.
//! Resolution is a pure lookup over the immutable index - no tree walking,
//! deterministic given the same index and focus set.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

use crate::extract::FileAnalysis;
use crate::index::{Occurrence, OccurrenceKind, SymbolIndex};
use crate::workspace::ScanRoots;
use crate::Definition;

/// A resolved reference in a definition's `used_functions` map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ResolvedUsage {
    /// Simple reference: the defining module's display string.
    Module(String),
    /// Class (or module-like base) with the methods accessed on it.
    Class { file: String, methods: Vec<String> },
}

/// `qualified name -> used_functions` for one file's definitions.
pub type ResolvedDefs = BTreeMap<String, BTreeMap<String, ResolvedUsage>>;

/// Resolves raw usages against a built index and validated roots.
pub struct Resolver<'a> {
    index: &'a SymbolIndex,
    roots: &'a ScanRoots,
}

impl<'a> Resolver<'a> {
    pub fn new(index: &'a SymbolIndex, roots: &'a ScanRoots) -> Self {
        Self { index, roots }
    }

    /// Resolve every definition of one file.
    pub fn resolve_file(&self, analysis: &FileAnalysis) -> ResolvedDefs {
        analysis
            .definitions
            .iter()
            .map(|(qualified, def)| {
                (
                    qualified.clone(),
                    self.resolve_definition(def, analysis),
                )
            })
            .collect()
    }

    /// Fold one definition's `used_names` and `used_base_attrs` into a
    /// `used_functions` map. Unresolved usages are silently omitted - stdlib
    /// and third-party names are expected to miss.
    pub fn resolve_definition(
        &self,
        def: &Definition,
        analysis: &FileAnalysis,
    ) -> BTreeMap<String, ResolvedUsage> {
        let usage = def.usage();
        let mut used_functions = BTreeMap::new();

        for name in &usage.names {
            if let Some(occ) = self.pick(name, None) {
                used_functions.insert(
                    name.clone(),
                    ResolvedUsage::Module(occ.module_display.clone()),
                );
            }
        }

        // Grouped entries overwrite same-named simple entries
        for (base, attrs) in &usage.base_attrs {
            let preferred = self.preferred_file_for_base(base, analysis);
            let Some(occ) = self.pick(base, preferred) else {
                continue;
            };

            match occ.kind {
                OccurrenceKind::Package => {
                    // The base names a package, not a single symbol:
                    // re-resolve each attribute rooted at the aggregator file
                    for attr in attrs {
                        if let Some(attr_occ) = self.pick(attr, Some(&occ.file)) {
                            used_functions.insert(
                                attr.clone(),
                                ResolvedUsage::Module(attr_occ.module_display.clone()),
                            );
                        }
                    }
                }
                OccurrenceKind::Definition => {
                    used_functions.insert(
                        base.clone(),
                        ResolvedUsage::Class {
                            file: occ.module_display.clone(),
                            methods: attrs.iter().cloned().collect(),
                        },
                    );
                }
            }
        }

        used_functions
    }

    /// Choose among a name's occurrences:
    /// 1. the preferred file, when supplied, in focus, and a candidate;
    /// 2. else the first in-focus occurrence;
    /// 3. else nothing - the usage stays unresolved.
    fn pick(&self, name: &str, preferred: Option<&Path>) -> Option<&'a Occurrence> {
        let candidates = self.index.occurrences(name);

        if let Some(preferred) = preferred {
            if self.roots.is_in_focus(preferred) {
                if let Some(occ) = candidates.iter().find(|o| o.file == preferred) {
                    return Some(occ);
                }
            }
        }

        candidates.iter().find(|o| self.roots.is_in_focus(&o.file))
    }

    /// The file an instance-attribute binding pinned for this base, if the
    /// binding recorded an origin module that maps to a scanned file.
    fn preferred_file_for_base(&self, base: &str, analysis: &FileAnalysis) -> Option<&'a Path> {
        let bound = analysis
            .bindings
            .values()
            .find(|b| b.class_name == base && b.origin_module.is_some())?;
        self.index.file_for_module(bound.origin_module.as_deref()?)
    }
}
