//! Assembly of the final analysis artifact.
//!
//! Restructures the flat per-file definition tables into the nested shape
//! the visualizer consumes: classes carry a `methods` map, free functions
//! stay top-level, and only focus-set files are emitted. Raw usage sets,
//! alias tables, bindings, and the class/function discriminator never leave
//! the library.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;

use crate::extract::FileAnalysis;
use crate::resolve::{ResolvedDefs, ResolvedUsage};
use crate::workspace::{is_aggregator, ScanRoots};
use crate::Definition;

/// One emitted class, function, or method.
#[derive(Debug, Clone, Serialize)]
pub struct DefRecord {
    pub args: Vec<String>,
    pub start_line: u32,
    pub end_line: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_api_endpoint: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub methods: Option<BTreeMap<String, DefRecord>>,
    pub used_functions: BTreeMap<String, ResolvedUsage>,
}

/// Per-file metadata record.
#[derive(Debug, Clone, Serialize)]
pub struct FileMeta {
    /// Whether the file is a package aggregator (`__init__.py`).
    pub is_router: bool,
    /// Dotted module name, e.g. `pkg.sub.module`.
    pub module: String,
}

/// The configuration echo embedded in the artifact.
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactConfig {
    pub scan_root: String,
    pub focus_root: String,
}

/// The complete JSON-shaped analysis artifact.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisArtifact {
    pub files: BTreeMap<String, BTreeMap<String, DefRecord>>,
    pub file_meta: BTreeMap<String, FileMeta>,
    pub config: ArtifactConfig,
}

/// Assemble the artifact from the focus set's analyses and resolved usages.
pub fn assemble(
    roots: &ScanRoots,
    resolved_files: &[(PathBuf, &FileAnalysis, ResolvedDefs)],
) -> AnalysisArtifact {
    let mut files = BTreeMap::new();
    let mut file_meta = BTreeMap::new();

    for (file, analysis, resolved) in resolved_files {
        let key = roots.output_key(file);
        files.insert(key.clone(), assemble_file(analysis, resolved));
        file_meta.insert(
            key,
            FileMeta {
                is_router: is_aggregator(file),
                module: roots.module_name(file),
            },
        );
    }

    AnalysisArtifact {
        files,
        file_meta,
        config: ArtifactConfig {
            scan_root: roots.scan_root().display().to_string(),
            focus_root: roots.focus_root().display().to_string(),
        },
    }
}

fn assemble_file(
    analysis: &FileAnalysis,
    resolved: &ResolvedDefs,
) -> BTreeMap<String, DefRecord> {
    let mut records = BTreeMap::new();

    let used = |qualified: &str| resolved.get(qualified).cloned().unwrap_or_default();

    // Classes first so their methods have somewhere to nest
    for (qualified, def) in &analysis.definitions {
        if let Definition::Class(class) = def {
            records.insert(
                qualified.clone(),
                DefRecord {
                    args: Vec::new(),
                    start_line: class.span.start_line,
                    end_line: class.span.end_line,
                    is_api_endpoint: None,
                    methods: Some(BTreeMap::new()),
                    used_functions: used(qualified),
                },
            );
        }
    }

    for (qualified, def) in &analysis.definitions {
        let Definition::Function(func) = def else {
            continue;
        };
        let record = DefRecord {
            args: func.parameters.clone(),
            start_line: func.span.start_line,
            end_line: func.span.end_line,
            is_api_endpoint: Some(func.is_endpoint),
            methods: None,
            used_functions: used(qualified),
        };

        match qualified.split_once('.') {
            Some((class_name, method_name)) => {
                // A method whose class record is absent is dropped
                if let Some(Some(methods)) =
                    records.get_mut(class_name).map(|r| r.methods.as_mut())
                {
                    methods.insert(method_name.to_string(), record);
                }
            }
            None => {
                records.insert(qualified.clone(), record);
            }
        }
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze_source;
    use std::path::Path;
    use tempfile::TempDir;

    fn artifact_for(sources: &[(&str, &str)], focus: Option<&str>) -> AnalysisArtifact {
        let temp = TempDir::new().unwrap();
        let focus_path = match focus {
            Some(rel) => {
                let p = temp.path().join(rel);
                std::fs::create_dir_all(&p).unwrap();
                p
            }
            None => temp.path().to_path_buf(),
        };
        let roots = ScanRoots::new(temp.path(), &focus_path).unwrap();

        let mut analyses: Vec<(PathBuf, FileAnalysis)> = sources
            .iter()
            .map(|(rel, src)| {
                let path = roots.scan_root().join(rel);
                (path.clone(), analyze_source(&path, src, 500).unwrap())
            })
            .collect();
        analyses.sort_by(|a, b| a.0.cmp(&b.0));

        let index = crate::SymbolIndex::build(&analyses, &roots);
        let resolver = crate::resolve::Resolver::new(&index, &roots);
        let resolved: Vec<(PathBuf, &FileAnalysis, ResolvedDefs)> = analyses
            .iter()
            .filter(|(path, _)| roots.is_in_focus(path))
            .map(|(path, analysis)| (path.clone(), analysis, resolver.resolve_file(analysis)))
            .collect();

        assemble(&roots, &resolved)
    }

    #[test]
    fn nests_methods_under_their_class() {
        let artifact = artifact_for(
            &[(
                "app.py",
                r#"
class Greeter:
    def greet(self, name):
        return name

def main():
    Greeter().greet("x")
"#,
            )],
            None,
        );

        let (_, defs) = artifact.files.iter().next().unwrap();
        let greeter = &defs["Greeter"];
        assert!(greeter.is_api_endpoint.is_none());
        assert!(greeter.args.is_empty());
        let methods = greeter.methods.as_ref().unwrap();
        let greet = &methods["greet"];
        assert_eq!(greet.args, ["self", "name"]);
        assert_eq!(greet.is_api_endpoint, Some(false));
        assert!(greet.methods.is_none());

        // Flat keys contain no dotted method names
        assert!(!defs.contains_key("Greeter.greet"));
        assert!(defs.contains_key("main"));
    }

    #[test]
    fn only_focus_files_are_emitted() {
        let artifact = artifact_for(
            &[
                ("app/main.py", "def run():\n    pass\n"),
                ("lib/util.py", "def helper():\n    pass\n"),
            ],
            Some("app"),
        );

        assert_eq!(artifact.files.len(), 1);
        let key = artifact.files.keys().next().unwrap();
        assert!(key.ends_with("app/main.py"));
        assert_eq!(artifact.file_meta.len(), 1);
    }

    #[test]
    fn file_meta_marks_aggregators() {
        let artifact = artifact_for(
            &[
                ("pkg/__init__.py", "from pkg.mod import thing\n"),
                ("pkg/mod.py", "def thing():\n    pass\n"),
            ],
            None,
        );

        let init_key = artifact
            .file_meta
            .keys()
            .find(|k| k.ends_with("__init__.py"))
            .unwrap()
            .clone();
        let meta = &artifact.file_meta[&init_key];
        assert!(meta.is_router);
        assert_eq!(meta.module, "pkg");

        let mod_key = artifact
            .file_meta
            .keys()
            .find(|k| k.ends_with("mod.py"))
            .unwrap()
            .clone();
        let meta = &artifact.file_meta[&mod_key];
        assert!(!meta.is_router);
        assert_eq!(meta.module, "pkg.mod");
    }

    #[test]
    fn artifact_serializes_with_stable_shape() {
        let artifact = artifact_for(
            &[(
                "app.py",
                r#"
@app.route("/ping")
def ping():
    return "pong"
"#,
            )],
            None,
        );

        let json = serde_json::to_value(&artifact).unwrap();
        let files = json.get("files").unwrap().as_object().unwrap();
        let (_, defs) = files.iter().next().unwrap();
        let ping = defs.get("ping").unwrap();

        assert_eq!(ping.get("is_api_endpoint"), Some(&serde_json::json!(true)));
        assert!(ping.get("start_line").is_some());
        assert!(ping.get("end_line").is_some());
        assert!(ping.get("used_functions").is_some());
        // Internal bookkeeping never leaks
        assert!(ping.get("methods").is_none());
        assert!(ping.get("used_names").is_none());
        assert!(ping.get("type").is_none());
        assert!(json.get("config").unwrap().get("scan_root").is_some());
    }

    #[test]
    fn orphan_methods_are_dropped() {
        // A method-shaped name with no surviving class record
        let path = Path::new("test.py");
        let analysis = analyze_source(
            path,
            r#"
class Tmp:
    def method(self):
        pass
"#,
            500,
        )
        .unwrap();

        // Simulate the class being shadowed away by a later function
        let mut analysis = analysis;
        analysis.definitions.shift_remove("Tmp");

        let records = assemble_file(&analysis, &ResolvedDefs::new());
        assert!(records.is_empty());
    }
}
