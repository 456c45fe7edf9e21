//! Definition extraction from Python source files.
//!
//! This is the per-file visitor: one pass collects import aliases and
//! instance-attribute bindings, a second builds the definition table and
//! attributes every name/attribute usage to the innermost open definition.
//! Both passes thread an explicit scope stack through the walk - there is no
//! shared state between files, which is what makes extraction safe to run in
//! parallel.
//!
//! Binding collection runs before usage attribution so that a reassigned
//! attribute resolves to its *last* binding everywhere in the class, matching
//! the last-write-wins policy of the instance-attribute model.

use std::collections::BTreeMap;
use std::path::Path;

use indexmap::IndexMap;

use crate::aliases::{AliasEntry, AliasTable};
use crate::parse::{node_span, node_text, parse_python};
use crate::{ClassDef, Definition, FunctionDef, UsageSet};

/// Decorator keywords that mark a callable as a network/API endpoint.
///
/// Matched case-insensitively against every name in the unwrapped decorator
/// chain, so `@app.route(...)`, `@router.get(...)` and `@api_view(...)` all
/// qualify.
pub const API_DECORATOR_KEYWORDS: &[&str] = &[
    "route", "router", "get", "post", "put", "patch", "delete", "options", "head", "api",
    "api_view", "endpoint",
];

/// The class an instance attribute was constructed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundClass {
    /// Canonicalized class name (`self.x = T()` with `T` aliasing `Thing`
    /// binds `Thing`).
    pub class_name: String,
    /// Origin module when the class name came through an import, used by
    /// resolution to pin the binding's file.
    pub origin_module: Option<String>,
}

/// Per-file map from `(owning class, attribute name)` to the bound class.
/// Reassignment overwrites: last write wins.
pub type BindingTable = BTreeMap<(String, String), BoundClass>;

/// Everything extraction produces for one file.
///
/// Immutable once the file's walk completes; resolution reads it without
/// copying.
#[derive(Debug, Clone, Default)]
pub struct FileAnalysis {
    /// Definitions keyed by qualified name, in textual order.
    pub definitions: IndexMap<String, Definition>,
    pub aliases: AliasTable,
    pub bindings: BindingTable,
}

/// Parse and extract a single file.
///
/// Returns `None` when the file does not parse cleanly; the skip is logged
/// and the file contributes nothing downstream.
pub fn analyze_source(file: &Path, source: &str, max_depth: usize) -> Option<FileAnalysis> {
    let tree = match parse_python(source) {
        Some(tree) => tree,
        None => {
            tracing::warn!("Skipping file that failed to parse: {}", file.display());
            return None;
        }
    };

    let root = tree.root_node();
    let bytes = source.as_bytes();

    let mut collector = Collector {
        source: bytes,
        aliases: AliasTable::new(),
        bindings: BindingTable::new(),
        scopes: Vec::new(),
    };
    collector.walk(&root, max_depth);

    let mut extractor = Extractor {
        source: bytes,
        aliases: &collector.aliases,
        bindings: &collector.bindings,
        definitions: IndexMap::new(),
        scopes: Vec::new(),
    };
    extractor.walk(&root, max_depth);

    Some(FileAnalysis {
        definitions: extractor.definitions,
        aliases: collector.aliases,
        bindings: collector.bindings,
    })
}

/// One open definition on the scope stack.
#[derive(Debug, Clone)]
struct Scope {
    qualified: String,
    is_class: bool,
}

fn nearest_class(scopes: &[Scope]) -> Option<&str> {
    scopes
        .iter()
        .rev()
        .find(|s| s.is_class)
        .map(|s| s.qualified.as_str())
}

// ============================================================================
// Pass 1: aliases and instance-attribute bindings
// ============================================================================

struct Collector<'a> {
    source: &'a [u8],
    aliases: AliasTable,
    bindings: BindingTable,
    scopes: Vec<Scope>,
}

impl Collector<'_> {
    fn walk(&mut self, node: &tree_sitter::Node, depth: usize) {
        if depth == 0 {
            return;
        }

        match node.kind() {
            "class_definition" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let name = node_text(&name_node, self.source).to_string();
                    self.scopes.push(Scope {
                        qualified: name,
                        is_class: true,
                    });
                    self.walk_children(node, depth);
                    self.scopes.pop();
                    return;
                }
            }
            "function_definition" => {
                if let Some(name_node) = node.child_by_field_name("name") {
                    let name = node_text(&name_node, self.source).to_string();
                    self.scopes.push(Scope {
                        qualified: name,
                        is_class: false,
                    });
                    self.walk_children(node, depth);
                    self.scopes.pop();
                    return;
                }
            }
            "import_statement" => {
                self.collect_import(node);
                return;
            }
            "import_from_statement" => {
                self.collect_import_from(node);
                return;
            }
            "assignment" => self.maybe_record_binding(node),
            _ => {}
        }

        self.walk_children(node, depth);
    }

    fn walk_children(&mut self, node: &tree_sitter::Node, depth: usize) {
        for i in 0..node.child_count() {
            if let Some(child) = node.child(i) {
                self.walk(&child, depth - 1);
            }
        }
    }

    /// `import a.b` records nothing; `import a.b as m` records a module alias.
    fn collect_import(&mut self, node: &tree_sitter::Node) {
        let mut cursor = node.walk();
        for name_child in node.children_by_field_name("name", &mut cursor) {
            if name_child.kind() != "aliased_import" {
                continue;
            }
            let module = name_child
                .child_by_field_name("name")
                .map(|n| node_text(&n, self.source).to_string());
            let local = name_child
                .child_by_field_name("alias")
                .map(|n| node_text(&n, self.source).to_string());
            if let (Some(module), Some(local)) = (module, local) {
                self.aliases.insert_module(local, module);
            }
        }
    }

    /// `from m import a, b as c` records symbol aliases; wildcard imports are
    /// ignored.
    fn collect_import_from(&mut self, node: &tree_sitter::Node) {
        let module = node
            .child_by_field_name("module_name")
            .map(|m| self.import_module_name(&m))
            .unwrap_or_default();

        let mut cursor = node.walk();
        for name_child in node.children_by_field_name("name", &mut cursor) {
            match name_child.kind() {
                "dotted_name" => {
                    let symbol = node_text(&name_child, self.source).to_string();
                    self.aliases
                        .insert_symbol(symbol.clone(), symbol, module.clone());
                }
                "aliased_import" => {
                    let symbol = name_child
                        .child_by_field_name("name")
                        .map(|n| node_text(&n, self.source).to_string());
                    let local = name_child
                        .child_by_field_name("alias")
                        .map(|n| node_text(&n, self.source).to_string());
                    if let (Some(symbol), Some(local)) = (symbol, local) {
                        self.aliases.insert_symbol(local, symbol, module.clone());
                    }
                }
                _ => {}
            }
        }
    }

    /// The origin module of a from-import; relative imports keep only the
    /// dotted tail (`from ..models import X` -> `models`).
    fn import_module_name(&self, module_node: &tree_sitter::Node) -> String {
        if module_node.kind() == "relative_import" {
            return crate::parse::find_child_by_kind(module_node, "dotted_name")
                .map(|n| node_text(&n, self.source).to_string())
                .unwrap_or_default();
        }
        node_text(module_node, self.source).to_string()
    }

    /// `self.ATTR = ClassName(...)` or `self.ATTR = ClassName` inside a class
    /// body binds `(class, ATTR)` to the canonicalized class name.
    fn maybe_record_binding(&mut self, node: &tree_sitter::Node) {
        let Some(left) = node.child_by_field_name("left") else {
            return;
        };
        if left.kind() != "attribute" {
            return;
        }
        let Some(obj) = left.child_by_field_name("object") else {
            return;
        };
        if obj.kind() != "identifier" || node_text(&obj, self.source) != "self" {
            return;
        }
        let Some(attr_node) = left.child_by_field_name("attribute") else {
            return;
        };
        let Some(owner) = nearest_class(&self.scopes).map(str::to_string) else {
            return;
        };
        let Some(right) = node.child_by_field_name("right") else {
            return;
        };

        let is_call = right.kind() == "call";
        let callee = if is_call {
            match right.child_by_field_name("function") {
                Some(f) => f,
                None => return,
            }
        } else {
            right
        };

        let bound = match callee.kind() {
            "identifier" => {
                let name = node_text(&callee, self.source);
                match self.aliases.get(name) {
                    Some(AliasEntry::Symbol { symbol, module }) => BoundClass {
                        class_name: symbol.clone(),
                        origin_module: Some(module.clone()),
                    },
                    _ => BoundClass {
                        class_name: name.to_string(),
                        origin_module: None,
                    },
                }
            }
            // Dotted callees only count when called: `self.x = m.Thing()`
            "attribute" if is_call => {
                let Some(segments) = dotted_segments(&callee, self.source) else {
                    return;
                };
                let (class_name, prefix) = match segments.split_last() {
                    Some((last, rest)) if !rest.is_empty() => (last.clone(), rest),
                    _ => return,
                };
                let mut origin: Vec<String> = Vec::with_capacity(prefix.len());
                origin.push(self.aliases.canonical_attr_base(&prefix[0]).to_string());
                origin.extend(prefix[1..].iter().cloned());
                BoundClass {
                    class_name,
                    origin_module: Some(origin.join(".")),
                }
            }
            _ => return,
        };

        let attr = node_text(&attr_node, self.source).to_string();
        self.bindings.insert((owner, attr), bound);
    }
}

/// Flatten a pure attribute chain (`a.b.C`) into its identifier segments.
/// Returns `None` when any link is not a plain identifier.
fn dotted_segments(node: &tree_sitter::Node, source: &[u8]) -> Option<Vec<String>> {
    let mut reversed = Vec::new();
    let mut current = *node;
    while current.kind() == "attribute" {
        let attr = current.child_by_field_name("attribute")?;
        reversed.push(node_text(&attr, source).to_string());
        current = current.child_by_field_name("object")?;
    }
    if current.kind() != "identifier" {
        return None;
    }
    reversed.push(node_text(&current, source).to_string());
    reversed.reverse();
    Some(reversed)
}

// ============================================================================
// Pass 2: definitions and usage attribution
// ============================================================================

struct Extractor<'a> {
    source: &'a [u8],
    aliases: &'a AliasTable,
    bindings: &'a BindingTable,
    definitions: IndexMap<String, Definition>,
    scopes: Vec<Scope>,
}

impl Extractor<'_> {
    fn walk(&mut self, node: &tree_sitter::Node, depth: usize) {
        if depth == 0 {
            return;
        }

        match node.kind() {
            "decorated_definition" => {
                let decorators: Vec<tree_sitter::Node> = (0..node.child_count())
                    .filter_map(|i| node.child(i))
                    .filter(|c| c.kind() == "decorator")
                    .collect();
                if let Some(def) = node.child_by_field_name("definition") {
                    match def.kind() {
                        "class_definition" => self.visit_class(&def, &decorators, depth),
                        "function_definition" => self.visit_function(&def, &decorators, depth),
                        _ => {}
                    }
                }
                return;
            }
            "class_definition" => {
                self.visit_class(node, &[], depth);
                return;
            }
            "function_definition" => {
                self.visit_function(node, &[], depth);
                return;
            }
            // Aliases were collected in the first pass; import names are not
            // usages.
            "import_statement" | "import_from_statement" => return,
            "attribute" => self.record_attr_usage(node),
            "identifier" => {
                self.maybe_record_name(node);
                return;
            }
            _ => {}
        }

        self.walk_children(node, depth);
    }

    fn walk_children(&mut self, node: &tree_sitter::Node, depth: usize) {
        for i in 0..node.child_count() {
            if let Some(child) = node.child(i) {
                self.walk(&child, depth - 1);
            }
        }
    }

    fn visit_class(
        &mut self,
        node: &tree_sitter::Node,
        decorators: &[tree_sitter::Node],
        depth: usize,
    ) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        // Classes keep their bare name even when nested
        let qualified = node_text(&name_node, self.source).to_string();

        self.definitions.insert(
            qualified.clone(),
            Definition::Class(ClassDef {
                span: node_span(node),
                usage: UsageSet::default(),
            }),
        );

        self.scopes.push(Scope {
            qualified,
            is_class: true,
        });
        for decorator in decorators {
            self.walk_children(decorator, depth);
        }
        self.walk_children(node, depth);
        self.scopes.pop();
    }

    fn visit_function(
        &mut self,
        node: &tree_sitter::Node,
        decorators: &[tree_sitter::Node],
        depth: usize,
    ) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = node_text(&name_node, self.source);

        // `Class.method` when directly inside a class; bare otherwise (a
        // function nested in a function keeps its bare name)
        let qualified = match self.scopes.last() {
            Some(scope) if scope.is_class => format!("{}.{}", scope.qualified, name),
            _ => name.to_string(),
        };

        let is_endpoint = decorators
            .iter()
            .any(|d| self.decorator_is_endpoint(d));

        self.definitions.insert(
            qualified.clone(),
            Definition::Function(FunctionDef {
                parameters: self.extract_parameters(node),
                span: node_span(node),
                usage: UsageSet::default(),
                is_endpoint,
            }),
        );

        self.scopes.push(Scope {
            qualified,
            is_class: false,
        });
        // Decorator expressions are usages of the decorated definition
        for decorator in decorators {
            self.walk_children(decorator, depth);
        }
        self.walk_children(node, depth);
        self.scopes.pop();
    }

    /// Declared parameter names in order. Splat parameters (`*args`,
    /// `**kwargs`) and separators are excluded.
    fn extract_parameters(&self, node: &tree_sitter::Node) -> Vec<String> {
        let mut params = Vec::new();
        let Some(params_node) = node.child_by_field_name("parameters") else {
            return params;
        };
        for i in 0..params_node.named_child_count() {
            let Some(child) = params_node.named_child(i) else {
                continue;
            };
            match child.kind() {
                "identifier" => params.push(node_text(&child, self.source).to_string()),
                "typed_parameter" => {
                    if let Some(inner) = child.named_child(0) {
                        if inner.kind() == "identifier" {
                            params.push(node_text(&inner, self.source).to_string());
                        }
                    }
                }
                "default_parameter" | "typed_default_parameter" => {
                    if let Some(name) = child.child_by_field_name("name") {
                        if name.kind() == "identifier" {
                            params.push(node_text(&name, self.source).to_string());
                        }
                    }
                }
                _ => {}
            }
        }
        params
    }

    /// True when any name in the decorator's unwrapped call/attribute chain
    /// is an API-routing keyword.
    fn decorator_is_endpoint(&self, decorator: &tree_sitter::Node) -> bool {
        let Some(expr) = decorator.named_child(0) else {
            return false;
        };
        decorator_keywords(&expr, self.source)
            .iter()
            .any(|name| API_DECORATOR_KEYWORDS.contains(&name.as_str()))
    }

    /// Record a load-context identifier into the innermost open definition.
    fn maybe_record_name(&mut self, node: &tree_sitter::Node) {
        let Some(scope) = self.scopes.last() else {
            // Module-level reads are not attributed to anything
            return;
        };
        if !is_usage_position(node) {
            return;
        }
        let name = node_text(node, self.source);
        let canonical = self.aliases.canonical_name(name).to_string();
        let key = scope.qualified.clone();
        if let Some(def) = self.definitions.get_mut(&key) {
            def.usage_mut().record_name(canonical);
        }
    }

    /// Record `base.attr`; bases that are bound instance attributes resolve
    /// to the class they were constructed from.
    fn record_attr_usage(&mut self, node: &tree_sitter::Node) {
        let Some(scope) = self.scopes.last() else {
            return;
        };
        let key = scope.qualified.clone();
        let Some(attr_node) = node.child_by_field_name("attribute") else {
            return;
        };
        let Some(obj) = node.child_by_field_name("object") else {
            return;
        };
        let attr = node_text(&attr_node, self.source).to_string();

        // `Foo().bar` attributes `bar` to `Foo`: peel the constructor call
        let obj = if obj.kind() == "call" {
            match obj.child_by_field_name("function") {
                Some(f) => f,
                None => return,
            }
        } else {
            obj
        };

        let base = match obj.kind() {
            // `self.X.attr` where `self.X = ClassName(...)` attributes
            // `attr` to ClassName
            "attribute" => {
                let inner_obj = obj.child_by_field_name("object");
                let inner_attr = obj.child_by_field_name("attribute");
                match (inner_obj, inner_attr) {
                    (Some(io), Some(ia))
                        if io.kind() == "identifier"
                            && node_text(&io, self.source) == "self" =>
                    {
                        let owner = nearest_class(&self.scopes).map(str::to_string);
                        let attr_name = node_text(&ia, self.source).to_string();
                        owner.and_then(|owner| {
                            self.bindings
                                .get(&(owner, attr_name))
                                .map(|b| b.class_name.clone())
                        })
                    }
                    _ => None,
                }
            }
            "identifier" => {
                let text = node_text(&obj, self.source);
                Some(self.aliases.canonical_attr_base(text).to_string())
            }
            _ => None,
        };

        if let Some(base) = base {
            if let Some(def) = self.definitions.get_mut(&key) {
                def.usage_mut().record_attr(base, attr);
            }
        }
    }
}

/// Names in a decorator expression, unwrapped: call layers are peeled down to
/// the callee, then the attribute chain down to its root identifier. Pure
/// function over the node structure.
fn decorator_keywords(expr: &tree_sitter::Node, source: &[u8]) -> Vec<String> {
    let mut names = Vec::new();
    let mut target = *expr;

    while target.kind() == "call" {
        match target.child_by_field_name("function") {
            Some(f) => target = f,
            None => return names,
        }
    }
    while target.kind() == "attribute" {
        if let Some(attr) = target.child_by_field_name("attribute") {
            names.push(node_text(&attr, source).to_lowercase());
        }
        match target.child_by_field_name("object") {
            Some(obj) => target = obj,
            None => return names,
        }
    }
    if target.kind() == "identifier" {
        names.push(node_text(&target, source).to_lowercase());
    }
    names
}

/// Whether an identifier is being read (Python load context), as opposed to
/// being bound: definition names, parameter names, assignment and loop
/// targets, `as` aliases, and keyword-argument names are not usages.
fn is_usage_position(node: &tree_sitter::Node) -> bool {
    let Some(parent) = node.parent() else {
        return false;
    };

    let is_field = |field: &str| {
        parent
            .child_by_field_name(field)
            .is_some_and(|n| n.id() == node.id())
    };

    match parent.kind() {
        "function_definition" | "class_definition" => !is_field("name"),
        "parameters" | "lambda_parameters" | "typed_parameter" => false,
        "default_parameter" | "typed_default_parameter" => !is_field("name"),
        "assignment" | "augmented_assignment" => !is_field("left"),
        "pattern_list" | "tuple_pattern" | "list_pattern" | "list_splat_pattern"
        | "dictionary_splat_pattern" => false,
        "for_statement" | "for_in_clause" => !is_field("left"),
        "named_expression" => !is_field("name"),
        "keyword_argument" => !is_field("name"),
        "attribute" => is_field("object"),
        "as_pattern_target" => false,
        "global_statement" | "nonlocal_statement" => false,
        _ => true,
    }
}
