//! Python parsing plumbing built on tree-sitter.
//!
//! Parsing is treated as a black box: a file's text either becomes a typed
//! tree or the file is reported as structurally broken. A tree whose root
//! contains error nodes counts as a parse failure - the analyzer works on
//! whole, well-formed files only, and a broken file is skipped rather than
//! half-read.

use std::cell::RefCell;

use crate::Span;

// Thread-local parser reuse - avoids creating a new parser per file
thread_local! {
    static PYTHON_PARSER: RefCell<tree_sitter::Parser> = RefCell::new({
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .expect("tree-sitter-python grammar incompatible with tree-sitter version");
        parser
    });
}

/// Parse Python source into a syntax tree.
///
/// Returns `None` when the parser gives up or the tree contains syntax
/// errors. Callers log the skip; a failed file never aborts a run.
pub fn parse_python(source: &str) -> Option<tree_sitter::Tree> {
    PYTHON_PARSER.with(|parser| {
        let tree = parser.borrow_mut().parse(source, None)?;
        if tree.root_node().has_error() {
            return None;
        }
        Some(tree)
    })
}

/// Convert a tree-sitter node position to a 1-indexed line span.
pub fn node_span(node: &tree_sitter::Node) -> Span {
    Span::new(
        (node.start_position().row + 1) as u32,
        (node.end_position().row + 1) as u32,
    )
}

/// The node's source text, or an empty string for out-of-range nodes.
pub fn node_text<'a>(node: &tree_sitter::Node, source: &'a [u8]) -> &'a str {
    node.utf8_text(source).unwrap_or_default()
}

/// Find a child node by its kind.
/// Uses cursor-based iteration for O(n) instead of O(n^2) performance.
pub fn find_child_by_kind<'a>(
    node: &tree_sitter::Node<'a>,
    kind: &str,
) -> Option<tree_sitter::Node<'a>> {
    let mut cursor = node.walk();
    if cursor.goto_first_child() {
        loop {
            if cursor.node().kind() == kind {
                return Some(cursor.node());
            }
            if !cursor.goto_next_sibling() {
                break;
            }
        }
    }
    None
}
