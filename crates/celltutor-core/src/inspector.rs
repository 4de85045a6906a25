//! Static inspection of Python cells with Tree-Sitter
//!
//! Produces the structural facts embedded in every manifest: function names,
//! loop presence, imported modules and the non-blank source lines. Cells that
//! do not parse are downgraded to a [`ParseFailure`] placeholder instead of
//! failing the build.

use std::borrow::Cow;
use std::collections::BTreeSet;
use tree_sitter::{Node, Parser};

use crate::types::{Inspection, ParseFailure, StructuralFacts};

/// Characters of raw input kept in a parse failure placeholder
pub const RAW_EXCERPT_CHARS: usize = 200;

const PARSE_ERROR: &str = "not python or parse error";

/// Tree-Sitter based inspector for Python cells
#[derive(Debug, Clone, Copy, Default)]
pub struct CodeInspector;

impl CodeInspector {
    /// Inspect `code`, never failing: unparseable input yields
    /// [`Inspection::Failed`] with a truncated copy of the source.
    pub fn extract_summary(code: &str) -> Inspection {
        let source_text = normalize_newlines(code);

        let mut parser = Parser::new();
        if let Err(e) = parser.set_language(tree_sitter_python::language()) {
            tracing::warn!("Python grammar unavailable: {}", e);
            return failure(code);
        }

        let tree = match parser.parse(source_text.as_bytes(), None) {
            Some(tree) => tree,
            None => return failure(code),
        };

        let root = tree.root_node();
        if root.has_error() {
            tracing::debug!("Cell does not parse as Python ({} bytes)", code.len());
            return failure(code);
        }

        let source = source_text.as_bytes();
        let mut facts = StructuralFacts::default();
        let mut python2 = false;

        walk_preorder(root, |node| match node.kind() {
            "function_definition" => {
                if let Some(name) = field_text(node, "name", source) {
                    facts.functions.push(name.to_string());
                }
            }
            "for_statement" | "while_statement" => facts.has_loop = true,
            "import_statement" => collect_imports(node, source, &mut facts.imports),
            "import_from_statement" => {
                if let Some(module) = node
                    .child_by_field_name("module_name")
                    .and_then(|m| from_module_name(m, source))
                {
                    insert_module(&mut facts.imports, module);
                }
            }
            "future_import_statement" => insert_module(&mut facts.imports, "__future__"),
            // Python 2 only; the grammar still accepts them
            "print_statement" | "exec_statement" => python2 = true,
            _ => {}
        });

        if python2 {
            tracing::debug!("Cell uses Python 2 statements");
            return failure(code);
        }

        facts.lines = source_text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(str::to_string)
            .collect();

        Inspection::Parsed(facts)
    }
}

/// `\r\n` and lone `\r` become `\n`
fn normalize_newlines(code: &str) -> Cow<'_, str> {
    if code.contains('\r') {
        Cow::Owned(code.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(code)
    }
}

fn failure(code: &str) -> Inspection {
    Inspection::Failed(ParseFailure {
        error: PARSE_ERROR.to_string(),
        raw_code: code.chars().take(RAW_EXCERPT_CHARS).collect(),
    })
}

/// Visit every node in document order
fn walk_preorder<'t>(root: Node<'t>, mut visit: impl FnMut(Node<'t>)) {
    let mut cursor = root.walk();
    loop {
        visit(cursor.node());
        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return;
            }
        }
    }
}

fn field_text<'s>(node: Node<'_>, field: &str, source: &'s [u8]) -> Option<&'s str> {
    node.child_by_field_name(field)
        .and_then(|child| child.utf8_text(source).ok())
}

/// `import a, b.c as d` -> {"a", "b.c"}
fn collect_imports(node: Node<'_>, source: &[u8], imports: &mut BTreeSet<String>) {
    let mut cursor = node.walk();
    for name in node.children_by_field_name("name", &mut cursor) {
        let module = match name.kind() {
            "aliased_import" => field_text(name, "name", source),
            _ => name.utf8_text(source).ok(),
        };
        if let Some(module) = module {
            insert_module(imports, module);
        }
    }
}

/// Module of a `from ... import` statement; `from . import x` has none
fn from_module_name<'s>(module: Node<'_>, source: &'s [u8]) -> Option<&'s str> {
    match module.kind() {
        "relative_import" => {
            let mut cursor = module.walk();
            let dotted = module
                .named_children(&mut cursor)
                .find(|child| child.kind() == "dotted_name");
            dotted.and_then(|d| d.utf8_text(source).ok())
        }
        _ => module.utf8_text(source).ok(),
    }
}

fn insert_module(imports: &mut BTreeSet<String>, module: &str) {
    let module = module.trim();
    if !module.is_empty() {
        imports.insert(module.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts(code: &str) -> StructuralFacts {
        match CodeInspector::extract_summary(code) {
            Inspection::Parsed(facts) => facts,
            Inspection::Failed(f) => panic!("expected parse success, got {:?}", f),
        }
    }

    #[test]
    fn test_functions_in_document_order() {
        let code = "def outer():\n    def inner():\n        pass\n    return inner\n\nasync def fetch():\n    pass\n\ndef last():\n    pass\n";
        let facts = facts(code);
        assert_eq!(facts.functions, vec!["outer", "inner", "fetch", "last"]);
        assert!(!facts.has_loop);
    }

    #[test]
    fn test_loop_detection() {
        assert!(facts("for i in range(3):\n    print(i)\n").has_loop);
        assert!(facts("while True:\n    break\n").has_loop);
        assert!(facts("def f():\n    if x:\n        for y in x:\n            pass\n").has_loop);
        assert!(!facts("xs = [i for i in range(3)]\n").has_loop);
    }

    #[test]
    fn test_imports_deduplicated() {
        let code = "import os\nimport os.path as p, sys\nfrom collections import deque\nfrom . import sibling\nfrom .pkg import thing\nimport os\n";
        let facts = facts(code);
        let imports: Vec<&str> = facts.imports.iter().map(String::as_str).collect();
        assert_eq!(imports, vec!["collections", "os", "os.path", "pkg", "sys"]);
    }

    #[test]
    fn test_lines_keep_indentation_and_skip_blanks() {
        let code = "def f(x):\n\n    y = x + 1\n   \n    return y\n";
        let facts = facts(code);
        assert_eq!(facts.lines, vec!["def f(x):", "    y = x + 1", "    return y"]);
    }

    #[test]
    fn test_parse_failure_is_truncated() {
        let code = format!("def broken(:\n    return\n{}", "x = (".repeat(100));
        let inspection = CodeInspector::extract_summary(&code);
        match inspection {
            Inspection::Failed(f) => {
                assert_eq!(f.error, PARSE_ERROR);
                assert_eq!(f.raw_code.chars().count(), RAW_EXCERPT_CHARS);
                assert!(code.starts_with(&f.raw_code));
            }
            Inspection::Parsed(_) => panic!("broken code should not parse"),
        }
    }

    #[test]
    fn test_parse_failure_short_input_kept_whole() {
        let inspection = CodeInspector::extract_summary("def (:");
        match inspection {
            Inspection::Failed(f) => assert_eq!(f.raw_code, "def (:"),
            Inspection::Parsed(_) => panic!("broken code should not parse"),
        }
    }

    #[test]
    fn test_carriage_return_line_endings() {
        let facts_cr = facts("import os\rfor i in range(2):\r    x = i\r");
        assert!(facts_cr.has_loop);
        assert_eq!(facts_cr.lines, vec!["import os", "for i in range(2):", "    x = i"]);

        let facts_crlf = facts("def f():\r\n    return 1\r\n");
        assert_eq!(facts_crlf.functions, vec!["f"]);
        assert_eq!(facts_crlf.lines, vec!["def f():", "    return 1"]);
    }

    #[test]
    fn test_python2_statements_rejected() {
        for code in ["print \"hello\"\n", "exec \"x=1\"\n"] {
            match CodeInspector::extract_summary(code) {
                Inspection::Failed(f) => assert_eq!(f.raw_code, code),
                Inspection::Parsed(_) => panic!("{:?} should be rejected", code),
            }
        }
        assert!(facts("print(\"hello\")\n").functions.is_empty());
    }

    #[test]
    fn test_empty_cell_parses() {
        let facts = facts("");
        assert!(facts.functions.is_empty());
        assert!(facts.imports.is_empty());
        assert!(facts.lines.is_empty());
    }
}
