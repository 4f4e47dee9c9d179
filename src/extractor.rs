use crate::error::ParseFailure;
use crate::syntax::{depth_first, SyntaxNode};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tree_sitter::{Node, Parser};

const FUNCTION_KIND: &str = "function_definition";
const DECORATED_KIND: &str = "decorated_definition";

/// One function definition lifted out of a source file.
///
/// Names are not unique; `(origin_file, position)` is what tells two units apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeUnit {
    pub origin_file: PathBuf,
    pub name: String,
    pub source_text: String,
    /// Index in pre-order traversal order within `origin_file`.
    pub position: usize,
    /// 1-based line where `source_text` starts.
    pub line: usize,
}

impl CodeUnit {
    pub fn id(&self) -> String {
        format!("{}#{}:{}", self.origin_file.display(), self.position, self.name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct UnitExtractor {
    include_decorators: bool,
}

impl UnitExtractor {
    pub fn new(include_decorators: bool) -> Self {
        Self { include_decorators }
    }

    /// Read and parse `path`, returning every function it defines in traversal order.
    pub fn extract(&self, path: &Path) -> Result<Vec<CodeUnit>, ParseFailure> {
        let bytes = fs::read(path).map_err(|e| ParseFailure::new(path, format!("read failed: {}", e)))?;
        let source = String::from_utf8(bytes)
            .map_err(|e| ParseFailure::new(path, format!("not valid UTF-8: {}", e)))?;
        self.extract_source(path, &source)
    }

    /// Same as [`extract`](Self::extract) for text that is already in memory.
    ///
    /// The file must be valid Python 3 before any unit is produced. tree-sitter
    /// recovers from input CPython rejects (Python 2 `print`, backticks, `<>`), so
    /// it only supplies the spans.
    pub fn extract_source(&self, path: &Path, source: &str) -> Result<Vec<CodeUnit>, ParseFailure> {
        check_python3(source).map_err(|message| ParseFailure::new(path, message))?;

        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::language())
            .map_err(|e| ParseFailure::new(path, format!("failed to load Python grammar: {}", e)))?;

        let tree = parser
            .parse(source, None)
            .ok_or_else(|| ParseFailure::new(path, "parser produced no tree"))?;
        let root = tree.root_node();

        if root.has_error() {
            return Err(ParseFailure::new(path, describe_first_error(root)));
        }

        let units = depth_first(root, |node| node.kind() == FUNCTION_KIND)
            .into_iter()
            .enumerate()
            .map(|(position, node)| self.to_unit(path, source, position, node))
            .collect();

        Ok(units)
    }

    fn to_unit(&self, path: &Path, source: &str, position: usize, node: Node) -> CodeUnit {
        let name = node
            .child_by_field_name("name")
            .and_then(|n| n.utf8_text(source.as_bytes()).ok())
            .unwrap_or("<anonymous>")
            .to_string();

        let span = if self.include_decorators {
            node.parent()
                .filter(|parent| parent.kind() == DECORATED_KIND)
                .unwrap_or(node)
        } else {
            node
        };

        CodeUnit {
            origin_file: path.to_path_buf(),
            name,
            source_text: source[SyntaxNode::byte_range(&span)].to_string(),
            position,
            line: span.start_position().row + 1,
        }
    }
}

fn check_python3(source: &str) -> Result<(), String> {
    match rustpython_parser::parse(source, rustpython_parser::Mode::Module, "<module>") {
        Ok(_) => Ok(()),
        Err(e) => {
            let offset = usize::from(e.offset).min(source.len());
            let before = source.get(..offset).unwrap_or(source);
            let line = before.matches('\n').count() + 1;
            let column = before.rsplit('\n').next().map_or(0, |tail| tail.chars().count()) + 1;
            Err(format!("syntax error at line {}, column {}: {}", line, column, e.error))
        }
    }
}

fn describe_first_error(root: Node) -> String {
    let first = depth_first(root, |n| n.is_error() || n.is_missing())
        .into_iter()
        .next();

    match first {
        Some(node) => {
            let (row, column) = SyntaxNode::start_point(&node);
            if node.is_missing() {
                format!("missing `{}` at line {}, column {}", node.kind(), row + 1, column + 1)
            } else {
                format!("syntax error at line {}, column {}", row + 1, column + 1)
            }
        }
        None => "syntax error".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn units(source: &str) -> Vec<CodeUnit> {
        UnitExtractor::default()
            .extract_source(Path::new("sample.py"), source)
            .unwrap()
    }

    fn names(units: &[CodeUnit]) -> Vec<&str> {
        units.iter().map(|u| u.name.as_str()).collect()
    }

    #[test]
    fn file_without_functions_yields_nothing() {
        assert!(units("import os\n\nX = 1\nprint(X)\n").is_empty());
        assert!(units("").is_empty());
    }

    #[test]
    fn broken_file_is_a_parse_failure() {
        let err = UnitExtractor::default()
            .extract_source(Path::new("broken.py"), "def ok():\n    pass\n\ndef broken(:\n    pass\n")
            .unwrap_err();
        assert_eq!(err.path, PathBuf::from("broken.py"));
        assert!(err.message.contains("line"), "{}", err.message);
    }

    #[test]
    fn python2_sources_are_parse_failures() {
        let extractor = UnitExtractor::default();
        let legacy = [
            "print \"hello\"\n\ndef f():\n    pass\n",
            "exec \"x = 1\"\n\ndef f():\n    pass\n",
            "def f():\n    try:\n        pass\n    except Exception, e:\n        pass\n",
            "def f(x):\n    return `x`\n",
            "def f():\n    return 0777\n",
            "def f(a, b):\n    return a <> b\n",
        ];

        for source in legacy {
            let result = extractor.extract_source(Path::new("legacy.py"), source);
            assert!(result.is_err(), "accepted as Python 3: {:?}", source);
        }
    }

    #[test]
    fn python2_print_failure_names_the_line() {
        let err = UnitExtractor::default()
            .extract_source(Path::new("legacy.py"), "def f():\n    pass\n\nprint \"done\"\n")
            .unwrap_err();
        assert!(err.message.contains("line 4"), "{}", err.message);
    }

    #[test]
    fn units_follow_textual_order_at_every_depth() {
        let source = r#"
def first():
    def inner():
        return 1
    return inner()

class Shape:
    def area(self):
        return 0

    async def load(self):
        await something()

if True:
    def conditional():
        pass

def last(x):
    return lambda y: x + y
"#;
        let found = units(source);
        assert_eq!(names(&found), vec!["first", "inner", "area", "load", "conditional", "last"]);
        let positions: Vec<usize> = found.iter().map(|u| u.position).collect();
        assert_eq!(positions, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(found[0].line, 2);
        assert_eq!(found[2].line, 8);
    }

    #[test]
    fn source_text_is_verbatim() {
        let source = "x = 1\n\ndef add(a, b):\n    # sum\n    return a + b\n";
        let found = units(source);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].source_text, "def add(a, b):\n    # sum\n    return a + b");
        assert!(source.contains(&found[0].source_text));
    }

    #[test]
    fn each_unit_reparses_on_its_own() {
        let source = r#"
class Repo:
    def save(self, item):
        if item:
            self.items.append(item)
        return len(self.items)

    def clear(self):
        def reset():
            return []
        self.items = reset()
"#;
        let extractor = UnitExtractor::default();
        let found = units(source);
        assert_eq!(found.len(), 3);

        for unit in &found {
            let again = extractor
                .extract_source(Path::new("fragment.py"), &unit.source_text)
                .unwrap_or_else(|e| panic!("{} did not reparse: {}", unit.id(), e));
            assert_eq!(again[0].name, unit.name);
            assert_eq!(again[0].source_text, unit.source_text);
        }
    }

    #[test]
    fn decorators_excluded_unless_requested() {
        let source = "@cache\n@trace(level=2)\ndef cached(n):\n    return n\n";

        let bare = units(source);
        assert_eq!(bare[0].source_text, "def cached(n):\n    return n");
        assert_eq!(bare[0].line, 3);

        let decorated = UnitExtractor::new(true)
            .extract_source(Path::new("sample.py"), source)
            .unwrap();
        assert_eq!(decorated[0].source_text, source.trim_end());
        assert_eq!(decorated[0].line, 1);
    }

    #[test]
    fn repeated_names_stay_distinct() {
        let source = "def run():\n    pass\n\nclass A:\n    def run(self):\n        pass\n";
        let found = units(source);
        assert_eq!(names(&found), vec!["run", "run"]);
        assert_ne!(found[0].id(), found[1].id());
        assert_eq!(found[1].id(), "sample.py#1:run");
    }

    #[test]
    fn unreadable_files_are_parse_failures() {
        let dir = tempfile::tempdir().unwrap();
        let binary = dir.path().join("blob.py");
        fs::write(&binary, [0xff, 0xfe, 0x00, 0x64]).unwrap();

        let extractor = UnitExtractor::default();
        let err = extractor.extract(&binary).unwrap_err();
        assert!(err.message.contains("UTF-8"));

        let missing = extractor.extract(&dir.path().join("gone.py")).unwrap_err();
        assert!(missing.message.contains("read failed"));
    }

    #[test]
    fn extract_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("mod.py");
        fs::write(&file, "def one():\n    return 1\n\ndef two():\n    return 2\n").unwrap();

        let found = UnitExtractor::default().extract(&file).unwrap();
        assert_eq!(names(&found), vec!["one", "two"]);
        assert!(found.iter().all(|u| u.origin_file == file));
    }
}
