//! Parser-agnostic view of a syntax tree.
//!
//! The extractor only needs node kinds, children and byte spans, so anything
//! that can answer those questions can be walked with [`depth_first`].

use std::ops::Range;

pub trait SyntaxNode: Copy {
    fn kind(&self) -> &str;
    fn child_nodes(&self) -> Vec<Self>;
    fn byte_range(&self) -> Range<usize>;
    /// Zero-based (row, column) of the first byte.
    fn start_point(&self) -> (usize, usize);
}

impl<'tree> SyntaxNode for tree_sitter::Node<'tree> {
    fn kind(&self) -> &str {
        tree_sitter::Node::kind(self)
    }

    fn child_nodes(&self) -> Vec<Self> {
        let mut cursor = self.walk();
        let children = self.children(&mut cursor).collect();
        children
    }

    fn byte_range(&self) -> Range<usize> {
        self.start_byte()..self.end_byte()
    }

    fn start_point(&self) -> (usize, usize) {
        let point = self.start_position();
        (point.row, point.column)
    }
}

/// Pre-order, left-to-right walk returning every node accepted by `keep`.
///
/// Uses an explicit stack so deeply nested sources cannot overflow the call stack.
pub fn depth_first<N, F>(root: N, mut keep: F) -> Vec<N>
where
    N: SyntaxNode,
    F: FnMut(&N) -> bool,
{
    let mut found = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if keep(&node) {
            found.push(node);
        }
        stack.extend(node.child_nodes().into_iter().rev());
    }
    found
}
