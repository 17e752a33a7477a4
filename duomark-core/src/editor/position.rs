//! Positions and selections inside a document.
//!
//! A [`Path`] addresses a node by child indices from the root. Text positions always
//! point into a textblock and count caret positions: one per character of text, one
//! per inline leaf (image, hard break).

use crate::schema::{Document, Node, NodeType};

/// Child indices from the document root
pub type Path = Vec<usize>;

/// A caret position inside a textblock.
///
/// Ordering follows document order: paths compare lexicographically, which is the
/// pre-order of the tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextPos {
    pub block: Path,
    pub offset: usize,
}

impl TextPos {
    pub fn new(block: Path, offset: usize) -> Self {
        Self { block, offset }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// A text range (a caret when `anchor == head`)
    Text { anchor: TextPos, head: TextPos },
    /// A whole node (e.g. after `select_parent_node`)
    Node { path: Path },
}

impl Selection {
    pub fn caret(block: Path, offset: usize) -> Self {
        let pos = TextPos::new(block, offset);
        Selection::Text {
            anchor: pos.clone(),
            head: pos,
        }
    }

    pub fn range(anchor: TextPos, head: TextPos) -> Self {
        Selection::Text { anchor, head }
    }

    pub fn node(path: Path) -> Self {
        Selection::Node { path }
    }

    /// Caret at the start of the first textblock, or the first block itself.
    pub fn start_of(doc: &Document) -> Self {
        match textblock_paths(doc.root()).into_iter().next() {
            Some(block) => Selection::caret(block, 0),
            None => Selection::node(vec![0]),
        }
    }

    pub fn is_caret(&self) -> bool {
        matches!(self, Selection::Text { anchor, head } if anchor == head)
    }

    /// Start of a text selection in document order
    pub fn from(&self) -> Option<&TextPos> {
        match self {
            Selection::Text { anchor, head } => Some(anchor.min(head)),
            Selection::Node { .. } => None,
        }
    }

    /// End of a text selection in document order
    pub fn to(&self) -> Option<&TextPos> {
        match self {
            Selection::Text { anchor, head } => Some(anchor.max(head)),
            Selection::Node { .. } => None,
        }
    }

    pub fn head(&self) -> Option<&TextPos> {
        match self {
            Selection::Text { head, .. } => Some(head),
            Selection::Node { .. } => None,
        }
    }

    /// Whether every position of the selection exists in `doc`.
    pub fn is_valid(&self, doc: &Document) -> bool {
        let pos_valid = |pos: &TextPos| {
            doc.node_at(&pos.block).is_some_and(|node| {
                node.node_type().is_textblock() && pos.offset <= node.content_size()
            })
        };
        match self {
            Selection::Text { anchor, head } => pos_valid(anchor) && pos_valid(head),
            Selection::Node { path } => !path.is_empty() && doc.node_at(path).is_some(),
        }
    }
}

/// Paths of all textblocks under `root`, in document order.
pub fn textblock_paths(root: &Node) -> Vec<Path> {
    fn walk(node: &Node, path: &mut Path, out: &mut Vec<Path>) {
        for (index, child) in node.content().iter().enumerate() {
            path.push(index);
            if child.node_type().is_textblock() {
                out.push(path.clone());
            } else if !child.node_type().is_inline() {
                walk(child, path, out);
            }
            path.pop();
        }
    }
    let mut out = Vec::new();
    walk(root, &mut Vec::new(), &mut out);
    out
}

/// Longest prefix of `path` (including `path` itself) whose node matches `predicate`.
pub fn find_ancestor(
    doc: &Document,
    path: &[usize],
    predicate: impl Fn(&Node) -> bool,
) -> Option<Path> {
    (0..=path.len())
        .rev()
        .map(|len| &path[..len])
        .find(|prefix| !prefix.is_empty() && doc.node_at(prefix).is_some_and(&predicate))
        .map(<[usize]>::to_vec)
}

/// Nearest list-item ancestor (list item or task item) of `path`.
pub fn enclosing_item(doc: &Document, path: &[usize]) -> Option<Path> {
    find_ancestor(doc, path, |node| node.node_type().is_list_item())
}

/// Whether the node at `path` is of `node_type`.
pub fn is_type(doc: &Document, path: &[usize], node_type: NodeType) -> bool {
    doc.node_at(path)
        .is_some_and(|node| node.node_type() == node_type)
}

/// Split a non-empty path into its parent path and index.
pub fn parent_and_index(path: &[usize]) -> Option<(&[usize], usize)> {
    path.split_last().map(|(index, parent)| (parent, *index))
}
