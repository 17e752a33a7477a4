//! Transactions: the only way a document changes.
//!
//! A [`Transaction`] is a list of [`Step`]s plus an optional selection to set
//! afterwards. Steps are applied in order to a copy of the document; the copy replaces
//! the original only when every step succeeded, so a rejected transaction leaves the
//! document exactly as it was.
//!
//! Every step re-validates the nodes it rebuilds, up to the root, which keeps the
//! schema invariants intact no matter how the transaction was put together.

use super::fragment::{map_marks, replace_inline};
use super::position::{Path, Selection};
use crate::error::TransactionError;
use crate::schema::{Attrs, Document, Mark, MarkType, Node};

/// One atomic change
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Replace caret range `from..to` of a textblock with inline nodes
    ReplaceInline {
        block: Path,
        from: usize,
        to: usize,
        content: Vec<Node>,
    },
    AddMark {
        block: Path,
        from: usize,
        to: usize,
        mark: Mark,
    },
    RemoveMark {
        block: Path,
        from: usize,
        to: usize,
        mark_type: MarkType,
    },
    SetAttrs {
        path: Path,
        attrs: Attrs,
    },
    /// Replace children `from..to` of the node at `parent` (the root when empty)
    ReplaceChildren {
        parent: Path,
        from: usize,
        to: usize,
        nodes: Vec<Node>,
    },
    ReplaceDoc {
        doc: Document,
    },
}

#[derive(Debug, Clone, Default)]
pub struct Transaction {
    steps: Vec<Step>,
    selection: Option<Selection>,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn replace_inline(self, block: Path, from: usize, to: usize, content: Vec<Node>) -> Self {
        self.step(Step::ReplaceInline {
            block,
            from,
            to,
            content,
        })
    }

    pub fn add_mark(self, block: Path, from: usize, to: usize, mark: Mark) -> Self {
        self.step(Step::AddMark {
            block,
            from,
            to,
            mark,
        })
    }

    pub fn remove_mark(self, block: Path, from: usize, to: usize, mark_type: MarkType) -> Self {
        self.step(Step::RemoveMark {
            block,
            from,
            to,
            mark_type,
        })
    }

    pub fn set_attrs(self, path: Path, attrs: Attrs) -> Self {
        self.step(Step::SetAttrs { path, attrs })
    }

    pub fn replace_children(self, parent: Path, from: usize, to: usize, nodes: Vec<Node>) -> Self {
        self.step(Step::ReplaceChildren {
            parent,
            from,
            to,
            nodes,
        })
    }

    pub fn replace_doc(self, doc: Document) -> Self {
        self.step(Step::ReplaceDoc { doc })
    }

    pub fn select(mut self, selection: Selection) -> Self {
        self.selection = Some(selection);
        self
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Apply every step to a copy of `doc`.
    pub fn apply(&self, doc: &Document) -> Result<Document, TransactionError> {
        let mut root = doc.root().clone();
        for step in &self.steps {
            root = apply_step(&root, step)?;
        }
        Ok(Document::from_root(root)?)
    }
}

fn apply_step(root: &Node, step: &Step) -> Result<Node, TransactionError> {
    match step {
        Step::ReplaceInline {
            block,
            from,
            to,
            content,
        } => update_textblock(root, block, *from, *to, |inline| {
            replace_inline(inline, *from, *to, content.clone())
        }),
        Step::AddMark {
            block,
            from,
            to,
            mark,
        } => update_textblock(root, block, *from, *to, |inline| {
            map_marks(inline, *from, *to, |marks| marks.with(mark.clone()))
        }),
        Step::RemoveMark {
            block,
            from,
            to,
            mark_type,
        } => update_textblock(root, block, *from, *to, |inline| {
            map_marks(inline, *from, *to, |marks| marks.without(*mark_type))
        }),
        Step::SetAttrs { path, attrs } => {
            update_at(root, path, path, &mut |node| Ok(node.with_attrs(attrs.clone())?))
        }
        Step::ReplaceChildren {
            parent,
            from,
            to,
            nodes,
        } => update_at(root, parent, parent, &mut |node| {
            if from > to || *to > node.child_count() {
                return Err(TransactionError::InvalidOffset {
                    path: parent.clone(),
                    offset: *to,
                });
            }
            let mut children = node.content().to_vec();
            children.splice(*from..*to, nodes.iter().cloned());
            Ok(node.with_content(children)?)
        }),
        Step::ReplaceDoc { doc } => Ok(doc.root().clone()),
    }
}

fn update_textblock(
    root: &Node,
    block: &Path,
    from: usize,
    to: usize,
    edit: impl Fn(&[Node]) -> Result<Vec<Node>, crate::error::SchemaViolation>,
) -> Result<Node, TransactionError> {
    update_at(root, block, block, &mut |node| {
        if !node.node_type().is_textblock() {
            return Err(TransactionError::NotTextblock(block.clone()));
        }
        let size = node.content_size();
        if from > to || to > size {
            return Err(TransactionError::InvalidOffset {
                path: block.clone(),
                offset: to.max(from),
            });
        }
        Ok(node.with_content(edit(node.content())?)?)
    })
}

/// Rebuild the path from `node` down to `rest`, replacing the target with `f`'s result.
fn update_at(
    node: &Node,
    rest: &[usize],
    full: &Path,
    f: &mut dyn FnMut(&Node) -> Result<Node, TransactionError>,
) -> Result<Node, TransactionError> {
    let Some((&index, tail)) = rest.split_first() else {
        return f(node);
    };
    let child = node
        .child(index)
        .ok_or_else(|| TransactionError::InvalidPath(full.clone()))?;
    let updated = update_at(child, tail, full, f)?;
    let mut children = node.content().to_vec();
    children[index] = updated;
    Ok(node.with_content(children)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::markdown::{parse_markdown, serialize_to_markdown, MarkdownRules};
    use crate::schema::{NodeType, TaskItemAttrs};

    fn md(doc: &Document) -> String {
        serialize_to_markdown(doc, &MarkdownRules::default())
    }

    #[test]
    fn test_replace_inline_and_mark() {
        let doc = parse_markdown("hello world\n");
        let tx = Transaction::new()
            .replace_inline(vec![0], 0, 5, vec![Node::plain_text("goodbye").unwrap()])
            .add_mark(vec![0], 8, 13, Mark::Strong);
        let doc = tx.apply(&doc).unwrap();
        assert_eq!(md(&doc), "goodbye **world**\n");

        let doc = Transaction::new()
            .remove_mark(vec![0], 0, 13, MarkType::Strong)
            .apply(&doc)
            .unwrap();
        assert_eq!(md(&doc), "goodbye world\n");
    }

    #[test]
    fn test_set_attrs_on_task_item() {
        let doc = parse_markdown("- [ ] todo\n");
        let doc = Transaction::new()
            .set_attrs(vec![0, 0], Attrs::TaskItem(TaskItemAttrs { checked: true }))
            .apply(&doc)
            .unwrap();
        assert_eq!(md(&doc), "- [x] todo\n");
    }

    #[test]
    fn test_replace_children_at_root() {
        let doc = parse_markdown("a\n\nb\n");
        let doc = Transaction::new()
            .replace_children(vec![], 1, 2, vec![Node::horizontal_rule()])
            .apply(&doc)
            .unwrap();
        assert_eq!(md(&doc), "a\n\n---\n");
    }

    #[test]
    fn test_failed_step_is_atomic() {
        let doc = parse_markdown("- [ ] todo\n");
        let paragraph = Node::empty_paragraph();
        let result = Transaction::new()
            .set_attrs(vec![0, 0], Attrs::TaskItem(TaskItemAttrs { checked: true }))
            .replace_children(vec![0], 0, 1, vec![paragraph])
            .apply(&doc);
        assert!(matches!(result, Err(TransactionError::Schema(_))));
        assert_eq!(doc.node_at(&[0, 0]).map(Node::node_type), Some(NodeType::TaskItem));
        assert_eq!(md(&doc), "- [ ] todo\n");
    }

    #[test]
    fn test_invalid_targets() {
        let doc = parse_markdown("---\n\ntext\n");
        assert_eq!(
            Transaction::new().add_mark(vec![0], 0, 1, Mark::Em).apply(&doc).unwrap_err(),
            TransactionError::NotTextblock(vec![0])
        );
        assert_eq!(
            Transaction::new().add_mark(vec![1], 0, 9, Mark::Em).apply(&doc).unwrap_err(),
            TransactionError::InvalidOffset { path: vec![1], offset: 9 }
        );
        assert_eq!(
            Transaction::new().add_mark(vec![7], 0, 1, Mark::Em).apply(&doc).unwrap_err(),
            TransactionError::InvalidPath(vec![7])
        );
    }

    #[test]
    fn test_code_block_rejects_marks() {
        let doc = parse_markdown("```\ncode\n```\n");
        let result = Transaction::new().add_mark(vec![0], 0, 4, Mark::Strong).apply(&doc);
        assert!(matches!(result, Err(TransactionError::Schema(_))));
    }
}
