//! Schema-validated document nodes.
//!
//!     A [`Node`] can only be obtained through a validating constructor, so every tree at
//!     rest satisfies the content model of every node in it. Fields are private; edits
//!     produce new nodes through [`Node::with_content`] / [`Node::with_attrs`], which
//!     validate again.
//!
//!     Inline content is normalized on construction: adjacent text nodes that carry the
//!     same mark set are merged into one.
//!
//!     JSON uses a ProseMirror-like shape and is deserialized through the same
//!     constructors:
//!
//!     ```text
//!     {"type": "heading", "attrs": {"level": 2}, "content": [{"type": "text", "text": "Hi"}]}
//!     ```

use super::attrs::{
    Attrs, CodeBlockAttrs, HeadingAttrs, ImageAttrs, OrderedListAttrs, TaskItemAttrs,
};
use super::content::NodeType;
use super::marks::{Mark, MarkSet};
use crate::error::SchemaViolation;
use serde::{Deserialize, Serialize};

/// A node of the structured document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawNode", into = "RawNode")]
pub struct Node {
    node_type: NodeType,
    attrs: Attrs,
    content: Vec<Node>,
    text: Option<String>,
    marks: MarkSet,
}

impl NodeType {
    /// Attributes a node of this type gets when none are given.
    ///
    /// `image` has no usable default (its `src` is required) and returns `Attrs::None`.
    pub fn default_attrs(&self) -> Attrs {
        match self {
            NodeType::Heading => Attrs::Heading(HeadingAttrs::default()),
            NodeType::CodeBlock => Attrs::CodeBlock(CodeBlockAttrs::default()),
            NodeType::OrderedList => Attrs::OrderedList(OrderedListAttrs::default()),
            NodeType::TaskItem => Attrs::TaskItem(TaskItemAttrs::default()),
            _ => Attrs::None,
        }
    }
}

impl Node {
    /// Build a non-text node. `Attrs::None` selects the type's default attributes.
    pub fn new(node_type: NodeType, attrs: Attrs, content: Vec<Node>) -> Result<Node, SchemaViolation> {
        if node_type == NodeType::Text {
            return Err(SchemaViolation::InvalidAttrs {
                node: NodeType::Text,
                reason: "text nodes are built with Node::text".to_string(),
            });
        }
        let attrs = check_attrs(node_type, attrs)?;
        let content = if node_type.is_textblock() {
            merge_text(content)
        } else {
            content
        };
        node_type.content_rule().validate(node_type, &content)?;
        Ok(Node {
            node_type,
            attrs,
            content,
            text: None,
            marks: MarkSet::new(),
        })
    }

    /// A text node. Text must be non-empty.
    pub fn text(text: impl Into<String>, marks: MarkSet) -> Result<Node, SchemaViolation> {
        let text = text.into();
        if text.is_empty() {
            return Err(SchemaViolation::EmptyText);
        }
        Ok(Node {
            node_type: NodeType::Text,
            attrs: Attrs::None,
            content: Vec::new(),
            text: Some(text),
            marks,
        })
    }

    pub fn plain_text(text: impl Into<String>) -> Result<Node, SchemaViolation> {
        Node::text(text, MarkSet::new())
    }

    pub fn doc(blocks: Vec<Node>) -> Result<Node, SchemaViolation> {
        Node::new(NodeType::Doc, Attrs::None, blocks)
    }

    pub fn paragraph(inline: Vec<Node>) -> Result<Node, SchemaViolation> {
        Node::new(NodeType::Paragraph, Attrs::None, inline)
    }

    /// A paragraph with no content
    pub fn empty_paragraph() -> Node {
        Node {
            node_type: NodeType::Paragraph,
            attrs: Attrs::None,
            content: Vec::new(),
            text: None,
            marks: MarkSet::new(),
        }
    }

    pub fn heading(level: u8, inline: Vec<Node>) -> Result<Node, SchemaViolation> {
        Node::new(
            NodeType::Heading,
            Attrs::Heading(HeadingAttrs { level }),
            inline,
        )
    }

    pub fn blockquote(blocks: Vec<Node>) -> Result<Node, SchemaViolation> {
        Node::new(NodeType::Blockquote, Attrs::None, blocks)
    }

    /// A code block holding `text` verbatim (an empty string gives an empty block).
    pub fn code_block(attrs: CodeBlockAttrs, text: &str) -> Result<Node, SchemaViolation> {
        let content = if text.is_empty() {
            Vec::new()
        } else {
            vec![Node::plain_text(text)?]
        };
        Node::new(NodeType::CodeBlock, Attrs::CodeBlock(attrs), content)
    }

    pub fn horizontal_rule() -> Node {
        Node::leaf(NodeType::HorizontalRule)
    }

    pub fn hard_break() -> Node {
        Node::leaf(NodeType::HardBreak)
    }

    pub fn image(attrs: ImageAttrs) -> Result<Node, SchemaViolation> {
        Node::new(NodeType::Image, Attrs::Image(attrs), Vec::new())
    }

    pub fn ordered_list(order: u32, items: Vec<Node>) -> Result<Node, SchemaViolation> {
        Node::new(
            NodeType::OrderedList,
            Attrs::OrderedList(OrderedListAttrs { order }),
            items,
        )
    }

    pub fn bullet_list(items: Vec<Node>) -> Result<Node, SchemaViolation> {
        Node::new(NodeType::BulletList, Attrs::None, items)
    }

    pub fn list_item(body: Vec<Node>) -> Result<Node, SchemaViolation> {
        Node::new(NodeType::ListItem, Attrs::None, body)
    }

    pub fn task_list(items: Vec<Node>) -> Result<Node, SchemaViolation> {
        Node::new(NodeType::TaskList, Attrs::None, items)
    }

    pub fn task_item(checked: bool, body: Vec<Node>) -> Result<Node, SchemaViolation> {
        Node::new(
            NodeType::TaskItem,
            Attrs::TaskItem(TaskItemAttrs { checked }),
            body,
        )
    }

    pub fn table(rows: Vec<Node>) -> Result<Node, SchemaViolation> {
        Node::new(NodeType::Table, Attrs::None, rows)
    }

    pub fn table_row(cells: Vec<Node>) -> Result<Node, SchemaViolation> {
        Node::new(NodeType::TableRow, Attrs::None, cells)
    }

    pub fn table_cell(body: Vec<Node>) -> Result<Node, SchemaViolation> {
        Node::new(NodeType::TableCell, Attrs::None, body)
    }

    pub fn table_header(body: Vec<Node>) -> Result<Node, SchemaViolation> {
        Node::new(NodeType::TableHeader, Attrs::None, body)
    }

    fn leaf(node_type: NodeType) -> Node {
        Node {
            node_type,
            attrs: Attrs::None,
            content: Vec::new(),
            text: None,
            marks: MarkSet::new(),
        }
    }

    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    pub fn content(&self) -> &[Node] {
        &self.content
    }

    pub fn child(&self, index: usize) -> Option<&Node> {
        self.content.get(index)
    }

    pub fn child_count(&self) -> usize {
        self.content.len()
    }

    /// The string of a text node
    pub fn text_str(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn marks(&self) -> &MarkSet {
        &self.marks
    }

    pub fn is_text(&self) -> bool {
        self.node_type == NodeType::Text
    }

    /// Concatenated text of all descendants; hard breaks contribute a newline.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self.node_type {
            NodeType::Text => out.push_str(self.text.as_deref().unwrap_or_default()),
            NodeType::HardBreak => out.push('\n'),
            _ => self.content.iter().for_each(|child| child.collect_text(out)),
        }
    }

    /// Size of an inline node in caret positions: characters for text, one for leaves.
    pub fn inline_size(&self) -> usize {
        match &self.text {
            Some(text) => text.chars().count(),
            None => 1,
        }
    }

    /// Caret positions spanned by a textblock's content.
    pub fn content_size(&self) -> usize {
        self.content.iter().map(Node::inline_size).sum()
    }

    /// Whether a textblock has no content or only whitespace text
    pub fn is_blank(&self) -> bool {
        self.content
            .iter()
            .all(|child| child.text.as_deref().is_some_and(|t| t.trim().is_empty()))
    }

    /// Descendant at `path` (child indices from this node).
    pub fn node_at(&self, path: &[usize]) -> Option<&Node> {
        path.iter()
            .try_fold(self, |node, &index| node.content.get(index))
    }

    /// Same node with new content, validated against the content model.
    pub fn with_content(&self, content: Vec<Node>) -> Result<Node, SchemaViolation> {
        if self.is_text() {
            return NodeType::Text
                .content_rule()
                .validate(NodeType::Text, &content)
                .map(|_| self.clone());
        }
        Node::new(self.node_type, self.attrs.clone(), content)
    }

    /// Same node with new attributes, validated against the node type.
    pub fn with_attrs(&self, attrs: Attrs) -> Result<Node, SchemaViolation> {
        let attrs = check_attrs(self.node_type, attrs)?;
        Ok(Node {
            attrs,
            ..self.clone()
        })
    }

    /// Same text node with another mark set. Non-text nodes are returned unchanged.
    pub fn with_marks(&self, marks: MarkSet) -> Node {
        if self.is_text() {
            Node {
                marks,
                ..self.clone()
            }
        } else {
            self.clone()
        }
    }

    /// Same node converted to another type, keeping its content.
    pub fn retyped(&self, node_type: NodeType, attrs: Attrs) -> Result<Node, SchemaViolation> {
        Node::new(node_type, attrs, self.content.clone())
    }

    /// Re-validate the whole subtree.
    pub fn check(&self) -> Result<(), SchemaViolation> {
        if self.is_text() {
            return match self.text.as_deref() {
                Some(text) if !text.is_empty() => Ok(()),
                _ => Err(SchemaViolation::EmptyText),
            };
        }
        check_attrs(self.node_type, self.attrs.clone())?;
        self.node_type
            .content_rule()
            .validate(self.node_type, &self.content)?;
        self.content.iter().try_for_each(Node::check)
    }
}

/// Validate attributes for `node_type`, substituting defaults for `Attrs::None`.
fn check_attrs(node_type: NodeType, attrs: Attrs) -> Result<Attrs, SchemaViolation> {
    let invalid = |reason: &str| SchemaViolation::InvalidAttrs {
        node: node_type,
        reason: reason.to_string(),
    };
    let attrs = match attrs {
        Attrs::None => node_type.default_attrs(),
        other => other,
    };
    let verdict = match (node_type, &attrs) {
        (NodeType::Heading, Attrs::Heading(h)) if (1..=6).contains(&h.level) => Ok(()),
        (NodeType::Heading, Attrs::Heading(_)) => Err(invalid("level must be between 1 and 6")),
        (NodeType::CodeBlock, Attrs::CodeBlock(_)) => Ok(()),
        (NodeType::OrderedList, Attrs::OrderedList(o)) if o.order >= 1 => Ok(()),
        (NodeType::OrderedList, Attrs::OrderedList(_)) => Err(invalid("order must be positive")),
        (NodeType::TaskItem, Attrs::TaskItem(_)) => Ok(()),
        (NodeType::Image, Attrs::Image(i)) if !i.src.is_empty() => Ok(()),
        (NodeType::Image, _) => Err(invalid("src is required")),
        (_, Attrs::None) => Ok(()),
        _ => Err(invalid("attributes belong to another node type")),
    };
    verdict.map(|()| attrs)
}

/// Merge adjacent text nodes carrying equal marks.
fn merge_text(content: Vec<Node>) -> Vec<Node> {
    let mut merged: Vec<Node> = Vec::with_capacity(content.len());
    for node in content {
        if let (Some(last), true) = (merged.last_mut(), node.is_text()) {
            if last.is_text() && last.marks == node.marks {
                if let (Some(acc), Some(more)) = (last.text.as_mut(), node.text.as_deref()) {
                    acc.push_str(more);
                    continue;
                }
            }
        }
        merged.push(node);
    }
    merged
}

/// A complete document: a `doc` node holding one or more blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Node", into = "Node")]
pub struct Document {
    root: Node,
}

impl Document {
    pub fn new(blocks: Vec<Node>) -> Result<Document, SchemaViolation> {
        Ok(Document {
            root: Node::doc(blocks)?,
        })
    }

    /// A document holding a single empty paragraph
    pub fn empty() -> Document {
        Document {
            root: Node {
                node_type: NodeType::Doc,
                attrs: Attrs::None,
                content: vec![Node::empty_paragraph()],
                text: None,
                marks: MarkSet::new(),
            },
        }
    }

    pub fn from_root(root: Node) -> Result<Document, SchemaViolation> {
        if root.node_type() != NodeType::Doc {
            return Err(SchemaViolation::InvalidAttrs {
                node: root.node_type(),
                reason: "document root must be 'doc'".to_string(),
            });
        }
        Ok(Document { root })
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn blocks(&self) -> &[Node] {
        self.root.content()
    }

    pub fn into_root(self) -> Node {
        self.root
    }

    pub fn node_at(&self, path: &[usize]) -> Option<&Node> {
        self.root.node_at(path)
    }

    /// Whether the document is one empty paragraph
    pub fn is_empty(&self) -> bool {
        matches!(self.blocks(), [only] if only.node_type() == NodeType::Paragraph && only.child_count() == 0)
    }
}

impl Default for Document {
    fn default() -> Self {
        Document::empty()
    }
}

impl TryFrom<Node> for Document {
    type Error = SchemaViolation;

    fn try_from(root: Node) -> Result<Self, Self::Error> {
        Document::from_root(root)
    }
}

impl From<Document> for Node {
    fn from(doc: Document) -> Self {
        doc.root
    }
}

/// Wire shape of a node
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawNode {
    #[serde(rename = "type")]
    node_type: NodeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    attrs: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    content: Vec<RawNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    marks: Vec<Mark>,
}

impl TryFrom<RawNode> for Node {
    type Error = SchemaViolation;

    fn try_from(raw: RawNode) -> Result<Self, Self::Error> {
        if raw.node_type == NodeType::Text {
            return Node::text(raw.text.unwrap_or_default(), MarkSet::from_marks(raw.marks));
        }
        let attrs = attrs_from_json(raw.node_type, raw.attrs)?;
        let content = raw
            .content
            .into_iter()
            .map(Node::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Node::new(raw.node_type, attrs, content)
    }
}

impl From<Node> for RawNode {
    fn from(node: Node) -> Self {
        RawNode {
            node_type: node.node_type,
            attrs: node.attrs.to_json(),
            content: node.content.into_iter().map(RawNode::from).collect(),
            text: node.text,
            marks: node.marks.iter().cloned().collect(),
        }
    }
}

fn attrs_from_json(
    node_type: NodeType,
    value: Option<serde_json::Value>,
) -> Result<Attrs, SchemaViolation> {
    let Some(value) = value else {
        return Ok(Attrs::None);
    };
    let invalid = |err: serde_json::Error| SchemaViolation::InvalidAttrs {
        node: node_type,
        reason: err.to_string(),
    };
    let attrs = match node_type {
        NodeType::Heading => Attrs::Heading(serde_json::from_value(value).map_err(invalid)?),
        NodeType::CodeBlock => Attrs::CodeBlock(serde_json::from_value(value).map_err(invalid)?),
        NodeType::OrderedList => {
            Attrs::OrderedList(serde_json::from_value(value).map_err(invalid)?)
        }
        NodeType::TaskItem => Attrs::TaskItem(serde_json::from_value(value).map_err(invalid)?),
        NodeType::Image => Attrs::Image(serde_json::from_value(value).map_err(invalid)?),
        _ => Attrs::None,
    };
    Ok(attrs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Node {
        Node::plain_text(s).unwrap()
    }

    #[test]
    fn code_block_rejects_marked_text() {
        let bold = Node::text("x", MarkSet::from_marks([Mark::Strong])).unwrap();
        let err = Node::new(
            NodeType::CodeBlock,
            Attrs::CodeBlock(CodeBlockAttrs::default()),
            vec![bold],
        )
        .unwrap_err();
        assert!(matches!(err, SchemaViolation::MarkNotAllowed { .. }));
    }

    #[test]
    fn task_list_only_holds_task_items() {
        let item = Node::list_item(vec![Node::empty_paragraph()]).unwrap();
        assert_eq!(
            Node::task_list(vec![item]).unwrap_err(),
            SchemaViolation::InvalidContent {
                parent: NodeType::TaskList,
                child: NodeType::ListItem,
                index: 0
            }
        );
    }

    #[test]
    fn list_item_must_start_with_paragraph() {
        let heading = Node::heading(2, vec![text("x")]).unwrap();
        assert!(Node::list_item(vec![heading]).is_err());
        assert!(Node::list_item(vec![]).is_err());
    }

    #[test]
    fn adjacent_equal_text_is_merged() {
        let p = Node::paragraph(vec![text("a"), text("b")]).unwrap();
        assert_eq!(p.child_count(), 1);
        assert_eq!(p.text_content(), "ab");
    }

    #[test]
    fn invalid_attrs_are_rejected() {
        assert!(Node::heading(7, vec![]).is_err());
        assert!(Node::ordered_list(0, vec![]).is_err());
        assert!(Node::image(ImageAttrs::new("")).is_err());
        assert!(Node::plain_text("").is_err());
    }

    #[test]
    fn json_goes_through_validation() {
        let json = r#"{"type":"doc","content":[{"type":"heading","attrs":{"level":2},"content":[{"type":"text","text":"Hi","marks":[{"type":"strong"}]}]}]}"#;
        let doc: Document = serde_json::from_str(json).unwrap();
        assert_eq!(doc.blocks()[0].attrs().heading().map(|h| h.level), Some(2));
        assert_eq!(serde_json::to_string(&doc).unwrap(), json);

        let bad = r#"{"type":"doc","content":[{"type":"text","text":"loose"}]}"#;
        assert!(serde_json::from_str::<Document>(bad).is_err());
    }

    #[test]
    fn empty_document_is_one_empty_paragraph() {
        let doc = Document::empty();
        assert!(doc.is_empty());
        assert!(doc.root().check().is_ok());
    }
}
