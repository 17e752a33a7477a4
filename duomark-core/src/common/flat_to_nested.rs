//! Converts a flat event stream into a validated document tree.
//!
//! # The High-Level Concept
//!
//! The stream is linear; the document is a tree. A stack remembers the "open"
//! containers: a `Start*` event pushes a frame, inline and leaf events are appended to
//! the frame on top, and an `End*` event pops the top frame, builds the schema node
//! through its validating constructor and appends it to the new top.
//!
//! # Normalization
//!
//! Parsers are allowed to be sloppy about a few structural requirements of the schema;
//! the builder fixes them up instead of failing:
//!
//! - a list item, task item or table cell whose body does not start with a paragraph
//!   gets an empty paragraph prepended
//! - an empty document or blockquote gets a single empty paragraph
//! - a `StartListItem` inside a task list becomes a `task_item` (unchecked unless told
//!   otherwise); elsewhere it becomes a `list_item` and `checked` is ignored
//! - empty text events are dropped
//!
//! Everything else that violates the schema is reported as a [`ConversionError`].

use crate::error::SchemaViolation;
use crate::ir::events::{Event, ListKind};
use crate::schema::{
    Attrs, Document, HeadingAttrs, ImageAttrs, Node, NodeType, OrderedListAttrs, TaskItemAttrs,
};

/// Error type for flat-to-nested conversion
#[derive(Debug, Clone, PartialEq)]
pub enum ConversionError {
    /// Stack was empty when trying to pop
    UnexpectedEnd(String),
    /// Mismatched start/end events
    MismatchedEvents { expected: String, found: String },
    /// Unexpected inline content in wrong context
    UnexpectedInline(String),
    /// Events remaining after document end
    ExtraEvents,
    /// Stack not empty at end (unclosed containers)
    UnclosedContainers(usize),
    /// A finished container does not satisfy the schema
    Schema(SchemaViolation),
}

impl std::fmt::Display for ConversionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConversionError::UnexpectedEnd(msg) => write!(f, "Unexpected end event: {msg}"),
            ConversionError::MismatchedEvents { expected, found } => {
                write!(f, "Mismatched events: expected {expected}, found {found}")
            }
            ConversionError::UnexpectedInline(msg) => {
                write!(f, "Unexpected inline content: {msg}")
            }
            ConversionError::ExtraEvents => write!(f, "Extra events after document end"),
            ConversionError::UnclosedContainers(count) => {
                write!(f, "Unclosed containers: {count} nodes remain on stack")
            }
            ConversionError::Schema(violation) => write!(f, "Schema violation: {violation}"),
        }
    }
}

impl std::error::Error for ConversionError {}

impl From<SchemaViolation> for ConversionError {
    fn from(violation: SchemaViolation) -> Self {
        ConversionError::Schema(violation)
    }
}

/// A container being built on the stack
#[derive(Debug)]
struct Frame {
    node_type: NodeType,
    attrs: Attrs,
    children: Vec<Node>,
}

impl Frame {
    fn new(node_type: NodeType, attrs: Attrs) -> Self {
        Frame {
            node_type,
            attrs,
            children: Vec::new(),
        }
    }

    fn into_node(mut self) -> Result<Node, ConversionError> {
        match self.node_type {
            NodeType::ListItem | NodeType::TaskItem | NodeType::TableCell | NodeType::TableHeader => {
                let starts_with_paragraph = self
                    .children
                    .first()
                    .is_some_and(|first| first.node_type() == NodeType::Paragraph);
                if !starts_with_paragraph {
                    self.children.insert(0, Node::empty_paragraph());
                }
            }
            NodeType::Doc | NodeType::Blockquote if self.children.is_empty() => {
                self.children.push(Node::empty_paragraph());
            }
            _ => {}
        }
        Ok(Node::new(self.node_type, self.attrs, self.children)?)
    }

    fn push_inline(&mut self, node: Node, event: &Event) -> Result<(), ConversionError> {
        if !self.node_type.is_textblock() {
            return Err(ConversionError::UnexpectedInline(format!(
                "{} inside '{}'",
                event.label(),
                self.node_type.name()
            )));
        }
        self.children.push(node);
        Ok(())
    }
}

/// Pop the top frame, check it is one of `expected`, and append it to its parent.
fn finalize_container(
    stack: &mut Vec<Frame>,
    event: &Event,
    expected: &[NodeType],
) -> Result<(), ConversionError> {
    let frame = stack
        .pop()
        .ok_or_else(|| ConversionError::UnexpectedEnd(format!("{} with empty stack", event.label())))?;

    if !expected.contains(&frame.node_type) {
        return Err(ConversionError::MismatchedEvents {
            expected: expected
                .iter()
                .map(NodeType::name)
                .collect::<Vec<_>>()
                .join(" or "),
            found: format!("{} (closing '{}')", event.label(), frame.node_type.name()),
        });
    }

    let node = frame.into_node()?;
    let parent = stack.last_mut().ok_or_else(|| {
        ConversionError::UnexpectedEnd(format!("No parent for '{}'", node.node_type().name()))
    })?;
    parent.children.push(node);
    Ok(())
}

fn top<'a>(stack: &'a mut [Frame], event: &Event) -> Result<&'a mut Frame, ConversionError> {
    stack
        .last_mut()
        .ok_or_else(|| ConversionError::UnexpectedEnd(format!("{} outside document", event.label())))
}

/// Converts a flat event stream into a document.
///
/// An empty stream yields [`Document::empty`].
///
/// # Example
///
/// ```ignore
/// let events = vec![
///     Event::StartDocument,
///     Event::StartParagraph,
///     Event::Text { text: "Hello".into(), marks: MarkSet::new() },
///     Event::EndParagraph,
///     Event::EndDocument,
/// ];
///
/// let doc = events_to_tree(&events)?;
/// assert_eq!(doc.blocks().len(), 1);
/// ```
pub fn events_to_tree(events: &[Event]) -> Result<Document, ConversionError> {
    let mut iter = events.iter().peekable();
    let mut stack: Vec<Frame> = Vec::new();

    match iter.next() {
        Some(Event::StartDocument) => stack.push(Frame::new(NodeType::Doc, Attrs::None)),
        Some(other) => {
            return Err(ConversionError::MismatchedEvents {
                expected: "StartDocument".to_string(),
                found: other.label().to_string(),
            })
        }
        None => return Ok(Document::empty()),
    }

    while let Some(event) = iter.next() {
        match event {
            Event::StartDocument => {
                return Err(ConversionError::MismatchedEvents {
                    expected: "content or EndDocument".to_string(),
                    found: "StartDocument".to_string(),
                });
            }
            Event::EndDocument => {
                if stack.len() != 1 {
                    return Err(ConversionError::UnclosedContainers(stack.len() - 1));
                }
                if iter.peek().is_some() {
                    return Err(ConversionError::ExtraEvents);
                }
                let root = stack
                    .pop()
                    .ok_or_else(|| ConversionError::UnexpectedEnd("EndDocument".to_string()))?
                    .into_node()?;
                return Ok(Document::from_root(root)?);
            }

            Event::StartParagraph => stack.push(Frame::new(NodeType::Paragraph, Attrs::None)),
            Event::EndParagraph => finalize_container(&mut stack, event, &[NodeType::Paragraph])?,

            Event::StartHeading(level) => stack.push(Frame::new(
                NodeType::Heading,
                Attrs::Heading(HeadingAttrs { level: *level }),
            )),
            Event::EndHeading => finalize_container(&mut stack, event, &[NodeType::Heading])?,

            Event::StartBlockquote => stack.push(Frame::new(NodeType::Blockquote, Attrs::None)),
            Event::EndBlockquote => finalize_container(&mut stack, event, &[NodeType::Blockquote])?,

            Event::CodeBlock { attrs, text } => {
                let node = Node::code_block(attrs.clone(), text)?;
                top(&mut stack, event)?.children.push(node);
            }
            Event::HorizontalRule => {
                top(&mut stack, event)?.children.push(Node::horizontal_rule());
            }

            Event::StartList(kind) => {
                let frame = match kind {
                    ListKind::Bullet => Frame::new(NodeType::BulletList, Attrs::None),
                    ListKind::Ordered { order } => Frame::new(
                        NodeType::OrderedList,
                        Attrs::OrderedList(OrderedListAttrs {
                            order: (*order).max(1),
                        }),
                    ),
                    ListKind::Task => Frame::new(NodeType::TaskList, Attrs::None),
                };
                stack.push(frame);
            }
            Event::EndList => finalize_container(
                &mut stack,
                event,
                &[NodeType::BulletList, NodeType::OrderedList, NodeType::TaskList],
            )?,

            Event::StartListItem { checked } => {
                let in_task_list = stack
                    .last()
                    .is_some_and(|frame| frame.node_type == NodeType::TaskList);
                let frame = if in_task_list {
                    Frame::new(
                        NodeType::TaskItem,
                        Attrs::TaskItem(TaskItemAttrs {
                            checked: checked.unwrap_or(false),
                        }),
                    )
                } else {
                    Frame::new(NodeType::ListItem, Attrs::None)
                };
                stack.push(frame);
            }
            Event::EndListItem => {
                finalize_container(&mut stack, event, &[NodeType::ListItem, NodeType::TaskItem])?
            }

            Event::StartTable => stack.push(Frame::new(NodeType::Table, Attrs::None)),
            Event::EndTable => finalize_container(&mut stack, event, &[NodeType::Table])?,
            Event::StartTableRow => stack.push(Frame::new(NodeType::TableRow, Attrs::None)),
            Event::EndTableRow => finalize_container(&mut stack, event, &[NodeType::TableRow])?,
            Event::StartTableCell { header } => {
                let node_type = if *header {
                    NodeType::TableHeader
                } else {
                    NodeType::TableCell
                };
                stack.push(Frame::new(node_type, Attrs::None));
            }
            Event::EndTableCell => finalize_container(
                &mut stack,
                event,
                &[NodeType::TableCell, NodeType::TableHeader],
            )?,

            Event::Text { text, marks } => {
                if text.is_empty() {
                    continue;
                }
                let node = Node::text(text.clone(), marks.clone())?;
                top(&mut stack, event)?.push_inline(node, event)?;
            }
            Event::Image(attrs) => {
                let node = Node::image(ImageAttrs::clone(attrs))?;
                top(&mut stack, event)?.push_inline(node, event)?;
            }
            Event::HardBreak => {
                top(&mut stack, event)?.push_inline(Node::hard_break(), event)?;
            }
        }
    }

    Err(ConversionError::UnclosedContainers(stack.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::MarkSet;

    fn text(s: &str) -> Event {
        Event::Text {
            text: s.to_string(),
            marks: MarkSet::new(),
        }
    }

    #[test]
    fn builds_simple_paragraph() {
        let events = vec![
            Event::StartDocument,
            Event::StartParagraph,
            text("Hello"),
            Event::EndParagraph,
            Event::EndDocument,
        ];
        let doc = events_to_tree(&events).unwrap();
        assert_eq!(doc.blocks().len(), 1);
        assert_eq!(doc.blocks()[0].text_content(), "Hello");
    }

    #[test]
    fn empty_stream_is_empty_document() {
        assert_eq!(events_to_tree(&[]).unwrap(), Document::empty());
        let doc = events_to_tree(&[Event::StartDocument, Event::EndDocument]).unwrap();
        assert!(doc.is_empty());
    }

    #[test]
    fn list_item_without_paragraph_gets_one() {
        let events = vec![
            Event::StartDocument,
            Event::StartList(ListKind::Bullet),
            Event::StartListItem { checked: None },
            Event::HorizontalRule,
            Event::EndListItem,
            Event::EndList,
            Event::EndDocument,
        ];
        let doc = events_to_tree(&events).unwrap();
        let item = doc.node_at(&[0, 0]).unwrap();
        assert_eq!(item.child(0).unwrap().node_type(), NodeType::Paragraph);
        assert_eq!(item.child(1).unwrap().node_type(), NodeType::HorizontalRule);
    }

    #[test]
    fn items_inside_task_list_become_task_items() {
        let events = vec![
            Event::StartDocument,
            Event::StartList(ListKind::Task),
            Event::StartListItem {
                checked: Some(true),
            },
            Event::EndListItem,
            Event::EndList,
            Event::EndDocument,
        ];
        let doc = events_to_tree(&events).unwrap();
        let item = doc.node_at(&[0, 0]).unwrap();
        assert_eq!(item.node_type(), NodeType::TaskItem);
        assert_eq!(item.attrs().task_item().map(|a| a.checked), Some(true));
    }

    #[test]
    fn mismatched_end_is_reported() {
        let events = vec![
            Event::StartDocument,
            Event::StartParagraph,
            Event::EndHeading,
            Event::EndDocument,
        ];
        assert!(matches!(
            events_to_tree(&events),
            Err(ConversionError::MismatchedEvents { .. })
        ));
    }

    #[test]
    fn inline_outside_textblock_is_rejected() {
        let events = vec![Event::StartDocument, text("loose"), Event::EndDocument];
        assert!(matches!(
            events_to_tree(&events),
            Err(ConversionError::UnexpectedInline(_))
        ));
    }

    #[test]
    fn unclosed_containers_are_reported() {
        let events = vec![Event::StartDocument, Event::StartParagraph];
        assert_eq!(
            events_to_tree(&events),
            Err(ConversionError::UnclosedContainers(2))
        );
    }
}
