//! Converts a document tree into a flat event stream.
//!
//! Traversing the tree in pre-order emits start/leaf/end events that
//! [`super::flat_to_nested::events_to_tree`] reassembles into the same tree. Each
//! container produces its own start/end markers around its children; inline nodes and
//! leaf blocks become single events in place.

use crate::ir::events::{Event, ListKind};
use crate::schema::{Document, Node, NodeType};

/// Converts a document to a flat vector of `Event`s.
pub fn tree_to_events(doc: &Document) -> Vec<Event> {
    let mut events = Vec::new();
    walk_node(doc.root(), &mut events);
    events
}

fn walk_children(node: &Node, events: &mut Vec<Event>) {
    for child in node.content() {
        walk_node(child, events);
    }
}

fn wrap(node: &Node, start: Event, end: Event, events: &mut Vec<Event>) {
    events.push(start);
    walk_children(node, events);
    events.push(end);
}

fn walk_node(node: &Node, events: &mut Vec<Event>) {
    match node.node_type() {
        NodeType::Doc => wrap(node, Event::StartDocument, Event::EndDocument, events),
        NodeType::Paragraph => wrap(node, Event::StartParagraph, Event::EndParagraph, events),
        NodeType::Heading => {
            let level = node.attrs().heading().map_or(1, |h| h.level);
            wrap(node, Event::StartHeading(level), Event::EndHeading, events)
        }
        NodeType::Blockquote => wrap(node, Event::StartBlockquote, Event::EndBlockquote, events),
        NodeType::CodeBlock => events.push(Event::CodeBlock {
            attrs: node.attrs().code_block().cloned().unwrap_or_default(),
            text: node.text_content(),
        }),
        NodeType::HorizontalRule => events.push(Event::HorizontalRule),
        NodeType::BulletList => wrap(
            node,
            Event::StartList(ListKind::Bullet),
            Event::EndList,
            events,
        ),
        NodeType::OrderedList => {
            let order = node.attrs().ordered_list().map_or(1, |o| o.order);
            wrap(
                node,
                Event::StartList(ListKind::Ordered { order }),
                Event::EndList,
                events,
            )
        }
        NodeType::TaskList => wrap(node, Event::StartList(ListKind::Task), Event::EndList, events),
        NodeType::ListItem => wrap(
            node,
            Event::StartListItem { checked: None },
            Event::EndListItem,
            events,
        ),
        NodeType::TaskItem => {
            let checked = node.attrs().task_item().is_some_and(|t| t.checked);
            wrap(
                node,
                Event::StartListItem {
                    checked: Some(checked),
                },
                Event::EndListItem,
                events,
            )
        }
        NodeType::Table => wrap(node, Event::StartTable, Event::EndTable, events),
        NodeType::TableRow => wrap(node, Event::StartTableRow, Event::EndTableRow, events),
        NodeType::TableCell => wrap(
            node,
            Event::StartTableCell { header: false },
            Event::EndTableCell,
            events,
        ),
        NodeType::TableHeader => wrap(
            node,
            Event::StartTableCell { header: true },
            Event::EndTableCell,
            events,
        ),
        NodeType::Image => {
            if let Some(attrs) = node.attrs().image() {
                events.push(Event::Image(attrs.clone()));
            }
        }
        NodeType::HardBreak => events.push(Event::HardBreak),
        NodeType::Text => events.push(Event::Text {
            text: node.text_str().unwrap_or_default().to_string(),
            marks: node.marks().clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::flat_to_nested::events_to_tree;
    use crate::schema::{CodeBlockAttrs, ImageAttrs, Mark, MarkSet};

    #[test]
    fn tree_survives_event_round_trip() {
        let bold = Node::text("bold", MarkSet::from_marks([Mark::Strong])).unwrap();
        let paragraph = Node::paragraph(vec![
            Node::plain_text("a ").unwrap(),
            bold,
            Node::hard_break(),
            Node::image(ImageAttrs::new("/x.png")).unwrap(),
        ])
        .unwrap();
        let task = Node::task_list(vec![Node::task_item(true, vec![paragraph.clone()]).unwrap()])
            .unwrap();
        let code = Node::code_block(CodeBlockAttrs::with_language(Some("rust".into())), "fn x()")
            .unwrap();
        let quote = Node::blockquote(vec![paragraph, code]).unwrap();
        let doc = Document::new(vec![quote, task, Node::horizontal_rule()]).unwrap();

        let events = tree_to_events(&doc);
        assert_eq!(events.first(), Some(&Event::StartDocument));
        assert_eq!(events_to_tree(&events).unwrap(), doc);
    }
}
