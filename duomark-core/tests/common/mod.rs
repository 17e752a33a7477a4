//! Tests for the flat <-> nested event conversion.

use duomark_core::common::flat_to_nested::{events_to_tree, ConversionError};
use duomark_core::common::nested_to_flat::tree_to_events;
use duomark_core::ir::events::{Event, ListKind};
use duomark_core::schema::{CodeBlockAttrs, Document, Mark, MarkSet, Node};

fn create_test_tree() -> Document {
    let text = |s: &str| Node::plain_text(s).unwrap();
    let para = |s: &str| Node::paragraph(vec![text(s)]).unwrap();
    Document::new(vec![
        Node::heading(1, vec![text("Title")]).unwrap(),
        para("Paragraph 1"),
        Node::bullet_list(vec![
            Node::list_item(vec![para("Item 1")]).unwrap(),
            Node::list_item(vec![
                para("Item 2"),
                Node::task_list(vec![Node::task_item(true, vec![para("done")]).unwrap()]).unwrap(),
            ])
            .unwrap(),
        ])
        .unwrap(),
        Node::code_block(CodeBlockAttrs::with_language(Some("rust".into())), "fn x() {}").unwrap(),
        Node::paragraph(vec![
            text("Final "),
            Node::text("paragraph", MarkSet::from_marks([Mark::Strong])).unwrap(),
        ])
        .unwrap(),
    ])
    .unwrap()
}

#[test]
fn test_round_trip_conversion() {
    let original = create_test_tree();

    // 1. nested -> flat
    let events = tree_to_events(&original);
    assert_eq!(events.first(), Some(&Event::StartDocument));
    assert_eq!(events.last(), Some(&Event::EndDocument));

    // 2. flat -> nested
    let rebuilt = events_to_tree(&events).expect("Failed to reconstruct tree");
    assert_eq!(original, rebuilt);
}

#[test]
fn test_list_item_without_paragraph_is_normalized() {
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
    assert_eq!(item.child_count(), 2);
    assert_eq!(item.child(0).unwrap(), &Node::empty_paragraph());
}

#[test]
fn test_mismatched_events_are_reported() {
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
