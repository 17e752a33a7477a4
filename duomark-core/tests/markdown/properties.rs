//! Round-trip and idempotence properties over generated documents.

use duomark_core::formats::markdown::{parse_markdown, serialize_to_markdown, MarkdownRules};
use duomark_core::schema::{CodeBlockAttrs, Document, Mark, MarkSet, Node};
use proptest::collection::vec;
use proptest::option;
use proptest::prelude::*;

fn run() -> impl Strategy<Value = Node> {
    (vec("[a-z]{1,8}", 1..3), 0..5u8, "[a-z]{1,6}").prop_map(|(words, mark, target)| {
        let marks = match mark {
            0 => MarkSet::new(),
            1 => MarkSet::from_marks([Mark::Strong]),
            2 => MarkSet::from_marks([Mark::Em]),
            3 => MarkSet::from_marks([Mark::Code]),
            _ => MarkSet::from_marks([Mark::link(format!("/{target}"), None)]),
        };
        Node::text(words.join(" "), marks).unwrap()
    })
}

/// Runs separated by plain spaces, so delimiters never touch.
fn inline() -> impl Strategy<Value = Vec<Node>> {
    vec(run(), 1..4).prop_map(|runs| {
        let mut nodes = Vec::with_capacity(runs.len() * 2);
        for (index, run) in runs.into_iter().enumerate() {
            if index > 0 {
                nodes.push(Node::plain_text(" ").unwrap());
            }
            nodes.push(run);
        }
        nodes
    })
}

fn paragraph() -> impl Strategy<Value = Node> {
    inline().prop_map(|content| Node::paragraph(content).unwrap())
}

fn items() -> impl Strategy<Value = Vec<Node>> {
    vec(paragraph(), 1..4).prop_map(|paragraphs| {
        paragraphs
            .into_iter()
            .map(|p| Node::list_item(vec![p]).unwrap())
            .collect()
    })
}

fn block() -> impl Strategy<Value = Node> {
    prop_oneof![
        paragraph(),
        (1u8..=6, inline()).prop_map(|(level, content)| Node::heading(level, content).unwrap()),
        Just(Node::horizontal_rule()),
        items().prop_map(|items| Node::bullet_list(items).unwrap()),
        (1u32..20, items()).prop_map(|(order, items)| Node::ordered_list(order, items).unwrap()),
        vec(paragraph(), 1..3).prop_map(|paragraphs| Node::blockquote(paragraphs).unwrap()),
        (option::of("[a-z]{1,6}"), "[a-z][a-z ]{0,20}").prop_map(|(language, text)| {
            Node::code_block(CodeBlockAttrs::with_language(language), &text).unwrap()
        }),
    ]
}

fn document() -> impl Strategy<Value = Document> {
    vec(block(), 1..6).prop_map(|blocks| Document::new(blocks).unwrap())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn tree_survives_round_trip(doc in document()) {
        let markdown = serialize_to_markdown(&doc, &MarkdownRules::default());
        prop_assert_eq!(parse_markdown(&markdown), doc, "markdown:\n{}", markdown);
    }

    #[test]
    fn serialization_is_idempotent(doc in document()) {
        let rules = MarkdownRules::default();
        let once = serialize_to_markdown(&doc, &rules);
        let twice = serialize_to_markdown(&parse_markdown(&once), &rules);
        prop_assert_eq!(twice, once);
    }

    #[test]
    fn parsing_is_total(source in "[a-z0-9#>*_`~!|.() \\[\\]\\-\n]{0,80}") {
        let doc = parse_markdown(&source);
        prop_assert!(doc.root().check().is_ok());
        let _ = serialize_to_markdown(&doc, &MarkdownRules::default());
    }
}
