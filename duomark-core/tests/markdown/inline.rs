//! Inline delimiters through a full parse / serialize trip.

use duomark_core::formats::markdown::{parse_markdown, serialize_to_markdown, MarkdownRules};
use duomark_core::schema::{Document, Mark, MarkSet, MarkType, Node};

fn inline(markdown: &str) -> Vec<Node> {
    parse_markdown(markdown).blocks()[0].content().to_vec()
}

fn normalize(markdown: &str) -> String {
    serialize_to_markdown(&parse_markdown(markdown), &MarkdownRules::default())
}

#[test]
fn test_literal_metacharacters_survive() {
    for markdown in ["2\\*3\\*4\n", "snake_case and \\_lead\n", "\\[not a link\\]\n", "\\~\\~x\\~\\~\n"] {
        assert_eq!(normalize(markdown), markdown);
    }
    assert_eq!(inline("2\\*3\\*4\n")[0].text_str(), Some("2*3*4"));
}

#[test]
fn test_unmatched_delimiters_become_escaped_text() {
    assert_eq!(normalize("a * b ** c\n"), "a \\* b \\*\\* c\n");
    assert_eq!(normalize("[open\n"), "\\[open\n");
}

#[test]
fn test_whitespace_moves_outside_marks() {
    let doc = Document::new(vec![Node::paragraph(vec![
        Node::text("bold ", MarkSet::from_marks([Mark::Strong])).unwrap(),
        Node::plain_text("after").unwrap(),
    ])
    .unwrap()])
    .unwrap();
    let markdown = serialize_to_markdown(&doc, &MarkdownRules::default());
    assert_eq!(markdown, "**bold** after\n");
    assert_eq!(normalize(&markdown), markdown);
}

#[test]
fn test_nested_marks() {
    let nodes = inline("***both*** and **[strong link](/x)**\n");
    assert!(nodes[0].marks().contains(MarkType::Strong));
    assert!(nodes[0].marks().contains(MarkType::Em));
    let link = nodes.last().unwrap();
    assert!(link.marks().contains(MarkType::Link));
    assert!(link.marks().contains(MarkType::Strong));
    assert_eq!(normalize("***both*** and **[strong link](/x)**\n"), "***both*** and [**strong link**](/x)\n");
}

#[test]
fn test_code_span_content_is_not_escaped() {
    assert_eq!(normalize("`a*b_c`\n"), "`a*b_c`\n");
    assert!(inline("`a*b_c`\n")[0].marks().contains(MarkType::Code));
}
