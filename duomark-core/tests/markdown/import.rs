use duomark_core::formats::markdown::parse_markdown;
use duomark_core::schema::{MarkType, Node, NodeType};

fn types(markdown: &str) -> Vec<NodeType> {
    parse_markdown(markdown)
        .blocks()
        .iter()
        .map(Node::node_type)
        .collect()
}

#[test]
fn test_headings() {
    let doc = parse_markdown("# One\n\n###### Six\n\n####### seven\n");
    let levels: Vec<u8> = doc
        .blocks()
        .iter()
        .filter_map(|block| block.attrs().heading().map(|h| h.level))
        .collect();
    assert_eq!(levels, vec![1, 6]);
    assert_eq!(doc.blocks()[2].node_type(), NodeType::Paragraph);
    assert_eq!(doc.blocks()[2].text_content(), "####### seven");
}

#[test]
fn test_block_kinds() {
    assert_eq!(
        types("para\n\n> quote\n\n---\n\n- a\n\n1. b\n\n- [ ] c\n\n```\nd\n```\n"),
        vec![
            NodeType::Paragraph,
            NodeType::Blockquote,
            NodeType::HorizontalRule,
            NodeType::BulletList,
            NodeType::OrderedList,
            NodeType::TaskList,
            NodeType::CodeBlock,
        ]
    );
}

#[test]
fn test_task_list_fidelity() {
    let doc = parse_markdown("- [ ] open\n- [x] done\n- [X] also done\n");
    let list = &doc.blocks()[0];
    assert_eq!(list.node_type(), NodeType::TaskList);
    let checked: Vec<bool> = list
        .content()
        .iter()
        .map(|item| item.attrs().task_item().is_some_and(|t| t.checked))
        .collect();
    assert_eq!(checked, vec![false, true, true]);
    assert_eq!(list.content()[1].text_content(), "done");
}

#[test]
fn test_ordered_list_start() {
    let doc = parse_markdown("3. three\n4. four\n");
    let list = &doc.blocks()[0];
    assert_eq!(list.attrs().ordered_list().map(|o| o.order), Some(3));
    assert_eq!(list.child_count(), 2);
}

#[test]
fn test_nested_lists_and_quotes() {
    let doc = parse_markdown("- outer\n  - inner\n  > quoted\n");
    let item = doc.node_at(&[0, 0]).unwrap();
    let kinds: Vec<NodeType> = item.content().iter().map(Node::node_type).collect();
    assert_eq!(
        kinds,
        vec![NodeType::Paragraph, NodeType::BulletList, NodeType::Blockquote]
    );
}

#[test]
fn test_table() {
    let doc = parse_markdown("| a | b |\n| --- | :-: |\n| 1 | 2 |\n");
    let table = &doc.blocks()[0];
    assert_eq!(table.node_type(), NodeType::Table);
    assert_eq!(table.child_count(), 2);
    let header = table.node_at(&[0, 0]).unwrap();
    assert_eq!(header.node_type(), NodeType::TableHeader);
    assert_eq!(header.text_content(), "a");
    let cell = table.node_at(&[1, 1]).unwrap();
    assert_eq!(cell.node_type(), NodeType::TableCell);
    assert_eq!(cell.text_content(), "2");
}

#[test]
fn test_ragged_table_is_padded() {
    let doc = parse_markdown("| a | b | c |\n| --- | --- | --- |\n| 1 |\n");
    let row = doc.node_at(&[0, 1]).unwrap();
    assert_eq!(row.child_count(), 3);
}

#[test]
fn test_fenced_code_with_language() {
    let doc = parse_markdown("```rust\nfn main() {\n    println!(\"*hi*\");\n}\n```\n");
    let block = &doc.blocks()[0];
    assert_eq!(
        block.attrs().code_block().and_then(|c| c.language.as_deref()),
        Some("rust")
    );
    assert_eq!(
        block.text_content(),
        "fn main() {\n    println!(\"*hi*\");\n}"
    );
    assert!(block.content().iter().all(|node| node.marks().is_empty()));
}

#[test]
fn test_unterminated_fence_swallows_the_rest() {
    let doc = parse_markdown("intro\n\n```\n# not a heading\n- not a list\n");
    assert_eq!(doc.blocks().len(), 2);
    let code = &doc.blocks()[1];
    assert_eq!(code.node_type(), NodeType::CodeBlock);
    assert_eq!(code.text_content(), "# not a heading\n- not a list");
}

#[test]
fn test_hard_breaks() {
    let doc = parse_markdown("one\\\ntwo  \nthree\nfour\n");
    let para = &doc.blocks()[0];
    assert_eq!(para.text_content(), "one\ntwo\nthree four");
}

#[test]
fn test_empty_input_is_one_empty_paragraph() {
    assert!(parse_markdown("").is_empty());
    assert!(parse_markdown("\n\n   \n").is_empty());
}

#[test]
fn test_link_and_image() {
    let doc = parse_markdown("[site](https://example.com \"Title\") ![alt](img.png)\n");
    let para = &doc.blocks()[0];
    let link = para.content()[0].marks().get(MarkType::Link).unwrap();
    let attrs = link.link_attrs().unwrap();
    assert_eq!(attrs.href, "https://example.com");
    assert_eq!(attrs.title.as_deref(), Some("Title"));
    let image = para.content().last().unwrap().attrs().image().unwrap();
    assert_eq!(image.src, "img.png");
    assert_eq!(image.alt.as_deref(), Some("alt"));
}
