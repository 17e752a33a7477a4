//! Serializer fidelity: what the Markdown looks like after a trip through the tree.

use duomark_core::format::Format;
use duomark_core::formats::markdown::{parse_markdown, serialize_to_markdown, MarkdownRules};
use duomark_core::formats::treeviz::to_treeviz_str;
use duomark_core::formats::MarkdownFormat;
use duomark_core::schema::{CodeBlockAttrs, Document, Mark, MarkSet, Node};
use insta::assert_snapshot;
use std::collections::HashMap;

fn normalize(markdown: &str) -> String {
    serialize_to_markdown(&parse_markdown(markdown), &MarkdownRules::default())
}

#[test]
fn test_canonical_documents_are_stable() {
    let canonical = [
        "# Title\n\nSome **bold**, *em*, `code` and ~~gone~~ text.\n",
        "> quoted\n>\n> - item\n",
        "- a\n- b\n  - nested\n",
        "3. three\n4. four\n",
        "- [ ] open\n- [x] done\n",
        "---\n",
        "[link](https://example.com \"Title\") and ![img](a.png)\n",
        "line one\\\nline two\n",
    ];
    for markdown in canonical {
        assert_eq!(normalize(markdown), markdown, "input: {markdown:?}");
    }
}

#[test]
fn test_task_list_round_trip() {
    let markdown = "- [ ] write tests\n- [x] ship\n  - [ ] nested task\n";
    assert_eq!(normalize(markdown), markdown);
}

#[test]
fn test_table_uses_left_aligned_separator() {
    let markdown = "| Name | Qty |\n| --- | ---: |\n| apples | 3 |\n";
    assert_snapshot!(normalize(markdown), @r"
    | Name | Qty |
    | :--- | :--- |
    | apples | 3 |
    ");
}

#[test]
fn test_table_cells_escape_pipes() {
    let markdown = "| a \\| b |\n| :--- |\n| c |\n";
    assert_eq!(normalize(markdown), markdown);
}

#[test]
fn test_fenced_code_keeps_language_and_text() {
    let markdown = "```python\ndef f():\n    return \"*x*\"\n```\n";
    assert_eq!(normalize(markdown), markdown);
}

#[test]
fn test_fence_is_widened_around_backticks() {
    let doc = Document::new(vec![Node::code_block(
        CodeBlockAttrs::with_language(Some("md".to_string())),
        "```\ninner\n```",
    )
    .unwrap()])
    .unwrap();
    let markdown = serialize_to_markdown(&doc, &MarkdownRules::default());
    assert_eq!(markdown, "````md\n```\ninner\n```\n````\n");
    assert_eq!(parse_markdown(&markdown), doc);
}

#[test]
fn test_unterminated_fence_is_closed_on_output() {
    assert_eq!(normalize("```sh\necho hi\n"), "```sh\necho hi\n```\n");
}

#[test]
fn test_rendered_diagram_serializes_its_source() {
    let attrs = CodeBlockAttrs {
        language: Some("mermaid".to_string()),
        original_source: Some("graph LR; a-->b".to_string()),
    };
    let doc = Document::new(vec![Node::code_block(attrs, "").unwrap()]).unwrap();
    assert_eq!(
        serialize_to_markdown(&doc, &MarkdownRules::default()),
        "```mermaid\ngraph LR; a-->b\n```\n"
    );
}

#[test]
fn test_ordered_numbering_options() {
    let doc = parse_markdown("7. a\n8. b\n");
    let format = MarkdownFormat::default();
    assert_eq!(format.serialize(&doc).unwrap(), "7. a\n8. b\n");

    let mut options = HashMap::new();
    options.insert("ordered-list-numbering".to_string(), "repeat-one".to_string());
    options.insert("bullet-marker".to_string(), "*".to_string());
    assert_eq!(
        format.serialize_with_options(&doc, &options).unwrap(),
        "1. a\n1. b\n"
    );
}

#[test]
fn test_treeviz_of_a_task_document() {
    let doc = parse_markdown("# Shopping\n\n- [x] Milk\n- [ ] Bread\n");
    assert_snapshot!(to_treeviz_str(&doc), @r"
    ⧉ Document (2 blocks)
    ├─ § h1 Shopping
    └─ ☑ 2 items
      ├─ ☐ [x] Milk
      │ └─ ¶ Milk
      └─ ☐ [ ] Bread
        └─ ¶ Bread
    ");
}

#[test]
fn test_separate_emphasis_runs_stay_separate() {
    let em = || MarkSet::from_marks([Mark::Em]);
    let doc = Document::new(vec![Node::paragraph(vec![
        Node::text("a", em()).unwrap(),
        Node::plain_text(" ").unwrap(),
        Node::text("a", em()).unwrap(),
    ])
    .unwrap()])
    .unwrap();
    let markdown = serialize_to_markdown(&doc, &MarkdownRules::default());
    assert_eq!(markdown, "*a* *a*\n");
    assert_eq!(parse_markdown(&markdown), doc);
}

#[test]
fn test_dash_only_cells_keep_their_row() {
    let markdown = "| a |\n| --- |\n| \\- |\n";
    let once = normalize(markdown);
    assert_eq!(once, "| a |\n| :--- |\n| \\- |\n");
    assert_eq!(normalize(&once), once);

    let markdown = "| x | y |\n| --- | --- |\n| \\-- | \\:--: |\n";
    assert_eq!(
        normalize(markdown),
        "| x | y |\n| :--- | :--- |\n| \\-- | \\:--: |\n"
    );
}

#[test]
fn test_ordinals_stay_within_nine_digits() {
    let once = normalize("999999999. a\n999999999. b\n");
    assert_eq!(once, "999999999. a\n999999999. b\n");
    assert_eq!(normalize(&once), once);
}
