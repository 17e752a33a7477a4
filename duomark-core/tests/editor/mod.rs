use duomark_core::editor::{type_text, EditorSession, Keymap, Selection, TextPos};
use duomark_core::{serialize_to_markdown, MarkType, MarkdownRules, NodeType};

fn md(session: &EditorSession) -> String {
    serialize_to_markdown(session.document(), &MarkdownRules::default())
}

fn type_chars(session: &mut EditorSession, input: &str) {
    for ch in input.chars() {
        type_text(session, &ch.to_string()).unwrap();
    }
}

#[test]
fn test_writing_a_document_from_scratch() {
    let keymap = Keymap::default();
    let mut session = EditorSession::from_markdown("");

    type_chars(&mut session, "# Notes");
    assert!(keymap.handle(&mut session, "Enter").unwrap());
    type_chars(&mut session, "- one");
    assert!(keymap.handle(&mut session, "Enter").unwrap());
    type_chars(&mut session, "two");
    assert!(keymap.handle(&mut session, "Tab").unwrap());
    assert!(keymap.handle(&mut session, "Enter").unwrap());
    type_chars(&mut session, "three");
    assert!(keymap.handle(&mut session, "Shift-Tab").unwrap());
    assert_eq!(md(&session), "# Notes\n\n- one\n  - two\n- three\n");

    // Enter twice leaves the list
    assert!(keymap.handle(&mut session, "Enter").unwrap());
    assert!(keymap.handle(&mut session, "Enter").unwrap());
    type_chars(&mut session, "Done **now**");
    assert_eq!(
        md(&session),
        "# Notes\n\n- one\n  - two\n- three\n\nDone **now**\n"
    );
}

#[test]
fn test_stored_marks_carry_into_typed_text() {
    let keymap = Keymap::default();
    let mut session = EditorSession::from_markdown("");

    type_chars(&mut session, "plain ");
    assert!(keymap.handle(&mut session, "Mod-b").unwrap());
    type_chars(&mut session, "bold");
    assert!(keymap.handle(&mut session, "Mod-b").unwrap());
    type_chars(&mut session, " end");
    assert_eq!(md(&session), "plain **bold** end\n");
}

#[test]
fn test_mark_over_a_range() {
    let keymap = Keymap::default();
    let mut session = EditorSession::from_markdown("one two three\n");
    assert!(session.set_selection(Selection::range(
        TextPos::new(vec![0], 4),
        TextPos::new(vec![0], 7),
    )));

    assert!(keymap.handle(&mut session, "Mod-i").unwrap());
    assert_eq!(md(&session), "one *two* three\n");
    assert!(keymap.handle(&mut session, "Mod-i").unwrap());
    assert_eq!(md(&session), "one two three\n");
}

#[test]
fn test_mac_keymap_uses_meta() {
    let keymap = Keymap::base(true);
    assert!(keymap.commands_for("Meta-b").is_some());
    assert!(keymap.commands_for("Ctrl-b").is_none());

    let mut session = EditorSession::from_markdown("word\n");
    assert!(session.set_selection(Selection::range(
        TextPos::new(vec![0], 0),
        TextPos::new(vec![0], 4),
    )));
    assert!(keymap.handle(&mut session, "Meta-b").unwrap());
    let text = &session.document().blocks()[0].content()[0];
    assert!(text.marks().contains(MarkType::Strong));
}

#[test]
fn test_heading_shortcuts() {
    let keymap = Keymap::default();
    let mut session = EditorSession::from_markdown("Title\n");

    assert!(keymap.handle(&mut session, "Shift-Ctrl-2").unwrap());
    assert_eq!(md(&session), "## Title\n");
    assert!(keymap.handle(&mut session, "Shift-Ctrl-0").unwrap());
    assert_eq!(md(&session), "Title\n");
}

#[test]
fn test_code_block_typed_and_exited() {
    let keymap = Keymap::default();
    let mut session = EditorSession::from_markdown("");

    type_chars(&mut session, "```sh ");
    assert_eq!(session.document().blocks()[0].node_type(), NodeType::CodeBlock);
    // markdown rules do not fire inside code
    type_chars(&mut session, "ls **");
    assert!(keymap.handle(&mut session, "Enter").unwrap());
    type_chars(&mut session, "pwd");
    assert!(keymap.handle(&mut session, "Mod-Enter").unwrap());
    type_chars(&mut session, "after");

    assert_eq!(md(&session), "```sh\nls **\npwd\n```\n\nafter\n");
}

#[test]
fn test_unbound_chord_does_nothing() {
    let keymap = Keymap::default();
    let mut session = EditorSession::from_markdown("text\n");
    assert!(!keymap.handle(&mut session, "Mod-q").unwrap());
    assert_eq!(md(&session), "text\n");
}
