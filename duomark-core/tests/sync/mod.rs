use duomark_core::editor::{EditorSession, Selection, Transaction};
use duomark_core::sync::{ExternalOutcome, SyncOptions, SyncState, DEFAULT_DEBOUNCE};
use duomark_core::{parse_markdown, Node};
use std::time::Duration;
use web_time::Instant;

/// Append `text` to the end of the first block at `now`.
fn append(session: &mut EditorSession, text: &str, now: Instant) {
    let end = session.document().blocks()[0].content_size();
    let tx = Transaction::new().replace_inline(
        vec![0],
        end,
        end,
        vec![Node::plain_text(text).unwrap()],
    );
    session.dispatch_at(tx, now).unwrap();
}

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

#[test]
fn test_burst_of_edits_emits_once() {
    let mut session = EditorSession::with_sync("a\n", SyncOptions::default());
    let start = Instant::now();
    for (i, ch) in ["b", "c", "d", "e"].into_iter().enumerate() {
        append(&mut session, ch, start + ms(100 * i as u64));
        assert_eq!(session.poll_sync(start + ms(100 * i as u64 + 50)), None);
    }

    let last = start + ms(300);
    assert_eq!(session.poll_sync(last + DEFAULT_DEBOUNCE - ms(1)), None);
    assert_eq!(
        session.poll_sync(last + DEFAULT_DEBOUNCE).as_deref(),
        Some("abcde\n")
    );
    // resolved: nothing more to emit
    assert_eq!(session.poll_sync(last + DEFAULT_DEBOUNCE * 4), None);
    assert_eq!(session.sync().unwrap().baseline(), "abcde\n");
}

#[test]
fn test_configured_debounce() {
    let options = SyncOptions::default().with_debounce_ms(50);
    let mut session = EditorSession::with_sync("a\n", options);
    let start = Instant::now();
    append(&mut session, "!", start);
    assert_eq!(session.poll_sync(start + ms(50)).as_deref(), Some("a!\n"));
}

#[test]
fn test_flush_emits_immediately() {
    let mut session = EditorSession::with_sync("a\n", SyncOptions::default());
    append(&mut session, "b", Instant::now());
    assert_eq!(session.flush_sync().as_deref(), Some("ab\n"));
    assert_eq!(session.flush_sync(), None);
}

#[test]
fn test_edit_that_restores_the_source_emits_nothing() {
    let mut session = EditorSession::with_sync("a\n", SyncOptions::default());
    let start = Instant::now();
    append(&mut session, "b", start);
    let tx = Transaction::new().replace_inline(vec![0], 1, 2, Vec::new());
    session.dispatch_at(tx, start + ms(10)).unwrap();
    assert_eq!(session.poll_sync(start + ms(10) + DEFAULT_DEBOUNCE), None);
}

#[test]
fn test_own_output_coming_back_is_an_echo() {
    let mut session = EditorSession::with_sync("a\n", SyncOptions::default());
    let start = Instant::now();
    append(&mut session, " more", start);
    let emitted = session.poll_sync(start + DEFAULT_DEBOUNCE).unwrap();
    assert_eq!(emitted, "a more\n");

    assert!(session.set_selection(Selection::caret(vec![0], 2)));
    let before = session.document().clone();
    assert_eq!(
        session.receive_external(&emitted, start + ms(500)),
        ExternalOutcome::Unchanged
    );
    assert_eq!(session.document(), &before);
    assert_eq!(session.selection(), &Selection::caret(vec![0], 2));
    assert_eq!(session.poll_sync(start + ms(5000)), None);
}

#[test]
fn test_external_change_replaces_without_echo() {
    let mut session = EditorSession::with_sync("a\n", SyncOptions::default());
    let start = Instant::now();

    let outcome = session.receive_external("# New\n\ntext\n", start);
    assert!(matches!(outcome, ExternalOutcome::Replace(_)));
    assert_eq!(session.document(), &parse_markdown("# New\n\ntext\n"));
    assert_eq!(session.selection(), &Selection::caret(vec![0], 0));
    assert_eq!(session.sync().unwrap().state(), SyncState::Idle);
    assert_eq!(session.poll_sync(start + DEFAULT_DEBOUNCE * 2), None);
}

#[test]
fn test_external_value_during_pending_edit_waits() {
    let mut session = EditorSession::with_sync("a\n", SyncOptions::default());
    let start = Instant::now();
    append(&mut session, "b", start);

    assert_eq!(
        session.receive_external("other\n", start + ms(10)),
        ExternalOutcome::Deferred
    );
    assert_eq!(session.document(), &parse_markdown("ab\n"));

    // the local edit goes out first, then the held value wins
    assert_eq!(
        session.poll_sync(start + DEFAULT_DEBOUNCE).as_deref(),
        Some("ab\n")
    );
    assert_eq!(session.document(), &parse_markdown("other\n"));
    assert_eq!(session.sync().unwrap().state(), SyncState::Idle);
}
