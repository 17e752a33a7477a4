//! Reconciliation between the Markdown source and the structured document.
//!
//! The Markdown text held by the source editor is the source of truth. The controller
//! keeps the in-memory tree and that text convergent:
//!
//! - local edits re-arm a debounce deadline; once it passes, the tree is serialized and
//!   emitted if it differs from the last-known external value (the baseline)
//! - an external value equal to the current serialization is ignored
//! - any other external value replaces the whole tree in one transaction, and the
//!   transaction that replacement triggers is not echoed back as a local edit
//! - an external value arriving while a local edit is pending waits for the debounce
//!   to resolve; the latest one wins
//!
//! Time is passed in by the caller so the state machine is deterministic under test.
//!
//! ```text
//!                 on_transaction                 poll (deadline passed)
//!   Idle ─────────────────────────► LocalEditPending ────────────────────► Idle
//!    │ ▲                              │ ▲    │                              (emit)
//!    │ │ on_transaction (echo)        └─┘    │ receive_external → deferred
//!    │ │                         re-arm      │
//!    ▼ │                                     ▼
//!   ExternalApplyInFlight ◄── receive_external (differs)
//! ```

use crate::formats::markdown::{parse_markdown, serialize_to_markdown, MarkdownRules};
use crate::schema::Document;
use std::time::Duration;
use tracing::debug;
use web_time::Instant;

/// Debounce applied when nothing else is configured
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(400);

#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Quiet period after the last local edit before the tree is serialized
    pub debounce: Duration,
    /// Rules used to serialize the tree
    pub rules: MarkdownRules,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            rules: MarkdownRules::default(),
        }
    }
}

impl SyncOptions {
    pub fn with_debounce_ms(mut self, millis: u64) -> Self {
        self.debounce = Duration::from_millis(millis);
        self
    }

    pub fn with_rules(mut self, rules: MarkdownRules) -> Self {
        self.rules = rules;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    /// A local edit waits for the debounce deadline
    LocalEditPending { deadline: Instant },
    /// A wholesale replacement was handed out; its transaction is not a local edit
    ExternalApplyInFlight,
}

/// What [`SyncController::receive_external`] decided
#[derive(Debug, Clone, PartialEq)]
pub enum ExternalOutcome {
    /// The value matches the current tree
    Unchanged,
    /// Held back until the pending local edit is emitted
    Deferred,
    /// The tree must be replaced with this document
    Replace(Document),
}

/// Result of resolving a debounce
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncOutput {
    /// Markdown to hand to the source editor
    pub emitted: Option<String>,
    /// Replacement produced by a deferred external value
    pub replacement: Option<Document>,
}

impl SyncOutput {
    pub fn is_empty(&self) -> bool {
        self.emitted.is_none() && self.replacement.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct SyncController {
    options: SyncOptions,
    state: SyncState,
    baseline: String,
    deferred: Option<String>,
}

impl SyncController {
    /// Controller whose baseline is the Markdown the session was created from.
    pub fn new(baseline: impl Into<String>, options: SyncOptions) -> Self {
        Self {
            options,
            state: SyncState::Idle,
            baseline: baseline.into(),
            deferred: None,
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Last Markdown value known to be held by the source editor
    pub fn baseline(&self) -> &str {
        &self.baseline
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    pub fn has_deferred(&self) -> bool {
        self.deferred.is_some()
    }

    pub fn serialize(&self, doc: &Document) -> String {
        serialize_to_markdown(doc, &self.options.rules)
    }

    /// Record that a transaction changed the document.
    pub fn on_transaction(&mut self, now: Instant) {
        self.state = match self.state {
            SyncState::ExternalApplyInFlight => {
                debug!("sync: external replacement applied, not echoed");
                SyncState::Idle
            }
            _ => SyncState::LocalEditPending {
                deadline: now + self.options.debounce,
            },
        };
    }

    /// Resolve the debounce if its deadline has passed.
    pub fn poll(&mut self, doc: &Document, now: Instant) -> SyncOutput {
        match self.state {
            SyncState::LocalEditPending { deadline } if now >= deadline => self.emit(doc),
            _ => SyncOutput::default(),
        }
    }

    /// Resolve a pending debounce immediately.
    pub fn flush(&mut self, doc: &Document) -> SyncOutput {
        match self.state {
            SyncState::LocalEditPending { .. } => self.emit(doc),
            _ => SyncOutput::default(),
        }
    }

    /// Handle a new value from the source editor.
    pub fn receive_external(&mut self, text: &str, doc: &Document) -> ExternalOutcome {
        if let SyncState::LocalEditPending { .. } = self.state {
            debug!("sync: external value deferred behind local edit");
            self.deferred = Some(text.to_string());
            return ExternalOutcome::Deferred;
        }

        self.baseline = text.to_string();
        if self.serialize(doc) == text {
            return ExternalOutcome::Unchanged;
        }
        let parsed = parse_markdown(text);
        if parsed == *doc {
            debug!("sync: external value differs only in formatting");
            return ExternalOutcome::Unchanged;
        }
        debug!("sync: replacing document from external value");
        self.state = SyncState::ExternalApplyInFlight;
        ExternalOutcome::Replace(parsed)
    }

    /// Forget an in-flight replacement that was never applied.
    pub fn cancel_external(&mut self) {
        if self.state == SyncState::ExternalApplyInFlight {
            self.state = SyncState::Idle;
        }
    }

    fn emit(&mut self, doc: &Document) -> SyncOutput {
        self.state = SyncState::Idle;
        let markdown = self.serialize(doc);
        let emitted = if markdown != self.baseline {
            debug!(bytes = markdown.len(), "sync: emitting local edits");
            self.baseline = markdown.clone();
            Some(markdown)
        } else {
            None
        };

        let replacement = self.deferred.take().and_then(|text| {
            match self.receive_external(&text, doc) {
                ExternalOutcome::Replace(replacement) => Some(replacement),
                _ => None,
            }
        });
        SyncOutput {
            emitted,
            replacement,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller(text: &str) -> (SyncController, Document) {
        (
            SyncController::new(text, SyncOptions::default()),
            parse_markdown(text),
        )
    }

    #[test]
    fn test_debounce_rearms_on_every_edit() {
        let (mut sync, doc) = controller("a\n");
        let start = Instant::now();
        sync.on_transaction(start);
        sync.on_transaction(start + Duration::from_millis(300));
        assert!(sync.poll(&doc, start + Duration::from_millis(500)).is_empty());
        assert!(matches!(sync.state(), SyncState::LocalEditPending { .. }));
        // unchanged tree: the deadline resolves without emitting
        assert!(sync.poll(&doc, start + Duration::from_millis(700)).is_empty());
        assert_eq!(sync.state(), SyncState::Idle);
    }

    #[test]
    fn test_emits_changed_serialization() {
        let (mut sync, _) = controller("a\n");
        let edited = parse_markdown("a **b**\n");
        let start = Instant::now();
        sync.on_transaction(start);
        let output = sync.poll(&edited, start + DEFAULT_DEBOUNCE);
        assert_eq!(output.emitted.as_deref(), Some("a **b**\n"));
        assert_eq!(sync.baseline(), "a **b**\n");
    }

    #[test]
    fn test_echo_is_ignored() {
        let (mut sync, doc) = controller("- a\n");
        assert_eq!(sync.receive_external("- a\n", &doc), ExternalOutcome::Unchanged);
        assert_eq!(sync.receive_external("* a\n", &doc), ExternalOutcome::Unchanged);
        assert_eq!(sync.baseline(), "* a\n");
        assert_eq!(sync.state(), SyncState::Idle);
    }

    #[test]
    fn test_external_replace_is_not_echoed() {
        let (mut sync, doc) = controller("a\n");
        let outcome = sync.receive_external("b\n", &doc);
        assert_eq!(outcome, ExternalOutcome::Replace(parse_markdown("b\n")));
        assert_eq!(sync.state(), SyncState::ExternalApplyInFlight);
        sync.on_transaction(Instant::now());
        assert_eq!(sync.state(), SyncState::Idle);
    }

    #[test]
    fn test_external_value_waits_for_pending_edit() {
        let (mut sync, _) = controller("a\n");
        let edited = parse_markdown("ab\n");
        let start = Instant::now();
        sync.on_transaction(start);
        assert_eq!(sync.receive_external("x\n", &edited), ExternalOutcome::Deferred);
        assert_eq!(sync.receive_external("y\n", &edited), ExternalOutcome::Deferred);

        let output = sync.flush(&edited);
        assert_eq!(output.emitted.as_deref(), Some("ab\n"));
        assert_eq!(output.replacement, Some(parse_markdown("y\n")));
        assert_eq!(sync.state(), SyncState::ExternalApplyInFlight);
        assert!(!sync.has_deferred());
    }
}
