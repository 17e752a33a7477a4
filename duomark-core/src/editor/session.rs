//! The editor session: one document, one selection, and everything that changes them.

use super::position::Selection;
use super::transaction::Transaction;
use crate::error::TransactionError;
use crate::formats::markdown::parse_markdown;
use crate::schema::{Document, MarkSet};
use crate::sync::{ExternalOutcome, SyncController, SyncOptions, SyncOutput};
use std::fmt;
use tracing::{debug, warn};
use web_time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A user-visible message produced by asynchronous work (uploads, conversions).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.level {
            NoticeLevel::Info => write!(f, "{}", self.message),
            NoticeLevel::Error => write!(f, "error: {}", self.message),
        }
    }
}

/// Owns the document of one editing surface.
///
/// There is no global editor: callers hold the session and pass it to commands,
/// input rules, paste ingestion and diagram rendering explicitly.
#[derive(Debug, Clone)]
pub struct EditorSession {
    doc: Document,
    selection: Selection,
    stored_marks: Option<MarkSet>,
    notices: Vec<Notice>,
    sync: Option<SyncController>,
    next_id: u64,
}

impl EditorSession {
    pub fn new(doc: Document) -> Self {
        let selection = Selection::start_of(&doc);
        Self {
            doc,
            selection,
            stored_marks: None,
            notices: Vec::new(),
            sync: None,
            next_id: 1,
        }
    }

    pub fn from_markdown(text: &str) -> Self {
        Self::new(parse_markdown(text))
    }

    /// Session created from the source editor's text, kept in sync with it.
    pub fn with_sync(text: &str, options: SyncOptions) -> Self {
        let mut session = Self::from_markdown(text);
        session.sync = Some(SyncController::new(text, options));
        session
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Move the selection; an invalid selection is refused.
    pub fn set_selection(&mut self, selection: Selection) -> bool {
        if !selection.is_valid(&self.doc) {
            return false;
        }
        if selection != self.selection {
            self.stored_marks = None;
        }
        self.selection = selection;
        true
    }

    /// Marks the next typed text gets, when toggled at a caret
    pub fn stored_marks(&self) -> Option<&MarkSet> {
        self.stored_marks.as_ref()
    }

    pub(crate) fn set_stored_marks(&mut self, marks: Option<MarkSet>) {
        self.stored_marks = marks;
    }

    pub fn sync(&self) -> Option<&SyncController> {
        self.sync.as_ref()
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn push_notice(&mut self, notice: Notice) {
        self.notices.push(notice);
    }

    pub(crate) fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn dispatch(&mut self, tx: Transaction) -> Result<(), TransactionError> {
        self.dispatch_at(tx, Instant::now())
    }

    /// Apply `tx` atomically and notify the sync controller.
    ///
    /// The selection becomes the transaction's selection, or stays where it was when
    /// still valid, or falls back to the start of the document.
    pub fn dispatch_at(&mut self, tx: Transaction, now: Instant) -> Result<(), TransactionError> {
        let doc = tx.apply(&self.doc)?;
        let selection = match tx.selection() {
            Some(selection) if selection.is_valid(&doc) => selection.clone(),
            Some(_) => return Err(TransactionError::InvalidSelection),
            None if self.selection.is_valid(&doc) => self.selection.clone(),
            None => Selection::start_of(&doc),
        };
        self.selection = selection;
        self.stored_marks = None;
        if tx.is_empty() {
            return Ok(());
        }
        self.doc = doc;
        if let Some(sync) = self.sync.as_mut() {
            sync.on_transaction(now);
        }
        Ok(())
    }

    /// Emit pending local edits whose debounce has passed.
    pub fn poll_sync(&mut self, now: Instant) -> Option<String> {
        let output = self.sync.as_mut()?.poll(&self.doc, now);
        self.finish_sync(output, now)
    }

    /// Emit pending local edits now.
    pub fn flush_sync(&mut self) -> Option<String> {
        let output = self.sync.as_mut()?.flush(&self.doc);
        self.finish_sync(output, Instant::now())
    }

    /// Take a new value from the source editor.
    pub fn receive_external(&mut self, text: &str, now: Instant) -> ExternalOutcome {
        let Some(sync) = self.sync.as_mut() else {
            return ExternalOutcome::Unchanged;
        };
        let outcome = sync.receive_external(text, &self.doc);
        if let ExternalOutcome::Replace(doc) = &outcome {
            self.replace_document(doc.clone(), now);
        }
        outcome
    }

    fn finish_sync(&mut self, output: SyncOutput, now: Instant) -> Option<String> {
        if let Some(doc) = output.replacement {
            self.replace_document(doc, now);
        }
        output.emitted
    }

    fn replace_document(&mut self, doc: Document, now: Instant) {
        let selection = Selection::start_of(&doc);
        let tx = Transaction::new().replace_doc(doc).select(selection);
        if let Err(err) = self.dispatch_at(tx, now) {
            warn!(error = %err, "sync: wholesale replacement rejected");
            if let Some(sync) = self.sync.as_mut() {
                sync.cancel_external();
            }
        } else {
            debug!("sync: document replaced, selection reset to start");
        }
    }
}
