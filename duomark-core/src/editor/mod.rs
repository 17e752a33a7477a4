//! Structured editing: sessions, selections, transactions, commands and key bindings.
//!
//! Everything that changes a document while a user edits it lives here. The flow is
//! always the same: a command or input rule inspects the [`EditorSession`], builds a
//! [`Transaction`] and dispatches it; the session applies it atomically and tells its
//! sync controller about the change.

pub mod commands;
pub(crate) mod fragment;
pub mod input_rules;
pub mod keymap;
pub mod position;
pub mod session;
pub mod transaction;

pub use commands::CommandResult;
pub use input_rules::{apply_input_rules, type_text};
pub use keymap::{Command, KeyChord, Keymap};
pub use position::{Path, Selection, TextPos};
pub use session::{EditorSession, Notice, NoticeLevel};
pub use transaction::{Step, Transaction};
