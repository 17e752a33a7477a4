//! Markdown ⇄ structured document engine for dual-surface editors
//!
//!     A dual-surface editor shows the same document twice: as plain Markdown text in a
//!     source editor, and as a structured, WYSIWYG tree. This crate is everything between
//!     the two: the tree's schema, the conversion in both directions, the protocol that
//!     keeps the two surfaces convergent, and the editing layer that changes the tree.
//!
//!     The Markdown text is the source of truth. The tree is created from it, replaced
//!     wholesale when it changes from the outside, and serialized back (debounced) when it
//!     is edited locally.
//!
//!     This is a pure lib, it powers duomark-cli but is shell agnostic: nothing here
//!     prints, reads env vars or touches the network. External work (uploads, HTML
//!     conversion, diagram rendering) comes in through the capability traits.
//!
//! Architecture
//!
//!     .
//!     ├── schema                  # Node/mark taxonomy, content rules, validated nodes
//!     ├── ir                      # Flat event stream
//!     ├── common                  # Event stream <-> tree
//!     ├── format.rs               # Format trait definition
//!     ├── registry.rs             # FormatRegistry for discovery and selection
//!     ├── formats
//!     │   ├── markdown            # Line parser, inline pass, serializer
//!     │   ├── html                # Preview rendering and HTML import
//!     │   ├── json                # serde tree
//!     │   └── treeviz             # Indented tree for inspection
//!     ├── editor                  # Session, transactions, commands, input rules, keymap
//!     ├── sync.rs                 # Source <-> tree reconciliation
//!     ├── paste.rs                # Paste / drop ingestion
//!     ├── diagram.rs              # Diagram rendering and source recovery
//!     ├── capability.rs           # Upload, HTML conversion and rendering traits
//!     └── error.rs
//!
//! Core Algorithms
//!
//!     Parsers do not build trees. They emit events (./ir/events.rs) and the common
//!     builder (./common/flat_to_nested.rs) nests them, validating every node against the
//!     schema on the way. The reverse walk (./common/nested_to_flat.rs) feeds inspection.
//!
//!     Markdown parsing is total: malformed input degrades to literal text, it never
//!     fails. Serialization is deterministic, so `serialize(parse(serialize(t)))` equals
//!     `serialize(t)`, which is what lets the sync controller tell echoes from edits.
//!
//! Editing
//!
//!     All mutation goes through [`editor::Transaction`]s dispatched on an
//!     [`editor::EditorSession`]. A transaction applies to a copy and commits only when
//!     every step validated, so a rejected edit leaves the document as it was. Commands
//!     return `Ok(false)` when they do not apply, which lets key bindings chain them.

pub mod capability;
pub mod common;
pub mod diagram;
pub mod editor;
pub mod error;
pub mod format;
pub mod formats;
pub mod ir;
pub mod paste;
pub mod registry;
pub mod schema;
pub mod sync;

pub use capability::{
    DiagramArtifact, DiagramRenderer, HtmlConversionOptions, HtmlToMarkdown, ProviderCapability,
    UploadCapability,
};
pub use editor::{EditorSession, Keymap, Notice, Selection, TextPos, Transaction};
pub use error::{
    ConversionFailure, FormatError, IngestFailure, SchemaViolation, TransactionError,
    UploadFailure,
};
pub use format::Format;
pub use formats::markdown::{parse_markdown, serialize_to_markdown, MarkdownRules};
pub use registry::FormatRegistry;
pub use schema::{Document, Mark, MarkType, Node, NodeType};
pub use sync::{SyncController, SyncOptions};
