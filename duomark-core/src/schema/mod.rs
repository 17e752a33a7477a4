//! The document schema: node and mark taxonomy with their content rules.
//!
//!     Node types, their content models and attributes live in [`content`] and
//!     [`attrs`]; inline formatting lives in [`marks`]. The [`Node`] type in [`nodes`]
//!     enforces the content model at construction, so parser, serializer and editor all
//!     work on trees that are valid by construction.

pub mod attrs;
pub mod content;
pub mod marks;
pub mod nodes;

pub use attrs::{
    Attrs, CodeBlockAttrs, HeadingAttrs, ImageAttrs, LinkAttrs, OrderedListAttrs, TaskItemAttrs,
};
pub use content::{ContentRule, NodeType};
pub use marks::{Mark, MarkSet, MarkType};
pub use nodes::{Document, Node};
