//! Defines the flat event stream representation of a document.

use crate::schema::{CodeBlockAttrs, ImageAttrs, MarkSet};

/// Kind of list opened by [`Event::StartList`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Bullet,
    Ordered { order: u32 },
    Task,
}

/// Represents a single event in the document stream.
///
/// Containers come as `Start*`/`End*` pairs; leaves (code blocks, rules, inline
/// content) are single events.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    StartDocument,
    EndDocument,
    StartParagraph,
    EndParagraph,
    StartHeading(u8),
    EndHeading,
    StartBlockquote,
    EndBlockquote,
    CodeBlock {
        attrs: CodeBlockAttrs,
        text: String,
    },
    HorizontalRule,
    StartList(ListKind),
    EndList,
    /// `checked` is set for task items only
    StartListItem {
        checked: Option<bool>,
    },
    EndListItem,
    StartTable,
    EndTable,
    StartTableRow,
    EndTableRow,
    StartTableCell {
        header: bool,
    },
    EndTableCell,
    Text {
        text: String,
        marks: MarkSet,
    },
    Image(ImageAttrs),
    HardBreak,
}

impl Event {
    /// Short name used in error messages and event dumps
    pub fn label(&self) -> &'static str {
        match self {
            Event::StartDocument => "StartDocument",
            Event::EndDocument => "EndDocument",
            Event::StartParagraph => "StartParagraph",
            Event::EndParagraph => "EndParagraph",
            Event::StartHeading(_) => "StartHeading",
            Event::EndHeading => "EndHeading",
            Event::StartBlockquote => "StartBlockquote",
            Event::EndBlockquote => "EndBlockquote",
            Event::CodeBlock { .. } => "CodeBlock",
            Event::HorizontalRule => "HorizontalRule",
            Event::StartList(_) => "StartList",
            Event::EndList => "EndList",
            Event::StartListItem { .. } => "StartListItem",
            Event::EndListItem => "EndListItem",
            Event::StartTable => "StartTable",
            Event::EndTable => "EndTable",
            Event::StartTableRow => "StartTableRow",
            Event::EndTableRow => "EndTableRow",
            Event::StartTableCell { .. } => "StartTableCell",
            Event::EndTableCell => "EndTableCell",
            Event::Text { .. } => "Text",
            Event::Image(_) => "Image",
            Event::HardBreak => "HardBreak",
        }
    }

    pub fn is_inline(&self) -> bool {
        matches!(self, Event::Text { .. } | Event::Image(_) | Event::HardBreak)
    }
}
