//! Typed node and mark attributes.

use serde::{Deserialize, Serialize};

/// Attributes of a `heading` node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadingAttrs {
    /// Heading level, 1 to 6
    pub level: u8,
}

impl Default for HeadingAttrs {
    fn default() -> Self {
        Self { level: 1 }
    }
}

/// Attributes of a `code_block` node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeBlockAttrs {
    /// Fence info string (`None` when the fence had none)
    #[serde(default)]
    pub language: Option<String>,
    /// Source kept aside when an external renderer replaced the display text.
    ///
    /// The serializer always prefers this over the block's current text.
    #[serde(default)]
    pub original_source: Option<String>,
}

impl CodeBlockAttrs {
    pub fn with_language(language: Option<String>) -> Self {
        Self {
            language,
            original_source: None,
        }
    }

    /// Whether the block's display text was replaced by a rendered artifact.
    pub fn is_rendered(&self) -> bool {
        self.original_source.is_some()
    }
}

/// Attributes of an `ordered_list` node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderedListAttrs {
    /// Number of the first item (positive)
    pub order: u32,
}

impl Default for OrderedListAttrs {
    fn default() -> Self {
        Self { order: 1 }
    }
}

/// Attributes of a `task_item` node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskItemAttrs {
    #[serde(default)]
    pub checked: bool,
}

/// Attributes of an `image` node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAttrs {
    pub src: String,
    #[serde(default)]
    pub alt: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

impl ImageAttrs {
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            alt: None,
            title: None,
        }
    }

    pub fn with_alt(mut self, alt: impl Into<String>) -> Self {
        let alt = alt.into();
        self.alt = if alt.is_empty() { None } else { Some(alt) };
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Attributes of a `link` mark
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkAttrs {
    pub href: String,
    #[serde(default)]
    pub title: Option<String>,
}

/// Attributes attached to a node, one variant per attributed node type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Attrs {
    #[default]
    None,
    Heading(HeadingAttrs),
    CodeBlock(CodeBlockAttrs),
    OrderedList(OrderedListAttrs),
    TaskItem(TaskItemAttrs),
    Image(ImageAttrs),
}

impl Attrs {
    pub fn heading(&self) -> Option<&HeadingAttrs> {
        match self {
            Attrs::Heading(attrs) => Some(attrs),
            _ => None,
        }
    }

    pub fn code_block(&self) -> Option<&CodeBlockAttrs> {
        match self {
            Attrs::CodeBlock(attrs) => Some(attrs),
            _ => None,
        }
    }

    pub fn ordered_list(&self) -> Option<&OrderedListAttrs> {
        match self {
            Attrs::OrderedList(attrs) => Some(attrs),
            _ => None,
        }
    }

    pub fn task_item(&self) -> Option<&TaskItemAttrs> {
        match self {
            Attrs::TaskItem(attrs) => Some(attrs),
            _ => None,
        }
    }

    pub fn image(&self) -> Option<&ImageAttrs> {
        match self {
            Attrs::Image(attrs) => Some(attrs),
            _ => None,
        }
    }

    /// JSON form used by the `json` format; `None` has no attributes.
    pub(crate) fn to_json(&self) -> Option<serde_json::Value> {
        let value = match self {
            Attrs::None => return None,
            Attrs::Heading(a) => serde_json::to_value(a),
            Attrs::CodeBlock(a) => serde_json::to_value(a),
            Attrs::OrderedList(a) => serde_json::to_value(a),
            Attrs::TaskItem(a) => serde_json::to_value(a),
            Attrs::Image(a) => serde_json::to_value(a),
        };
        value.ok()
    }
}
