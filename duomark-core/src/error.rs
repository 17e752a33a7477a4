//! Error types for schema, editing, format and capability operations
//!
//! Parsing and serialization of Markdown are total and never produce an error; the
//! types below only surface at the schema-construction boundary, when a transaction is
//! rejected, when a format is used in a way it does not support, and at the async
//! boundary with external capabilities (upload, HTML conversion, diagram rendering).

use crate::schema::{MarkType, NodeType};
use std::fmt;

/// Errors that can occur during format operations
#[derive(Debug, Clone, PartialEq)]
pub enum FormatError {
    /// Format not found in registry
    FormatNotFound(String),
    /// Error during parsing
    ParseError(String),
    /// Error during serialization
    SerializationError(String),
    /// Format does not support the operation
    NotSupported(String),
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatError::FormatNotFound(name) => write!(f, "Format '{name}' not found"),
            FormatError::ParseError(msg) => write!(f, "Parse error: {msg}"),
            FormatError::SerializationError(msg) => write!(f, "Serialization error: {msg}"),
            FormatError::NotSupported(msg) => write!(f, "Operation not supported: {msg}"),
        }
    }
}

impl std::error::Error for FormatError {}

/// Attempted construction of a structurally invalid node.
///
/// This is an internal error: the command layer mediates every edit, so user input
/// alone must never produce one.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaViolation {
    /// A child node is not allowed at this position of the parent's content
    InvalidContent {
        parent: NodeType,
        child: NodeType,
        index: usize,
    },
    /// The parent requires content it did not receive
    MissingContent { parent: NodeType },
    /// Attributes are of the wrong kind or hold an invalid value
    InvalidAttrs { node: NodeType, reason: String },
    /// The parent forbids marks on its text
    MarkNotAllowed { parent: NodeType, mark: MarkType },
    /// Text nodes must not be empty
    EmptyText,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaViolation::InvalidContent {
                parent,
                child,
                index,
            } => write!(
                f,
                "'{}' cannot contain '{}' at index {index}",
                parent.name(),
                child.name()
            ),
            SchemaViolation::MissingContent { parent } => {
                write!(f, "'{}' requires content", parent.name())
            }
            SchemaViolation::InvalidAttrs { node, reason } => {
                write!(f, "Invalid attributes for '{}': {reason}", node.name())
            }
            SchemaViolation::MarkNotAllowed { parent, mark } => write!(
                f,
                "'{}' does not allow the '{}' mark",
                parent.name(),
                mark.name()
            ),
            SchemaViolation::EmptyText => write!(f, "Text nodes must not be empty"),
        }
    }
}

impl std::error::Error for SchemaViolation {}

/// A transaction step could not be applied; the document is left unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum TransactionError {
    /// No node exists at the given path
    InvalidPath(Vec<usize>),
    /// The node at the path is not a textblock
    NotTextblock(Vec<usize>),
    /// An inline offset lies outside the textblock
    InvalidOffset { path: Vec<usize>, offset: usize },
    /// The resulting tree violates the schema
    Schema(SchemaViolation),
    /// The selection set by the transaction does not exist in the new document
    InvalidSelection,
}

impl fmt::Display for TransactionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionError::InvalidPath(path) => write!(f, "No node at path {path:?}"),
            TransactionError::NotTextblock(path) => {
                write!(f, "Node at path {path:?} is not a textblock")
            }
            TransactionError::InvalidOffset { path, offset } => {
                write!(f, "Offset {offset} is out of range in block {path:?}")
            }
            TransactionError::Schema(violation) => write!(f, "Schema violation: {violation}"),
            TransactionError::InvalidSelection => {
                write!(f, "Selection does not fit the resulting document")
            }
        }
    }
}

impl std::error::Error for TransactionError {}

impl From<SchemaViolation> for TransactionError {
    fn from(violation: SchemaViolation) -> Self {
        TransactionError::Schema(violation)
    }
}

/// Failure reported by an upload provider (network, auth, provider error)
#[derive(Debug, Clone, PartialEq)]
pub struct UploadFailure {
    pub message: String,
}

impl UploadFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for UploadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Upload failed: {}", self.message)
    }
}

impl std::error::Error for UploadFailure {}

/// Which external conversion failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionKind {
    Html,
    Diagram,
}

/// Failure of an HTML→Markdown conversion or a diagram render
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionFailure {
    pub kind: ConversionKind,
    pub message: String,
}

impl ConversionFailure {
    pub fn html(message: impl Into<String>) -> Self {
        Self {
            kind: ConversionKind::Html,
            message: message.into(),
        }
    }

    pub fn diagram(message: impl Into<String>) -> Self {
        Self {
            kind: ConversionKind::Diagram,
            message: message.into(),
        }
    }
}

impl fmt::Display for ConversionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ConversionKind::Html => write!(f, "HTML conversion failed: {}", self.message),
            ConversionKind::Diagram => write!(f, "Diagram rendering failed: {}", self.message),
        }
    }
}

impl std::error::Error for ConversionFailure {}

/// Why a paste or drop could not be completed
#[derive(Debug, Clone, PartialEq)]
pub enum IngestFailure {
    Upload(UploadFailure),
    Conversion(ConversionFailure),
}

impl fmt::Display for IngestFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestFailure::Upload(err) => err.fmt(f),
            IngestFailure::Conversion(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for IngestFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IngestFailure::Upload(err) => Some(err),
            IngestFailure::Conversion(err) => Some(err),
        }
    }
}

impl From<UploadFailure> for IngestFailure {
    fn from(err: UploadFailure) -> Self {
        IngestFailure::Upload(err)
    }
}

impl From<ConversionFailure> for IngestFailure {
    fn from(err: ConversionFailure) -> Self {
        IngestFailure::Conversion(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_violation_messages_use_schema_names() {
        let err = SchemaViolation::InvalidContent {
            parent: NodeType::TaskList,
            child: NodeType::ListItem,
            index: 0,
        };
        assert_eq!(
            err.to_string(),
            "'task_list' cannot contain 'list_item' at index 0"
        );
    }

    #[test]
    fn transaction_error_wraps_schema_violation() {
        let err: TransactionError = SchemaViolation::EmptyText.into();
        assert_eq!(
            err.to_string(),
            "Schema violation: Text nodes must not be empty"
        );
    }

    #[test]
    fn conversion_failure_names_its_kind() {
        assert_eq!(
            ConversionFailure::diagram("syntax error on line 2").to_string(),
            "Diagram rendering failed: syntax error on line 2"
        );
    }
}
