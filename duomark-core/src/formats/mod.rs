//! Format implementations
//!
//! Each format converts between the document tree and one text representation.

pub mod html;
pub mod icons;
pub mod json;
pub mod markdown;
pub mod treeviz;

pub use html::{HtmlFormat, HtmlImporter, HtmlOptions};
pub use json::JsonFormat;
pub use markdown::{MarkdownFormat, MarkdownRules};
pub use treeviz::TreevizFormat;
