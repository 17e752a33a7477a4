//! External collaborators, modelled as capabilities.
//!
//! The engine never talks to the network, a diagram library or a clipboard converter
//! directly. Hosts hand it implementations of the traits below, and the engine awaits
//! them outside of any document mutation (see [`crate::paste`] and [`crate::diagram`]).
//!
//! Futures are returned as `impl Future` so hosts can implement the traits with plain
//! `async fn`s, whatever executor they run on.

use crate::error::{ConversionFailure, UploadFailure};
use serde::{Deserialize, Serialize};
use std::future::Future;

/// Stores binary media somewhere addressable and returns its URL.
pub trait UploadCapability {
    /// Upload `bytes`; `filename_hint` is the original file name when one is known.
    fn upload(
        &self,
        bytes: Vec<u8>,
        filename_hint: &str,
    ) -> impl Future<Output = Result<String, UploadFailure>>;
}

/// A named storage provider (a cloud drive, a gist host, a repository).
///
/// Besides media upload it can store and fetch whole documents.
pub trait ProviderCapability: UploadCapability {
    /// Provider name shown to the user
    fn name(&self) -> &str;

    fn upload_text(
        &self,
        path: &str,
        text: &str,
    ) -> impl Future<Output = Result<String, UploadFailure>>;

    fn download(&self, path: &str) -> impl Future<Output = Result<Vec<u8>, UploadFailure>>;

    fn list(&self, prefix: &str) -> impl Future<Output = Result<Vec<String>, UploadFailure>>;

    fn delete(&self, path: &str) -> impl Future<Output = Result<(), UploadFailure>>;
}

/// Which HTML structures survive a paste.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct HtmlConversionOptions {
    /// Keep strong, emphasis, strikethrough and inline code
    pub preserve_formatting: bool,
    pub links: bool,
    pub images: bool,
    pub lists: bool,
    pub headings: bool,
}

impl Default for HtmlConversionOptions {
    fn default() -> Self {
        Self {
            preserve_formatting: true,
            links: true,
            images: true,
            lists: true,
            headings: true,
        }
    }
}

impl HtmlConversionOptions {
    /// Only text and paragraph structure.
    pub fn plain() -> Self {
        Self {
            preserve_formatting: false,
            links: false,
            images: false,
            lists: false,
            headings: false,
        }
    }
}

/// Converts pasted or dropped HTML to Markdown.
pub trait HtmlToMarkdown {
    fn convert(
        &self,
        html: &str,
        options: &HtmlConversionOptions,
    ) -> impl Future<Output = Result<String, ConversionFailure>>;
}

/// Rendered form of a diagram, ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramArtifact {
    /// MIME type of `content`, usually `image/svg+xml`
    pub mime: String,
    pub content: String,
}

impl DiagramArtifact {
    pub fn svg(content: impl Into<String>) -> Self {
        Self {
            mime: "image/svg+xml".to_string(),
            content: content.into(),
        }
    }
}

/// Turns diagram source (e.g. a mermaid chart) into an artifact.
pub trait DiagramRenderer {
    fn render(&self, source: &str)
        -> impl Future<Output = Result<DiagramArtifact, ConversionFailure>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_options_default_to_everything() {
        let options = HtmlConversionOptions::default();
        assert!(options.preserve_formatting && options.links && options.images);
        assert!(options.lists && options.headings);
        assert_ne!(options, HtmlConversionOptions::plain());
    }

    #[test]
    fn test_conversion_options_deserialize_partially() {
        let options: HtmlConversionOptions =
            serde_json::from_str(r#"{"images": false, "preserve-formatting": false}"#).unwrap();
        assert!(!options.images);
        assert!(!options.preserve_formatting);
        assert!(options.links);
    }
}
