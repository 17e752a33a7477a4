//! Shared configuration loader for the duomark toolchain.
//!
//! `defaults/duomark.default.toml` is embedded into every binary so that docs and
//! runtime behavior stay in sync. Applications layer user-specific files on top
//! of those defaults via [`Loader`] before deserializing into [`DuomarkConfig`].

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use duomark_core::capability::HtmlConversionOptions;
use duomark_core::diagram::DiagramOptions;
use duomark_core::formats::markdown::{ListNumbering, MarkdownRules};
use duomark_core::sync::SyncOptions;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

const DEFAULT_TOML: &str = include_str!("../defaults/duomark.default.toml");

/// Project-local file picked up from the working directory when present
pub const PROJECT_CONFIG_FILE: &str = "duomark.toml";

/// Top-level configuration consumed by duomark applications.
#[derive(Debug, Clone, Deserialize)]
pub struct DuomarkConfig {
    pub markdown: MarkdownConfig,
    pub sync: SyncConfig,
    pub paste: PasteConfig,
    pub diagram: DiagramConfig,
    pub inspect: InspectConfig,
    pub convert: ConvertConfig,
}

/// Mirrors the knobs exposed by the Markdown serializer.
#[derive(Debug, Clone, Deserialize)]
pub struct MarkdownConfig {
    pub ordered_list_numbering: ListNumbering,
    pub bullet_marker: char,
}

impl From<&MarkdownConfig> for MarkdownRules {
    fn from(config: &MarkdownConfig) -> Self {
        MarkdownRules {
            ordered_list_numbering: config.ordered_list_numbering,
            bullet_marker: config.bullet_marker,
        }
    }
}

impl From<MarkdownConfig> for MarkdownRules {
    fn from(config: MarkdownConfig) -> Self {
        MarkdownRules::from(&config)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    pub debounce_ms: u64,
}

impl SyncConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PasteConfig {
    pub html: HtmlPasteConfig,
}

/// Which parts of pasted HTML survive conversion.
#[derive(Debug, Clone, Deserialize)]
pub struct HtmlPasteConfig {
    pub preserve_formatting: bool,
    pub links: bool,
    pub images: bool,
    pub lists: bool,
    pub headings: bool,
}

impl From<&HtmlPasteConfig> for HtmlConversionOptions {
    fn from(config: &HtmlPasteConfig) -> Self {
        HtmlConversionOptions {
            preserve_formatting: config.preserve_formatting,
            links: config.links,
            images: config.images,
            lists: config.lists,
            headings: config.headings,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiagramConfig {
    pub languages: Vec<String>,
}

impl From<&DiagramConfig> for DiagramOptions {
    fn from(config: &DiagramConfig) -> Self {
        DiagramOptions {
            languages: config.languages.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InspectConfig {
    pub treeviz: TreevizConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TreevizConfig {
    pub inline: bool,
}

/// Format-specific conversion knobs.
#[derive(Debug, Clone, Deserialize)]
pub struct ConvertConfig {
    pub html: HtmlExportConfig,
    pub json: JsonExportConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HtmlExportConfig {
    pub standalone: bool,
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonExportConfig {
    pub pretty: bool,
}

impl DuomarkConfig {
    pub fn markdown_rules(&self) -> MarkdownRules {
        MarkdownRules::from(&self.markdown)
    }

    pub fn html_conversion(&self) -> HtmlConversionOptions {
        HtmlConversionOptions::from(&self.paste.html)
    }

    pub fn diagram_options(&self) -> DiagramOptions {
        DiagramOptions::from(&self.diagram)
    }

    /// Sync options: the configured debounce, serializing with the configured rules.
    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            debounce: self.sync.debounce(),
            rules: self.markdown_rules(),
        }
    }
}

impl From<&DuomarkConfig> for SyncOptions {
    fn from(config: &DuomarkConfig) -> Self {
        config.sync_options()
    }
}

/// Helper for layering user overrides over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start a loader seeded with the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file. Missing files trigger an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer an optional configuration file (ignored if the file is absent).
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer `duomark.toml` from `dir` if it exists.
    pub fn with_project_file(self, dir: impl AsRef<Path>) -> Self {
        self.with_optional_file(dir.as_ref().join(PROJECT_CONFIG_FILE))
    }

    /// Apply a single key/value override (useful for CLI settings).
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Finalize the builder and deserialize the resulting configuration.
    pub fn build(self) -> Result<DuomarkConfig, ConfigError> {
        let config: DuomarkConfig = self.builder.build()?.try_deserialize()?;
        if !matches!(config.markdown.bullet_marker, '-' | '*' | '+') {
            return Err(ConfigError::Message(format!(
                "markdown.bullet_marker must be one of '-', '*' or '+', got '{}'",
                config.markdown.bullet_marker
            )));
        }
        Ok(config)
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for callers that only need the defaults.
pub fn load_defaults() -> Result<DuomarkConfig, ConfigError> {
    Loader::new().build()
}
