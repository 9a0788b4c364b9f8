//! Preprocessor configuration, loadable from JSON or YAML.

use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::PreprocessError;

/// Name of the optional configuration file looked up in the site root.
pub const CONFIG_FILE_NAME: &str = ".weft.json";

/// Default recursion ceiling for includes and macro expansion.
pub const MAX_RECURSIONS: usize = 100;

/// An in-memory file served instead of the filesystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualFile {
    /// Path relative to the root (a leading `/` is allowed).
    pub fname: String,
    /// File contents.
    pub content: String,
}

impl VirtualFile {
    /// Creates a virtual file entry.
    pub fn new(fname: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            fname: fname.into(),
            content: content.into(),
        }
    }
}

/// Options for `:MARKDOWN` lowering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkdownConfig {
    /// Class set on a markdown directive that has none.
    #[serde(default = "default_markdown_class")]
    pub default_class: String,
    /// Apply trailing `{.class #id key=value}` lists to headings and paragraphs.
    #[serde(default = "default_true")]
    pub attribute_lists: bool,
    /// Give headings ids and wrap their content in a self link.
    #[serde(default = "default_true")]
    pub heading_anchors: bool,
    /// Highlight fenced code blocks with a known language.
    #[serde(default = "default_true")]
    pub highlight_code: bool,
}

fn default_markdown_class() -> String {
    "weft-markdown".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            default_class: default_markdown_class(),
            attribute_lists: true,
            heading_anchors: true,
            highlight_code: true,
        }
    }
}

/// Settings for one [`Preprocessor`](crate::Preprocessor).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreprocessorConfig {
    /// Sandbox root; every loaded file must live under it.
    #[serde(default)]
    pub root_path: PathBuf,
    /// Files served from memory before the filesystem is consulted.
    #[serde(default)]
    pub virtual_files: Vec<VirtualFile>,
    /// Fragment include-spliced into every page's `<head>`.
    #[serde(default)]
    pub bootstrap: Option<String>,
    /// Ceiling for include and macro nesting.
    #[serde(default = "default_max_recursions")]
    pub max_recursions: usize,
    /// Markdown lowering options.
    #[serde(default)]
    pub markdown: MarkdownConfig,
}

fn default_max_recursions() -> usize {
    MAX_RECURSIONS
}

impl Default for PreprocessorConfig {
    fn default() -> Self {
        Self {
            root_path: PathBuf::new(),
            virtual_files: Vec::new(),
            bootstrap: None,
            max_recursions: default_max_recursions(),
            markdown: MarkdownConfig::default(),
        }
    }
}

impl PreprocessorConfig {
    /// Default configuration rooted at `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root_path: root.into(),
            ..Self::default()
        }
    }

    /// Decodes a JSON configuration.
    pub fn from_json_str(text: &str) -> Result<Self, PreprocessError> {
        serde_json::from_str(text).map_err(|e| PreprocessError::config(e.to_string()))
    }

    /// Decodes a YAML configuration.
    pub fn from_yaml_str(text: &str) -> Result<Self, PreprocessError> {
        serde_yaml::from_str(text).map_err(|e| PreprocessError::config(e.to_string()))
    }

    /// Reads a configuration file; `.yaml`/`.yml` are YAML, anything else JSON.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PreprocessError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            PreprocessError::config(format!("could not read {}: {e}", path.display()))
        })?;
        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));
        if is_yaml {
            Self::from_yaml_str(&text)
        } else {
            Self::from_json_str(&text)
        }
    }

    /// Loads `<root>/.weft.json`, falling back to defaults when it does not exist.
    ///
    /// The returned root is `root` unless the file names one; a relative root in the
    /// file is taken relative to `root`.
    pub fn discover(root: impl AsRef<Path>) -> Result<Self, PreprocessError> {
        let root = root.as_ref();
        let path = root.join(CONFIG_FILE_NAME);
        if !path.is_file() {
            warn!("No {} found in {}, using defaults", CONFIG_FILE_NAME, root.display());
            return Ok(Self::with_root(root));
        }
        debug!("Loading configuration from {}", path.display());
        let mut config = Self::load(&path)?;
        config.root_path = root.join(&config.root_path);
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_uses_defaults() {
        let config = PreprocessorConfig::from_json_str("{}").unwrap();
        assert_eq!(config, PreprocessorConfig::default());
        assert_eq!(config.max_recursions, 100);
        assert_eq!(config.markdown.default_class, "weft-markdown");
    }

    #[test]
    fn camel_case_fields() {
        let config = PreprocessorConfig::from_json_str(
            r#"{
                "rootPath": "/site",
                "virtualFiles": [{ "fname": "lib.html", "content": "<lib></lib>" }],
                "maxRecursions": 8,
                "markdown": { "defaultClass": "md", "highlightCode": false }
            }"#,
        )
        .unwrap();
        assert_eq!(config.root_path, PathBuf::from("/site"));
        assert_eq!(config.virtual_files, vec![VirtualFile::new("lib.html", "<lib></lib>")]);
        assert_eq!(config.max_recursions, 8);
        assert_eq!(config.markdown.default_class, "md");
        assert!(!config.markdown.highlight_code);
        assert!(config.markdown.heading_anchors);
    }

    #[test]
    fn yaml_configuration() {
        let config = PreprocessorConfig::from_yaml_str("bootstrap: \"<lib></lib>\"\n").unwrap();
        assert_eq!(config.bootstrap.as_deref(), Some("<lib></lib>"));
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = PreprocessorConfig::from_json_str("{").unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Config);
    }

    #[test]
    fn discover_without_file_keeps_root() {
        let dir = tempfile::tempdir().unwrap();
        let config = PreprocessorConfig::discover(dir.path()).unwrap();
        assert_eq!(config.root_path, dir.path());
        assert!(config.bootstrap.is_none());
    }

    #[test]
    fn discover_reads_root_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"{ "rootPath": "pages", "maxRecursions": 5 }"#,
        )
        .unwrap();
        let config = PreprocessorConfig::discover(dir.path()).unwrap();
        assert_eq!(config.root_path, dir.path().join("pages"));
        assert_eq!(config.max_recursions, 5);
    }
}
