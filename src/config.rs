//! Persisted search options.
//!
//! The record is a flat JSON object loaded once per session start. Unknown
//! fields are ignored and absent fields fall back to defaults, so an options
//! file written by an older build keeps working.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A highlight colour in HSV with its rendered hex form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HsvColor {
    pub hue: f32,
    pub saturation: f32,
    pub value: f32,
    pub hex_color: String,
}

impl HsvColor {
    pub fn new(hue: f32, saturation: f32, value: f32, hex_color: &str) -> Self {
        Self {
            hue,
            saturation,
            value,
            hex_color: hex_color.to_string(),
        }
    }
}

/// Display colours for rendered highlights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ColorConfig {
    /// Colour of the focused occurrence
    pub index_highlight_color: HsvColor,
    /// Colour of every other occurrence
    pub all_highlight_color: HsvColor,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            index_highlight_color: HsvColor::new(34.0, 0.925, 1.0, "#ff9813"),
            all_highlight_color: HsvColor::new(56.0, 1.0, 1.0, "#fff000"),
        }
    }
}

/// Options for one search operation.
///
/// Handed to the builder and navigator by value; a session never mutates the
/// options it was given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchOptions {
    pub use_regex_syntax: bool,
    pub case_sensitive: bool,
    pub persist_highlights: bool,
    /// Cap on reported occurrences, 0 = unbounded
    pub max_results: usize,
    #[serde(flatten)]
    pub colors: ColorConfig,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            use_regex_syntax: true,
            case_sensitive: true,
            persist_highlights: false,
            max_results: 0,
            colors: ColorConfig::default(),
        }
    }
}

impl SearchOptions {
    pub fn literal(mut self) -> Self {
        self.use_regex_syntax = false;
        self
    }

    pub fn case_insensitive(mut self) -> Self {
        self.case_sensitive = false;
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn persistent(mut self, persist: bool) -> Self {
        self.persist_highlights = persist;
        self
    }
}

/// JSON-file backed options record.
pub struct OptionsStore {
    path: PathBuf,
}

impl OptionsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default location: `$HOME/.regex-page-search.json`, or the working
    /// directory when `HOME` is unset.
    pub fn default_path() -> PathBuf {
        match std::env::var_os("HOME") {
            Some(home) => Path::new(&home).join(".regex-page-search.json"),
            None => PathBuf::from(".regex-page-search.json"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored options, applying defaults when the file is absent or
    /// unreadable.
    pub fn load(&self) -> SearchOptions {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(_) => {
                log::debug!("No options file at {}, using defaults", self.path.display());
                return SearchOptions::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(options) => options,
            Err(e) => {
                log::warn!("Ignoring malformed options file {}: {}", self.path.display(), e);
                SearchOptions::default()
            }
        }
    }

    pub fn save(&self, options: &SearchOptions) -> Result<(), String> {
        let json = serde_json::to_string_pretty(options)
            .map_err(|e| format!("Failed to encode options: {}", e))?;
        fs::write(&self.path, json)
            .map_err(|e| format!("Failed to save options file: {}", e))?;
        Ok(())
    }
}
