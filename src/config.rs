//! Build options and the CLI configuration file.
//!
//! ```toml
//! schema_path = "schema.toml"
//!
//! [build]
//! ignore_null_filter_values = true
//! empty_in_list = "fail"
//! line_ending = "crlf"
//! text_parameter_length = 300
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::QueryResult;

/// What to do with an `IN` / `NOT IN` whose list is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyListPolicy {
    /// Fail the build with a usage error.
    #[default]
    Fail,
    /// Render `col in ()` and let the server reject it.
    Render,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineEnding {
    #[default]
    Lf,
    Crlf,
}

impl LineEnding {
    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::Crlf => "\r\n",
        }
    }
}

/// Options that influence how a single query is compiled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildOptions {
    /// A filter compared against a captured `null` is dropped instead of
    /// rendered as `is null`.
    pub ignore_null_filter_values: bool,

    pub empty_in_list: EmptyListPolicy,

    pub line_ending: LineEnding,

    /// Declared length of `nvarchar` parameters in the runnable script.
    pub text_parameter_length: u32,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            ignore_null_filter_values: true,
            empty_in_list: EmptyListPolicy::Fail,
            line_ending: LineEnding::Lf,
            text_parameter_length: 300,
        }
    }
}

impl BuildOptions {
    pub fn with_ignore_null_filter_values(mut self, ignore: bool) -> Self {
        self.ignore_null_filter_values = ignore;
        self
    }

    pub fn with_empty_in_list(mut self, policy: EmptyListPolicy) -> Self {
        self.empty_in_list = policy;
        self
    }

    pub fn with_line_ending(mut self, ending: LineEnding) -> Self {
        self.line_ending = ending;
        self
    }

    pub fn with_text_parameter_length(mut self, length: u32) -> Self {
        self.text_parameter_length = length;
        self
    }
}

/// Contents of `config.toml` as read by the `paramquery` binary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Schema used when `--schema` is not given.
    pub schema_path: Option<PathBuf>,

    pub build: BuildOptions,
}

impl Config {
    /// Default location: `<config dir>/paramquery/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("paramquery").join("config.toml"))
    }

    pub fn from_toml_str(content: &str) -> QueryResult<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> QueryResult<Self> {
        let content = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Load the explicit path, else the default location if it exists,
    /// else defaults.
    pub fn load_or_default(path: Option<&Path>) -> QueryResult<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_keep_null_filters_ignored() {
        let opts = BuildOptions::default();
        assert!(opts.ignore_null_filter_values);
        assert_eq!(opts.empty_in_list, EmptyListPolicy::Fail);
        assert_eq!(opts.line_ending.as_str(), "\n");
        assert_eq!(opts.text_parameter_length, 300);
    }

    #[test]
    fn test_partial_toml() {
        let config = Config::from_toml_str(
            r#"
            schema_path = "demo.toml"

            [build]
            line_ending = "crlf"
            "#,
        )
        .unwrap();
        assert_eq!(config.schema_path, Some(PathBuf::from("demo.toml")));
        assert_eq!(config.build.line_ending, LineEnding::Crlf);
        assert!(config.build.ignore_null_filter_values);
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        let err = Config::from_toml_str("[build]\nempty_in_list = \"maybe\"").unwrap_err();
        assert!(matches!(err, crate::error::QueryError::Config(_)));
    }
}
