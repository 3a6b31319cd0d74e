//! Wizard settings
//!
//! Loaded from a TOML file named on the command line, else from the file
//! named by `CONFWIZ_CONFIG`, else built-in defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;

/// Environment variable naming a settings file
pub const CONFIG_ENV: &str = "CONFWIZ_CONFIG";

/// Wizard settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WizardConfig {
    /// Fix rounds before giving up on an invalid configuration
    pub max_fix_attempts: u32,
    /// Maximum nesting of schemas while prompting
    pub max_depth: usize,
    /// Ask before re-prompting for violations
    pub confirm_fixes: bool,
    /// Ask before writing a document
    pub confirm_save: bool,
    /// Output path when none is given for `new`
    pub default_output: PathBuf,
    /// Version string written to document headers
    pub format_version: String,
    /// Catalog files always loaded before command-line ones
    pub schema_files: Vec<PathBuf>,
}

impl WizardConfig {
    /// Create default settings
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With fix attempt budget
    #[inline]
    #[must_use]
    pub fn with_max_fix_attempts(mut self, attempts: u32) -> Self {
        self.max_fix_attempts = attempts;
        self
    }

    /// With nesting limit
    #[inline]
    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// With fix confirmation
    #[inline]
    #[must_use]
    pub fn with_confirm_fixes(mut self, confirm: bool) -> Self {
        self.confirm_fixes = confirm;
        self
    }

    /// With save confirmation
    #[inline]
    #[must_use]
    pub fn with_confirm_save(mut self, confirm: bool) -> Self {
        self.confirm_save = confirm;
        self
    }

    /// With default output path
    #[inline]
    #[must_use]
    pub fn with_default_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.default_output = path.into();
        self
    }

    /// With document format version
    #[inline]
    #[must_use]
    pub fn with_format_version(mut self, version: impl Into<String>) -> Self {
        self.format_version = version.into();
        self
    }

    /// Parse settings from TOML text
    ///
    /// # Errors
    /// Returns error if the text is invalid or a value is unusable.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load settings from a TOML file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or is invalid.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        debug!(path = %path.display(), "loading wizard settings");
        Self::from_toml_str(&text)
    }

    /// Load from `explicit`, else from `CONFWIZ_CONFIG`, else defaults
    ///
    /// # Errors
    /// Returns error if a named file cannot be loaded.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match std::env::var_os(CONFIG_ENV) {
            Some(path) if !path.is_empty() => Self::load(PathBuf::from(path)),
            _ => Ok(Self::default()),
        }
    }

    /// Check settings are usable
    ///
    /// # Errors
    /// Returns error naming the first unusable setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 {
            return Err(ConfigError::Invalid {
                key: "max_depth".into(),
                message: "must be at least 1".into(),
            });
        }
        if self.default_output.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                key: "default_output".into(),
                message: "must not be empty".into(),
            });
        }
        if self.format_version.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "format_version".into(),
                message: "must not be empty".into(),
            });
        }
        Ok(())
    }
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            max_fix_attempts: 3,
            max_depth: 16,
            confirm_fixes: true,
            confirm_save: true,
            default_output: PathBuf::from("config.yaml"),
            format_version: crate::VERSION.to_string(),
            schema_files: Vec::new(),
        }
    }
}
