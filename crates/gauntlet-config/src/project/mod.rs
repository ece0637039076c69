//! Project file parsing: which engines a repository enables.
//!
//! The project file is a YAML document with a single `plugins` mapping. Each
//! value is either a boolean or a mapping with optional `enabled` and
//! `channel` keys:
//!
//! ```yaml
//! plugins:
//!   rubocop: true
//!   eslint:
//!     channel: eslint-8
//!   duplication: false
//! ```
//!
//! Entries are kept in document order because installation pulls images in
//! configuration order.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::defaults::DEFAULT_ENGINES;

/// Errors raised while reading a project file.
#[derive(Debug, Error)]
pub enum ProjectConfigError {
    /// The project file could not be read.
    #[error("failed to read project file '{path}': {source}")]
    Read {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },
    /// The project file is not valid YAML for the expected shape.
    #[error("failed to parse project file: {message}")]
    Parse {
        /// Parser diagnostic.
        message: String,
    },
}

/// One engine entry as written by the project author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfigEntry {
    name: String,
    channel: Option<String>,
    enabled: bool,
}

impl EngineConfigEntry {
    /// Creates an entry.
    #[must_use]
    pub fn new(name: impl Into<String>, channel: Option<String>, enabled: bool) -> Self {
        Self {
            name: name.into(),
            channel,
            enabled,
        }
    }

    /// Creates an enabled entry without an explicit channel.
    #[must_use]
    pub fn enabled(name: impl Into<String>) -> Self {
        Self::new(name, None, true)
    }

    /// Returns the engine name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the channel named in the project file, if any.
    #[must_use]
    pub fn channel(&self) -> Option<&str> {
        self.channel.as_deref()
    }

    /// Returns the channel, falling back to `default_channel`.
    #[must_use]
    pub fn channel_or<'a>(&'a self, default_channel: &'a str) -> &'a str {
        self.channel.as_deref().unwrap_or(default_channel)
    }

    /// Returns `true` when the engine should be installed and run.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// Parsed project file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    plugins: OrderedPlugins,
}

impl ProjectConfig {
    /// Parses a project file from YAML text.
    ///
    /// An empty document yields an empty configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectConfigError::Parse`] when the text is not a mapping
    /// of the documented shape.
    pub fn from_yaml_str(text: &str) -> Result<Self, ProjectConfigError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_saphyr::from_str(text).map_err(|err| ProjectConfigError::Parse {
            message: err.to_string(),
        })
    }

    /// Reads and parses a project file.
    ///
    /// A missing file is treated as an empty project so the default engines
    /// still apply.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectConfigError::Read`] for I/O failures other than a
    /// missing file, or [`ProjectConfigError::Parse`] for malformed content.
    pub fn load(path: &Path) -> Result<Self, ProjectConfigError> {
        match fs::read_to_string(path) {
            Ok(text) => Self::from_yaml_str(&text),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ProjectConfigError::Read {
                path: path.to_path_buf(),
                source: Arc::new(err),
            }),
        }
    }

    /// Returns the entries written in the project file, in document order.
    #[must_use]
    pub fn declared_entries(&self) -> &[EngineConfigEntry] {
        &self.plugins.0
    }

    /// Returns the effective engine list.
    ///
    /// The default engines come first. A project entry naming a default
    /// engine replaces it in place; other project entries follow in document
    /// order.
    #[must_use]
    pub fn engine_entries(&self) -> Vec<EngineConfigEntry> {
        let mut entries: Vec<EngineConfigEntry> = DEFAULT_ENGINES
            .iter()
            .map(|(name, channel)| EngineConfigEntry::new(*name, Some((*channel).to_owned()), true))
            .collect();

        for declared in &self.plugins.0 {
            let Some(existing) = entries.iter_mut().find(|entry| entry.name == declared.name)
            else {
                entries.push(declared.clone());
                continue;
            };
            existing.enabled = declared.enabled;
            if declared.channel.is_some() {
                existing.channel.clone_from(&declared.channel);
            }
        }
        entries
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct OrderedPlugins(Vec<EngineConfigEntry>);

#[derive(Deserialize)]
#[serde(untagged)]
enum PluginSetting {
    Toggle(bool),
    Detailed {
        #[serde(default = "enabled_by_default")]
        enabled: bool,
        #[serde(default)]
        channel: Option<String>,
    },
}

const fn enabled_by_default() -> bool {
    true
}

impl<'de> Deserialize<'de> for OrderedPlugins {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct PluginsVisitor;

        impl<'de> Visitor<'de> for PluginsVisitor {
            type Value = OrderedPlugins;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("a mapping of engine name to a boolean or settings")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::new();
                while let Some((name, setting)) = access.next_entry::<String, PluginSetting>()? {
                    let entry = match setting {
                        PluginSetting::Toggle(enabled) => EngineConfigEntry::new(name, None, enabled),
                        PluginSetting::Detailed { enabled, channel } => {
                            EngineConfigEntry::new(name, channel, enabled)
                        }
                    };
                    entries.push(entry);
                }
                Ok(OrderedPlugins(entries))
            }

            fn visit_unit<E>(self) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(OrderedPlugins::default())
            }

            fn visit_none<E>(self) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(OrderedPlugins::default())
            }
        }

        deserializer.deserialize_map(PluginsVisitor)
    }
}
