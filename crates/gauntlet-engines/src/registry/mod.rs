//! Engine registry for manifest storage and channel lookup.
//!
//! The [`EngineRegistry`] is loaded once per process and is read-only
//! afterwards, so it can be shared freely between concurrent runs.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use gauntlet_config::EngineConfigEntry;

use crate::error::{EngineError, ManifestError};
use crate::manifest::{EngineManifestEntry, parse_manifest};

/// An engine name and channel resolved to a concrete image reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedEngine {
    name: String,
    channel: String,
    image: String,
}

impl ResolvedEngine {
    /// Creates a resolved engine.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        channel: impl Into<String>,
        image: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            channel: channel.into(),
            image: image.into(),
        }
    }

    /// Engine name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Channel the image was resolved from.
    #[must_use]
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Image reference to pull and run.
    #[must_use]
    pub fn image(&self) -> &str {
        &self.image
    }
}

impl fmt::Display for ResolvedEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.channel)
    }
}

/// Registry of engines known to the manifest.
///
/// # Example
///
/// ```
/// use gauntlet_engines::{EngineManifestEntry, EngineRegistry};
///
/// let registry = EngineRegistry::new([
///     EngineManifestEntry::new("structure", "")
///         .with_channel("stable", "gauntlet/structure:stable"),
/// ])
/// .expect("valid manifest");
///
/// let engine = registry.resolve("structure", "stable").expect("known engine");
/// assert_eq!(engine.image(), "gauntlet/structure:stable");
/// assert!(registry.resolve("structure", "beta").is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct EngineRegistry {
    entries: BTreeMap<String, EngineManifestEntry>,
}

impl EngineRegistry {
    /// Builds a registry from validated entries.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Invalid`] when an entry fails validation or
    /// two entries share a name.
    pub fn new(
        entries: impl IntoIterator<Item = EngineManifestEntry>,
    ) -> Result<Self, ManifestError> {
        let mut registry = Self::default();
        for entry in entries {
            entry.validate()?;
            let name = entry.name().to_owned();
            if registry.entries.contains_key(&name) {
                return Err(ManifestError::Invalid {
                    message: format!("engine '{name}' is declared more than once"),
                });
            }
            registry.entries.insert(name, entry);
        }
        Ok(registry)
    }

    /// Parses a registry from manifest YAML.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError`] for malformed or invalid manifests.
    pub fn from_yaml_str(text: &str) -> Result<Self, ManifestError> {
        Self::new(parse_manifest(text)?)
    }

    /// Reads and parses the manifest at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Read`] when the file cannot be read, or the
    /// errors of [`EngineRegistry::from_yaml_str`].
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let text = fs::read_to_string(path).map_err(|err| ManifestError::Read {
            path: path.to_path_buf(),
            source: Arc::new(err),
        })?;
        Self::from_yaml_str(&text)
    }

    /// Entries ordered by engine name.
    pub fn entries(&self) -> impl Iterator<Item = &EngineManifestEntry> {
        self.entries.values()
    }

    /// Looks up an engine by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&EngineManifestEntry> {
        self.entries.get(name)
    }

    /// Resolves `name` on `channel` to an image reference.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownEngine`] when the engine is absent or
    /// does not publish `channel`.
    pub fn resolve(&self, name: &str, channel: &str) -> Result<ResolvedEngine, EngineError> {
        self.entries
            .get(name)
            .and_then(|entry| entry.image(channel))
            .map(|image| ResolvedEngine::new(name, channel, image))
            .ok_or_else(|| EngineError::UnknownEngine {
                name: name.to_owned(),
                channel: channel.to_owned(),
            })
    }

    /// Resolves a configuration entry, applying `default_channel` when the
    /// entry names none.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownEngine`] as for
    /// [`EngineRegistry::resolve`].
    pub fn resolve_entry(
        &self,
        entry: &EngineConfigEntry,
        default_channel: &str,
    ) -> Result<ResolvedEngine, EngineError> {
        self.resolve(entry.name(), entry.channel_or(default_channel))
    }

    /// Number of engines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the manifest lists no engines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
