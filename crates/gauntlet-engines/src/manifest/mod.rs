//! Engine manifest entries and their YAML representation.
//!
//! The manifest maps each engine name to a description and a set of release
//! channels, each channel naming one image reference:
//!
//! ```yaml
//! structure:
//!   description: Complexity and structure checks
//!   channels:
//!     stable: gauntlet/structure:stable
//!     beta: gauntlet/structure:beta
//! ```

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::ManifestError;

/// One engine as described by the manifest.
///
/// # Example
///
/// ```
/// use gauntlet_engines::EngineManifestEntry;
///
/// let entry = EngineManifestEntry::new("structure", "Structure checks")
///     .with_channel("stable", "gauntlet/structure:stable");
/// assert_eq!(entry.image("stable"), Some("gauntlet/structure:stable"));
/// assert_eq!(entry.image("beta"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineManifestEntry {
    name: String,
    description: String,
    channels: BTreeMap<String, String>,
}

impl EngineManifestEntry {
    /// Creates an entry with no channels.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            channels: BTreeMap::new(),
        }
    }

    /// Adds or replaces a channel.
    #[must_use]
    pub fn with_channel(mut self, channel: impl Into<String>, image: impl Into<String>) -> Self {
        self.channels.insert(channel.into(), image.into());
        self
    }

    /// Engine name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human-readable description; empty when the manifest omits one.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Channel name to image reference.
    #[must_use]
    pub const fn channels(&self) -> &BTreeMap<String, String> {
        &self.channels
    }

    /// Image reference published on `channel`.
    #[must_use]
    pub fn image(&self, channel: &str) -> Option<&str> {
        self.channels.get(channel).map(String::as_str)
    }

    /// Rejects entries that could never resolve to an image.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Invalid`] when the name is blank, there are
    /// no channels, or a channel has a blank name or image.
    pub fn validate(&self) -> Result<(), ManifestError> {
        if self.name.trim().is_empty() {
            return Err(ManifestError::Invalid {
                message: String::from("engine name must not be empty"),
            });
        }
        if self.channels.is_empty() {
            return Err(ManifestError::Invalid {
                message: format!("engine '{}' declares no channels", self.name),
            });
        }
        for (channel, image) in &self.channels {
            if channel.trim().is_empty() {
                return Err(ManifestError::Invalid {
                    message: format!("engine '{}' has an unnamed channel", self.name),
                });
            }
            if image.trim().is_empty() {
                return Err(ManifestError::Invalid {
                    message: format!(
                        "engine '{}' channel '{channel}' has an empty image reference",
                        self.name
                    ),
                });
            }
        }
        Ok(())
    }
}

#[derive(Deserialize)]
struct RawEntry {
    #[serde(default)]
    description: String,
    #[serde(default)]
    channels: BTreeMap<String, String>,
}

/// Parses manifest YAML into validated entries ordered by name.
///
/// # Errors
///
/// Returns [`ManifestError::Parse`] for malformed YAML and
/// [`ManifestError::Invalid`] for entries that fail
/// [`EngineManifestEntry::validate`].
pub fn parse_manifest(text: &str) -> Result<Vec<EngineManifestEntry>, ManifestError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    let raw: BTreeMap<String, RawEntry> =
        serde_saphyr::from_str(text).map_err(|err| ManifestError::Parse {
            message: err.to_string(),
        })?;

    raw.into_iter()
        .map(|(name, entry)| {
            let manifest_entry = EngineManifestEntry {
                name,
                description: entry.description,
                channels: entry.channels,
            };
            manifest_entry.validate()?;
            Ok(manifest_entry)
        })
        .collect()
}
