//! Pulls the images for every enabled engine.
//!
//! Installation walks the configured engines in order. Engines the registry
//! cannot resolve are reported as warnings and skipped; the first failed pull
//! stops the batch. Images already pulled stay pulled.

use std::io::Write;

use gauntlet_config::{DEFAULT_CHANNEL, EngineConfigEntry};
use gauntlet_container::ContainerRuntime;
use tracing::{debug, info, warn};

use crate::error::EngineError;
use crate::registry::{EngineRegistry, ResolvedEngine};

const INSTALLER_TARGET: &str = "gauntlet_engines::installer";

/// What an installation did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    pulled: Vec<ResolvedEngine>,
    unknown: Vec<String>,
}

impl InstallReport {
    /// Engines whose images were pulled, in pull order.
    #[must_use]
    pub fn pulled(&self) -> &[ResolvedEngine] {
        &self.pulled
    }

    /// `name:channel` pairs that the registry could not resolve.
    #[must_use]
    pub fn unknown(&self) -> &[String] {
        &self.unknown
    }
}

/// Resolves configured engines and pulls their images.
///
/// # Example
///
/// ```rust,no_run
/// use gauntlet_config::ProjectConfig;
/// use gauntlet_container::DockerRuntime;
/// use gauntlet_engines::{EngineRegistry, Installer};
///
/// let registry = EngineRegistry::load("engines.yml".as_ref()).expect("manifest");
/// let runtime = DockerRuntime::new();
/// let entries = ProjectConfig::default().engine_entries();
/// let report = Installer::new(&registry, &runtime)
///     .install(&entries, &mut std::io::stderr())
///     .expect("install");
/// assert!(report.unknown().is_empty());
/// ```
#[derive(Debug)]
pub struct Installer<'a, R: ?Sized> {
    registry: &'a EngineRegistry,
    runtime: &'a R,
    default_channel: String,
}

impl<'a, R: ContainerRuntime + ?Sized> Installer<'a, R> {
    /// Creates an installer using [`DEFAULT_CHANNEL`] for entries without a
    /// channel.
    #[must_use]
    pub fn new(registry: &'a EngineRegistry, runtime: &'a R) -> Self {
        Self {
            registry,
            runtime,
            default_channel: DEFAULT_CHANNEL.to_owned(),
        }
    }

    /// Overrides the channel applied to entries that omit one.
    #[must_use]
    pub fn with_default_channel(mut self, channel: impl Into<String>) -> Self {
        self.default_channel = channel.into();
        self
    }

    /// Installs every enabled entry, writing warnings to `warnings`.
    ///
    /// Pulls run one at a time in `entries` order.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ImagePullFailure`] for the first image the
    /// runtime fails to pull. No further entries are processed.
    pub fn install(
        &self,
        entries: &[EngineConfigEntry],
        warnings: &mut dyn Write,
    ) -> Result<InstallReport, EngineError> {
        let mut report = InstallReport::default();

        for entry in entries.iter().filter(|entry| entry.is_enabled()) {
            let engine = match self.registry.resolve_entry(entry, &self.default_channel) {
                Ok(engine) => engine,
                Err(err) => {
                    warn!(
                        target: INSTALLER_TARGET,
                        engine = entry.name(),
                        channel = entry.channel_or(&self.default_channel),
                        "skipping unknown engine"
                    );
                    if let Err(write_err) = writeln!(warnings, "{err}") {
                        debug!(
                            target: INSTALLER_TARGET,
                            error = %write_err,
                            "failed to write installer warning"
                        );
                    }
                    report.unknown.push(format!(
                        "{}:{}",
                        entry.name(),
                        entry.channel_or(&self.default_channel)
                    ));
                    continue;
                }
            };

            info!(
                target: INSTALLER_TARGET,
                engine = engine.name(),
                image = engine.image(),
                "pulling engine image"
            );
            self.runtime
                .pull(engine.image())
                .map_err(|source| EngineError::ImagePullFailure {
                    image: engine.image().to_owned(),
                    source,
                })?;
            report.pulled.push(engine);
        }

        Ok(report)
    }
}
