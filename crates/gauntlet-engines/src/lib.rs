//! Engine orchestration for gauntlet.
//!
//! Engines are static-analysis tools shipped as container images and
//! published on named channels. This crate covers their lifecycle above the
//! container runtime:
//!
//! - [`EngineRegistry`] loads the manifest and resolves `name:channel` pairs
//!   to images.
//! - [`Installer`] pulls the images for the enabled engines, warning about
//!   unknown ones and stopping at the first failed pull.
//! - [`EngineRunner`] runs engines with bounded concurrency and reports
//!   `started`/`finished` to [`ContainerListener`]s such as
//!   [`MetricsListener`] and [`LoggingListener`].
//! - [`LocationDescription`] renders the line or offset ranges engines attach
//!   to issues.
//!
//! # Example
//!
//! ```
//! use gauntlet_engines::EngineRegistry;
//!
//! let registry = EngineRegistry::from_yaml_str(
//!     "structure:\n  description: Structure checks\n  channels:\n    stable: gauntlet/structure\n",
//! )
//! .expect("valid manifest");
//! let engine = registry.resolve("structure", "stable").expect("known engine");
//! assert_eq!(engine.to_string(), "structure:stable");
//! ```

pub mod error;
pub mod installer;
pub mod issue;
pub mod listener;
pub mod location;
pub mod manifest;
pub mod registry;
pub mod runner;

#[cfg(test)]
mod tests;

pub use self::error::{EngineError, ManifestError};
pub use self::installer::{InstallReport, Installer};
pub use self::issue::{EngineIssue, IssueLocation, parse_issues};
pub use self::listener::{
    ContainerListener, EngineDetails, EngineIdentity, ListenerDispatcher, LogMetricsSink,
    LoggingListener, MetricsListener, MetricsSink, Outcome,
};
pub use self::location::{
    LocationDescription, LocationDescriptor, LocationError, Position, SourceBuffer, SourceText,
};
pub use self::manifest::{EngineManifestEntry, parse_manifest};
pub use self::registry::{EngineRegistry, ResolvedEngine};
pub use self::runner::{ContainerEngineExecutor, EngineExecutor, EngineRun, EngineRunner, SOURCE_MOUNT};
