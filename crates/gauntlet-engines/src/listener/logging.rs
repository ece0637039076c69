//! Logging observer.

use gauntlet_container::ExecutionResult;
use tracing::{info, warn};

use super::{ContainerListener, EngineDetails, EngineIdentity, Outcome};

const LISTENER_TARGET: &str = "gauntlet_engines::listener";

/// Logs engine starts at info and finishes with their classification.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingListener;

impl ContainerListener for LoggingListener {
    fn started(&self, engine: &EngineIdentity, details: &EngineDetails) {
        info!(
            target: LISTENER_TARGET,
            engine = engine.name(),
            channel = engine.channel().unwrap_or_default(),
            image = details.get("image").map(String::as_str).unwrap_or_default(),
            "engine started"
        );
    }

    fn finished(&self, engine: &EngineIdentity, _details: &EngineDetails, result: &ExecutionResult) {
        let outcome = Outcome::classify(result);
        let elapsed_ms = u64::try_from(result.duration().as_millis()).unwrap_or(u64::MAX);
        if outcome == Outcome::Succeeded {
            info!(
                target: LISTENER_TARGET,
                engine = engine.name(),
                elapsed_ms,
                exit_status = result.exit_status(),
                %outcome,
                "engine finished"
            );
        } else {
            let stderr = String::from_utf8_lossy(result.stderr());
            warn!(
                target: LISTENER_TARGET,
                engine = engine.name(),
                elapsed_ms,
                exit_status = result.exit_status(),
                %outcome,
                stderr = %stderr.trim(),
                "engine finished"
            );
        }
    }
}
