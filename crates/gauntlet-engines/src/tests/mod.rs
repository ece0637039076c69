//! Shared test doubles and crate-level BDD tests.

use gauntlet_container::{ContainerError, ContainerRuntime, ExecutionResult, InvocationSpec};
use mockall::mock;
use tokio::process::Command;

use crate::listener::{ContainerListener, EngineDetails, EngineIdentity, MetricsSink};


mock! {
    pub Runtime {}
    impl ContainerRuntime for Runtime {
        fn pull(&self, image: &str) -> Result<(), ContainerError>;
        fn command(&self, image: &str, spec: &InvocationSpec) -> Command;
        fn kill_command(&self, name: &str) -> Command;
    }
}

mock! {
    pub Sink {}
    impl MetricsSink for Sink {
        fn increment(&self, name: &str, tags: &[String]);
        fn timing(&self, name: &str, millis: u64, tags: &[String]);
    }
}

mock! {
    pub Listener {}
    impl ContainerListener for Listener {
        fn started(&self, engine: &EngineIdentity, details: &EngineDetails);
        fn finished(
            &self,
            engine: &EngineIdentity,
            details: &EngineDetails,
            result: &ExecutionResult,
        );
    }
}

/// Runs the image reference as an `sh -c` script.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct ShellRuntime;

impl ContainerRuntime for ShellRuntime {
    fn pull(&self, _image: &str) -> Result<(), ContainerError> {
        Ok(())
    }

    fn command(&self, image: &str, _spec: &InvocationSpec) -> Command {
        let mut command = Command::new("sh");
        command.arg("-c").arg(image);
        command
    }

    fn kill_command(&self, _name: &str) -> Command {
        Command::new("true")
    }
}
