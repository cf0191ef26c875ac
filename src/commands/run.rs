//! Run command: resolve configuration, provision, then supervise the gateway

use tracing::{debug, info};

use crate::config::{self, Configuration, LogFormat, ProcessEnv};
use crate::error::Result;
use crate::gateway::GatewayLauncher;
use crate::logging;
use crate::orchestrator::Orchestrator;
use crate::step_log::StepLog;

/// Full boot sequence; returns the gateway's exit code
pub fn run(verbose: bool) -> Result<i32> {
    // On failure nothing is provisioned and no step log is touched
    let config = config::resolve(&ProcessEnv)?;

    bootstrap(&config, verbose)
}

fn bootstrap(config: &Configuration, verbose: bool) -> Result<i32> {
    logging::init(config.logging, verbose);
    info!(
        user = %config.credentials.user,
        address = %config.gateway_address(),
        state_dir = %config.state_dir.display(),
        "Bootstrapping MetaTrader 5 container"
    );

    let log = StepLog::open(&config.state_dir)?;
    let mut orchestrator =
        Orchestrator::standard(log).with_progress(config.logging.format == LogFormat::Text);
    let completed = match orchestrator.run(config) {
        Ok(completed) => completed,
        Err(e) => {
            debug!(state = ?orchestrator.state(), "Provisioning halted");
            return Err(e);
        }
    };
    for step in completed.steps() {
        debug!(step = %step.name, executed = step.executed, "{}", step.message);
    }
    info!(
        executed = completed.executed(),
        skipped = completed.steps().len() - completed.executed(),
        step_log = %orchestrator.log().path().display(),
        "All provisioning steps succeeded"
    );

    // Release the step log lock; the gateway may run for the container's lifetime
    drop(orchestrator.into_log());

    GatewayLauncher::new(config).launch(&completed)
}
