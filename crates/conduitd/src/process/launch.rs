//! Sequences server start-up, steady state and shutdown.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use tracing::info;

use conduit_config::Config;
use conduit_protocol::RequestChannel;

use crate::StructuredHealthReporter;
use crate::bootstrap::{ConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::dispatch::{
    BuiltinExecutor, CommandExecutor, DispatchHandle, ProgramExecutor, RequestHandler, RequestLoop,
};
use crate::health::HealthReporter;

use super::PROCESS_TARGET;
use super::errors::LaunchError;
use super::guard::{HealthState, ProcessGuard};
use super::shutdown::{ShutdownSignal, SystemShutdownSignal};

/// Service dependencies required to construct the server runtime.
pub(crate) struct ServiceDeps<L> {
    pub(crate) loader: L,
    pub(crate) reporter: Arc<dyn HealthReporter>,
}

/// Collaborators required to launch the server.
pub(crate) struct LaunchPlan<L, S> {
    pub(crate) shutdown: S,
    pub(crate) services: ServiceDeps<L>,
}

/// Runs the server using the production collaborators.
///
/// Returns once a termination signal or a `shutdown` request has been
/// handled and every in-flight request has finished.
pub fn run_server() -> Result<(), LaunchError> {
    let plan = LaunchPlan {
        shutdown: SystemShutdownSignal,
        services: ServiceDeps {
            loader: SystemConfigLoader,
            reporter: Arc::new(StructuredHealthReporter::new()),
        },
    };
    run_server_with(plan)
}

/// Runs the server with injected collaborators.
pub(crate) fn run_server_with<L, S>(plan: LaunchPlan<L, S>) -> Result<(), LaunchError>
where
    L: ConfigLoader,
    S: ShutdownSignal,
{
    let LaunchPlan { shutdown, services } = plan;
    let ServiceDeps { loader, reporter } = services;

    let server = bootstrap_with(&loader, reporter)?;
    let config = server.config();
    let paths = server.paths();
    info!(
        target: PROCESS_TARGET,
        channel_dir = %paths.channel_dir().display(),
        mode = %config.dispatch_mode(),
        "starting server runtime"
    );

    let mut guard = ProcessGuard::acquire(paths.clone())?;
    let pid = std::process::id();
    guard.write_pid(pid)?;
    guard.write_health(HealthState::Starting)?;

    let stop = Arc::new(AtomicBool::new(false));
    shutdown.install(&stop)?;

    let handler = RequestHandler::new(
        build_executor(config, &stop),
        paths.clone(),
        config.response_write_timeout(),
        server.reporter(),
    );
    let channel = RequestChannel::create(&paths.instance_channel(pid), paths.request_alias())?;
    let handle = RequestLoop::new(channel, Arc::new(handler), config.dispatch_mode())
        .start(Arc::clone(&stop))?;

    if let Err(error) = guard.write_health(HealthState::Ready) {
        stop_loop(handle)?;
        return Err(error);
    }
    handle.join()?;
    guard.write_health(HealthState::Stopping)?;
    info!(
        target: PROCESS_TARGET,
        "shutdown sequence completed"
    );
    Ok(())
}

fn build_executor(config: &Config, stop: &Arc<AtomicBool>) -> Arc<dyn CommandExecutor> {
    let builtin = BuiltinExecutor::new(Arc::clone(stop));
    let executor = match config.executor() {
        Some(program) => {
            info!(
                target: PROCESS_TARGET,
                program = %program,
                "delegating unknown commands to executor program"
            );
            builtin.with_fallback(Arc::new(ProgramExecutor::new(
                program.as_std_path(),
                config.execution_timeout(),
            )))
        }
        None => builtin,
    };
    Arc::new(executor)
}

fn stop_loop(handle: DispatchHandle) -> Result<(), LaunchError> {
    handle.shutdown();
    handle.join()?;
    Ok(())
}
