use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;
use std::time::Duration;

use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use tokio::process::Child;
use tokio::signal::unix::{SignalKind, signal};

use crate::cluster::cleanup::{CleanupReport, cleanup_private_dirs};
use crate::cluster::daemons::DaemonControl;
use crate::cluster::materialize::{RuntimeConfig, materialize};
use crate::cluster::remote::{RemoteShell, check_connectivity};
use crate::common::env::{HADOOP_CONF_DIR, HADOOP_HOME, JAVA_HOME};
use crate::common::error::error;

/// How long the job gets to exit after it was sent SIGTERM.
const JOB_TERMINATION_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterState {
    Unconfigured,
    Configured,
    Running,
    Stopping,
    TornDown,
}

/// How the user command ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Finished(ExitStatus),
    /// This process received a termination signal while the command was running
    Interrupted(Signal),
}

impl RunOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Finished(status) => status
                .code()
                .unwrap_or_else(|| 128 + status.signal().unwrap_or(0)),
            RunOutcome::Interrupted(signal) => 128 + *signal as i32,
        }
    }
}

/// SIGTERM/SIGINT listeners.
///
/// Once created, the signals no longer terminate the process, so the cluster can be
/// torn down before exiting.
struct TerminationSignals {
    terminate: tokio::signal::unix::Signal,
    interrupt: tokio::signal::unix::Signal,
}

impl TerminationSignals {
    fn new() -> crate::Result<Self> {
        Ok(Self {
            terminate: signal(SignalKind::terminate())?,
            interrupt: signal(SignalKind::interrupt())?,
        })
    }

    async fn recv(&mut self) -> Signal {
        tokio::select! {
            _ = self.terminate.recv() => Signal::SIGTERM,
            _ = self.interrupt.recv() => Signal::SIGINT,
        }
    }
}

/// Drives a cluster through configuration, daemon start, job execution and teardown.
///
/// Once the daemons were (possibly partially) started, teardown happens after the job
/// finishes, after an error and after a termination signal. Dropping a running manager
/// (e.g. a cancelled `run` future) tears the cluster down as well.
pub struct ClusterLifecycleManager<'a, D: DaemonControl, S: RemoteShell> {
    daemons: &'a D,
    shell: &'a S,
    state: ClusterState,
    runtime: Option<RuntimeConfig>,
    cleanup_report: Option<CleanupReport>,
}

impl<'a, D: DaemonControl, S: RemoteShell> ClusterLifecycleManager<'a, D, S> {
    pub fn new(daemons: &'a D, shell: &'a S) -> Self {
        Self {
            daemons,
            shell,
            state: ClusterState::Unconfigured,
            runtime: None,
            cleanup_report: None,
        }
    }

    pub fn state(&self) -> ClusterState {
        self.state
    }

    pub fn cleanup_report(&self) -> Option<&CleanupReport> {
        self.cleanup_report.as_ref()
    }

    /// Writes the configuration directory of the cluster.
    pub fn configure(&mut self, runtime: RuntimeConfig, force: bool) -> crate::Result<()> {
        if self.state != ClusterState::Unconfigured {
            return error(format!("Cannot configure a cluster in state {:?}", self.state));
        }
        materialize(&runtime, force)?;
        self.runtime = Some(runtime);
        self.state = ClusterState::Configured;
        Ok(())
    }

    /// Checks connectivity, starts the daemons, runs `command` and tears the cluster down.
    pub async fn run(&mut self, command: &[String]) -> crate::Result<RunOutcome> {
        let runtime = match (&self.state, &self.runtime) {
            (ClusterState::Configured, Some(runtime)) => runtime.clone(),
            _ => return error(format!("Cannot run a cluster in state {:?}", self.state)),
        };

        if let Err(error) = check_connectivity(self.shell, &runtime.topology) {
            self.state = ClusterState::TornDown;
            return Err(error);
        }

        let mut signals = match TerminationSignals::new() {
            Ok(signals) => signals,
            Err(error) => {
                self.state = ClusterState::TornDown;
                return Err(error);
            }
        };
        self.state = ClusterState::Running;

        let result = match self.daemons.start(&runtime) {
            Ok(()) => {
                log::info!(
                    "Cluster is running, JobTracker listens on {}:{}",
                    runtime.topology.master(),
                    runtime.ports.coordinator
                );
                execute_job(&runtime, command, &mut signals).await
            }
            Err(error) => Err(error),
        };
        self.teardown();
        result
    }

    /// Stops the daemons and removes private state. Does nothing unless the cluster runs.
    fn teardown(&mut self) {
        if self.state != ClusterState::Running {
            return;
        }
        let Some(runtime) = self.runtime.as_ref() else {
            return;
        };
        self.state = ClusterState::Stopping;
        if let Err(error) = self.daemons.stop(runtime) {
            log::error!("Stopping the daemons failed: {error}");
        }
        self.cleanup_report = Some(cleanup_private_dirs(self.shell, runtime));
        self.state = ClusterState::TornDown;
    }
}

impl<D: DaemonControl, S: RemoteShell> Drop for ClusterLifecycleManager<'_, D, S> {
    fn drop(&mut self) {
        self.teardown();
    }
}

async fn execute_job(
    runtime: &RuntimeConfig,
    command: &[String],
    signals: &mut TerminationSignals,
) -> crate::Result<RunOutcome> {
    let Some((program, args)) = command.split_first() else {
        return error("No command to execute".to_string());
    };
    log::info!("Executing `{}`", command.join(" "));
    let mut child = tokio::process::Command::new(program)
        .args(args)
        .env(HADOOP_CONF_DIR, &runtime.conf_dir)
        .env(HADOOP_HOME, &runtime.hadoop_home)
        .env(JAVA_HOME, &runtime.java_home)
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| crate::Error::GenericError(format!("Cannot execute `{program}`: {e}")))?;

    tokio::select! {
        status = child.wait() => {
            let status = status?;
            log::info!("Command finished with {status}");
            Ok(RunOutcome::Finished(status))
        }
        received = signals.recv() => {
            log::warn!("Received {received}, terminating the command");
            terminate_child(&mut child).await;
            Ok(RunOutcome::Interrupted(received))
        }
    }
}

async fn terminate_child(child: &mut Child) {
    if let Some(pid) = child.id() {
        if let Err(error) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
            log::debug!("Cannot send SIGTERM to {pid}: {error}");
        }
        if tokio::time::timeout(JOB_TERMINATION_TIMEOUT, child.wait())
            .await
            .is_ok()
        {
            return;
        }
        log::warn!("Command did not stop in {JOB_TERMINATION_TIMEOUT:?}, killing it");
    }
    if let Err(error) = child.kill().await {
        log::debug!("Cannot kill command: {error}");
    }
}
