use crate::cluster::materialize::RuntimeConfig;
use crate::cluster::remote::{RemoteShell, shell_quote};
use crate::common::utils::fs::is_strictly_under;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCleanup {
    Removed,
    Failed(String),
}

/// Outcome of removing the private directory of a job from all hosts.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    /// The directory did not pass the safety check and nothing was removed
    pub skipped: bool,
    pub hosts: Vec<(String, HostCleanup)>,
}

impl CleanupReport {
    pub fn failed_hosts(&self) -> impl Iterator<Item = &str> {
        self.hosts.iter().filter_map(|(host, result)| match result {
            HostCleanup::Failed(_) => Some(host.as_str()),
            HostCleanup::Removed => None,
        })
    }
}

/// Removes `directory` on a single host.
pub fn cleanup_host(shell: &impl RemoteShell, host: &str, directory: &str) -> HostCleanup {
    match shell.run(host, &format!("rm -rf {}", shell_quote(directory))) {
        Ok(()) => HostCleanup::Removed,
        Err(error) => {
            log::warn!("Cannot remove {directory} on {host}: {error:#}");
            HostCleanup::Failed(format!("{error:#}"))
        }
    }
}

/// Removes the private job directory from every host of the cluster.
///
/// Failures are only logged, the process may be killed by the batch system at any moment,
/// so nothing is retried. A directory that is not located below the temporary storage
/// root is never touched.
pub fn cleanup_private_dirs(shell: &impl RemoteShell, runtime: &RuntimeConfig) -> CleanupReport {
    let directory = &runtime.private_dir;
    if !is_strictly_under(directory, &runtime.tmp_root) {
        log::warn!(
            "Refusing to remove {}, it is not located under {}",
            directory.display(),
            runtime.tmp_root.display()
        );
        return CleanupReport {
            skipped: true,
            hosts: vec![],
        };
    }

    let directory = directory.display().to_string();
    let hosts: Vec<_> = runtime
        .topology
        .hosts()
        .iter()
        .map(|host| (host.clone(), cleanup_host(shell, host, &directory)))
        .collect();
    let report = CleanupReport {
        skipped: false,
        hosts,
    };
    let failed = report.failed_hosts().count();
    if failed == 0 {
        log::info!("Removed {directory} from all hosts");
    } else {
        log::warn!("{directory} could not be removed from {failed} host(s)");
    }
    report
}
