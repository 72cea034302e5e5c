use serde::{Deserialize, Serialize};

use crate::common::env::{
    EnvSource, LSB_HOSTS, SLURM_JOB_NODELIST, SLURM_NODELIST, SLURM_NTASKS_PER_NODE,
};
use crate::common::error::configuration_error;
use crate::common::manager::info::ManagerType;
use crate::common::manager::{lsf, slurm};

pub const LOCAL_HOST: &str = "localhost";

/// Hosts participating in the cluster and the number of task slots each of them offers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostTopology {
    manager: ManagerType,
    hosts: Vec<String>,
    max_tasks_per_host: u32,
}

impl HostTopology {
    pub fn new(
        manager: ManagerType,
        mut hosts: Vec<String>,
        max_tasks_per_host: u32,
    ) -> crate::Result<Self> {
        hosts.sort_unstable();
        hosts.dedup();
        if hosts.is_empty() {
            return configuration_error(format!("{manager} allocation does not contain any host"));
        }
        Ok(Self {
            manager,
            hosts,
            max_tasks_per_host: max_tasks_per_host.max(1),
        })
    }

    pub fn local() -> Self {
        Self {
            manager: ManagerType::Local,
            hosts: vec![LOCAL_HOST.to_string()],
            max_tasks_per_host: 1,
        }
    }

    pub fn manager(&self) -> ManagerType {
        self.manager
    }

    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    /// Host running the coordinator daemon.
    pub fn master(&self) -> &str {
        &self.hosts[0]
    }

    pub fn max_tasks_per_host(&self) -> u32 {
        self.max_tasks_per_host
    }
}

/// Derives the cluster topology from the batch system variables found in `env`.
///
/// Slurm is checked first, then LSF. Without either, the cluster runs on the local host only.
pub fn resolve_topology(env: &impl EnvSource) -> crate::Result<HostTopology> {
    if let Some(nodelist) = env.first_of(&[SLURM_JOB_NODELIST, SLURM_NODELIST]) {
        log::debug!("Detected SLURM nodelist `{nodelist}`");
        let hosts = slurm::expand_hostlist(&nodelist).map_err(|error| {
            crate::Error::ConfigurationError(format!(
                "Cannot parse SLURM nodelist `{nodelist}`: {error}"
            ))
        })?;
        let tasks = match env.var(SLURM_NTASKS_PER_NODE) {
            Some(value) => slurm::parse_tasks_per_node(&value).unwrap_or_else(|| {
                log::warn!("Ignoring invalid {SLURM_NTASKS_PER_NODE} value `{value}`, using 1");
                1
            }),
            None => 1,
        };
        return HostTopology::new(ManagerType::Slurm, hosts, tasks);
    }

    if let Some(lsb_hosts) = env.var(LSB_HOSTS) {
        log::debug!("Detected LSF host list `{lsb_hosts}`");
        return match lsf::parse_lsb_hosts(&lsb_hosts) {
            Some(parsed) => HostTopology::new(ManagerType::Lsf, parsed.hosts, parsed.min_slots),
            None => configuration_error(format!("{LSB_HOSTS} is set, but it is empty")),
        };
    }

    log::info!("No batch system detected, running on the local host only");
    Ok(HostTopology::local())
}
