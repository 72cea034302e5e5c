//! Known environment variables.

// Slurm
pub const SLURM_JOB_NODELIST: &str = "SLURM_JOB_NODELIST";
pub const SLURM_NODELIST: &str = "SLURM_NODELIST";
pub const SLURM_NTASKS_PER_NODE: &str = "SLURM_NTASKS_PER_NODE";
pub const SLURM_JOB_ID: &str = "SLURM_JOB_ID";
pub const SLURM_JOBID: &str = "SLURM_JOBID";

// LSF
pub const LSB_HOSTS: &str = "LSB_HOSTS";
pub const LSB_JOBID: &str = "LSB_JOBID";

// Install roots of the provisioned runtimes
pub const HADOOP_HOME: &str = "HADOOP_HOME";
pub const JAVA_HOME: &str = "JAVA_HOME";
pub const HADOOP_CONF_DIR: &str = "HADOOP_CONF_DIR";

/// Read-only view of the process environment.
///
/// Only topology resolution and job identity computation consult the environment;
/// both go through this trait so that tests can provide a fixed set of variables.
pub trait EnvSource {
    fn var(&self, name: &str) -> Option<String>;

    /// Returns the first of `names` that is set.
    fn first_of(&self, names: &[&str]) -> Option<String> {
        names.iter().find_map(|name| self.var(name))
    }
}

/// The environment of the current process.
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl EnvSource for crate::common::Map<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}
