use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Batch system that provided the allocation the cluster runs in.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum ManagerType {
    Slurm,
    Lsf,
    /// No batch system was detected, the cluster consists of the local host only.
    Local,
}

impl Display for ManagerType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ManagerType::Slurm => f.write_str("SLURM"),
            ManagerType::Lsf => f.write_str("LSF"),
            ManagerType::Local => f.write_str("local"),
        }
    }
}
