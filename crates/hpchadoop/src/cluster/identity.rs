use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::common::env::{EnvSource, LSB_JOBID, SLURM_JOB_ID, SLURM_JOBID};
use crate::common::error::configuration_error;
use crate::common::utils::network::get_short_hostname;

/// Token that namespaces every private resource of one cluster run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobIdentity(String);

impl JobIdentity {
    /// Validates `value` and wraps it.
    ///
    /// The identity becomes part of filesystem paths and single-quoted shell arguments,
    /// so quotes, whitespace and path separators are rejected.
    pub fn new(value: String) -> crate::Result<Self> {
        if value.is_empty() {
            return configuration_error("Job identity is empty".to_string());
        }
        if let Some(c) = value
            .chars()
            .find(|&c| c == '\'' || c == '"' || c == '/' || c.is_whitespace())
        {
            return configuration_error(format!(
                "Job identity `{value}` contains the forbidden character {c:?}"
            ));
        }
        Ok(Self(value))
    }

    /// Uses the batch job id if there is one, otherwise `<timestamp>.<short-hostname>.<pid>`.
    pub fn resolve(env: &impl EnvSource) -> crate::Result<Self> {
        match env.first_of(&[SLURM_JOB_ID, SLURM_JOBID, LSB_JOBID]) {
            Some(job_id) => Self::new(job_id),
            None => {
                let identity = format!(
                    "{}.{}.{}",
                    chrono::Local::now().format("%Y%m%d%H%M%S"),
                    get_short_hostname(),
                    std::process::id()
                );
                log::debug!("No batch job id found, using generated identity {identity}");
                Self::new(identity)
            }
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Directory holding the private state of the daemons of this job.
    pub fn private_dir(&self, tmp_root: &Path) -> PathBuf {
        tmp_root.join(format!("{}-{}", crate::PRODUCT_NAME, self.0))
    }
}

impl Display for JobIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
