use std::path::{Path, PathBuf};

use crate::cluster::JobIdentity;
use crate::common::cli::ClusterOpts;
use crate::common::env::{HADOOP_HOME, JAVA_HOME};
use crate::common::error::configuration_error;
use crate::common::utils::fs::absolute_path;

/// Settings of one cluster run, assembled once at startup.
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    pub identity: JobIdentity,
    pub hadoop_home: PathBuf,
    pub java_home: PathBuf,
    pub shared_root: PathBuf,
    pub tmp_root: PathBuf,
    pub conf_dir: PathBuf,
    pub force: bool,
}

impl ClusterConfig {
    pub fn from_opts(opts: &ClusterOpts, identity: JobIdentity) -> crate::Result<Self> {
        let hadoop_home = require_install_dir(opts.hadoop_home.as_deref(), "Hadoop", HADOOP_HOME)?;
        let java_home = require_install_dir(opts.java_home.as_deref(), "Java", JAVA_HOME)?;

        let tmp_root = absolute_path(opts.tmp_root.clone())?;
        if !tmp_root.is_dir() {
            return configuration_error(format!(
                "Temporary storage root {} is not a directory",
                tmp_root.display()
            ));
        }

        Ok(Self {
            identity,
            hadoop_home,
            java_home,
            shared_root: absolute_path(opts.shared_root.clone())?,
            tmp_root,
            conf_dir: absolute_path(opts.conf_dir.clone())?,
            force: opts.force,
        })
    }
}

fn require_install_dir(path: Option<&Path>, name: &str, env_var: &str) -> crate::Result<PathBuf> {
    let Some(path) = path else {
        return configuration_error(format!(
            "{name} installation was not specified, use --{}-home or set {env_var}",
            name.to_lowercase()
        ));
    };
    let path = absolute_path(path.to_path_buf())?;
    if !path.is_dir() {
        return configuration_error(format!(
            "{name} installation directory {} does not exist",
            path.display()
        ));
    }
    Ok(path)
}
