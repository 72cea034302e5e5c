use std::path::PathBuf;
use std::process::Command;

use crate::cluster::materialize::RuntimeConfig;
use crate::common::env::{HADOOP_CONF_DIR, HADOOP_HOME, JAVA_HOME};

const START_SCRIPT: &str = "start-mapred.sh";
const STOP_SCRIPT: &str = "stop-mapred.sh";

/// Starts and stops the coordinator and worker daemons of a cluster.
pub trait DaemonControl {
    fn start(&self, runtime: &RuntimeConfig) -> crate::Result<()>;
    fn stop(&self, runtime: &RuntimeConfig) -> crate::Result<()>;
}

/// Controls the JobTracker/TaskTrackers through the scripts shipped with Hadoop.
///
/// The scripts start the TaskTrackers on the hosts listed in the `slaves` file over ssh.
/// Success is whatever the scripts report, the daemons are not verified afterwards.
#[derive(Default)]
pub struct HadoopDaemons;

impl HadoopDaemons {
    fn script_path(runtime: &RuntimeConfig, script: &str) -> PathBuf {
        runtime.hadoop_home.join("bin").join(script)
    }

    fn run_script(runtime: &RuntimeConfig, script: &str) -> crate::Result<()> {
        let path = Self::script_path(runtime, script);
        log::debug!("Running {}", path.display());
        let status = Command::new(&path)
            .env(HADOOP_CONF_DIR, &runtime.conf_dir)
            .env(HADOOP_HOME, &runtime.hadoop_home)
            .env(JAVA_HOME, &runtime.java_home)
            .status()
            .map_err(|error| {
                crate::Error::DaemonControlError(format!(
                    "Cannot execute {}: {error}",
                    path.display()
                ))
            })?;
        if !status.success() {
            return Err(crate::Error::DaemonControlError(format!(
                "{script} exited with {status}"
            )));
        }
        Ok(())
    }
}

impl DaemonControl for HadoopDaemons {
    fn start(&self, runtime: &RuntimeConfig) -> crate::Result<()> {
        std::fs::create_dir_all(&runtime.pid_dir)?;
        log::info!(
            "Starting JobTracker on {} and TaskTrackers on {} host(s)",
            runtime.topology.master(),
            runtime.topology.hosts().len()
        );
        Self::run_script(runtime, START_SCRIPT)
    }

    fn stop(&self, runtime: &RuntimeConfig) -> crate::Result<()> {
        log::info!("Stopping Hadoop daemons");
        Self::run_script(runtime, STOP_SCRIPT)
    }
}

#[cfg(test)]
mod tests {
    use super::{DaemonControl, HadoopDaemons};
    use crate::tests::utils::TestInstall;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    fn write_script(path: &Path, content: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    fn test_start_passes_conf_dir() {
        let install = TestInstall::new(&["cn1"], 1);
        let runtime = install.runtime_config();
        let marker = install.shared_root().join("started");
        write_script(
            &runtime.hadoop_home.join("bin/start-mapred.sh"),
            &format!("#!/bin/sh\necho \"$HADOOP_CONF_DIR\" > '{}'\n", marker.display()),
        );

        HadoopDaemons.start(&runtime).unwrap();
        assert!(runtime.pid_dir.is_dir());
        assert_eq!(
            std::fs::read_to_string(marker).unwrap().trim(),
            runtime.conf_dir.to_str().unwrap()
        );
    }

    #[test]
    fn test_stop_failure_is_reported() {
        let install = TestInstall::new(&["cn1"], 1);
        let runtime = install.runtime_config();
        write_script(
            &runtime.hadoop_home.join("bin/stop-mapred.sh"),
            "#!/bin/sh\nexit 3\n",
        );
        assert!(matches!(
            HadoopDaemons.stop(&runtime),
            Err(crate::Error::DaemonControlError(_))
        ));
    }

    #[test]
    fn test_missing_script() {
        let install = TestInstall::new(&["cn1"], 1);
        let runtime = install.runtime_config();
        assert!(matches!(
            HadoopDaemons.stop(&runtime),
            Err(crate::Error::DaemonControlError(_))
        ));
    }
}
