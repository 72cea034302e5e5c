use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use walkdir::WalkDir;

use crate::cluster::daemons::DaemonControl;
use crate::cluster::materialize::RuntimeConfig;
use crate::cluster::ports::{PortProbe, PortTriple};
use crate::cluster::remote::RemoteShell;
use crate::cluster::{ClusterConfig, HostTopology, JobIdentity};
use crate::common::Map;
use crate::common::manager::info::ManagerType;

pub fn env_map(vars: &[(&str, &str)]) -> Map<String, String> {
    vars.iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub struct FakePortProbe {
    pub busy: HashSet<u16>,
}

impl FakePortProbe {
    pub fn all_free() -> Self {
        Self::with_busy(&[])
    }

    pub fn with_busy(ports: &[u16]) -> Self {
        Self {
            busy: ports.iter().copied().collect(),
        }
    }
}

impl PortProbe for FakePortProbe {
    fn is_free(&self, port: u16) -> bool {
        !self.busy.contains(&port)
    }
}

/// Records executed commands, fails on selected hosts.
#[derive(Default)]
pub struct FakeShell {
    failing_hosts: HashSet<String>,
    calls: RefCell<Vec<(String, String)>>,
}

impl FakeShell {
    pub fn failing(hosts: &[&str]) -> Self {
        Self {
            failing_hosts: hosts.iter().map(|h| h.to_string()).collect(),
            calls: Default::default(),
        }
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.borrow().clone()
    }
}

impl RemoteShell for FakeShell {
    fn run(&self, host: &str, command: &str) -> anyhow::Result<()> {
        self.calls
            .borrow_mut()
            .push((host.to_string(), command.to_string()));
        if self.failing_hosts.contains(host) {
            anyhow::bail!("Permission denied (publickey)");
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeDaemons {
    fail_start: bool,
    events: RefCell<Vec<&'static str>>,
}

impl FakeDaemons {
    pub fn failing_start() -> Self {
        Self {
            fail_start: true,
            events: Default::default(),
        }
    }

    pub fn events(&self) -> Vec<&'static str> {
        self.events.borrow().clone()
    }
}

impl DaemonControl for FakeDaemons {
    fn start(&self, _runtime: &RuntimeConfig) -> crate::Result<()> {
        self.events.borrow_mut().push("start");
        if self.fail_start {
            return Err(crate::Error::DaemonControlError(
                "start-mapred.sh exited with exit status: 1".into(),
            ));
        }
        Ok(())
    }

    fn stop(&self, _runtime: &RuntimeConfig) -> crate::Result<()> {
        self.events.borrow_mut().push("stop");
        Ok(())
    }
}

const TEMPLATE_HADOOP_ENV: &str = "# Set Hadoop-specific environment variables here.
# The java implementation to use.  Required.
# export JAVA_HOME=/usr/lib/j2sdk1.5-sun
export HADOOP_HEAPSIZE=2000
# export HADOOP_PID_DIR=/var/hadoop/pids
";

/// Fake Hadoop/Java installation with scratch directories for one cluster run.
pub struct TestInstall {
    root: TempDir,
    hosts: Vec<String>,
    tasks: u32,
}

impl TestInstall {
    pub fn new(hosts: &[&str], tasks: u32) -> Self {
        let root = TempDir::with_prefix("hpchadoop").unwrap();
        let template = root.path().join("hadoop/conf");
        std::fs::create_dir_all(&template).unwrap();
        std::fs::write(template.join("hadoop-env.sh"), TEMPLATE_HADOOP_ENV).unwrap();
        std::fs::write(template.join("log4j.properties"), "log4j.rootLogger=INFO\n").unwrap();
        std::fs::write(template.join("core-site.xml"), "<configuration/>\n").unwrap();
        for dir in ["java", "shared", "tmp"] {
            std::fs::create_dir_all(root.path().join(dir)).unwrap();
        }
        Self {
            root,
            hosts: hosts.iter().map(|h| h.to_string()).collect(),
            tasks,
        }
    }

    pub fn shared_root(&self) -> PathBuf {
        self.root.path().join("shared")
    }

    pub fn cluster_config(&self) -> ClusterConfig {
        ClusterConfig {
            identity: JobIdentity::new("4242".into()).unwrap(),
            hadoop_home: self.root.path().join("hadoop"),
            java_home: self.root.path().join("java"),
            shared_root: self.shared_root(),
            tmp_root: self.root.path().join("tmp"),
            conf_dir: self.root.path().join("work/hadoop-conf"),
            force: false,
        }
    }

    pub fn runtime_config(&self) -> RuntimeConfig {
        let topology = HostTopology::new(ManagerType::Slurm, self.hosts.clone(), self.tasks).unwrap();
        let ports = PortTriple {
            coordinator: 41000,
            coordinator_web: 41001,
            worker_web: 41002,
        };
        RuntimeConfig::new(&self.cluster_config(), topology, ports)
    }
}

/// Relative path -> content of every file below `root`.
pub fn read_tree(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    WalkDir::new(root)
        .into_iter()
        .map(|entry| entry.unwrap())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| {
            (
                entry.path().strip_prefix(root).unwrap().to_path_buf(),
                std::fs::read(entry.path()).unwrap(),
            )
        })
        .collect()
}
