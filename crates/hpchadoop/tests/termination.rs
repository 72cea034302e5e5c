//! Kept in its own test binary: the termination signal is delivered to the whole
//! process and would interrupt jobs of concurrently running tests.
use std::cell::RefCell;
use std::time::{Duration, Instant};

use hpchadoop::cluster::daemons::DaemonControl;
use hpchadoop::cluster::lifecycle::{ClusterLifecycleManager, ClusterState, RunOutcome};
use hpchadoop::cluster::materialize::RuntimeConfig;
use hpchadoop::cluster::ports::PortTriple;
use hpchadoop::cluster::remote::RemoteShell;
use hpchadoop::cluster::{ClusterConfig, HostTopology, JobIdentity};
use nix::sys::signal::Signal;

#[derive(Default)]
struct RecordingDaemons {
    events: RefCell<Vec<&'static str>>,
}

impl DaemonControl for RecordingDaemons {
    fn start(&self, runtime: &RuntimeConfig) -> hpchadoop::Result<()> {
        std::fs::create_dir_all(&runtime.pid_dir)?;
        self.events.borrow_mut().push("start");
        Ok(())
    }

    fn stop(&self, _runtime: &RuntimeConfig) -> hpchadoop::Result<()> {
        self.events.borrow_mut().push("stop");
        Ok(())
    }
}

#[derive(Default)]
struct RecordingShell {
    commands: RefCell<Vec<String>>,
}

impl RemoteShell for RecordingShell {
    fn run(&self, _host: &str, command: &str) -> anyhow::Result<()> {
        self.commands.borrow_mut().push(command.to_string());
        Ok(())
    }
}

#[tokio::test]
async fn sigterm_stops_job_and_tears_down() {
    let root = tempfile::tempdir().unwrap();
    let root = root.path();
    std::fs::create_dir_all(root.join("hadoop/conf")).unwrap();
    for dir in ["java", "shared", "tmp"] {
        std::fs::create_dir_all(root.join(dir)).unwrap();
    }
    let config = ClusterConfig {
        identity: JobIdentity::new("term-1".to_string()).unwrap(),
        hadoop_home: root.join("hadoop"),
        java_home: root.join("java"),
        shared_root: root.join("shared"),
        tmp_root: root.join("tmp"),
        conf_dir: root.join("hadoop-conf"),
        force: false,
    };
    let topology = HostTopology::local();
    let ports = PortTriple {
        coordinator: 41000,
        coordinator_web: 41001,
        worker_web: 41002,
    };
    let runtime = RuntimeConfig::new(&config, topology, ports);

    let daemons = RecordingDaemons::default();
    let shell = RecordingShell::default();
    let mut manager = ClusterLifecycleManager::new(&daemons, &shell);
    manager.configure(runtime.clone(), false).unwrap();

    // The job sends SIGTERM to this process and then waits far longer than the test
    let command: Vec<String> = ["sh", "-c", "kill -TERM $PPID; exec sleep 30"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let started = Instant::now();
    let outcome = manager.run(&command).await.unwrap();

    assert_eq!(outcome, RunOutcome::Interrupted(Signal::SIGTERM));
    assert_eq!(outcome.exit_code(), 143);
    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(*daemons.events.borrow(), vec!["start", "stop"]);
    assert_eq!(manager.state(), ClusterState::TornDown);

    let report = manager.cleanup_report().unwrap();
    assert_eq!(report.hosts.len(), 1);
    assert_eq!(report.failed_hosts().count(), 0);
    assert_eq!(
        shell.commands.borrow().last().unwrap(),
        &format!("rm -rf '{}'", runtime.private_dir.display())
    );
}
