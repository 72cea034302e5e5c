//! Generation of the private Hadoop configuration directory of a cluster run.
//!
//! The template shipped in `$HADOOP_HOME/conf` is copied as a whole and then
//! redirected: logs go to shared storage, daemon state and pid files go to a
//! node-local directory namespaced by the job identity, and the filesystem root
//! points to shared POSIX storage instead of HDFS.
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::cluster::ports::PortTriple;
use crate::cluster::remote::shell_quote;
use crate::cluster::{ClusterConfig, HostTopology, JobIdentity};
use crate::common::env::{HADOOP_CONF_DIR, HADOOP_HOME, JAVA_HOME};
use crate::common::error::configuration_error;
use crate::common::utils::fs::copy_tree;

pub const TEMPLATE_DIR: &str = "conf";
pub const HADOOP_ENV_FILE: &str = "hadoop-env.sh";
pub const SLAVES_FILE: &str = "slaves";
pub const MASTERS_FILE: &str = "masters";
pub const CORE_SITE_FILE: &str = "core-site.xml";
pub const MAPRED_SITE_FILE: &str = "mapred-site.xml";
pub const RUNTIME_CONFIG_FILE: &str = "hpchadoop.json";

/// Variables of `hadoop-env.sh` that are always replaced by generated values.
const MANAGED_ENV_VARS: [&str; 6] = [
    JAVA_HOME,
    HADOOP_HOME,
    HADOOP_CONF_DIR,
    "HADOOP_LOG_DIR",
    "HADOOP_PID_DIR",
    "HADOOP_IDENT_STRING",
];

/// Fully resolved configuration of one cluster run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub identity: JobIdentity,
    pub hadoop_home: PathBuf,
    pub java_home: PathBuf,
    pub shared_root: PathBuf,
    pub tmp_root: PathBuf,
    pub conf_dir: PathBuf,
    /// Node-local directory with all private state of the daemons
    pub private_dir: PathBuf,
    pub pid_dir: PathBuf,
    pub log_dir: PathBuf,
    pub topology: HostTopology,
    pub ports: PortTriple,
}

impl RuntimeConfig {
    pub fn new(config: &ClusterConfig, topology: HostTopology, ports: PortTriple) -> Self {
        let private_dir = config.identity.private_dir(&config.tmp_root);
        Self {
            identity: config.identity.clone(),
            hadoop_home: config.hadoop_home.clone(),
            java_home: config.java_home.clone(),
            shared_root: config.shared_root.clone(),
            tmp_root: config.tmp_root.clone(),
            conf_dir: config.conf_dir.clone(),
            pid_dir: private_dir.join("pids"),
            private_dir,
            log_dir: shared_product_dir(&config.shared_root).join("logs"),
            topology,
            ports,
        }
    }

    pub fn template_dir(&self) -> PathBuf {
        self.hadoop_home.join(TEMPLATE_DIR)
    }
}

fn shared_product_dir(shared_root: &Path) -> PathBuf {
    shared_root.join(crate::PRODUCT_NAME)
}

/// Writes the configuration directory described by `runtime`.
///
/// An existing directory is only replaced when `force` is set, and then it is removed
/// completely first so that no file of a previous run survives.
pub fn materialize(runtime: &RuntimeConfig, force: bool) -> crate::Result<()> {
    let template = runtime.template_dir();
    if !template.is_dir() {
        return configuration_error(format!(
            "Hadoop configuration template {} does not exist",
            template.display()
        ));
    }
    if runtime.conf_dir.starts_with(&template) || template.starts_with(&runtime.conf_dir) {
        return configuration_error(format!(
            "Configuration directory {} overlaps the Hadoop configuration template {}",
            runtime.conf_dir.display(),
            template.display()
        ));
    }
    prepare_conf_dir(&runtime.conf_dir, force)?;

    log::debug!(
        "Copying configuration template {} into {}",
        template.display(),
        runtime.conf_dir.display()
    );
    copy_tree(&template, &runtime.conf_dir)?;

    let env_path = runtime.conf_dir.join(HADOOP_ENV_FILE);
    let template_env = match std::fs::read_to_string(&env_path) {
        Ok(content) => content,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(error) => return Err(error.into()),
    };
    std::fs::write(&env_path, rewrite_hadoop_env(&template_env, runtime))?;

    std::fs::create_dir_all(&runtime.log_dir)?;

    let hosts = runtime.topology.hosts();
    std::fs::write(runtime.conf_dir.join(SLAVES_FILE), render_lines(hosts))?;
    std::fs::write(
        runtime.conf_dir.join(MASTERS_FILE),
        render_lines(&[runtime.topology.master()]),
    )?;
    std::fs::write(
        runtime.conf_dir.join(CORE_SITE_FILE),
        render_site_xml(&core_site_properties(runtime)),
    )?;
    std::fs::write(
        runtime.conf_dir.join(MAPRED_SITE_FILE),
        render_site_xml(&mapred_site_properties(runtime)),
    )?;

    let file = std::fs::File::create(runtime.conf_dir.join(RUNTIME_CONFIG_FILE))?;
    serde_json::to_writer_pretty(file, runtime)?;

    log::info!(
        "Hadoop configuration for job {} written to {}",
        runtime.identity,
        runtime.conf_dir.display()
    );
    Ok(())
}

fn prepare_conf_dir(conf_dir: &Path, force: bool) -> crate::Result<()> {
    if !conf_dir.exists() {
        return Ok(());
    }
    if !force {
        return configuration_error(format!(
            "Configuration directory {} already exists, use --force to overwrite it",
            conf_dir.display()
        ));
    }
    log::warn!(
        "Removing existing configuration directory {}",
        conf_dir.display()
    );
    if conf_dir.is_dir() {
        std::fs::remove_dir_all(conf_dir)?;
    } else {
        std::fs::remove_file(conf_dir)?;
    }
    Ok(())
}

/// Returns true for `export VAR=...` lines (also commented out) of a managed variable.
fn is_managed_assignment(line: &str) -> bool {
    let line = line.trim_start().trim_start_matches('#').trim_start();
    let line = line.strip_prefix("export ").unwrap_or(line).trim_start();
    MANAGED_ENV_VARS.iter().any(|var| {
        line.strip_prefix(var)
            .is_some_and(|rest| rest.trim_start().starts_with('='))
    })
}

fn rewrite_hadoop_env(template: &str, runtime: &RuntimeConfig) -> String {
    let mut content = String::with_capacity(template.len() + 512);
    for line in template.lines().filter(|line| !is_managed_assignment(line)) {
        content.push_str(line);
        content.push('\n');
    }

    let exports = [
        (JAVA_HOME, runtime.java_home.display().to_string()),
        (HADOOP_HOME, runtime.hadoop_home.display().to_string()),
        (HADOOP_CONF_DIR, runtime.conf_dir.display().to_string()),
        ("HADOOP_LOG_DIR", runtime.log_dir.display().to_string()),
        ("HADOOP_PID_DIR", runtime.pid_dir.display().to_string()),
        ("HADOOP_IDENT_STRING", runtime.identity.to_string()),
    ];
    content.push_str(&format!("\n# Generated for job {}\n", runtime.identity));
    for (name, value) in exports {
        content.push_str(&format!("export {name}={}\n", shell_quote(&value)));
    }
    content
}

fn render_lines<S: AsRef<str>>(lines: &[S]) -> String {
    lines.iter().fold(String::new(), |mut acc, line| {
        acc.push_str(line.as_ref());
        acc.push('\n');
        acc
    })
}

fn core_site_properties(runtime: &RuntimeConfig) -> Vec<(&'static str, String)> {
    vec![
        (
            "fs.default.name",
            format!("file://{}", runtime.shared_root.display()),
        ),
        ("hadoop.tmp.dir", runtime.private_dir.display().to_string()),
    ]
}

fn mapred_site_properties(runtime: &RuntimeConfig) -> Vec<(&'static str, String)> {
    let mapred_dir = shared_product_dir(&runtime.shared_root).join("mapred");
    let ports = &runtime.ports;
    let tasks = runtime.topology.max_tasks_per_host().to_string();
    vec![
        (
            "mapred.job.tracker",
            format!("{}:{}", runtime.topology.master(), ports.coordinator),
        ),
        (
            "mapred.job.tracker.http.address",
            format!("0.0.0.0:{}", ports.coordinator_web),
        ),
        (
            "mapred.task.tracker.http.address",
            format!("0.0.0.0:{}", ports.worker_web),
        ),
        ("mapred.tasktracker.map.tasks.maximum", tasks.clone()),
        ("mapred.tasktracker.reduce.tasks.maximum", tasks),
        (
            "mapred.system.dir",
            mapred_dir
                .join("system")
                .join(runtime.identity.as_str())
                .display()
                .to_string(),
        ),
        (
            "mapreduce.jobtracker.staging.root.dir",
            mapred_dir.join("staging").display().to_string(),
        ),
        (
            "mapred.local.dir",
            runtime.private_dir.join("mapred/local").display().to_string(),
        ),
    ]
}

fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
    }
    escaped
}

fn render_site_xml(properties: &[(&str, String)]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\"?>\n<?xml-stylesheet type=\"text/xsl\" href=\"configuration.xsl\"?>\n<configuration>\n",
    );
    for (name, value) in properties {
        xml.push_str(&format!(
            "  <property>\n    <name>{}</name>\n    <value>{}</value>\n  </property>\n",
            escape_xml(name),
            escape_xml(value)
        ));
    }
    xml.push_str("</configuration>\n");
    xml
}
