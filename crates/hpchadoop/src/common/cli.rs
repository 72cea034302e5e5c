use std::path::PathBuf;

use clap::Parser;

/// Runs a command on a private Hadoop MapReduce cluster spawned inside the current
/// Slurm/LSF allocation. Job data is read from and written to shared POSIX storage.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct ClusterOpts {
    /// Shared storage directory used as the root of the Hadoop filesystem
    #[arg(long, value_hint = clap::ValueHint::DirPath, default_value = ".")]
    pub shared_root: PathBuf,

    /// Hadoop installation directory
    #[arg(long, value_hint = clap::ValueHint::DirPath, env = "HADOOP_HOME")]
    pub hadoop_home: Option<PathBuf>,

    /// Java installation directory
    #[arg(long, value_hint = clap::ValueHint::DirPath, env = "JAVA_HOME")]
    pub java_home: Option<PathBuf>,

    /// Overwrite an existing generated configuration directory
    #[arg(long)]
    pub force: bool,

    /// Where to generate the Hadoop configuration
    #[arg(long, value_hint = clap::ValueHint::DirPath, default_value = "hadoop-conf")]
    pub conf_dir: PathBuf,

    /// Node-local directory under which the private daemon state of the job is stored
    #[arg(
        long,
        value_hint = clap::ValueHint::DirPath,
        env = "HPCHADOOP_TMP_ROOT",
        default_value = "/tmp"
    )]
    pub tmp_root: PathBuf,

    /// Enables more detailed log output
    #[arg(long)]
    pub debug: bool,

    /// Command (and its arguments) executed once the cluster is running
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}
