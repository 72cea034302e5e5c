use clap::Parser;

use hpchadoop::cluster::daemons::HadoopDaemons;
use hpchadoop::cluster::lifecycle::{ClusterLifecycleManager, RunOutcome};
use hpchadoop::cluster::materialize::RuntimeConfig;
use hpchadoop::cluster::ports::{PortRange, TcpPortProbe, allocate_port_triple};
use hpchadoop::cluster::remote::SshShell;
use hpchadoop::cluster::topology::resolve_topology;
use hpchadoop::cluster::{ClusterConfig, JobIdentity};
use hpchadoop::common::cli::ClusterOpts;
use hpchadoop::common::env::ProcessEnv;
use hpchadoop::common::setup::setup_logging;
use hpchadoop::HPCHADOOP_VERSION;

async fn run_cluster(opts: ClusterOpts) -> hpchadoop::Result<RunOutcome> {
    log::info!("Starting hpchadoop {HPCHADOOP_VERSION}");

    let identity = JobIdentity::resolve(&ProcessEnv)?;
    let config = ClusterConfig::from_opts(&opts, identity)?;
    let topology = resolve_topology(&ProcessEnv)?;
    log::info!(
        "Job {}: {} host(s) from {} allocation, {} task(s) per host",
        config.identity,
        topology.hosts().len(),
        topology.manager(),
        topology.max_tasks_per_host()
    );

    let ports = allocate_port_triple(
        &TcpPortProbe::default(),
        PortRange::system(),
        &config.identity,
    )?;
    let runtime = RuntimeConfig::new(&config, topology, ports);

    let daemons = HadoopDaemons;
    let shell = SshShell::default();
    let mut manager = ClusterLifecycleManager::new(&daemons, &shell);
    manager.configure(runtime, config.force)?;
    manager.run(&opts.command).await
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let opts = match ClusterOpts::try_parse() {
        Ok(opts) => opts,
        Err(error) => error.exit(),
    };

    setup_logging(opts.debug);

    let code = match run_cluster(opts).await {
        Ok(outcome) => {
            let code = outcome.exit_code();
            if code != 0 {
                log::warn!("Command ended with exit code {code}");
            }
            code
        }
        Err(error) => {
            log::error!("{error}");
            eprintln!("error: {error}");
            error.exit_code()
        }
    };
    std::process::exit(code);
}
