use std::process::{Command, Output, Stdio};

use anyhow::Context;
use bstr::ByteSlice;

use crate::cluster::HostTopology;

/// Runs shell commands on cluster hosts.
pub trait RemoteShell {
    fn run(&self, host: &str, command: &str) -> anyhow::Result<()>;
}

/// Executes commands through non-interactive ssh.
///
/// `BatchMode` makes ssh fail instead of prompting when password-less access is not set up.
pub struct SshShell {
    program: String,
    options: Vec<String>,
}

impl Default for SshShell {
    fn default() -> Self {
        Self {
            program: "ssh".to_string(),
            options: [
                "-o",
                "BatchMode=yes",
                "-o",
                "StrictHostKeyChecking=no",
                "-o",
                "ConnectTimeout=10",
            ]
            .into_iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl RemoteShell for SshShell {
    fn run(&self, host: &str, command: &str) -> anyhow::Result<()> {
        log::debug!("Running `{command}` on {host}");
        let output = Command::new(&self.program)
            .args(&self.options)
            .arg(host)
            .arg(command)
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("{} start failed", self.program))?;
        check_command_output(output)
            .with_context(|| format!("{} execution failed", self.program))?;
        Ok(())
    }
}

pub fn check_command_output(output: Output) -> anyhow::Result<Output> {
    let status = output.status;
    if !status.success() {
        return Err(anyhow::anyhow!(
            "Exit code: {}\nStderr: {}\nStdout: {}",
            status.code().unwrap_or(-1),
            output.stderr.to_str_lossy().trim(),
            output.stdout.to_str_lossy().trim()
        ));
    }
    Ok(output)
}

/// Quotes `value` for use as a single POSIX shell word.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Verifies that commands can be executed on `host` without any prompt.
pub fn check_host(shell: &impl RemoteShell, host: &str) -> crate::Result<()> {
    shell
        .run(host, "true")
        .map_err(|error| crate::Error::ConnectivityError {
            host: host.to_string(),
            reason: format!("{error:#}"),
        })
}

/// Checks all hosts of the topology, one after another, and stops at the first failure.
pub fn check_connectivity(shell: &impl RemoteShell, topology: &HostTopology) -> crate::Result<()> {
    for host in topology.hosts() {
        check_host(shell, host)?;
        log::debug!("Host {host} is reachable");
    }
    log::info!(
        "All {} host(s) are reachable over ssh",
        topology.hosts().len()
    );
    Ok(())
}
