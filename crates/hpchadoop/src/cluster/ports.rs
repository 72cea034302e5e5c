use std::fmt::{Display, Formatter};
use std::net::{Ipv4Addr, SocketAddr, TcpListener, TcpStream};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cluster::JobIdentity;
use crate::common::error::error;

/// Kernel setting that holds the ephemeral port range.
pub const PORT_RANGE_FILE: &str = "/proc/sys/net/ipv4/ip_local_port_range";

/// Linux default ephemeral range, used when [`PORT_RANGE_FILE`] cannot be read.
const DEFAULT_PORT_RANGE: PortRange = PortRange {
    start: 32768,
    end: 60999,
};

/// Delay between binding a probe listener and connecting to it.
const PROBE_SETTLE_DELAY: Duration = Duration::from_millis(100);
const PROBE_CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

/// Inclusive range of ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRange {
    pub start: u16,
    pub end: u16,
}

impl PortRange {
    pub fn new(start: u16, end: u16) -> crate::Result<Self> {
        if start == 0 || end < start {
            return error(format!("Invalid port range {start}-{end}"));
        }
        Ok(Self { start, end })
    }

    /// Reads the ephemeral port range configured in the kernel.
    pub fn system() -> Self {
        match read_port_range(Path::new(PORT_RANGE_FILE)) {
            Ok(range) => range,
            Err(error) => {
                log::warn!(
                    "Cannot read ephemeral port range from {PORT_RANGE_FILE}: {error}, using {DEFAULT_PORT_RANGE}"
                );
                DEFAULT_PORT_RANGE
            }
        }
    }

    /// Maps `hash` into the lower half of the range.
    fn offset(&self, hash: u32) -> u16 {
        let half = u32::from(self.end - self.start) / 2 + 1;
        self.start + (hash % half) as u16
    }
}

impl Display for PortRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

fn read_port_range(path: &Path) -> crate::Result<PortRange> {
    let content = std::fs::read_to_string(path)?;
    parse_port_range(&content)
}

fn parse_port_range(content: &str) -> crate::Result<PortRange> {
    let bounds: Vec<u16> = content
        .split_whitespace()
        .map(|value| value.parse::<u16>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("Invalid port range `{}`: {e}", content.trim()))?;
    match bounds.as_slice() {
        [start, end] => PortRange::new(*start, *end),
        _ => error(format!("Invalid port range `{}`", content.trim())),
    }
}

/// Ports used by the daemons of one cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortTriple {
    /// RPC port of the coordinator (JobTracker)
    pub coordinator: u16,
    /// Web UI of the coordinator
    pub coordinator_web: u16,
    /// Web UI of the workers (TaskTrackers)
    pub worker_web: u16,
}

/// Checks whether a port can be used.
pub trait PortProbe {
    fn is_free(&self, port: u16) -> bool;
}

/// Probes ports by binding a listener on all interfaces and connecting to it.
///
/// A successful bind alone is not enough, some environments accept the bind but
/// filter connections to the port.
pub struct TcpPortProbe {
    settle_delay: Duration,
    connect_timeout: Duration,
}

impl Default for TcpPortProbe {
    fn default() -> Self {
        Self {
            settle_delay: PROBE_SETTLE_DELAY,
            connect_timeout: PROBE_CONNECT_TIMEOUT,
        }
    }
}

impl TcpPortProbe {
    pub fn new(settle_delay: Duration, connect_timeout: Duration) -> Self {
        Self {
            settle_delay,
            connect_timeout,
        }
    }
}

impl PortProbe for TcpPortProbe {
    fn is_free(&self, port: u16) -> bool {
        let listener = match TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)) {
            Ok(listener) => listener,
            Err(error) => {
                log::debug!("Port {port} cannot be bound: {error}");
                return false;
            }
        };
        std::thread::sleep(self.settle_delay);
        let address = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
        let reachable = match TcpStream::connect_timeout(&address, self.connect_timeout) {
            Ok(_) => true,
            Err(error) => {
                log::debug!("Port {port} is bound, but not reachable: {error}");
                false
            }
        };
        drop(listener);
        reachable
    }
}

/// Start of the port search for the given job.
///
/// Derived from the job identity so that clusters starting at the same time
/// usually scan different parts of the range.
pub fn search_offset(identity: &JobIdentity, range: PortRange) -> u16 {
    range.offset(fxhash::hash32(identity.as_str()))
}

/// Finds `count` free ports in `range`, each larger than the previous one.
///
/// There is no reservation: another process may take a port between this check
/// and the moment a daemon binds it.
pub fn allocate_ports(
    probe: &impl PortProbe,
    range: PortRange,
    identity: &JobIdentity,
    count: usize,
) -> crate::Result<Vec<u16>> {
    let mut ports = Vec::with_capacity(count);
    let mut candidate = u32::from(search_offset(identity, range));
    log::debug!("Searching for {count} ports in {range}, starting at {candidate}");

    while ports.len() < count {
        if candidate > u32::from(range.end) {
            return Err(crate::Error::PortExhaustionError {
                start: range.start,
                end: range.end,
                found: ports.len(),
                required: count,
            });
        }
        let port = candidate as u16;
        if probe.is_free(port) {
            ports.push(port);
        }
        candidate += 1;
    }
    Ok(ports)
}

pub fn allocate_port_triple(
    probe: &impl PortProbe,
    range: PortRange,
    identity: &JobIdentity,
) -> crate::Result<PortTriple> {
    let ports = allocate_ports(probe, range, identity, 3)?;
    let triple = PortTriple {
        coordinator: ports[0],
        coordinator_web: ports[1],
        worker_web: ports[2],
    };
    log::info!(
        "Allocated ports: coordinator {}, coordinator web {}, worker web {}",
        triple.coordinator,
        triple.coordinator_web,
        triple.worker_web
    );
    Ok(triple)
}

#[cfg(test)]
mod tests {
    use super::{
        PortRange, PortTriple, allocate_port_triple, allocate_ports, parse_port_range,
        search_offset,
    };
    use crate::cluster::JobIdentity;
    use crate::tests::utils::FakePortProbe;

    fn identity(value: &str) -> JobIdentity {
        JobIdentity::new(value.to_string()).unwrap()
    }

    #[test]
    fn test_parse_port_range() {
        assert_eq!(
            parse_port_range("32768\t60999\n").unwrap(),
            PortRange::new(32768, 60999).unwrap()
        );
        assert!(parse_port_range("32768").is_err());
        assert!(parse_port_range("60999 32768").is_err());
        assert!(parse_port_range("a b").is_err());
    }

    #[test]
    fn test_offset_in_lower_half() {
        let range = PortRange::new(40000, 50000).unwrap();
        for id in ["1", "2", "4641914", "20240101120000.cn1.42"] {
            let offset = search_offset(&identity(id), range);
            assert!((40000..=45000).contains(&offset), "{offset}");
        }
    }

    #[test]
    fn test_offset_deterministic() {
        let range = PortRange::new(40000, 50000).unwrap();
        assert_eq!(
            search_offset(&identity("123"), range),
            search_offset(&identity("123"), range)
        );
    }

    #[test]
    fn test_offset_single_port_range() {
        let range = PortRange::new(5000, 5000).unwrap();
        assert_eq!(search_offset(&identity("x"), range), 5000);
    }

    #[test]
    fn test_allocate_triple_increasing() {
        let range = PortRange::new(40000, 40100).unwrap();
        let id = identity("77");
        let triple = allocate_port_triple(&FakePortProbe::all_free(), range, &id).unwrap();
        let start = search_offset(&id, range);
        assert_eq!(
            triple,
            PortTriple {
                coordinator: start,
                coordinator_web: start + 1,
                worker_web: start + 2
            }
        );
    }

    #[test]
    fn test_allocate_skips_busy_ports() {
        let range = PortRange::new(40000, 40100).unwrap();
        let id = identity("77");
        let start = search_offset(&id, range);
        let probe = FakePortProbe::with_busy(&[start, start + 2, start + 3]);
        let ports = allocate_ports(&probe, range, &id, 3).unwrap();
        assert_eq!(ports, vec![start + 1, start + 4, start + 5]);
        assert!(ports.windows(2).all(|w| w[0] < w[1]));
        assert!(ports.iter().all(|p| !probe.busy.contains(p)));
    }

    #[test]
    fn test_allocate_exhausted() {
        let range = PortRange::new(40000, 40003).unwrap();
        let id = identity("77");
        let busy: Vec<u16> = (40000..=40003).skip(1).collect();
        let probe = FakePortProbe::with_busy(&busy);
        match allocate_ports(&probe, range, &id, 3) {
            Err(crate::Error::PortExhaustionError {
                start,
                end,
                required,
                ..
            }) => {
                assert_eq!((start, end, required), (40000, 40003, 3));
            }
            other => panic!("Unexpected result {other:?}"),
        }
    }
}
