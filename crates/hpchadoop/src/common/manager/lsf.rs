use crate::common::Map;

/// Parsed content of `LSB_HOSTS`.
///
/// LSF lists one token per allocated slot, so a host that received four slots
/// appears four times.
#[derive(Debug, PartialEq, Eq)]
pub struct LsfHosts {
    /// Unique hostnames, sorted
    pub hosts: Vec<String>,
    /// Smallest number of slots allocated on any of the hosts
    pub min_slots: u32,
}

pub fn parse_lsb_hosts(value: &str) -> Option<LsfHosts> {
    let mut slots: Map<&str, u32> = Map::default();
    for token in value.split_whitespace() {
        *slots.entry(token).or_default() += 1;
    }
    let min_slots = slots.values().copied().min()?;

    let mut hosts: Vec<String> = slots.into_keys().map(|h| h.to_string()).collect();
    hosts.sort_unstable();
    Some(LsfHosts { hosts, min_slots })
}
