pub mod cleanup;
pub mod config;
pub mod daemons;
pub mod identity;
pub mod lifecycle;
pub mod materialize;
pub mod ports;
pub mod remote;
pub mod topology;

pub use config::ClusterConfig;
pub use identity::JobIdentity;
pub use topology::HostTopology;
