pub mod cluster;
pub mod common;

#[cfg(test)]
pub(crate) mod tests;

pub type Error = crate::common::error::HadoopError;
pub type Result<T> = std::result::Result<T, Error>;

pub const HPCHADOOP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the product whose daemons are provisioned. Used to namespace shared directories.
pub const PRODUCT_NAME: &str = "hadoop";
