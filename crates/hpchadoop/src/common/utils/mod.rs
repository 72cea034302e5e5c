pub mod fs;
pub mod network;
