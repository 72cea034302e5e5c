pub mod cli;
pub mod env;
pub mod error;
pub mod manager;
pub mod parser;
pub mod setup;
pub mod utils;

pub type Map<K, V> = std::collections::HashMap<K, V, fxhash::FxBuildHasher>;
