//! Static startup configuration, read once from the environment.

pub mod oracle;

pub use oracle::{GasLimits, ListenerConfig, OracleConfig, OracleSelection};
