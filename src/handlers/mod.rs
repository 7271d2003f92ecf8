//! API handlers for the oracle server

pub mod oracle;

pub use oracle::{api_info, health_check, list_oracles, root};
