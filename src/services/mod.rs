//! Oracle coordination services

pub mod backoff;
pub mod bootstrap_service;
pub mod oracle_service;
pub mod status_generator;
pub mod subscription;

pub use bootstrap_service::{BootstrapReport, OracleBootstrapper};
pub use oracle_service::{DispatchReport, OracleService};
