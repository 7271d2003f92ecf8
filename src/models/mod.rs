//! Data models for the oracle coordination service

pub mod events;
pub mod oracle;

pub use events::*;
pub use oracle::*;
