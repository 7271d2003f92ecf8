//! Flight Oracle Server Library
//!
//! Coordinates a pool of simulated flight-status oracles against the flight
//! surety contract: registers the pool, tracks index assignments, listens for
//! status requests and fans out one response per eligible oracle.

pub mod app_state;
pub mod config;
pub mod error;
pub mod event_listener;
pub mod handlers;
pub mod ledger;
pub mod models;
pub mod registry;
pub mod routes;
pub mod services;
