//! Ledger client abstraction.
//!
//! Everything the coordination service needs from the flight surety contract
//! goes through [`LedgerClient`]: account discovery, oracle registration, index
//! queries, response submission and event paging. The production implementation
//! speaks JSON-RPC ([`rpc::RpcLedgerClient`]); tests use an in-memory mock.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::LedgerError;
use crate::models::{EventKind, OracleIdentity, OracleResponse, TxReceipt};

#[cfg(test)]
pub(crate) mod mock;
pub mod parse;
pub mod rpc;

/// Contract event as delivered by the ledger, before payload decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEvent {
    pub id: Option<String>,
    pub ledger: u64,
    pub contract_id: String,
    pub name: String,
    pub payload: Value,
}

/// One page of events from a stream plus the cursor to resume after it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventPage {
    pub events: Vec<RawEvent>,
    pub cursor: Option<String>,
}

/// Where a stream subscription resumes reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamPosition {
    /// Start at a ledger sequence number (0 = genesis)
    FromLedger(u64),
    /// Continue after a cursor returned by a previous page
    After(String),
}

#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Accounts the connected node can sign for.
    async fn accounts(&self) -> Result<Vec<OracleIdentity>, LedgerError>;

    /// `registerOracle()` paying `fee_wei`, sent from `oracle`.
    async fn register_oracle(
        &self,
        oracle: &OracleIdentity,
        fee_wei: u128,
    ) -> Result<TxReceipt, LedgerError>;

    /// `getMyIndexes()` called as `oracle`.
    async fn get_my_indexes(&self, oracle: &OracleIdentity) -> Result<Vec<u64>, LedgerError>;

    /// `submitOracleResponse(index, airline, flight, timestamp, statusCode)` sent from `oracle`.
    async fn submit_oracle_response(
        &self,
        oracle: &OracleIdentity,
        response: &OracleResponse,
    ) -> Result<TxReceipt, LedgerError>;

    /// Next page of `kind` events starting at `position`.
    async fn fetch_events(
        &self,
        kind: EventKind,
        position: &StreamPosition,
        limit: u32,
    ) -> Result<EventPage, LedgerError>;
}
