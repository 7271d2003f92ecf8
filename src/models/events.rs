use serde::{Deserialize, Serialize};
use std::fmt;

use super::oracle::StatusCode;

/// Named event streams the contract emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    OracleRequest,
    OracleReport,
    FlightStatusInfo,
}

impl EventKind {
    pub const ALL: [EventKind; 3] = [
        EventKind::OracleRequest,
        EventKind::OracleReport,
        EventKind::FlightStatusInfo,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EventKind::OracleRequest => "OracleRequest",
            EventKind::OracleReport => "OracleReport",
            EventKind::FlightStatusInfo => "FlightStatusInfo",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Request for every oracle holding `index` to report a flight status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OracleRequest {
    pub index: u8,
    pub airline: String,
    pub flight_number: String,
    pub timestamp: u64,
}

/// Individual oracle report accepted by the contract. Informational only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OracleReport {
    pub index: Option<u8>,
    pub airline: String,
    pub flight_number: String,
    pub timestamp: u64,
    pub status: Option<StatusCode>,
}

/// Final status the contract settled on after quorum. Informational only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightStatusInfo {
    pub airline: String,
    pub flight_number: String,
    pub timestamp: u64,
    pub status: StatusCode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventPayload {
    OracleRequest(OracleRequest),
    OracleReport(OracleReport),
    FlightStatusInfo(FlightStatusInfo),
}

impl EventPayload {
    pub fn kind(&self) -> EventKind {
        match self {
            EventPayload::OracleRequest(_) => EventKind::OracleRequest,
            EventPayload::OracleReport(_) => EventKind::OracleReport,
            EventPayload::FlightStatusInfo(_) => EventKind::FlightStatusInfo,
        }
    }
}

/// A decoded contract event together with its position in the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEvent {
    /// Ledger-assigned event id, stable across replays when present
    pub id: Option<String>,
    pub ledger: u64,
    pub payload: EventPayload,
}
