//! Decoding of raw JSON-RPC event objects into typed contract events.
//!
//! Gateways disagree on field spelling (`contractId` vs `contract_id`, numbers
//! as JSON numbers or decimal strings), so lookups try a few known aliases.

use serde_json::Value;

use super::RawEvent;
use crate::error::LedgerError;
use crate::models::{
    EventKind, EventPayload, FlightStatusInfo, LedgerEvent, OracleReport, OracleRequest,
    StatusCode,
};

/// Lift one element of `result.events` into a [`RawEvent`]. Returns `None` when
/// the object carries no event name at all.
pub fn raw_event(raw: &Value) -> Option<RawEvent> {
    let name = raw
        .pointer("/event")
        .or_else(|| raw.pointer("/type"))
        .and_then(Value::as_str)
        .map(ToString::to_string)
        .or_else(|| extract_topic_symbol(raw.pointer("/topic").or_else(|| raw.pointer("/topics"))))?;

    let contract_id = first_str(raw, &["/contractId", "/contract_id", "/address"])
        .unwrap_or_default()
        .to_string();

    let ledger = first_u64(raw, &["/ledger", "/ledgerSequence", "/blockNumber"]).unwrap_or(0);

    let id = first_str(raw, &["/id", "/pagingToken", "/paging_token"])
        .map(ToString::to_string)
        .or_else(|| {
            // Ethereum style logs are identified by tx hash and log index
            let tx = first_str(raw, &["/transactionHash", "/txHash"])?;
            let log_index = first_u64(raw, &["/logIndex"])?;
            Some(format!("{}-{}", tx, log_index))
        });

    let payload = raw
        .pointer("/value")
        .or_else(|| raw.pointer("/returnValues"))
        .or_else(|| raw.pointer("/data"))
        .cloned()
        .unwrap_or(Value::Null);

    Some(RawEvent {
        id,
        ledger,
        contract_id,
        name,
        payload,
    })
}

/// Decode the payload of a raw event according to its stream.
pub fn decode_event(kind: EventKind, raw: &RawEvent) -> Result<LedgerEvent, LedgerError> {
    if raw.name != kind.name() {
        return Err(LedgerError::Malformed(format!(
            "expected {} event, got {}",
            kind, raw.name
        )));
    }

    let payload = &raw.payload;
    let decoded = match kind {
        EventKind::OracleRequest => EventPayload::OracleRequest(OracleRequest {
            index: index_field(payload)?,
            airline: string_field(payload, "airline")?,
            flight_number: flight_field(payload)?,
            timestamp: u64_field(payload, "timestamp")?,
        }),
        EventKind::OracleReport => EventPayload::OracleReport(OracleReport {
            index: index_field(payload).ok(),
            airline: string_field(payload, "airline")?,
            flight_number: flight_field(payload)?,
            timestamp: u64_field(payload, "timestamp")?,
            status: status_field(payload).ok(),
        }),
        EventKind::FlightStatusInfo => EventPayload::FlightStatusInfo(FlightStatusInfo {
            airline: string_field(payload, "airline")?,
            flight_number: flight_field(payload)?,
            timestamp: u64_field(payload, "timestamp")?,
            status: status_field(payload)?,
        }),
    };

    Ok(LedgerEvent {
        id: raw.id.clone(),
        ledger: raw.ledger,
        payload: decoded,
    })
}

/// Render a flight number that may arrive as a zero padded `bytes32` hex string.
/// Anything that is not valid hex-encoded UTF-8 is returned unchanged.
pub fn display_flight_number(flight_number: &str) -> String {
    flight_number
        .strip_prefix("0x")
        .and_then(|digits| hex::decode(digits).ok())
        .map(|mut bytes| {
            while bytes.last() == Some(&0) {
                bytes.pop();
            }
            bytes
        })
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| flight_number.to_string())
}

/// Accept a JSON number or a decimal string.
pub fn as_u64(value: &Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|text| text.trim().parse().ok()))
}

fn first_str<'a>(raw: &'a Value, pointers: &[&str]) -> Option<&'a str> {
    pointers
        .iter()
        .find_map(|pointer| raw.pointer(pointer).and_then(Value::as_str))
}

fn first_u64(raw: &Value, pointers: &[&str]) -> Option<u64> {
    pointers
        .iter()
        .find_map(|pointer| raw.pointer(pointer).and_then(as_u64))
}

fn extract_topic_symbol(value: Option<&Value>) -> Option<String> {
    let topics = value?.as_array()?;
    topics
        .first()
        .and_then(|topic| {
            topic
                .as_str()
                .or_else(|| topic.pointer("/symbol").and_then(Value::as_str))
                .or_else(|| topic.pointer("/value").and_then(Value::as_str))
        })
        .map(ToString::to_string)
}

fn missing(field: &str) -> LedgerError {
    LedgerError::Malformed(format!("missing or invalid field {:?}", field))
}

fn string_field(payload: &Value, field: &str) -> Result<String, LedgerError> {
    payload
        .get(field)
        .and_then(Value::as_str)
        .map(ToString::to_string)
        .ok_or_else(|| missing(field))
}

fn flight_field(payload: &Value) -> Result<String, LedgerError> {
    string_field(payload, "flightNumber").or_else(|_| string_field(payload, "flight"))
}

fn u64_field(payload: &Value, field: &str) -> Result<u64, LedgerError> {
    payload.get(field).and_then(as_u64).ok_or_else(|| missing(field))
}

fn index_field(payload: &Value) -> Result<u8, LedgerError> {
    let index = u64_field(payload, "index")?;
    u8::try_from(index).map_err(|_| LedgerError::Malformed(format!("index {} out of range", index)))
}

fn status_field(payload: &Value) -> Result<StatusCode, LedgerError> {
    let code = u64_field(payload, "status")?;
    u8::try_from(code)
        .map_err(|_| format!("unknown flight status code {}", code))
        .and_then(StatusCode::try_from)
        .map_err(LedgerError::Malformed)
}
