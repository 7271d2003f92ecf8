//! JSON-RPC 2.0 ledger gateway client

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::{parse, EventPage, LedgerClient, RawEvent, StreamPosition};
use crate::config::GasLimits;
use crate::error::LedgerError;
use crate::models::{EventKind, OracleIdentity, OracleResponse, TxReceipt};

#[derive(Clone)]
pub struct RpcLedgerClient {
    rpc_url: String,
    contract_id: String,
    gas: GasLimits,
    http: Client,
}

impl RpcLedgerClient {
    pub fn new(rpc_url: impl Into<String>, contract_id: impl Into<String>, gas: GasLimits) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            contract_id: contract_id.into(),
            gas,
            http: Client::new(),
        }
    }

    /// Events without a contract id are trusted to match the `contractIds` filter.
    fn emitted_by_contract(&self, event: &RawEvent) -> bool {
        event.contract_id.is_empty() || event.contract_id.eq_ignore_ascii_case(&self.contract_id)
    }

    /// Send one request; a JSON-RPC `error` object is reported as a rejection of `operation`.
    async fn rpc_call(
        &self,
        operation: &'static str,
        method: &str,
        params: Value,
    ) -> Result<Value, LedgerError> {
        let response = self
            .http
            .post(&self.rpc_url)
            .json(&json!({
                "jsonrpc": "2.0",
                "id": "flight-oracle-server",
                "method": method,
                "params": params,
            }))
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;

        if let Some(err) = response.get("error") {
            let reason = err
                .get("message")
                .and_then(Value::as_str)
                .map(ToString::to_string)
                .unwrap_or_else(|| err.to_string());
            return Err(LedgerError::Rejected { operation, reason });
        }

        response
            .get("result")
            .cloned()
            .ok_or_else(|| LedgerError::Malformed(format!("{} response has no result", method)))
    }

    async fn invoke_contract(
        &self,
        function: &'static str,
        from: &OracleIdentity,
        args: Value,
        value_wei: u128,
        gas: u64,
    ) -> Result<TxReceipt, LedgerError> {
        let result = self
            .rpc_call(
                function,
                "invokeContract",
                json!({
                    "contractId": self.contract_id,
                    "function": function,
                    "args": args,
                    "from": from,
                    // wei amounts overflow JSON numbers, send as decimal string
                    "value": value_wei.to_string(),
                    "gas": gas,
                }),
            )
            .await?;

        let hash = result
            .get("hash")
            .and_then(Value::as_str)
            .or_else(|| result.as_str())
            .ok_or_else(|| LedgerError::Malformed(format!("{} returned no transaction hash", function)))?;

        debug!(function, from = %from, tx_hash = hash, "contract invocation accepted");

        Ok(TxReceipt {
            hash: hash.to_string(),
        })
    }
}

#[async_trait]
impl LedgerClient for RpcLedgerClient {
    async fn accounts(&self) -> Result<Vec<OracleIdentity>, LedgerError> {
        let result = self.rpc_call("getAccounts", "getAccounts", json!({})).await?;
        let accounts = result
            .as_array()
            .ok_or_else(|| LedgerError::Malformed("getAccounts result is not a list".into()))?;

        accounts
            .iter()
            .map(|account| {
                account
                    .as_str()
                    .map(OracleIdentity::new)
                    .ok_or_else(|| LedgerError::Malformed(format!("invalid account {}", account)))
            })
            .collect()
    }

    async fn register_oracle(
        &self,
        oracle: &OracleIdentity,
        fee_wei: u128,
    ) -> Result<TxReceipt, LedgerError> {
        self.invoke_contract("registerOracle", oracle, json!([]), fee_wei, self.gas.register)
            .await
    }

    async fn get_my_indexes(&self, oracle: &OracleIdentity) -> Result<Vec<u64>, LedgerError> {
        let result = self
            .rpc_call(
                "getMyIndexes",
                "callContract",
                json!({
                    "contractId": self.contract_id,
                    "function": "getMyIndexes",
                    "args": [],
                    "from": oracle,
                    "gas": self.gas.query,
                }),
            )
            .await?;

        let values = result
            .as_array()
            .ok_or_else(|| LedgerError::Malformed("getMyIndexes result is not a list".into()))?;

        values
            .iter()
            .map(|value| {
                parse::as_u64(value)
                    .ok_or_else(|| LedgerError::Malformed(format!("invalid index {}", value)))
            })
            .collect()
    }

    async fn submit_oracle_response(
        &self,
        oracle: &OracleIdentity,
        response: &OracleResponse,
    ) -> Result<TxReceipt, LedgerError> {
        let args = json!([
            response.index,
            response.airline,
            response.flight_number,
            response.timestamp,
            response.status_code,
        ]);
        self.invoke_contract("submitOracleResponse", oracle, args, 0, self.gas.submit)
            .await
    }

    async fn fetch_events(
        &self,
        kind: EventKind,
        position: &StreamPosition,
        limit: u32,
    ) -> Result<EventPage, LedgerError> {
        let (start_ledger, cursor) = match position {
            StreamPosition::FromLedger(ledger) => (json!(ledger), Value::Null),
            StreamPosition::After(cursor) => (Value::Null, json!(cursor)),
        };

        let result = self
            .rpc_call(
                "getEvents",
                "getEvents",
                json!({
                    "startLedger": start_ledger,
                    "filters": [{
                        "type": "contract",
                        "contractIds": [self.contract_id],
                        "topics": [[kind.name()]],
                    }],
                    "pagination": {
                        "cursor": cursor,
                        "limit": limit,
                    },
                }),
            )
            .await?;

        let events: Vec<RawEvent> = result
            .pointer("/events")
            .and_then(Value::as_array)
            .map(|events| events.iter().filter_map(parse::raw_event).collect())
            .unwrap_or_default();

        // the cursor moves past foreign events too
        let cursor = result
            .pointer("/cursor")
            .and_then(Value::as_str)
            .filter(|cursor| !cursor.is_empty())
            .map(ToString::to_string)
            .or_else(|| events.last().and_then(|event| event.id.clone()));

        let events = events
            .into_iter()
            .filter(|event| {
                let ours = self.emitted_by_contract(event);
                if !ours {
                    warn!(
                        stream = %kind,
                        event_id = ?event.id,
                        contract = %event.contract_id,
                        "ignoring event from another contract"
                    );
                }
                ours
            })
            .collect();

        Ok(EventPage { events, cursor })
    }
}
