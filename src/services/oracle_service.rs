//! Oracle response fan-out.
//!
//! [`OracleService`] owns the frozen account registry and answers contract
//! events. For an `OracleRequest` it submits one response per oracle holding
//! the requested index, each on its own task. A failed submission is logged
//! and never touches its siblings; nothing is retried and quorum is left to
//! the contract.

use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::status_generator;
use crate::error::LedgerError;
use crate::event_listener::EventHandler;
use crate::ledger::{parse, LedgerClient};
use crate::models::{
    EventPayload, FlightStatusInfo, LedgerEvent, OracleIdentity, OracleReport, OracleRequest,
    OracleResponse, TxReceipt,
};
use crate::registry::AccountRegistry;

/// How many fanned-out event ids are remembered for replay suppression.
pub const DEFAULT_SEEN_EVENTS: usize = 1024;

/// Outcome of a single oracle's submission.
#[derive(Debug)]
pub struct SubmissionOutcome {
    pub oracle: OracleIdentity,
    pub response: OracleResponse,
    pub result: Result<TxReceipt, LedgerError>,
}

/// Every submission attempted for one status request.
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub outcomes: Vec<SubmissionOutcome>,
}

impl DispatchReport {
    pub fn accepted(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn rejected(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(&o.result, Err(err) if err.is_rejection()))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.accepted() - self.rejected()
    }
}

/// Bounded FIFO of recently dispatched event ids.
struct SeenEvents {
    capacity: usize,
    order: VecDeque<String>,
    ids: HashSet<String>,
}

impl SeenEvents {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            order: VecDeque::new(),
            ids: HashSet::new(),
        }
    }

    /// Returns false if `id` was already recorded.
    fn insert(&mut self, id: &str) -> bool {
        if self.capacity == 0 {
            return true;
        }
        if !self.ids.insert(id.to_string()) {
            return false;
        }
        self.order.push_back(id.to_string());
        while self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.ids.remove(&evicted);
            }
        }
        true
    }
}

pub struct OracleService {
    registry: Arc<AccountRegistry>,
    ledger: Arc<dyn LedgerClient>,
    seen: Mutex<SeenEvents>,
}

impl OracleService {
    pub fn new(registry: Arc<AccountRegistry>, ledger: Arc<dyn LedgerClient>) -> Self {
        Self::with_seen_capacity(registry, ledger, DEFAULT_SEEN_EVENTS)
    }

    pub fn with_seen_capacity(
        registry: Arc<AccountRegistry>,
        ledger: Arc<dyn LedgerClient>,
        capacity: usize,
    ) -> Self {
        Self {
            registry,
            ledger,
            seen: Mutex::new(SeenEvents::new(capacity)),
        }
    }

    /// Fan `request` out to every oracle holding its index and wait for all of
    /// them. Returns `None` when `event_id` was already dispatched.
    pub async fn on_status_request(
        &self,
        event_id: Option<&str>,
        request: &OracleRequest,
    ) -> Option<DispatchReport> {
        if let Some(id) = event_id {
            if !self.seen.lock().await.insert(id) {
                debug!(event_id = id, "oracle request already dispatched, skipping replay");
                return None;
            }
        }

        let oracles = self.registry.lookup_by_index(request.index);
        if oracles.is_empty() {
            info!(
                index = request.index,
                flight = %request.flight_number,
                "no registered oracle holds the requested index"
            );
            return Some(DispatchReport::default());
        }

        info!(
            index = request.index,
            airline = %request.airline,
            flight = %request.flight_number,
            timestamp = request.timestamp,
            oracles = oracles.len(),
            "dispatching oracle responses"
        );

        let mut submissions = JoinSet::new();
        for oracle in oracles {
            let ledger = Arc::clone(&self.ledger);
            let response = OracleResponse {
                index: request.index,
                airline: request.airline.clone(),
                flight_number: request.flight_number.clone(),
                timestamp: request.timestamp,
                status_code: status_generator::generate(),
            };
            submissions.spawn(async move {
                let result = ledger.submit_oracle_response(&oracle, &response).await;
                SubmissionOutcome {
                    oracle,
                    response,
                    result,
                }
            });
        }

        let mut report = DispatchReport::default();
        while let Some(joined) = submissions.join_next().await {
            match joined {
                Ok(outcome) => {
                    log_outcome(&outcome);
                    report.outcomes.push(outcome);
                }
                Err(join_error) => {
                    error!(error = %join_error, "oracle submission task aborted");
                }
            }
        }

        info!(
            index = request.index,
            flight = %request.flight_number,
            accepted = report.accepted(),
            rejected = report.rejected(),
            failed = report.failed(),
            "oracle responses dispatched"
        );

        Some(report)
    }
}

fn log_outcome(outcome: &SubmissionOutcome) {
    let status = outcome.response.status_code;
    match &outcome.result {
        Ok(receipt) => info!(
            oracle = %outcome.oracle,
            status = %status,
            tx_hash = %receipt.hash,
            "oracle response submitted"
        ),
        Err(err) if err.is_rejection() => warn!(
            oracle = %outcome.oracle,
            status = %status,
            error = %err,
            "oracle response rejected by contract"
        ),
        Err(err) => error!(
            oracle = %outcome.oracle,
            status = %status,
            error = %err,
            "oracle response submission failed"
        ),
    }
}

fn log_report(event: &LedgerEvent, report: &OracleReport) {
    info!(
        ledger = event.ledger,
        airline = %report.airline,
        flight = %parse::display_flight_number(&report.flight_number),
        timestamp = report.timestamp,
        index = ?report.index,
        status = ?report.status.map(|status| status.code()),
        "oracle report received"
    );
}

fn log_flight_status(event: &LedgerEvent, info: &FlightStatusInfo) {
    let departure = i64::try_from(info.timestamp)
        .ok()
        .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
        .map(|time| time.to_rfc3339())
        .unwrap_or_default();

    info!(
        ledger = event.ledger,
        airline = %info.airline,
        flight = %parse::display_flight_number(&info.flight_number),
        timestamp = info.timestamp,
        departure = %departure,
        status = %info.status,
        "flight status info received"
    );
}

#[async_trait]
impl EventHandler for OracleService {
    async fn handle(&self, event: LedgerEvent) {
        match &event.payload {
            EventPayload::OracleRequest(request) => {
                self.on_status_request(event.id.as_deref(), request).await;
            }
            EventPayload::OracleReport(report) => log_report(&event, report),
            EventPayload::FlightStatusInfo(info) => log_flight_status(&event, info),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::mock::MockLedger;
    use crate::models::{IndexAssignment, StatusCode};
    use std::time::Duration;

    fn oracle(n: usize) -> OracleIdentity {
        OracleIdentity::new(format!("0xoracle{:02}", n))
    }

    /// 30 oracles; only 0, 1 and 2 hold index 4.
    fn pool_of_thirty() -> AccountRegistry {
        let mut registry = AccountRegistry::new();
        for n in 0..30 {
            let indexes = match n {
                0 => [4, 1, 2],
                1 => [0, 4, 9],
                2 => [7, 8, 4],
                _ => [(n % 4) as u8, 5 + (n % 2) as u8, 9 - (n % 3) as u8],
            };
            registry
                .register(oracle(n), IndexAssignment::new(indexes))
                .unwrap();
        }
        registry
    }

    fn request() -> OracleRequest {
        OracleRequest {
            index: 4,
            airline: "0xairline".into(),
            flight_number: "UA8080".into(),
            timestamp: 1_111_111_111,
        }
    }

    #[tokio::test]
    async fn submits_once_per_matching_oracle() {
        let registry = Arc::new(pool_of_thirty());
        assert_eq!(registry.lookup_by_index(4).len(), 3);

        let ledger = Arc::new(MockLedger::new());
        let service = OracleService::new(registry, ledger.clone());

        let report = service.on_status_request(Some("evt-1"), &request()).await.unwrap();
        assert_eq!(report.accepted(), 3);

        let mut submitted: Vec<_> = ledger.submissions();
        submitted.sort_by(|a, b| a.0.cmp(&b.0));
        let oracles: Vec<_> = submitted.iter().map(|(o, _)| o.clone()).collect();
        assert_eq!(oracles, vec![oracle(0), oracle(1), oracle(2)]);

        for (_, response) in submitted {
            assert_eq!(response.index, 4);
            assert_eq!(response.airline, "0xairline");
            assert_eq!(response.flight_number, "UA8080");
            assert_eq!(response.timestamp, 1_111_111_111);
            assert!(StatusCode::ALL.contains(&response.status_code));
        }
    }

    #[tokio::test]
    async fn rejected_oracle_does_not_block_siblings() {
        let registry = Arc::new(pool_of_thirty());
        let ledger = Arc::new(
            MockLedger::new()
                .rejecting_submissions_from(&oracle(1))
                .with_unreachable(&oracle(2)),
        );
        let service = OracleService::new(registry, ledger.clone());

        let report = service.on_status_request(None, &request()).await.unwrap();

        assert_eq!(report.outcomes.len(), 3);
        assert_eq!(report.accepted(), 1);
        assert_eq!(report.rejected(), 1);
        assert_eq!(report.failed(), 1);
        let submitted: Vec<_> = ledger.submissions().into_iter().map(|(o, _)| o).collect();
        assert_eq!(submitted, vec![oracle(0)]);
    }

    #[tokio::test]
    async fn rejection_of_middle_oracle_keeps_the_others() {
        let registry = Arc::new(pool_of_thirty());
        let ledger = Arc::new(MockLedger::new().rejecting_submissions_from(&oracle(1)));
        let service = OracleService::new(registry, ledger.clone());

        let report = service.on_status_request(None, &request()).await.unwrap();

        assert_eq!(report.accepted(), 2);
        assert_eq!(report.rejected(), 1);
        let mut submitted: Vec<_> = ledger.submissions().into_iter().map(|(o, _)| o).collect();
        submitted.sort();
        assert_eq!(submitted, vec![oracle(0), oracle(2)]);
    }

    #[tokio::test]
    async fn stalled_oracle_does_not_hold_up_the_others() {
        let ledger = Arc::new(MockLedger::new().stalling_submissions_from(&oracle(0)));
        let service = OracleService::new(Arc::new(pool_of_thirty()), ledger.clone());

        let dispatch = tokio::spawn(async move { service.on_status_request(None, &request()).await });

        tokio::time::timeout(Duration::from_secs(2), async {
            while ledger.submissions().len() < 2 {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .expect("siblings of a stalled oracle were not submitted");

        let mut submitted: Vec<_> = ledger.submissions().into_iter().map(|(o, _)| o).collect();
        submitted.sort();
        assert_eq!(submitted, vec![oracle(1), oracle(2)]);
        // the dispatch still waits on oracle 0
        assert!(!dispatch.is_finished());
        dispatch.abort();
    }

    #[tokio::test]
    async fn unmatched_index_submits_nothing() {
        let mut registry = AccountRegistry::new();
        registry
            .register(oracle(0), IndexAssignment::new([1, 2, 3]))
            .unwrap();
        let ledger = Arc::new(MockLedger::new());
        let service = OracleService::new(Arc::new(registry), ledger.clone());

        let report = service.on_status_request(Some("evt-9"), &request()).await.unwrap();

        assert!(report.outcomes.is_empty());
        assert!(ledger.submissions().is_empty());
    }

    #[tokio::test]
    async fn replayed_event_id_is_not_dispatched_again() {
        let ledger = Arc::new(MockLedger::new());
        let service = OracleService::new(Arc::new(pool_of_thirty()), ledger.clone());

        assert!(service.on_status_request(Some("evt-1"), &request()).await.is_some());
        assert!(service.on_status_request(Some("evt-1"), &request()).await.is_none());
        assert_eq!(ledger.submissions().len(), 3);

        // without an id every delivery fans out, bounded by the matching set
        service.on_status_request(None, &request()).await;
        service.on_status_request(None, &request()).await;
        assert_eq!(ledger.submissions().len(), 9);
    }

    #[tokio::test]
    async fn seen_ids_are_evicted_in_fifo_order() {
        let ledger = Arc::new(MockLedger::new());
        let service =
            OracleService::with_seen_capacity(Arc::new(pool_of_thirty()), ledger.clone(), 2);

        for id in ["a", "b", "c"] {
            assert!(service.on_status_request(Some(id), &request()).await.is_some());
        }
        // "a" fell out of the window, "c" is still remembered
        assert!(service.on_status_request(Some("a"), &request()).await.is_some());
        assert!(service.on_status_request(Some("c"), &request()).await.is_none());
    }

    #[tokio::test]
    async fn informational_events_submit_nothing() {
        let ledger = Arc::new(MockLedger::new());
        let service = OracleService::new(Arc::new(pool_of_thirty()), ledger.clone());

        service
            .handle(LedgerEvent {
                id: Some("evt-2".into()),
                ledger: 10,
                payload: EventPayload::FlightStatusInfo(FlightStatusInfo {
                    airline: "0xairline".into(),
                    flight_number: "UA8080".into(),
                    timestamp: 1_111_111_111,
                    status: StatusCode::LateAirline,
                }),
            })
            .await;
        service
            .handle(LedgerEvent {
                id: None,
                ledger: 10,
                payload: EventPayload::OracleReport(OracleReport {
                    index: Some(4),
                    airline: "0xairline".into(),
                    flight_number: "UA8080".into(),
                    timestamp: 1_111_111_111,
                    status: Some(StatusCode::LateAirline),
                }),
            })
            .await;

        assert!(ledger.submissions().is_empty());
    }
}
