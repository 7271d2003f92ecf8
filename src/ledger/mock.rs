//! Scripted in-memory ledger used by unit tests.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use super::{EventPage, LedgerClient, StreamPosition};
use crate::error::LedgerError;
use crate::models::{EventKind, OracleIdentity, OracleResponse, TxReceipt};

pub(crate) const MIN_FEE_WEI: u128 = 1_000_000_000_000_000_000;

#[derive(Default)]
pub(crate) struct MockLedger {
    accounts: Vec<OracleIdentity>,
    assignments: HashMap<OracleIdentity, Vec<u64>>,
    unreachable: HashSet<OracleIdentity>,
    reject_submissions: HashSet<OracleIdentity>,
    stalled_submissions: HashSet<OracleIdentity>,
    fetch_panics: Mutex<HashMap<EventKind, usize>>,
    registered: Mutex<HashSet<OracleIdentity>>,
    submissions: Mutex<Vec<(OracleIdentity, OracleResponse)>>,
    pages: Mutex<HashMap<EventKind, VecDeque<Result<EventPage, LedgerError>>>>,
    fetches: Mutex<Vec<(EventKind, StreamPosition)>>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_accounts(mut self, accounts: Vec<OracleIdentity>) -> Self {
        self.accounts = accounts;
        self
    }

    /// Indexes the ledger will hand out to `oracle` once registered.
    pub fn with_assignment(mut self, oracle: &OracleIdentity, indexes: Vec<u64>) -> Self {
        self.assignments.insert(oracle.clone(), indexes);
        self
    }

    /// Calls from `oracle` fail with a transport error.
    pub fn with_unreachable(mut self, oracle: &OracleIdentity) -> Self {
        self.unreachable.insert(oracle.clone());
        self
    }

    /// Submissions from `oracle` are reverted by the contract.
    pub fn rejecting_submissions_from(mut self, oracle: &OracleIdentity) -> Self {
        self.reject_submissions.insert(oracle.clone());
        self
    }

    /// Submissions from `oracle` never complete.
    pub fn stalling_submissions_from(mut self, oracle: &OracleIdentity) -> Self {
        self.stalled_submissions.insert(oracle.clone());
        self
    }

    /// The next `times` fetches of `kind` panic before returning a page.
    pub fn panicking_on_fetch(self, kind: EventKind, times: usize) -> Self {
        self.fetch_panics.lock().unwrap().insert(kind, times);
        self
    }

    pub fn with_registered(self, oracle: &OracleIdentity) -> Self {
        self.registered.lock().unwrap().insert(oracle.clone());
        self
    }

    pub fn push_page(&self, kind: EventKind, page: Result<EventPage, LedgerError>) {
        self.pages
            .lock()
            .unwrap()
            .entry(kind)
            .or_default()
            .push_back(page);
    }

    pub fn submissions(&self) -> Vec<(OracleIdentity, OracleResponse)> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn fetches(&self, kind: EventKind) -> Vec<StreamPosition> {
        self.fetches
            .lock()
            .unwrap()
            .iter()
            .filter(|(fetched, _)| *fetched == kind)
            .map(|(_, position)| position.clone())
            .collect()
    }

    fn check_reachable(&self, oracle: &OracleIdentity) -> Result<(), LedgerError> {
        if self.unreachable.contains(oracle) {
            return Err(LedgerError::Transport(format!("connection reset for {}", oracle)));
        }
        Ok(())
    }
}

fn revert(operation: &'static str, reason: &str) -> LedgerError {
    LedgerError::Rejected {
        operation,
        reason: reason.to_string(),
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn accounts(&self) -> Result<Vec<OracleIdentity>, LedgerError> {
        Ok(self.accounts.clone())
    }

    async fn register_oracle(
        &self,
        oracle: &OracleIdentity,
        fee_wei: u128,
    ) -> Result<TxReceipt, LedgerError> {
        self.check_reachable(oracle)?;
        if fee_wei < MIN_FEE_WEI {
            return Err(revert("registerOracle", "Registration fee is required"));
        }
        if !self.registered.lock().unwrap().insert(oracle.clone()) {
            return Err(revert("registerOracle", "Oracle already registered"));
        }
        Ok(TxReceipt {
            hash: format!("0xregister-{}", oracle),
        })
    }

    async fn get_my_indexes(&self, oracle: &OracleIdentity) -> Result<Vec<u64>, LedgerError> {
        self.check_reachable(oracle)?;
        if !self.registered.lock().unwrap().contains(oracle) {
            return Err(revert("getMyIndexes", "Not registered as an oracle"));
        }
        Ok(self.assignments.get(oracle).cloned().unwrap_or_else(|| vec![0, 1, 2]))
    }

    async fn submit_oracle_response(
        &self,
        oracle: &OracleIdentity,
        response: &OracleResponse,
    ) -> Result<TxReceipt, LedgerError> {
        self.check_reachable(oracle)?;
        if self.stalled_submissions.contains(oracle) {
            std::future::pending::<()>().await;
        }
        if self.reject_submissions.contains(oracle) {
            return Err(revert(
                "submitOracleResponse",
                "Index does not match oracle request",
            ));
        }
        self.submissions
            .lock()
            .unwrap()
            .push((oracle.clone(), response.clone()));
        Ok(TxReceipt {
            hash: format!("0xsubmit-{}", oracle),
        })
    }

    async fn fetch_events(
        &self,
        kind: EventKind,
        position: &StreamPosition,
        _limit: u32,
    ) -> Result<EventPage, LedgerError> {
        self.fetches.lock().unwrap().push((kind, position.clone()));
        let panics = {
            let mut remaining = self.fetch_panics.lock().unwrap();
            match remaining.get_mut(&kind) {
                Some(left) if *left > 0 => {
                    *left -= 1;
                    true
                }
                _ => false,
            }
        };
        if panics {
            panic!("scripted {} fetch failure", kind);
        }
        self.pages
            .lock()
            .unwrap()
            .get_mut(&kind)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Ok(EventPage::default()))
    }
}
