//! Oracle pool bootstrap.
//!
//! Registers each configured identity with the contract, one after the other,
//! and records the indexes the contract assigned. A failed identity is logged
//! and left out; bootstrap itself never fails.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::backoff::Backoff;
use crate::config::{ListenerConfig, OracleSelection};
use crate::error::{BootstrapError, LedgerError, RegistryError};
use crate::ledger::LedgerClient;
use crate::models::{IndexAssignment, OracleIdentity};
use crate::registry::AccountRegistry;

#[derive(Debug)]
pub struct SkippedOracle {
    pub oracle: OracleIdentity,
    pub reason: BootstrapError,
}

#[derive(Debug)]
pub struct BootstrapReport {
    pub registry: AccountRegistry,
    pub skipped: Vec<SkippedOracle>,
}

pub struct OracleBootstrapper {
    ledger: Arc<dyn LedgerClient>,
    fee_wei: u128,
    max_index: u8,
}

impl OracleBootstrapper {
    pub fn new(ledger: Arc<dyn LedgerClient>, fee_wei: u128, max_index: u8) -> Self {
        Self {
            ledger,
            fee_wei,
            max_index,
        }
    }

    /// Register `identities` in order and collect their assignments. Stops
    /// early, leaving the remaining identities out, once `shutdown` fires.
    pub async fn bootstrap(
        &self,
        identities: &[OracleIdentity],
        shutdown: &CancellationToken,
    ) -> BootstrapReport {
        let mut registry = AccountRegistry::new();
        let mut skipped = Vec::new();

        for (position, oracle) in identities.iter().enumerate() {
            let registered = tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    info!(
                        remaining = identities.len() - position,
                        "oracle bootstrap interrupted by shutdown"
                    );
                    break;
                }
                registered = self.register_one(&mut registry, oracle) => registered,
            };
            match registered {
                Ok(assignment) => {
                    info!(oracle = %oracle, indexes = %assignment, "registered oracle");
                }
                Err(reason) => {
                    warn!(oracle = %oracle, error = %reason, "skipping oracle");
                    skipped.push(SkippedOracle {
                        oracle: oracle.clone(),
                        reason,
                    });
                }
            }
        }

        info!(
            registered = registry.len(),
            skipped = skipped.len(),
            "oracle bootstrap complete"
        );

        BootstrapReport { registry, skipped }
    }

    async fn register_one(
        &self,
        registry: &mut AccountRegistry,
        oracle: &OracleIdentity,
    ) -> Result<IndexAssignment, BootstrapError> {
        // Listed twice: the contract would revert anyway, don't pay for it.
        if registry.contains(oracle) {
            return Err(RegistryError::DuplicateRegistration(oracle.clone()).into());
        }

        self.ledger.register_oracle(oracle, self.fee_wei).await?;

        let values = self.ledger.get_my_indexes(oracle).await?;
        let assignment = IndexAssignment::from_ledger_values(&values, self.max_index)
            .map_err(LedgerError::Malformed)?;

        registry.register(oracle.clone(), assignment)?;
        Ok(assignment)
    }
}

/// Turn the configured selection into the ordered list of oracle identities.
pub async fn resolve_pool(
    ledger: &dyn LedgerClient,
    selection: &OracleSelection,
) -> Result<Vec<OracleIdentity>, LedgerError> {
    match selection {
        OracleSelection::Explicit(identities) => Ok(identities.clone()),
        OracleSelection::Range { offset, count } => {
            let accounts = ledger.accounts().await?;
            if accounts.len() < offset.saturating_add(*count) {
                warn!(
                    available = accounts.len(),
                    offset, count, "ledger exposes fewer accounts than configured"
                );
            }
            Ok(accounts.into_iter().skip(*offset).take(*count).collect())
        }
    }
}

/// [`resolve_pool`], retried with backoff until it succeeds or `shutdown` fires.
pub async fn resolve_pool_with_retry(
    ledger: &dyn LedgerClient,
    selection: &OracleSelection,
    settings: &ListenerConfig,
    shutdown: &CancellationToken,
) -> Option<Vec<OracleIdentity>> {
    let mut backoff = Backoff::new(settings.backoff_base, settings.backoff_max).with_jitter(0.2);
    loop {
        match resolve_pool(ledger, selection).await {
            Ok(pool) => return Some(pool),
            Err(err) => {
                let delay = backoff.next_delay();
                error!(
                    error = %err,
                    attempt = backoff.attempts(),
                    retry_in_ms = delay.as_millis() as u64,
                    "failed to list ledger accounts"
                );
                tokio::select! {
                    _ = shutdown.cancelled() => return None,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    }
}
