use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::models::OracleIdentity;

/// One ether, the contract's registration fee.
pub const DEFAULT_REGISTRATION_FEE_WEI: u128 = 1_000_000_000_000_000_000;

/// Gas attached to each kind of contract call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GasLimits {
    pub register: u64,
    pub query: u64,
    pub submit: u64,
}

impl Default for GasLimits {
    fn default() -> Self {
        Self {
            register: 3_000_000,
            query: 1_000_000,
            submit: 3_000_000,
        }
    }
}

/// Which ledger accounts make up the oracle pool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OracleSelection {
    /// Exactly these identities, in this order
    Explicit(Vec<OracleIdentity>),
    /// `count` accounts of the node's account list starting at `offset`
    Range { offset: usize, count: usize },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListenerConfig {
    pub start_ledger: u64,
    pub poll_interval: Duration,
    pub page_limit: u32,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
    /// Events handled at once; further events wait in the stream buffer
    pub max_in_flight: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            start_ledger: 0,
            poll_interval: Duration::from_millis(2_000),
            page_limit: 100,
            backoff_base: Duration::from_millis(500),
            backoff_max: Duration::from_millis(30_000),
            max_in_flight: 16,
        }
    }
}

#[derive(Clone, Debug)]
pub struct OracleConfig {
    pub rpc_url: String,
    pub app_contract_address: String,
    pub selection: OracleSelection,
    pub registration_fee_wei: u128,
    pub gas: GasLimits,
    pub max_index: u8,
    pub listener: ListenerConfig,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

impl OracleConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Build the configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let app_contract_address =
            var("APP_CONTRACT_ADDRESS").ok_or(ConfigError::Missing("APP_CONTRACT_ADDRESS"))?;

        let selection = match var("ORACLE_ACCOUNTS") {
            Some(list) => OracleSelection::Explicit(
                list.split(',')
                    .map(str::trim)
                    .filter(|account| !account.is_empty())
                    .map(OracleIdentity::new)
                    .collect(),
            ),
            None => OracleSelection::Range {
                offset: parse_or(var("ORACLE_ACCOUNT_OFFSET"), "ORACLE_ACCOUNT_OFFSET", 10)?,
                count: parse_or(var("ORACLE_COUNT"), "ORACLE_COUNT", 20)?,
            },
        };

        let defaults = ListenerConfig::default();
        let listener = ListenerConfig {
            start_ledger: parse_or(var("EVENT_START_BLOCK"), "EVENT_START_BLOCK", 0)?,
            poll_interval: Duration::from_millis(parse_or(
                var("EVENT_POLL_INTERVAL_MS"),
                "EVENT_POLL_INTERVAL_MS",
                defaults.poll_interval.as_millis() as u64,
            )?),
            page_limit: parse_or(var("EVENT_PAGE_LIMIT"), "EVENT_PAGE_LIMIT", defaults.page_limit)?,
            backoff_base: Duration::from_millis(parse_or(
                var("RESUBSCRIBE_BASE_DELAY_MS"),
                "RESUBSCRIBE_BASE_DELAY_MS",
                defaults.backoff_base.as_millis() as u64,
            )?),
            backoff_max: Duration::from_millis(parse_or(
                var("RESUBSCRIBE_MAX_DELAY_MS"),
                "RESUBSCRIBE_MAX_DELAY_MS",
                defaults.backoff_max.as_millis() as u64,
            )?),
            max_in_flight: parse_or(
                var("MAX_IN_FLIGHT_EVENTS"),
                "MAX_IN_FLIGHT_EVENTS",
                defaults.max_in_flight,
            )?
            .max(1),
        };

        let gas_defaults = GasLimits::default();
        let gas = GasLimits {
            register: parse_or(var("REGISTER_GAS"), "REGISTER_GAS", gas_defaults.register)?,
            query: parse_or(var("QUERY_GAS"), "QUERY_GAS", gas_defaults.query)?,
            submit: parse_or(var("SUBMIT_GAS"), "SUBMIT_GAS", gas_defaults.submit)?,
        };

        Ok(Self {
            rpc_url: var("LEDGER_RPC_URL").unwrap_or_else(|| "http://127.0.0.1:8545".to_string()),
            app_contract_address,
            selection,
            registration_fee_wei: parse_or(
                var("ORACLE_REGISTRATION_FEE_WEI"),
                "ORACLE_REGISTRATION_FEE_WEI",
                DEFAULT_REGISTRATION_FEE_WEI,
            )?,
            gas,
            max_index: parse_or(var("MAX_ORACLE_INDEX"), "MAX_ORACLE_INDEX", 9)?,
            listener,
            port: parse_or(var("PORT"), "PORT", 3000)?,
            cors_allowed_origins: var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|| "http://localhost:8000".to_string())
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect(),
        })
    }
}

fn parse_or<T>(value: Option<String>, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|err: T::Err| ConfigError::Invalid {
            var: name,
            value: raw.clone(),
            reason: err.to_string(),
        }),
    }
}
