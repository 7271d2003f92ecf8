use serde::{Deserialize, Serialize};
use std::fmt;

/// Ledger account acting as an oracle. Supplied externally, never created here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OracleIdentity(String);

impl OracleIdentity {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }
}

impl fmt::Display for OracleIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OracleIdentity {
    fn from(address: &str) -> Self {
        Self::new(address)
    }
}

/// Number of indexes the ledger hands out per oracle.
pub const INDEXES_PER_ORACLE: usize = 3;

/// The three indexes the ledger assigned to an oracle at registration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndexAssignment([u8; INDEXES_PER_ORACLE]);

impl IndexAssignment {
    pub fn new(indexes: [u8; INDEXES_PER_ORACLE]) -> Self {
        Self(indexes)
    }

    /// Build an assignment from raw ledger values, rejecting anything that is not
    /// exactly three values in `0..=max_index`.
    pub fn from_ledger_values(values: &[u64], max_index: u8) -> Result<Self, String> {
        if values.len() != INDEXES_PER_ORACLE {
            return Err(format!(
                "expected {} indexes, ledger returned {}",
                INDEXES_PER_ORACLE,
                values.len()
            ));
        }

        let mut indexes = [0u8; INDEXES_PER_ORACLE];
        for (slot, value) in indexes.iter_mut().zip(values) {
            *slot = u8::try_from(*value)
                .ok()
                .filter(|index| *index <= max_index)
                .ok_or_else(|| format!("index {} outside 0..={}", value, max_index))?;
        }

        Ok(Self(indexes))
    }

    pub fn contains(&self, index: u8) -> bool {
        self.0.contains(&index)
    }

    pub fn indexes(&self) -> [u8; INDEXES_PER_ORACLE] {
        self.0
    }
}

impl fmt::Display for IndexAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.0[0], self.0[1], self.0[2])
    }
}

/// Flight status reported by an oracle. Wire value is the numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum StatusCode {
    Unknown,
    OnTime,
    LateAirline,
    LateWeather,
    LateTechnical,
    LateOther,
}

impl StatusCode {
    pub const ALL: [StatusCode; 6] = [
        StatusCode::Unknown,
        StatusCode::OnTime,
        StatusCode::LateAirline,
        StatusCode::LateWeather,
        StatusCode::LateTechnical,
        StatusCode::LateOther,
    ];

    pub fn code(self) -> u8 {
        match self {
            StatusCode::Unknown => 0,
            StatusCode::OnTime => 10,
            StatusCode::LateAirline => 20,
            StatusCode::LateWeather => 30,
            StatusCode::LateTechnical => 40,
            StatusCode::LateOther => 50,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            StatusCode::Unknown => "unknown",
            StatusCode::OnTime => "on time",
            StatusCode::LateAirline => "late (airline)",
            StatusCode::LateWeather => "late (weather)",
            StatusCode::LateTechnical => "late (technical)",
            StatusCode::LateOther => "late (other)",
        }
    }
}

impl From<StatusCode> for u8 {
    fn from(status: StatusCode) -> Self {
        status.code()
    }
}

impl TryFrom<u8> for StatusCode {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        StatusCode::ALL
            .into_iter()
            .find(|status| status.code() == code)
            .ok_or_else(|| format!("unknown flight status code {}", code))
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code(), self.name())
    }
}

/// Response a single oracle submits for a status request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OracleResponse {
    pub index: u8,
    pub airline: String,
    pub flight_number: String,
    pub timestamp: u64,
    pub status_code: StatusCode,
}

/// Transaction acknowledgement returned by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub hash: String,
}
