use std::fmt::{self, Debug, Display};
use std::io;

use crate::inventory::InventoryId;
use crate::survivors::SurvivorId;

/// Provides `ZssnError` and maps other errors to it.
///
/// Every rule violation is request scoped: the operation that returns it has left the ledger in
/// its pre-request state. Use [`ZssnError::is_client_error`] to tell rule violations apart from
/// store and plumbing failures.
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub enum ZssnError {
    IoError(io::Error),
    JsonError(serde_json::Error),
    CsvError(csv::Error),
    ConfigError(String),
    /// Malformed or out-of-range input, detected before any mutation.
    ValidationError(String),
    NotFound {
        entity: &'static str,
        id: usize,
    },
    /// The survivor exists but is infected and therefore opaque.
    InfectedAccess(SurvivorId),
    InfectedParty(SurvivorId),
    SelfReport(SurvivorId),
    ReporterInfected(SurvivorId),
    DuplicateReport {
        reporter: SurvivorId,
        reported: SurvivorId,
    },
    SameSurvivor(SurvivorId),
    UnbalancedTrade {
        first: u64,
        second: u64,
    },
    InsufficientInventory(InventoryId),
    EmptyFleet,
    ZssnError(String),
}

impl ZssnError {
    /// The machine-readable kind reported to clients alongside the message.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            ZssnError::IoError(_) => "io_error",
            ZssnError::JsonError(_) => "json_error",
            ZssnError::CsvError(_) => "csv_error",
            ZssnError::ConfigError(_) => "config_error",
            ZssnError::ValidationError(_) => "validation_error",
            ZssnError::NotFound { .. } => "not_found",
            ZssnError::InfectedAccess(_) => "infected_access",
            ZssnError::InfectedParty(_) => "infected_party",
            ZssnError::SelfReport(_) => "self_report",
            ZssnError::ReporterInfected(_) => "reporter_infected",
            ZssnError::DuplicateReport { .. } => "duplicate_report",
            ZssnError::SameSurvivor(_) => "same_survivor",
            ZssnError::UnbalancedTrade { .. } => "unbalanced_trade",
            ZssnError::InsufficientInventory(_) => "insufficient_inventory",
            ZssnError::EmptyFleet => "empty_fleet",
            ZssnError::ZssnError(_) => "internal_error",
        }
    }

    /// True for rule violations and bad input; false for store and plumbing failures.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            ZssnError::IoError(_)
                | ZssnError::JsonError(_)
                | ZssnError::CsvError(_)
                | ZssnError::ConfigError(_)
                | ZssnError::ZssnError(_)
        )
    }
}

impl From<io::Error> for ZssnError {
    fn from(error: io::Error) -> Self {
        ZssnError::IoError(error)
    }
}

impl From<serde_json::Error> for ZssnError {
    fn from(error: serde_json::Error) -> Self {
        ZssnError::JsonError(error)
    }
}

impl From<csv::Error> for ZssnError {
    fn from(error: csv::Error) -> Self {
        ZssnError::CsvError(error)
    }
}

impl From<String> for ZssnError {
    fn from(error: String) -> Self {
        ZssnError::ZssnError(error)
    }
}

impl From<&str> for ZssnError {
    fn from(error: &str) -> Self {
        ZssnError::ZssnError(error.to_string())
    }
}

impl std::error::Error for ZssnError {}

impl Display for ZssnError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ZssnError::IoError(error) => write!(f, "I/O error: {error}"),
            ZssnError::JsonError(error) => write!(f, "JSON error: {error}"),
            ZssnError::CsvError(error) => write!(f, "CSV error: {error}"),
            ZssnError::ConfigError(msg) => write!(f, "Configuration error: {msg}"),
            ZssnError::ValidationError(msg) => write!(f, "Invalid input: {msg}"),
            ZssnError::NotFound { entity, id } => write!(f, "No {entity} with id {id}"),
            ZssnError::InfectedAccess(id) => write!(f, "Selected survivor {id} is infected"),
            ZssnError::InfectedParty(id) => {
                write!(f, "One of the trading parties ({id}) is infected")
            }
            ZssnError::SelfReport(id) => write!(f, "Survivor {id} cannot report themselves"),
            ZssnError::ReporterInfected(id) => {
                write!(f, "Survivor {id} is infected and cannot file reports")
            }
            ZssnError::DuplicateReport { reporter, reported } => {
                write!(f, "Survivor {reporter} has already reported survivor {reported}")
            }
            ZssnError::SameSurvivor(id) => {
                write!(f, "Trade must be between different survivors, got {id} twice")
            }
            ZssnError::UnbalancedTrade { first, second } => write!(
                f,
                "Both parties must trade an equal amount of points ({first} != {second})"
            ),
            ZssnError::InsufficientInventory(id) => {
                write!(f, "Inventory {id} does not hold enough supplies for this trade")
            }
            ZssnError::EmptyFleet => write!(f, "No survivors"),
            ZssnError::ZssnError(msg) => write!(f, "Error: {msg}"),
        }
    }
}
