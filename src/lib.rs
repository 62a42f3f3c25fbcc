//! A ledger for survivors of an outbreak.
//!
//! The ledger tracks survivors, the supplies each of them holds, and the reports survivors file
//! against one another. Three rules govern it:
//! * a survivor reported by three others becomes infected, and stays infected;
//! * infected survivors can be listed and reported, but not read, moved or traded with;
//! * trades are atomic exchanges of equal point value between two healthy survivors.
//!
//! The central object is the [`Context`]. Modules keep their data in it and expose their
//! operations as extension traits:
//! * [`ContextSurvivorsExt`] registers, reads, moves and removes survivors.
//! * [`ContextInventoryExt`] reads inventories.
//! * [`ContextInfectionExt`] files reports and derives infection.
//! * [`ContextTradeExt`] executes trades.
//! * [`ContextFleetExt`] computes fleet-wide statistics.
//! * [`ContextWebApiExt`] serves all of the above over HTTP.
//!
//! Every mutation runs in a ledger [`Transaction`](ledger::Transaction), so a failed operation
//! leaves the ledger as it found it.
pub mod access;
pub mod config;
pub mod context;
pub mod error;
pub mod fleet;
pub mod global_properties;
pub mod hashing;
pub mod incidence;
pub mod infection;
pub mod inventory;
pub mod ledger;
pub mod log;
pub mod prelude;
pub mod runner;
pub mod survivors;
pub mod trade;
pub mod web_api;

pub use crate::config::{ContextConfigExt, PointWeights};
pub use crate::context::Context;
pub use crate::error::ZssnError;
pub use crate::fleet::{ContextFleetExt, FleetReport};
pub use crate::global_properties::ContextGlobalPropertiesExt;
pub use crate::hashing::{HashMap, HashMapExt};
pub use crate::incidence::ContextIncidenceExt;
pub use crate::infection::ContextInfectionExt;
pub use crate::inventory::ContextInventoryExt;
pub use crate::ledger::ContextLedgerExt;
pub use crate::log::{debug, error, info, trace, warn};
pub use crate::survivors::ContextSurvivorsExt;
pub use crate::trade::ContextTradeExt;
pub use crate::web_api::ContextWebApiExt;
