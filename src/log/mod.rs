//! Diagnostic logging for the ledger server. Not to be confused with the incidence output (see
//! [`crate::incidence`]), which is data: one CSV row per infection.
//!
//! The five `log` macros are re-exported here and at the crate root. The engines follow one
//! convention: a rejected operation is logged at `debug`, a committed mutation at `info`, and
//! transaction plumbing at `trace`.
//!
//! Nothing is printed until a level is chosen. The `zssn` binary takes `--log-level`; embedders
//! call [`set_log_level`] and narrow things down per module:
//!
//! ```rust
//! use zssn::log::{set_log_level, set_module_filter, LevelFilter};
//!
//! set_log_level(LevelFilter::Info);
//! // Follow every rejected trade, but not the transaction chatter.
//! set_module_filter("zssn::trade", LevelFilter::Debug);
//! set_module_filter("zssn::ledger", LevelFilter::Off);
//! ```
#[cfg(feature = "logging")]
mod standard_logger;

#[cfg(not(feature = "logging"))]
mod null_logger;

use std::sync::{LazyLock, Mutex, MutexGuard, PoisonError};

pub use log::{debug, error, info, trace, warn, LevelFilter};
#[cfg(feature = "logging")]
use log4rs::Handle;

use crate::{HashMap, HashMapExt};

/// Targets that stay quiet unless a filter says otherwise. The web server's I/O stack logs every
/// socket event.
const QUIET_TARGETS: [&str; 2] = ["mio", "hyper"];

static LOGGING: LazyLock<Mutex<LogSettings>> = LazyLock::new(|| Mutex::new(LogSettings::new()));

/// The levels currently in force. There is one global logger, so there is one of these.
#[derive(Debug)]
struct LogSettings {
    /// Applies to every target without an entry in `module_levels`.
    level: LevelFilter,
    module_levels: HashMap<String, LevelFilter>,

    #[cfg(feature = "logging")]
    handle: Option<Handle>,
}

impl LogSettings {
    fn new() -> LogSettings {
        let mut module_levels = HashMap::new();
        for target in QUIET_TARGETS {
            module_levels.insert(target.to_string(), LevelFilter::Off);
        }
        LogSettings {
            level: LevelFilter::Off,
            module_levels,

            #[cfg(feature = "logging")]
            handle: None,
        }
    }
}

fn settings() -> MutexGuard<'static, LogSettings> {
    // A panic while holding the lock leaves the settings intact.
    LOGGING.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Logs everything, `LevelFilter::Trace`.
pub fn enable_logging() {
    set_log_level(LevelFilter::Trace);
}

/// Silences everything without a module filter, `LevelFilter::Off`.
pub fn disable_logging() {
    set_log_level(LevelFilter::Off);
}

/// Sets the level for every target without a module filter. `LevelFilter::Off` silences them.
pub fn set_log_level(level: LevelFilter) {
    let mut settings = settings();
    settings.level = level;
    settings.apply();
}

/// Overrides the level for one module path, e.g. `"zssn::infection"`.
pub fn set_module_filter(module: &str, level: LevelFilter) {
    let mut settings = settings();
    if settings.module_levels.insert(module.to_string(), level) != Some(level) {
        settings.apply();
    }
}

/// Overrides several module paths at once, reconfiguring the logger once.
pub fn set_module_filters(filters: &[(&str, LevelFilter)]) {
    let mut settings = settings();
    let mut changed = false;
    for &(module, level) in filters {
        changed |= settings.module_levels.insert(module.to_string(), level) != Some(level);
    }
    if changed {
        settings.apply();
    }
}

/// Drops the override for `module`; it follows the global level again.
pub fn remove_module_filter(module: &str) {
    let mut settings = settings();
    if settings.module_levels.remove(module).is_some() {
        settings.apply();
    }
}
