//! Backend for builds without the `logging` feature: levels are tracked, nothing is printed.
use crate::log::LogSettings;

impl LogSettings {
    pub(super) fn apply(&mut self) {
        log::set_max_level(self.level);
    }
}
