//! log4rs backend: a single stderr appender, one log4rs `Logger` per module filter.
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::config::{Appender, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;
use log4rs::Config;

use crate::log::LogSettings;

// UTC timestamp, colored level, module path, message
const LOG_PATTERN: &str = "{d(%Y-%m-%dT%H:%M:%SZ)} {h({l})} {t} - {m}{n}";
const APPENDER: &str = "stderr";

impl LogSettings {
    /// Installs the logger on first use, and reconfigures it afterwards.
    pub(super) fn apply(&mut self) {
        let stderr = ConsoleAppender::builder()
            .target(Target::Stderr)
            .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
            .build();
        let loggers = self
            .module_levels
            .iter()
            .map(|(module, level)| Logger::builder().build(module.clone(), *level));
        let config = Config::builder()
            .appender(Appender::builder().build(APPENDER, Box::new(stderr)))
            .loggers(loggers)
            .build(Root::builder().appender(APPENDER).build(self.level));
        let config = match config {
            Ok(config) => config,
            Err(err) => {
                eprintln!("zssn: invalid log configuration: {err}");
                return;
            }
        };

        match &self.handle {
            Some(handle) => handle.set_config(config),
            None => match log4rs::init_config(config) {
                Ok(handle) => self.handle = Some(handle),
                Err(err) => eprintln!("zssn: could not install the logger: {err}"),
            },
        }
    }
}
