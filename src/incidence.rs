use std::cell::RefCell;
use std::ffi::OsStr;
use std::fs::{create_dir_all, File};
use std::path::Path;

use csv::Writer;
use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::define_data_plugin;
use crate::error::ZssnError;

/// One row of the incidence output: a survivor that just became infected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidenceRecord {
    pub survivor_id: usize,
    pub name: String,
    pub report_count: usize,
}

struct IncidenceData {
    writer: RefCell<Option<Writer<File>>>,
}

define_data_plugin!(
    IncidencePlugin,
    IncidenceData,
    IncidenceData {
        writer: RefCell::new(None),
    }
);

// Creates the file and all parent directories if they do not exist.
fn generate_validate_filepath(path: &Path) -> Result<File, ZssnError> {
    match path.extension().and_then(OsStr::to_str) {
        Some("csv") => {
            if let Some(parent) = path.parent() {
                create_dir_all(parent)?;
            }
            Ok(File::create(path)?)
        }
        _ => Err(ZssnError::ConfigError(format!(
            "incidence output must be a CSV file, got {}",
            path.display()
        ))),
    }
}

pub trait ContextIncidenceExt {
    /// Directs infection events to a CSV file at `path`, replacing any earlier output.
    ///
    /// # Errors
    /// Returns a `ZssnError` if `path` is not a `.csv` path or cannot be created.
    fn add_incidence_output(&mut self, path: &Path) -> Result<(), ZssnError>;

    /// Appends a row to the incidence output. Does nothing if no output was added.
    ///
    /// # Errors
    /// Returns a `ZssnError` if the row cannot be written.
    fn record_incidence(&self, record: &IncidenceRecord) -> Result<(), ZssnError>;
}

impl ContextIncidenceExt for Context {
    fn add_incidence_output(&mut self, path: &Path) -> Result<(), ZssnError> {
        let file = generate_validate_filepath(path)?;
        let data_container = self.get_data_mut(IncidencePlugin);
        data_container.writer.replace(Some(Writer::from_writer(file)));
        Ok(())
    }

    fn record_incidence(&self, record: &IncidenceRecord) -> Result<(), ZssnError> {
        // No data container exists if no output has been added
        let Some(data_container) = self.get_data(IncidencePlugin) else {
            return Ok(());
        };
        let mut writer = data_container.writer.borrow_mut();
        if let Some(writer) = writer.as_mut() {
            writer.serialize(record)?;
            writer.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn add_and_record_incidence() {
        let mut context = Context::new();
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("incidence.csv");
        context.add_incidence_output(&path).unwrap();

        let record = IncidenceRecord {
            survivor_id: 3,
            name: "Ann".to_string(),
            report_count: 3,
        };
        context.record_incidence(&record).unwrap();

        assert!(path.exists(), "CSV file should exist");
        let mut reader = csv::Reader::from_path(&path).unwrap();
        let records: Vec<IncidenceRecord> =
            reader.deserialize().collect::<Result<_, _>>().unwrap();
        assert_eq!(records, vec![record]);
    }

    #[test]
    fn recording_without_output_is_a_no_op() {
        let context = Context::new();
        let record = IncidenceRecord {
            survivor_id: 0,
            name: "Ann".to_string(),
            report_count: 3,
        };
        assert!(context.record_incidence(&record).is_ok());
    }

    #[test]
    fn non_csv_output_is_rejected() {
        let mut context = Context::new();
        let temp_dir = tempdir().unwrap();
        let result = context.add_incidence_output(&temp_dir.path().join("incidence.txt"));
        assert!(matches!(result, Err(ZssnError::ConfigError(_))));
    }
}
