//! The infection engine. Reports are directed accusations between survivors; a survivor with
//! [`INFECTION_REPORT_THRESHOLD`] reports against them becomes infected, permanently.
//!
//! Filing a report and the resulting infection happen in one transaction: the report is
//! stored, the reports against the reported survivor are counted including the new one, and
//! the survivor is flipped if the threshold is reached.
use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::error::ZssnError;
use crate::incidence::{ContextIncidenceExt, IncidenceRecord};
use crate::ledger::ContextLedgerExt;
use crate::survivors::SurvivorId;
use crate::{debug, error, info};

/// Reports needed to infect a survivor.
pub const INFECTION_REPORT_THRESHOLD: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportId(usize);

impl ReportId {
    #[must_use]
    pub fn new(id: usize) -> Self {
        ReportId(id)
    }

    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for ReportId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub id: ReportId,
    pub reporter: SurvivorId,
    pub reported: SurvivorId,
}

/// A request to file a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewReport {
    #[serde(alias = "whoReported")]
    pub reporter: SurvivorId,
    #[serde(alias = "gotReported")]
    pub reported: SurvivorId,
}

/// The outcome of a filed report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiledReport {
    pub report: Report,
    /// Reports against the reported survivor, including this one.
    pub report_count: usize,
    /// Whether this report infected the reported survivor.
    pub infected: bool,
}

pub trait ContextInfectionExt {
    /// Files a report and infects the reported survivor if it reaches the threshold.
    ///
    /// # Errors
    /// - `ZssnError::SelfReport` if reporter and reported are the same survivor
    /// - `ZssnError::NotFound` if either survivor does not exist
    /// - `ZssnError::ReporterInfected` if the reporter is infected
    /// - `ZssnError::DuplicateReport` if the reporter already reported this survivor
    fn register_report(&mut self, report: NewReport) -> Result<FiledReport, ZssnError>;

    /// Every report, ordered by id.
    fn list_reports(&self) -> Vec<Report>;

    /// # Errors
    /// Returns a `ZssnError::NotFound` if there is no report `id`.
    fn get_report(&self, id: ReportId) -> Result<Report, ZssnError>;

    /// The number of reports filed against `survivor`.
    fn report_count(&self, survivor: SurvivorId) -> usize;
}

impl ContextInfectionExt for Context {
    fn register_report(&mut self, report: NewReport) -> Result<FiledReport, ZssnError> {
        let NewReport { reporter, reported } = report;
        if reporter == reported {
            return Err(ZssnError::SelfReport(reporter));
        }
        let filed = self.transaction(|tx| {
            let reporter_survivor = tx.survivor(reporter).ok_or(ZssnError::NotFound {
                entity: "survivor",
                id: reporter.index(),
            })?;
            let reporter_infected = reporter_survivor.is_infected();
            if tx.survivor(reported).is_none() {
                return Err(ZssnError::NotFound {
                    entity: "survivor",
                    id: reported.index(),
                });
            }
            if reporter_infected {
                return Err(ZssnError::ReporterInfected(reporter));
            }
            if tx.find_report(reporter, reported).is_some() {
                return Err(ZssnError::DuplicateReport { reporter, reported });
            }

            let report = tx.insert_report(reporter, reported);
            let report_count = tx.report_count_against(reported);
            let infected = report_count >= INFECTION_REPORT_THRESHOLD && tx.infect(reported)?;
            Ok(FiledReport {
                report,
                report_count,
                infected,
            })
        });

        let filed = match filed {
            Ok(filed) => filed,
            Err(err) => {
                debug!("Report {reporter} -> {reported} rejected: {err}");
                return Err(err);
            }
        };
        debug!(
            "Survivor {reporter} reported survivor {reported} ({} reports)",
            filed.report_count
        );
        if filed.infected {
            let name = self
                .ledger()
                .survivor(reported)
                .map(|survivor| survivor.name.clone())
                .unwrap_or_default();
            info!(
                "Survivor {reported} ({name}) is infected after {} reports",
                filed.report_count
            );
            let record = IncidenceRecord {
                survivor_id: reported.index(),
                name,
                report_count: filed.report_count,
            };
            // The infection is committed; a failed write must not undo it.
            if let Err(err) = self.record_incidence(&record) {
                error!("Failed to record infection of survivor {reported}: {err}");
            }
        }
        Ok(filed)
    }

    fn list_reports(&self) -> Vec<Report> {
        self.ledger().reports().cloned().collect()
    }

    fn get_report(&self, id: ReportId) -> Result<Report, ZssnError> {
        self.ledger()
            .report(id)
            .cloned()
            .ok_or(ZssnError::NotFound {
                entity: "report",
                id: id.index(),
            })
    }

    fn report_count(&self, survivor: SurvivorId) -> usize {
        self.ledger().report_count_against(survivor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::survivors::tests::{new_survivor, register_infected};
    use crate::survivors::{ContextSurvivorsExt, Location, Survivor};

    fn register(context: &mut Context, name: &str) -> Survivor {
        context.register_survivor(new_survivor(name)).unwrap().0
    }

    fn report(reporter: &Survivor, reported: &Survivor) -> NewReport {
        NewReport {
            reporter: reporter.id,
            reported: reported.id,
        }
    }

    #[test]
    fn third_report_infects() {
        let mut context = Context::new();
        let target = register(&mut context, "Target");
        let reporters: Vec<Survivor> = ["A", "B", "C"]
            .iter()
            .map(|name| register(&mut context, name))
            .collect();

        for (i, reporter) in reporters.iter().enumerate() {
            let filed = context.register_report(report(reporter, &target)).unwrap();
            assert_eq!(filed.report_count, i + 1);
            assert_eq!(filed.infected, i == 2);
            assert_eq!(context.ledger().survivor(target.id).unwrap().is_infected(), i == 2);
        }
        assert_eq!(context.report_count(target.id), 3);
    }

    #[test]
    fn infection_is_monotonic() {
        let mut context = Context::new();
        let target = register(&mut context, "Target");
        let reporters: Vec<Survivor> = ["A", "B", "C", "D"]
            .iter()
            .map(|name| register(&mut context, name))
            .collect();
        for reporter in &reporters[..3] {
            context.register_report(report(reporter, &target)).unwrap();
        }

        // A fourth report does not flip again; the survivor stays infected.
        let filed = context
            .register_report(report(&reporters[3], &target))
            .unwrap();
        assert!(!filed.infected);
        assert_eq!(filed.report_count, 4);

        // Removing a reporter drops their report but not the infection.
        context.remove_survivor(reporters[0].id).unwrap();
        assert_eq!(context.report_count(target.id), 3);
        context.remove_survivor(reporters[1].id).unwrap();
        let location = Location {
            latitude: 0.0,
            longitude: 0.0,
        };
        assert!(context.update_location(target.id, location).is_err());
        assert!(context.ledger().survivor(target.id).unwrap().is_infected());
    }

    #[test]
    fn duplicate_report_is_rejected() {
        let mut context = Context::new();
        let ann = register(&mut context, "Ann");
        let bob = register(&mut context, "Bob");
        context.register_report(report(&ann, &bob)).unwrap();
        let result = context.register_report(report(&ann, &bob));
        assert!(matches!(
            result,
            Err(ZssnError::DuplicateReport { reporter, reported })
                if reporter == ann.id && reported == bob.id
        ));
        assert_eq!(context.list_reports().len(), 1);
        // The reverse edge is a different report.
        assert!(context.register_report(report(&bob, &ann)).is_ok());
    }

    #[test]
    fn self_report_is_rejected() {
        let mut context = Context::new();
        let ann = register(&mut context, "Ann");
        let result = context.register_report(report(&ann, &ann));
        assert!(matches!(result, Err(ZssnError::SelfReport(id)) if id == ann.id));
        assert!(context.list_reports().is_empty());
    }

    #[test]
    fn infected_reporter_is_rejected() {
        let mut context = Context::new();
        let infected = register_infected(&mut context, "Zed");
        let ann = register(&mut context, "Ann");
        let result = context.register_report(report(&infected, &ann));
        assert!(matches!(result, Err(ZssnError::ReporterInfected(id)) if id == infected.id));
    }

    #[test]
    fn infected_survivor_can_be_reported() {
        let mut context = Context::new();
        let infected = register_infected(&mut context, "Zed");
        let ann = register(&mut context, "Ann");
        let filed = context.register_report(report(&ann, &infected)).unwrap();
        assert!(!filed.infected);
        assert_eq!(filed.report_count, 1);
    }

    #[test]
    fn unknown_survivors_are_rejected() {
        let mut context = Context::new();
        let ann = register(&mut context, "Ann");
        let missing = NewReport {
            reporter: ann.id,
            reported: SurvivorId::new(42),
        };
        assert!(matches!(
            context.register_report(missing),
            Err(ZssnError::NotFound {
                entity: "survivor",
                id: 42
            })
        ));
        let missing = NewReport {
            reporter: SurvivorId::new(42),
            reported: ann.id,
        };
        assert!(matches!(
            context.register_report(missing),
            Err(ZssnError::NotFound { .. })
        ));
    }

    #[test]
    fn get_report() {
        let mut context = Context::new();
        let ann = register(&mut context, "Ann");
        let bob = register(&mut context, "Bob");
        let filed = context.register_report(report(&ann, &bob)).unwrap();
        assert_eq!(context.get_report(filed.report.id).unwrap(), filed.report);
        assert!(matches!(
            context.get_report(ReportId::new(7)),
            Err(ZssnError::NotFound {
                entity: "report",
                id: 7
            })
        ));
    }

    #[test]
    fn new_report_accepts_legacy_field_names() {
        let parsed: NewReport =
            serde_json::from_str(r#"{"whoReported": 1, "gotReported": 2}"#).unwrap();
        assert_eq!(
            parsed,
            NewReport {
                reporter: SurvivorId::new(1),
                reported: SurvivorId::new(2),
            }
        );
    }

    #[test]
    fn infection_is_written_to_incidence_output() {
        let mut context = Context::new();
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("incidence.csv");
        context.add_incidence_output(&path).unwrap();

        let target = register(&mut context, "Target");
        for name in ["A", "B", "C"] {
            let reporter = register(&mut context, name);
            context.register_report(report(&reporter, &target)).unwrap();
        }

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let records: Vec<IncidenceRecord> =
            reader.deserialize().collect::<Result<_, _>>().unwrap();
        assert_eq!(
            records,
            vec![IncidenceRecord {
                survivor_id: target.id.index(),
                name: "Target".to_string(),
                report_count: 3,
            }]
        );
    }
}
