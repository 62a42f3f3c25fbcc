//! The ledger store: survivors, inventories and reports, held in a data plugin on the
//! [`Context`].
//!
//! Every mutation goes through a [`Transaction`]. A transaction stages its writes on top of the
//! committed ledger; reads inside the transaction see the staged writes. When the closure passed
//! to [`ContextLedgerExt::transaction`] returns `Ok`, all staged writes are applied at once;
//! when it returns `Err`, they are dropped and the ledger is left exactly as it was.
//!
//! Identifiers are assigned sequentially and never reused, even after a removal.
use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::context::Context;
use crate::error::ZssnError;
use crate::infection::{Report, ReportId};
use crate::inventory::{Inventory, InventoryId, Supplies};
use crate::survivors::{Location, NewSurvivor, Survivor, SurvivorId};
use crate::{define_data_plugin, trace, HashMap, HashMapExt};

/// The committed state of the ledger.
#[derive(Debug)]
pub struct LedgerData {
    survivors: BTreeMap<SurvivorId, Survivor>,
    inventories: BTreeMap<InventoryId, Inventory>,
    reports: BTreeMap<ReportId, Report>,
    // (reporter, reported) -> report; enforces one report per ordered pair
    report_index: HashMap<(SurvivorId, SurvivorId), ReportId>,
    reports_against: HashMap<SurvivorId, usize>,
    next_survivor: usize,
    next_inventory: usize,
    next_report: usize,
}

impl Default for LedgerData {
    fn default() -> Self {
        LedgerData {
            survivors: BTreeMap::new(),
            inventories: BTreeMap::new(),
            reports: BTreeMap::new(),
            report_index: HashMap::new(),
            reports_against: HashMap::new(),
            next_survivor: 0,
            next_inventory: 0,
            next_report: 0,
        }
    }
}

define_data_plugin!(LedgerPlugin, LedgerData, LedgerData::default());

static EMPTY_LEDGER: LazyLock<LedgerData> = LazyLock::new(LedgerData::default);

impl LedgerData {
    #[must_use]
    pub fn survivor(&self, id: SurvivorId) -> Option<&Survivor> {
        self.survivors.get(&id)
    }

    pub fn survivors(&self) -> impl Iterator<Item = &Survivor> {
        self.survivors.values()
    }

    #[must_use]
    pub fn inventory(&self, id: InventoryId) -> Option<&Inventory> {
        self.inventories.get(&id)
    }

    pub fn inventories(&self) -> impl Iterator<Item = &Inventory> {
        self.inventories.values()
    }

    #[must_use]
    pub fn report(&self, id: ReportId) -> Option<&Report> {
        self.reports.get(&id)
    }

    pub fn reports(&self) -> impl Iterator<Item = &Report> {
        self.reports.values()
    }

    #[must_use]
    pub fn find_report(&self, reporter: SurvivorId, reported: SurvivorId) -> Option<ReportId> {
        self.report_index.get(&(reporter, reported)).copied()
    }

    /// The number of reports filed against `reported`.
    #[must_use]
    pub fn report_count_against(&self, reported: SurvivorId) -> usize {
        self.reports_against.get(&reported).copied().unwrap_or(0)
    }

    fn index_report(&mut self, report: &Report) {
        self.report_index
            .insert((report.reporter, report.reported), report.id);
        *self.reports_against.entry(report.reported).or_insert(0) += 1;
    }

    fn unindex_report(&mut self, report: &Report) {
        self.report_index.remove(&(report.reporter, report.reported));
        if let Some(count) = self.reports_against.get_mut(&report.reported) {
            *count -= 1;
            if *count == 0 {
                self.reports_against.remove(&report.reported);
            }
        }
    }

    fn apply(&mut self, staged: Staged) {
        for (id, survivor) in staged.survivors {
            match survivor {
                Some(survivor) => {
                    self.survivors.insert(id, survivor);
                }
                None => {
                    self.survivors.remove(&id);
                }
            }
        }
        for (id, inventory) in staged.inventories {
            match inventory {
                Some(inventory) => {
                    self.inventories.insert(id, inventory);
                }
                None => {
                    self.inventories.remove(&id);
                }
            }
        }
        // Reports are immutable: a staged entry is either an insertion or a removal.
        for (id, report) in staged.reports {
            if let Some(old) = self.reports.remove(&id) {
                self.unindex_report(&old);
            }
            if let Some(report) = report {
                self.index_report(&report);
                self.reports.insert(id, report);
            }
        }
        self.next_survivor = staged.next_survivor;
        self.next_inventory = staged.next_inventory;
        self.next_report = staged.next_report;
    }
}

/// Writes staged by a transaction. `None` marks a removal.
#[derive(Debug)]
struct Staged {
    survivors: BTreeMap<SurvivorId, Option<Survivor>>,
    inventories: BTreeMap<InventoryId, Option<Inventory>>,
    reports: BTreeMap<ReportId, Option<Report>>,
    next_survivor: usize,
    next_inventory: usize,
    next_report: usize,
}

impl Staged {
    fn len(&self) -> usize {
        self.survivors.len() + self.inventories.len() + self.reports.len()
    }
}

/// A unit of work over the ledger. See the module documentation.
pub struct Transaction<'a> {
    ledger: &'a LedgerData,
    staged: Staged,
}

impl<'a> Transaction<'a> {
    fn new(ledger: &'a LedgerData) -> Transaction<'a> {
        Transaction {
            ledger,
            staged: Staged {
                survivors: BTreeMap::new(),
                inventories: BTreeMap::new(),
                reports: BTreeMap::new(),
                next_survivor: ledger.next_survivor,
                next_inventory: ledger.next_inventory,
                next_report: ledger.next_report,
            },
        }
    }

    fn into_staged(self) -> Staged {
        self.staged
    }

    #[must_use]
    pub fn survivor(&self, id: SurvivorId) -> Option<&Survivor> {
        match self.staged.survivors.get(&id) {
            Some(staged) => staged.as_ref(),
            None => self.ledger.survivor(id),
        }
    }

    #[must_use]
    pub fn inventory(&self, id: InventoryId) -> Option<&Inventory> {
        match self.staged.inventories.get(&id) {
            Some(staged) => staged.as_ref(),
            None => self.ledger.inventory(id),
        }
    }

    #[must_use]
    pub fn report(&self, id: ReportId) -> Option<&Report> {
        match self.staged.reports.get(&id) {
            Some(staged) => staged.as_ref(),
            None => self.ledger.report(id),
        }
    }

    #[must_use]
    pub fn find_report(&self, reporter: SurvivorId, reported: SurvivorId) -> Option<ReportId> {
        if let Some(id) = self.ledger.find_report(reporter, reported) {
            if !matches!(self.staged.reports.get(&id), Some(None)) {
                return Some(id);
            }
        }
        self.staged.reports.iter().find_map(|(id, staged)| {
            staged
                .as_ref()
                .filter(|report| report.reporter == reporter && report.reported == reported)
                .map(|_| *id)
        })
    }

    /// The number of reports against `reported`, staged reports included.
    #[must_use]
    pub fn report_count_against(&self, reported: SurvivorId) -> usize {
        let mut count = self.ledger.report_count_against(reported);
        for (id, staged) in &self.staged.reports {
            if self
                .ledger
                .report(*id)
                .is_some_and(|report| report.reported == reported)
            {
                count -= 1;
            }
            if staged
                .as_ref()
                .is_some_and(|report| report.reported == reported)
            {
                count += 1;
            }
        }
        count
    }

    /// Creates a healthy survivor and its inventory. The registration is assumed to be valid.
    pub fn insert_survivor(&mut self, registration: NewSurvivor) -> (Survivor, Inventory) {
        let survivor_id = SurvivorId::new(self.staged.next_survivor);
        self.staged.next_survivor += 1;
        let inventory_id = InventoryId::new(self.staged.next_inventory);
        self.staged.next_inventory += 1;

        let inventory = Inventory {
            id: inventory_id,
            owner: survivor_id,
            supplies: registration.inventory,
        };
        let survivor = Survivor::new(survivor_id, registration, inventory_id);
        trace!("Staging survivor {survivor_id} with inventory {inventory_id}");
        self.staged
            .survivors
            .insert(survivor_id, Some(survivor.clone()));
        self.staged
            .inventories
            .insert(inventory_id, Some(inventory.clone()));
        (survivor, inventory)
    }

    /// # Errors
    /// Returns `ZssnError::NotFound` if there is no survivor `id`.
    pub fn set_location(
        &mut self,
        id: SurvivorId,
        location: Location,
    ) -> Result<Survivor, ZssnError> {
        let mut survivor = self.survivor(id).cloned().ok_or(ZssnError::NotFound {
            entity: "survivor",
            id: id.index(),
        })?;
        survivor.location = location;
        self.staged.survivors.insert(id, Some(survivor.clone()));
        Ok(survivor)
    }

    /// Removes a survivor, its inventory and every report filed by or against it. Returns the
    /// number of reports removed.
    ///
    /// # Errors
    /// Returns `ZssnError::NotFound` if there is no survivor `id`.
    pub fn remove_survivor(&mut self, id: SurvivorId) -> Result<usize, ZssnError> {
        let survivor = self.survivor(id).cloned().ok_or(ZssnError::NotFound {
            entity: "survivor",
            id: id.index(),
        })?;
        let involved: Vec<ReportId> = self
            .ledger
            .reports()
            .map(|report| report.id)
            .chain(self.staged.reports.keys().copied())
            .filter(|report_id| {
                self.report(*report_id)
                    .is_some_and(|report| report.reporter == id || report.reported == id)
            })
            .collect();
        let removed = involved.len();
        for report_id in involved {
            self.staged.reports.insert(report_id, None);
        }
        self.staged.survivors.insert(id, None);
        self.staged.inventories.insert(survivor.inventory, None);
        trace!("Staging removal of survivor {id} and {removed} reports");
        Ok(removed)
    }

    /// Overwrites the supplies of an inventory. Trades are the only caller.
    pub(crate) fn put_supplies(
        &mut self,
        id: InventoryId,
        supplies: Supplies,
    ) -> Result<Inventory, ZssnError> {
        let mut inventory = self.inventory(id).cloned().ok_or(ZssnError::NotFound {
            entity: "inventory",
            id: id.index(),
        })?;
        inventory.supplies = supplies;
        self.staged.inventories.insert(id, Some(inventory.clone()));
        Ok(inventory)
    }

    /// Stores a report. The infection engine checks the report rules first.
    pub(crate) fn insert_report(&mut self, reporter: SurvivorId, reported: SurvivorId) -> Report {
        let id = ReportId::new(self.staged.next_report);
        self.staged.next_report += 1;
        let report = Report {
            id,
            reporter,
            reported,
        };
        self.staged.reports.insert(id, Some(report.clone()));
        report
    }

    /// Performs the Healthy → Infected transition. Returns false if the survivor was already
    /// infected.
    ///
    /// # Errors
    /// Returns `ZssnError::NotFound` if there is no survivor `id`.
    pub(crate) fn infect(&mut self, id: SurvivorId) -> Result<bool, ZssnError> {
        let mut survivor = self.survivor(id).cloned().ok_or(ZssnError::NotFound {
            entity: "survivor",
            id: id.index(),
        })?;
        if !survivor.mark_infected() {
            return Ok(false);
        }
        self.staged.survivors.insert(id, Some(survivor));
        Ok(true)
    }
}

pub trait ContextLedgerExt {
    /// The committed ledger, for reads outside a transaction.
    fn ledger(&self) -> &LedgerData;

    /// Runs `operation` in a transaction. Staged writes are committed if it returns `Ok` and
    /// discarded if it returns `Err`.
    ///
    /// # Errors
    /// Returns the error returned by `operation`.
    fn transaction<T, F>(&mut self, operation: F) -> Result<T, ZssnError>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<T, ZssnError>;
}

impl ContextLedgerExt for Context {
    fn ledger(&self) -> &LedgerData {
        self.get_data(LedgerPlugin).unwrap_or(&EMPTY_LEDGER)
    }

    fn transaction<T, F>(&mut self, operation: F) -> Result<T, ZssnError>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<T, ZssnError>,
    {
        let ledger = self.get_data_mut(LedgerPlugin);
        let mut tx = Transaction::new(ledger);
        let value = match operation(&mut tx) {
            Ok(value) => value,
            Err(err) => {
                trace!("Transaction rolled back: {err}");
                return Err(err);
            }
        };
        let staged = tx.into_staged();
        let writes = staged.len();
        ledger.apply(staged);
        trace!("Transaction committed {writes} writes");
        Ok(value)
    }
}
