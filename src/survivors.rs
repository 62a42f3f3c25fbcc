//! Survivors: identity, location and derived infection status.
//!
//! Registration creates the survivor and its inventory in one transaction. Afterwards only the
//! location can be changed, and only while the survivor is healthy. The infection status has no
//! setter here; it is derived from peer reports by [`crate::infection`].
use serde::{Deserialize, Serialize, Serializer};

use crate::access::ensure_accessible;
use crate::context::Context;
use crate::error::ZssnError;
use crate::inventory::{Inventory, InventoryId, Supplies};
use crate::ledger::ContextLedgerExt;
use crate::{debug, info};

pub const MAX_NAME_LENGTH: usize = 100;
pub const MAX_AGE: u8 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SurvivorId(usize);

impl SurvivorId {
    #[must_use]
    pub fn new(id: usize) -> Self {
        SurvivorId(id)
    }

    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for SurvivorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Female,
    Male,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    /// # Errors
    /// Returns a `ZssnError::ValidationError` if a coordinate is outside its range.
    pub fn validate(&self) -> Result<(), ZssnError> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(ZssnError::ValidationError(format!(
                "latitude must be within [-90, 90], got {}",
                self.latitude
            )));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(ZssnError::ValidationError(format!(
                "longitude must be within [-180, 180], got {}",
                self.longitude
            )));
        }
        Ok(())
    }
}

/// Healthy survivors become infected once; there is no way back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InfectionStatus {
    #[default]
    Healthy,
    Infected,
}

impl Serialize for InfectionStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bool(*self == InfectionStatus::Infected)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Survivor {
    pub id: SurvivorId,
    pub name: String,
    pub age: u8,
    pub gender: Gender,
    #[serde(flatten)]
    pub location: Location,
    #[serde(rename = "infected")]
    status: InfectionStatus,
    #[serde(skip)]
    pub inventory: InventoryId,
}

impl Survivor {
    pub(crate) fn new(
        id: SurvivorId,
        registration: NewSurvivor,
        inventory: InventoryId,
    ) -> Survivor {
        Survivor {
            id,
            name: registration.name.trim().to_string(),
            age: registration.age,
            gender: registration.gender,
            location: Location {
                latitude: registration.latitude,
                longitude: registration.longitude,
            },
            status: InfectionStatus::Healthy,
            inventory,
        }
    }

    #[must_use]
    pub fn status(&self) -> InfectionStatus {
        self.status
    }

    #[must_use]
    pub fn is_infected(&self) -> bool {
        self.status == InfectionStatus::Infected
    }

    /// Performs the Healthy → Infected transition. Returns false if already infected.
    pub(crate) fn mark_infected(&mut self) -> bool {
        if self.is_infected() {
            return false;
        }
        self.status = InfectionStatus::Infected;
        true
    }
}

/// A registration request. The infection status is assigned by the ledger, so an `infected`
/// field is rejected along with any other unknown field.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewSurvivor {
    pub name: String,
    pub age: u8,
    pub gender: Gender,
    pub latitude: f64,
    pub longitude: f64,
    pub inventory: Supplies,
}

impl NewSurvivor {
    /// # Errors
    /// Returns a `ZssnError::ValidationError` describing the first invalid field.
    pub fn validate(&self) -> Result<(), ZssnError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ZssnError::ValidationError("name must not be empty".to_string()));
        }
        if name.chars().count() > MAX_NAME_LENGTH {
            return Err(ZssnError::ValidationError(format!(
                "name must be at most {MAX_NAME_LENGTH} characters"
            )));
        }
        if self.age > MAX_AGE {
            return Err(ZssnError::ValidationError(format!(
                "age must be within [0, {MAX_AGE}], got {}",
                self.age
            )));
        }
        Location {
            latitude: self.latitude,
            longitude: self.longitude,
        }
        .validate()
    }
}

pub trait ContextSurvivorsExt {
    /// Registers a survivor together with its inventory.
    ///
    /// # Errors
    /// Returns a `ZssnError::ValidationError` if the registration is invalid.
    fn register_survivor(&mut self, registration: NewSurvivor)
        -> Result<(Survivor, Inventory), ZssnError>;

    /// Every survivor, infected or not, ordered by id.
    fn list_survivors(&self) -> Vec<Survivor>;

    /// # Errors
    /// - `ZssnError::NotFound` if there is no survivor `id`
    /// - `ZssnError::InfectedAccess` if the survivor is infected
    fn get_survivor(&self, id: SurvivorId) -> Result<Survivor, ZssnError>;

    /// Moves a healthy survivor.
    ///
    /// # Errors
    /// - `ZssnError::ValidationError` if `location` is out of range
    /// - `ZssnError::NotFound` if there is no survivor `id`
    /// - `ZssnError::InfectedAccess` if the survivor is infected; the location is unchanged
    fn update_location(&mut self, id: SurvivorId, location: Location)
        -> Result<Survivor, ZssnError>;

    /// Removes a survivor, its inventory, and every report filed by or against it.
    ///
    /// # Errors
    /// Returns a `ZssnError::NotFound` if there is no survivor `id`.
    fn remove_survivor(&mut self, id: SurvivorId) -> Result<(), ZssnError>;
}

impl ContextSurvivorsExt for Context {
    fn register_survivor(
        &mut self,
        registration: NewSurvivor,
    ) -> Result<(Survivor, Inventory), ZssnError> {
        registration.validate()?;
        let (survivor, inventory) =
            self.transaction(|tx| Ok(tx.insert_survivor(registration)))?;
        info!(
            "Registered survivor {} ({}) with inventory {}",
            survivor.id, survivor.name, inventory.id
        );
        Ok((survivor, inventory))
    }

    fn list_survivors(&self) -> Vec<Survivor> {
        self.ledger().survivors().cloned().collect()
    }

    fn get_survivor(&self, id: SurvivorId) -> Result<Survivor, ZssnError> {
        let survivor = self.ledger().survivor(id).ok_or(ZssnError::NotFound {
            entity: "survivor",
            id: id.index(),
        })?;
        ensure_accessible(survivor)?;
        Ok(survivor.clone())
    }

    fn update_location(
        &mut self,
        id: SurvivorId,
        location: Location,
    ) -> Result<Survivor, ZssnError> {
        location.validate()?;
        let survivor = self.transaction(|tx| {
            let survivor = tx.survivor(id).ok_or(ZssnError::NotFound {
                entity: "survivor",
                id: id.index(),
            })?;
            ensure_accessible(survivor)?;
            tx.set_location(id, location)
        });
        match &survivor {
            Ok(survivor) => info!(
                "Survivor {} moved to ({}, {})",
                survivor.id, survivor.location.latitude, survivor.location.longitude
            ),
            Err(err) => debug!("Location update for survivor {id} rejected: {err}"),
        }
        survivor
    }

    fn remove_survivor(&mut self, id: SurvivorId) -> Result<(), ZssnError> {
        let removed_reports = self.transaction(|tx| tx.remove_survivor(id))?;
        info!("Removed survivor {id} and {removed_reports} related reports");
        Ok(())
    }
}
