//! Inventories: the four-resource supply ledger owned by one survivor.
//!
//! An inventory is created together with its owner and removed together with it. Afterwards it
//! only changes through a trade (see [`crate::trade`]). Reading a single inventory is subject to
//! the access guard of its owner; listing is not.
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use crate::access::ensure_accessible;
use crate::context::Context;
use crate::error::ZssnError;
use crate::ledger::ContextLedgerExt;
use crate::survivors::SurvivorId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Resource {
    Water,
    Food,
    Meds,
    Ammo,
}

impl Resource {
    /// The environment variable holding this resource's point weight.
    #[must_use]
    pub fn env_var(self) -> &'static str {
        match self {
            Resource::Water => "PTS_WATER",
            Resource::Food => "PTS_FOOD",
            Resource::Meds => "PTS_MEDS",
            Resource::Ammo => "PTS_AMMO",
        }
    }
}

/// An amount of each resource: the content of an inventory or one side of a trade.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Supplies {
    pub water: u32,
    pub food: u32,
    pub meds: u32,
    pub ammo: u32,
}

impl Supplies {
    #[must_use]
    pub fn new(water: u32, food: u32, meds: u32, ammo: u32) -> Supplies {
        Supplies {
            water,
            food,
            meds,
            ammo,
        }
    }

    #[must_use]
    pub fn get(&self, resource: Resource) -> u32 {
        match resource {
            Resource::Water => self.water,
            Resource::Food => self.food,
            Resource::Meds => self.meds,
            Resource::Ammo => self.ammo,
        }
    }

    pub fn set(&mut self, resource: Resource, amount: u32) {
        match resource {
            Resource::Water => self.water = amount,
            Resource::Food => self.food = amount,
            Resource::Meds => self.meds = amount,
            Resource::Ammo => self.ammo = amount,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InventoryId(usize);

impl InventoryId {
    #[must_use]
    pub fn new(id: usize) -> Self {
        InventoryId(id)
    }

    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for InventoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Inventory {
    pub id: InventoryId,
    #[serde(rename = "owner_survivor")]
    pub owner: SurvivorId,
    #[serde(flatten)]
    pub supplies: Supplies,
}

pub trait ContextInventoryExt {
    /// Every inventory, including those of infected survivors, ordered by id.
    fn list_inventories(&self) -> Vec<Inventory>;

    /// # Errors
    /// - `ZssnError::NotFound` if there is no inventory `id`
    /// - `ZssnError::InfectedAccess` if its owner is infected
    fn get_inventory(&self, id: InventoryId) -> Result<Inventory, ZssnError>;
}

impl ContextInventoryExt for Context {
    fn list_inventories(&self) -> Vec<Inventory> {
        self.ledger().inventories().cloned().collect()
    }

    fn get_inventory(&self, id: InventoryId) -> Result<Inventory, ZssnError> {
        let ledger = self.ledger();
        let inventory = ledger.inventory(id).ok_or(ZssnError::NotFound {
            entity: "inventory",
            id: id.index(),
        })?;
        let owner = ledger.survivor(inventory.owner).ok_or(ZssnError::NotFound {
            entity: "survivor",
            id: inventory.owner.index(),
        })?;
        ensure_accessible(owner)?;
        Ok(inventory.clone())
    }
}
