//! The trade engine: atomic, point-balanced exchanges of supplies between two healthy
//! survivors.
//!
//! A trade is checked in this order: distinct parties, configured weights, both survivors
//! exist, neither is infected, equal points on both sides, and finally that neither inventory
//! would go negative. The two inventory writes share one transaction.
use serde::Deserialize;
use strum::IntoEnumIterator;

use crate::access::ensure_can_trade;
use crate::config::ContextConfigExt;
use crate::context::Context;
use crate::error::ZssnError;
use crate::inventory::{Inventory, InventoryId, Resource, Supplies};
use crate::ledger::{ContextLedgerExt, Transaction};
use crate::survivors::{Survivor, SurvivorId};
use crate::{debug, info};

/// One side of a trade: a survivor and the supplies they hand over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "WireOffer")]
pub struct TraderOffer {
    pub survivor: SurvivorId,
    pub offered: Supplies,
}

/// The request body form of an offer, `{"id", "trd_water", "trd_food", "trd_meds", "trd_ammo"}`.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct WireOffer {
    id: SurvivorId,
    #[serde(default)]
    trd_water: u32,
    #[serde(default)]
    trd_food: u32,
    #[serde(default)]
    trd_meds: u32,
    #[serde(default)]
    trd_ammo: u32,
}

impl From<WireOffer> for TraderOffer {
    fn from(wire: WireOffer) -> Self {
        TraderOffer {
            survivor: wire.id,
            offered: Supplies::new(wire.trd_water, wire.trd_food, wire.trd_meds, wire.trd_ammo),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TradeRequest {
    #[serde(alias = "trader_1")]
    pub trader1: TraderOffer,
    #[serde(alias = "trader_2")]
    pub trader2: TraderOffer,
}

/// The supplies `pre` becomes after handing over `given` and receiving `received`.
///
/// # Errors
/// Returns `ZssnError::InsufficientInventory` if any resource would go negative.
fn settle(pre: &Inventory, given: &Supplies, received: &Supplies) -> Result<Supplies, ZssnError> {
    let mut post = Supplies::default();
    for resource in Resource::iter() {
        let amount = i64::from(pre.supplies.get(resource)) - i64::from(given.get(resource))
            + i64::from(received.get(resource));
        let amount =
            u32::try_from(amount).map_err(|_| ZssnError::InsufficientInventory(pre.id))?;
        post.set(resource, amount);
    }
    Ok(post)
}

fn trader<'t>(tx: &'t Transaction<'_>, id: SurvivorId) -> Result<&'t Survivor, ZssnError> {
    tx.survivor(id).ok_or(ZssnError::NotFound {
        entity: "survivor",
        id: id.index(),
    })
}

pub trait ContextTradeExt {
    /// Exchanges the offered supplies between two survivors. Returns both updated
    /// inventories, first trader first.
    ///
    /// # Errors
    /// - `ZssnError::SameSurvivor` if both offers name the same survivor
    /// - `ZssnError::ConfigError` if no point weights are configured
    /// - `ZssnError::NotFound` if either survivor does not exist
    /// - `ZssnError::InfectedParty` if either survivor is infected
    /// - `ZssnError::UnbalancedTrade` if the offers are worth different points
    /// - `ZssnError::InsufficientInventory` if either inventory would go negative
    ///
    /// On error neither inventory is changed.
    fn execute_trade(&mut self, request: TradeRequest) -> Result<(Inventory, Inventory), ZssnError>;
}

impl ContextTradeExt for Context {
    fn execute_trade(&mut self, request: TradeRequest) -> Result<(Inventory, Inventory), ZssnError> {
        let TradeRequest { trader1, trader2 } = request;
        if trader1.survivor == trader2.survivor {
            return Err(ZssnError::SameSurvivor(trader1.survivor));
        }
        let weights = self.point_weights()?;

        let result = self.transaction(|tx| {
            let first = trader(tx, trader1.survivor)?;
            let second = trader(tx, trader2.survivor)?;
            ensure_can_trade(first)?;
            ensure_can_trade(second)?;
            let (first_inventory, second_inventory) = (first.inventory, second.inventory);

            let first_points = weights.points(&trader1.offered)?;
            let second_points = weights.points(&trader2.offered)?;
            if first_points != second_points {
                return Err(ZssnError::UnbalancedTrade {
                    first: first_points,
                    second: second_points,
                });
            }

            let missing = |id: InventoryId| ZssnError::NotFound {
                entity: "inventory",
                id: id.index(),
            };
            let first_pre = tx.inventory(first_inventory).ok_or_else(|| missing(first_inventory))?;
            let second_pre = tx
                .inventory(second_inventory)
                .ok_or_else(|| missing(second_inventory))?;
            let first_post = settle(first_pre, &trader1.offered, &trader2.offered)?;
            let second_post = settle(second_pre, &trader2.offered, &trader1.offered)?;

            Ok((
                tx.put_supplies(first_inventory, first_post)?,
                tx.put_supplies(second_inventory, second_post)?,
            ))
        });

        match &result {
            Ok(_) => info!(
                "Survivors {} and {} traded {:?} for {:?}",
                trader1.survivor, trader2.survivor, trader1.offered, trader2.offered
            ),
            Err(err) => debug!(
                "Trade between {} and {} rejected: {err}",
                trader1.survivor, trader2.survivor
            ),
        }
        result
    }
}
