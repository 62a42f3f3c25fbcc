//! Fleet-wide statistics: the infection ratio, the average supplies per survivor and the points
//! lost to infection.
//!
//! Averages are taken over every survivor, infected or not. The report is undefined when no
//! healthy survivor remains.
use serde::Serialize;
use strum::IntoEnumIterator;

use crate::config::ContextConfigExt;
use crate::context::Context;
use crate::error::ZssnError;
use crate::inventory::Resource;
use crate::ledger::ContextLedgerExt;
use crate::trace;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FleetReport {
    pub infected_percent: f64,
    pub survivors_percent: f64,
    pub avg_water: f64,
    pub avg_food: f64,
    pub avg_meds: f64,
    pub avg_ammo: f64,
    /// Weighted value of the supplies held by infected survivors. Not rounded.
    pub points_lost: f64,
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

pub trait ContextFleetExt {
    /// # Errors
    /// - `ZssnError::EmptyFleet` if there is no healthy survivor
    /// - `ZssnError::ConfigError` if no point weights are configured
    fn compute_fleet_report(&self) -> Result<FleetReport, ZssnError>;
}

impl ContextFleetExt for Context {
    #[allow(clippy::cast_precision_loss)]
    fn compute_fleet_report(&self) -> Result<FleetReport, ZssnError> {
        let weights = self.point_weights()?;
        let ledger = self.ledger();
        let mut infected = 0usize;
        let mut healthy = 0usize;
        let mut totals = [0u64; 4];
        let mut points_lost = 0u128;

        for survivor in ledger.survivors() {
            let supplies = ledger
                .inventory(survivor.inventory)
                .map(|inventory| inventory.supplies)
                .unwrap_or_default();
            for (total, resource) in totals.iter_mut().zip(Resource::iter()) {
                *total += u64::from(supplies.get(resource));
            }
            if survivor.is_infected() {
                infected += 1;
                points_lost += u128::from(weights.points(&supplies)?);
            } else {
                healthy += 1;
            }
        }
        if healthy == 0 {
            return Err(ZssnError::EmptyFleet);
        }

        let total = (infected + healthy) as f64;
        let infected_percent = infected as f64 / total * 100.0;
        let [water, food, meds, ammo] = totals.map(|sum| round3(sum as f64 / total));
        trace!("Fleet of {total} survivors, {infected} infected, {points_lost} points lost");
        Ok(FleetReport {
            infected_percent: round3(infected_percent),
            survivors_percent: round3(100.0 - infected_percent),
            avg_water: water,
            avg_food: food,
            avg_meds: meds,
            avg_ammo: ammo,
            points_lost: points_lost as f64,
        })
    }
}
