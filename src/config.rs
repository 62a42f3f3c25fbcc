//! Point weights and their sources.
//!
//! Each resource carries a positive integer weight. The weights are read once at start-up, from a
//! JSON config file when one is given and from the `PTS_*` environment variables otherwise, and
//! stored in the `Context` as the [`PointWeightsProperty`] global property.
use std::path::Path;

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use crate::context::Context;
use crate::error::ZssnError;
use crate::global_properties::ContextGlobalPropertiesExt;
use crate::inventory::{Resource, Supplies};
use crate::{define_global_property, info};

/// The largest accepted weight. A full inventory at this weight is still far from `u64::MAX`
/// points.
pub const MAX_POINT_WEIGHT: u32 = 1_000_000;

/// Per-resource point values used to judge trade fairness and the value of lost supplies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PointWeights {
    pub water: u32,
    pub food: u32,
    pub meds: u32,
    pub ammo: u32,
}

impl PointWeights {
    #[must_use]
    pub fn weight(&self, resource: Resource) -> u32 {
        match resource {
            Resource::Water => self.water,
            Resource::Food => self.food,
            Resource::Meds => self.meds,
            Resource::Ammo => self.ammo,
        }
    }

    /// The weighted sum of `supplies`.
    ///
    /// # Errors
    /// Returns a `ZssnError::ValidationError` if the sum does not fit in a `u64`, which only
    /// happens with weights above [`MAX_POINT_WEIGHT`].
    pub fn points(&self, supplies: &Supplies) -> Result<u64, ZssnError> {
        Resource::iter().try_fold(0u64, |total, resource| {
            u64::from(supplies.get(resource))
                .checked_mul(u64::from(self.weight(resource)))
                .and_then(|points| total.checked_add(points))
                .ok_or_else(|| {
                    ZssnError::ValidationError(format!(
                        "{supplies:?} is worth more than {} points",
                        u64::MAX
                    ))
                })
        })
    }

    /// Reads `PTS_WATER`, `PTS_FOOD`, `PTS_MEDS` and `PTS_AMMO`.
    ///
    /// # Errors
    /// Returns a `ZssnError::ConfigError` if a variable is missing or not a positive integer.
    pub fn from_env() -> Result<PointWeights, ZssnError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<PointWeights, ZssnError> {
        let read = |resource: Resource| -> Result<u32, ZssnError> {
            let name = resource.env_var();
            let raw = lookup(name)
                .ok_or_else(|| ZssnError::ConfigError(format!("{name} is not set")))?;
            raw.trim().parse::<u32>().map_err(|_| {
                ZssnError::ConfigError(format!("{name} must be a positive integer, got {raw:?}"))
            })
        };
        let weights = PointWeights {
            water: read(Resource::Water)?,
            food: read(Resource::Food)?,
            meds: read(Resource::Meds)?,
            ammo: read(Resource::Ammo)?,
        };
        validate_point_weights(&weights)?;
        Ok(weights)
    }
}

fn validate_point_weights(weights: &PointWeights) -> Result<(), ZssnError> {
    for resource in Resource::iter() {
        let weight = weights.weight(resource);
        if weight == 0 {
            return Err(ZssnError::ConfigError(format!(
                "the {resource} weight must be positive"
            )));
        }
        if weight > MAX_POINT_WEIGHT {
            return Err(ZssnError::ConfigError(format!(
                "the {resource} weight must be at most {MAX_POINT_WEIGHT}, got {weight}"
            )));
        }
    }
    Ok(())
}

define_global_property!(PointWeightsProperty, PointWeights, validate_point_weights);

/// The shape of a `--config` file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    point_weights: PointWeights,
}

pub trait ContextConfigExt {
    /// Installs the point weights. Weights can only be set once.
    ///
    /// # Errors
    /// Returns a `ZssnError::ConfigError` if a weight is zero or weights were already set.
    fn set_point_weights(&mut self, weights: PointWeights) -> Result<(), ZssnError>;

    /// # Errors
    /// Returns a `ZssnError::ConfigError` if no weights were set.
    fn point_weights(&self) -> Result<PointWeights, ZssnError>;

    /// Loads the configuration from a JSON file of the form
    /// `{"point_weights": {"water": 4, "food": 3, "meds": 2, "ammo": 1}}`.
    ///
    /// # Errors
    /// Returns a `ZssnError` if the file cannot be read or parsed, or holds invalid weights.
    fn load_config(&mut self, path: &Path) -> Result<(), ZssnError>;
}

impl ContextConfigExt for Context {
    fn set_point_weights(&mut self, weights: PointWeights) -> Result<(), ZssnError> {
        self.set_global_property_value(PointWeightsProperty, weights)?;
        info!(
            "Point weights: water={} food={} meds={} ammo={}",
            weights.water, weights.food, weights.meds, weights.ammo
        );
        Ok(())
    }

    fn point_weights(&self) -> Result<PointWeights, ZssnError> {
        self.get_global_property_value(PointWeightsProperty)
            .copied()
            .ok_or_else(|| ZssnError::ConfigError("point weights are not configured".to_string()))
    }

    fn load_config(&mut self, path: &Path) -> Result<(), ZssnError> {
        let raw = std::fs::read_to_string(path)?;
        let config: ConfigFile = serde_json::from_str(&raw)?;
        self.set_point_weights(config.point_weights)
    }
}
