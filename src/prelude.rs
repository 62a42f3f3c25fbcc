pub use crate::config::{ContextConfigExt, PointWeights};
pub use crate::context::Context;
pub use crate::error::ZssnError;
pub use crate::fleet::{ContextFleetExt, FleetReport};
pub use crate::global_properties::ContextGlobalPropertiesExt;
pub use crate::incidence::ContextIncidenceExt;
pub use crate::infection::{ContextInfectionExt, NewReport, Report, ReportId};
pub use crate::inventory::{ContextInventoryExt, Inventory, InventoryId, Resource, Supplies};
pub use crate::log::{debug, error, info, trace, warn};
pub use crate::survivors::{
    ContextSurvivorsExt, Gender, Location, NewSurvivor, Survivor, SurvivorId,
};
pub use crate::trade::{ContextTradeExt, TradeRequest, TraderOffer};
pub use crate::web_api::ContextWebApiExt;
pub use crate::{define_data_plugin, define_global_property};
