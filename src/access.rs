//! The access guard. Infected survivors are opaque: single-item reads, location updates and
//! trades involving them fail with `InfectedAccess` (or `InfectedParty` for trades) rather than
//! `NotFound`, because the record exists.
//!
//! Exempt: listings, and the reported side of a report.
use crate::error::ZssnError;
use crate::survivors::Survivor;

#[must_use]
pub fn is_accessible(survivor: &Survivor) -> bool {
    !survivor.is_infected()
}

/// # Errors
/// Returns `ZssnError::InfectedAccess` if `survivor` is infected.
pub fn ensure_accessible(survivor: &Survivor) -> Result<(), ZssnError> {
    if is_accessible(survivor) {
        Ok(())
    } else {
        Err(ZssnError::InfectedAccess(survivor.id))
    }
}

/// The trade flavor of [`ensure_accessible`].
///
/// # Errors
/// Returns `ZssnError::InfectedParty` if `survivor` is infected.
pub fn ensure_can_trade(survivor: &Survivor) -> Result<(), ZssnError> {
    if is_accessible(survivor) {
        Ok(())
    } else {
        Err(ZssnError::InfectedParty(survivor.id))
    }
}
