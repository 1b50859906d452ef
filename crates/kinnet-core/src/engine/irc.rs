//! Classification of the two endpoints of an intrinsic reaction coordinate.

use super::error::ReactionFailure;
use crate::core::models::structure::Structure;
use crate::core::utils::geometry;

/// Closest approach (Angstrom) below which an endpoint geometry is unphysical.
pub const MIN_INTERATOMIC_DISTANCE: f64 = 0.3;

#[derive(Debug, Clone, PartialEq)]
pub enum IrcEndpoint {
    /// Same species as the reactant.
    Reactant,
    Other(Structure),
    /// Failed or unphysical endpoint; never matches the reactant.
    Invalid,
}

pub fn classify_endpoint(endpoint: Structure, reactant: &Structure) -> IrcEndpoint {
    if geometry::has_close_contacts(endpoint.geometry(), MIN_INTERATOMIC_DISTANCE) {
        IrcEndpoint::Invalid
    } else if endpoint.chemid() == reactant.chemid() {
        IrcEndpoint::Reactant
    } else {
        IrcEndpoint::Other(endpoint)
    }
}

/// Picks the product when exactly one direction leads back to the reactant
/// and the other leads to a valid structure.
pub fn resolve_product(
    forward: IrcEndpoint,
    reverse: IrcEndpoint,
) -> Result<Structure, ReactionFailure> {
    match (forward, reverse) {
        (IrcEndpoint::Reactant, IrcEndpoint::Other(product))
        | (IrcEndpoint::Other(product), IrcEndpoint::Reactant) => Ok(product),
        _ => Err(ReactionFailure::AmbiguousReactionPath),
    }
}
