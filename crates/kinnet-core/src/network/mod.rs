//! Assembly of per-species reaction lists into one network of wells,
//! bimolecular products and reactions, with path and branching queries.

pub mod error;
pub mod export;
pub mod graph;
pub mod mess;
pub mod query;

pub use error::NetworkError;
pub use graph::{ReactionNetwork, SpeciesResult};
pub use query::{Query, Selection};
