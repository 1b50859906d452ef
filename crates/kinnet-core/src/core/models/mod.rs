//! # Core Models Module
//!
//! Data structures describing one species or stationary point.
//!
//! - [`element`] - Per-element constants (covalent radii, valences, standard bond lengths)
//! - [`topology`] - Bond orders and the symmetric bond-order matrix
//! - [`structure`] - Characterized structures and their canonical [`structure::Chemid`]
//! - [`ids`] - Slot-map keys for reaction instances and shared fragments

pub mod element;
pub mod ids;
pub mod structure;
pub mod topology;
