//! # kinnet Core Library
//!
//! Automated discovery of elementary gas-phase reactions and assembly of the
//! resulting reaction networks.
//!
//! Starting from one molecular structure, kinnet enumerates the reactions each
//! reaction family allows, drives every candidate through a chain of external
//! quantum-chemistry jobs (constrained scan, saddle-point search, frequency
//! check, intrinsic reaction coordinate, product optimization) and keeps the
//! reactions that survive validation. Products can be explored in turn, and
//! the verified reactions of many wells form a network that can be queried.
//!
//! ## Architectural Philosophy
//!
//! - **[`core`]: The Foundation.** Stateless data models (`Structure`, `Chemid`,
//!   bond matrices), structure characterization, motif matching, ring conformers
//!   and XYZ I/O.
//!
//! - **[`families`]: The Chemistry.** One record per reaction family: its motifs,
//!   the constraints of every scan step and its step count, kept in a registry.
//!
//! - **[`engine`]: The Logic Core.** The stateful layer. Reaction instances are
//!   state machines advanced once per tick against a quantum-chemistry backend;
//!   an orchestrator drives all instances of one species and maintains its
//!   progress snapshot and summary.
//!
//! - **[`network`]: The Analysis.** Assembles per-well results into a reaction
//!   network and answers path and filter queries over it.
//!
//! - **[`workflows`]: The Public API.** Complete procedures tying the layers
//!   together: exploring one species, a whole surface, or building a network.

pub mod core;
pub mod engine;
pub mod families;
pub mod network;
pub mod workflows;
