//! # Workflows Module
//!
//! The top-level entry points of kinnet. Each workflow ties the engine and the
//! network layer together into one complete procedure, reporting its phases
//! through a [`ProgressReporter`](crate::engine::progress::ProgressReporter).
//!
//! - **Exploration** ([`explore`]) - optimizes one reactant well, finds every
//!   candidate reaction and drives the candidates to verified reactions.
//! - **Surface exploration** ([`pes`]) - explores every well of a potential
//!   energy surface, one process per well, sharing a well list.
//! - **Network** ([`network`]) - collects finished explorations into a reaction
//!   network, selects part of it and writes it out.

pub mod explore;
pub mod network;
pub mod pes;
