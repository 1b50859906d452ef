//! # Core Module
//!
//! Stateless building blocks for reaction discovery: molecular data models,
//! structure characterization, the motif matcher that proposes reactive atom
//! sets, geometry helpers, ring conformer enumeration and molecule file I/O.
//!
//! - **Molecular Representation** ([`models`]) - Element tables, bond matrices and
//!   characterized structures with their chemid
//! - **Characterization** ([`chem`]) - Bond perception, radical sites, rings and symmetry classes
//! - **Motif Search** ([`motif`]) - Labeled self-avoiding walks over the bond graph
//! - **Conformers** ([`conformers`]) - Ring-puckering variants of cyclic structures
//! - **File I/O** ([`io`]) - XYZ reading and writing

pub mod chem;
pub mod conformers;
pub mod io;
pub mod models;
pub mod motif;
pub mod utils;
