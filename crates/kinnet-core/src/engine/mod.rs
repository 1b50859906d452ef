//! # Engine Module
//!
//! The stateful layer of kinnet: it turns reactive atom tuples into verified
//! elementary reactions by driving every candidate through a chain of external
//! quantum-chemistry jobs.
//!
//! ## Overview
//!
//! Each candidate becomes a [`instance::ReactionInstance`], a small state
//! machine advanced once per tick by the [`orchestrator::SpeciesOrchestrator`].
//! An instance never blocks: it submits a job, returns, and looks at the job
//! status again on the next tick. Results that are not readable yet defer the
//! instance instead of failing it.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - thresholds, search and refinement settings
//! - **Backend** ([`backend`]) - the QC backend interface and the file-exchange backend
//! - **Validation** ([`frequency`], [`irc`]) - saddle-point and reaction-path checks
//! - **Instances** ([`instance`], [`finder`], [`fragments`]) - candidates, their state
//!   machine and the product fragments they share
//! - **Orchestration** ([`orchestrator`], [`snapshot`], [`summary`]) - the tick loop and
//!   the files it maintains
//! - **Refinement** ([`refine`]) - optional conformer search and high-level optimization
//! - **Wells** ([`wells`], [`molecular`]) - the well list shared by concurrent explorations
//!   and the molecular data of every stationary point found
//! - **Progress Monitoring** ([`progress`]) - progress reporting and user feedback
//! - **Error Handling** ([`error`]) - engine errors and the reaction failure taxonomy

pub mod backend;
pub mod config;
pub mod error;
pub mod finder;
pub mod fragments;
pub mod frequency;
pub mod instance;
pub mod irc;
pub mod molecular;
pub mod orchestrator;
pub mod progress;
pub mod refine;
pub mod snapshot;
pub mod summary;
pub mod wells;
