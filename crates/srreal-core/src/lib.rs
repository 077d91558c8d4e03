//! # srreal Core Library
//!
//! Pluggable component infrastructure for pair distribution function calculators.
//! Calculation pieces such as peak profiles, peak width models and scattering factor
//! tables are created by name, configured through named numeric attributes and
//! checked for modification through a shared logical clock.
//!
//! ## Layers
//!
//! - **[`core`]: The Foundation.** Type registries, attribute tables, the modification
//!   clock, component owners and snapshots. Nothing here knows about concrete kinds.
//!
//! - **[`components`]: The Kinds.** Traits and built-in implementations of each
//!   component kind, registered into the core registries.
//!
//! - **[`engine`]: The Assembly.** Bundles one registry per kind around a single clock,
//!   builds a [`engine::setup::CalculationSetup`] from configuration and caches derived
//!   results until any of its components change.

pub mod components;
pub mod core;
pub mod engine;
