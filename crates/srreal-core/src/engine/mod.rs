//! # Engine Module
//!
//! Assembles the pluggable components into a single calculation setup and keeps
//! derived results in step with it.
//!
//! - **Registries** ([`registries`]) - One registry per component kind around a shared clock,
//!   with kind-dispatched operations for string level tooling
//! - **Configuration** ([`config`]) - Component type names, attribute values and custom factors
//! - **Setup** ([`setup`]) - The owned components plus grid attributes, and their snapshot
//! - **Caching** ([`cache`]) - Results recomputed only when the clock reports a change
//! - **Error Handling** ([`error`]) - Failures while assembling a setup

pub mod cache;
pub mod config;
pub mod error;
pub mod registries;
pub mod setup;
