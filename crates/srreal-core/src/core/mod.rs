//! # Core Module
//!
//! Generic infrastructure that makes calculation components pluggable: they can be
//! created by name, inspected and configured through named numeric attributes,
//! cloned, and cheaply checked for modifications.
//!
//! ## Key Components
//!
//! - [`ticker`] - Modification clock shared by all components ([`ticker::ClockSource`], [`ticker::EventTicker`])
//! - [`attributes`] - Per-instance tables of named numeric accessors
//! - [`component`] - The [`component::Component`] capability set common to every kind
//! - [`registry`] - Name keyed factories with alias resolution, one per component kind
//! - [`owner`] - Holders that keep exactly one component and expose its modification time
//! - [`snapshot`] - The persisted form of a component: type name plus attribute values
//!
//! ## Usage
//!
//! ```ignore
//! use srreal::core::owner::ComponentOwner;
//! use srreal::engine::registries::ComponentRegistries;
//!
//! let registries = ComponentRegistries::with_builtins()?;
//! let mut owner = ComponentOwner::with_type(registries.peak_profiles(), "gauss")?;
//! let stamp = owner.ticker_value();
//! owner.get_mut().set_attribute("precision", 1e-6)?;
//! assert!(owner.ticker_value() > stamp);
//! ```

pub mod attributes;
pub mod component;
pub mod owner;
pub mod registry;
pub mod snapshot;
pub mod ticker;
