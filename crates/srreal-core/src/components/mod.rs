//! # Components Module
//!
//! Concrete component kinds built on the [`crate::core`] infrastructure. Each kind
//! is a trait with [`crate::core::component::Component`] as supertrait and gets its
//! own registry, owner alias and free functions mirroring the registry operations.
//!
//! - [`peak_profile`] - Peak shape functions (`"gauss"`)
//! - [`peak_width`] - Peak width models (`"constant"`, `"debye-waller"`, `"jeong"`)
//! - [`scattering`] - Scattering factor tables with user overrides (`"electronnumber"`)
//! - [`elements`] - Element and ion symbol lookup shared by the tables

pub mod elements;
pub mod peak_profile;
pub mod peak_width;
pub mod scattering;
