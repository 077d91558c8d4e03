use crate::components::peak_profile::{PeakProfile, PeakProfileRegistry, register_builtin_peak_profiles};
use crate::components::peak_width::{
    PeakWidthModel, PeakWidthModelRegistry, register_builtin_peak_width_models,
};
use crate::components::scattering::{
    ScatteringFactorTable, ScatteringFactorTableRegistry, register_builtin_scattering_factor_tables,
};
use crate::core::attributes::Attributes;
use crate::core::component::Component;
use crate::core::registry::RegistryError;
use crate::core::snapshot::SnapshotError;
use crate::core::ticker::ClockSource;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error(
    "Unknown component kind '{0}' (expected one of: peak-profile, peak-width, scattering-factor-table)"
)]
pub struct ParseKindError(pub String);

/// The component kinds a calculation setup is assembled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ComponentKind {
    PeakProfile,
    PeakWidth,
    ScatteringFactorTable,
}

impl ComponentKind {
    pub const ALL: [ComponentKind; 3] = [
        ComponentKind::PeakProfile,
        ComponentKind::PeakWidth,
        ComponentKind::ScatteringFactorTable,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::PeakProfile => "peak-profile",
            ComponentKind::PeakWidth => "peak-width",
            ComponentKind::ScatteringFactorTable => "scattering-factor-table",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentKind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "peak-profile" | "peakprofile" => Ok(ComponentKind::PeakProfile),
            "peak-width" | "peak-width-model" | "peakwidthmodel" => Ok(ComponentKind::PeakWidth),
            "scattering-factor-table" | "scattering-table" | "sftable" => {
                Ok(ComponentKind::ScatteringFactorTable)
            }
            _ => Err(ParseKindError(s.to_string())),
        }
    }
}

/// A freshly created instance of any kind.
pub enum AnyComponent {
    PeakProfile(Box<dyn PeakProfile>),
    PeakWidth(Box<dyn PeakWidthModel>),
    ScatteringFactorTable(Box<dyn ScatteringFactorTable>),
}

impl AnyComponent {
    pub fn kind(&self) -> ComponentKind {
        match self {
            AnyComponent::PeakProfile(_) => ComponentKind::PeakProfile,
            AnyComponent::PeakWidth(_) => ComponentKind::PeakWidth,
            AnyComponent::ScatteringFactorTable(_) => ComponentKind::ScatteringFactorTable,
        }
    }

    pub fn as_component(&self) -> &dyn Component {
        match self {
            AnyComponent::PeakProfile(c) => c.as_ref(),
            AnyComponent::PeakWidth(c) => c.as_ref(),
            AnyComponent::ScatteringFactorTable(c) => c.as_ref(),
        }
    }

    pub fn as_component_mut(&mut self) -> &mut dyn Component {
        match self {
            AnyComponent::PeakProfile(c) => c.as_mut(),
            AnyComponent::PeakWidth(c) => c.as_mut(),
            AnyComponent::ScatteringFactorTable(c) => c.as_mut(),
        }
    }
}

impl fmt::Debug for AnyComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyComponent")
            .field("kind", &self.kind())
            .field("type", &self.as_component().type_name())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttributeInfo {
    pub name: String,
    pub value: f64,
    pub writable: bool,
}

/// Attribute listing of a registered type, as seen on a default instance.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescription {
    pub kind: ComponentKind,
    pub type_name: String,
    pub attributes: Vec<AttributeInfo>,
}

/// One registry per component kind, all stamping from the same clock.
#[derive(Debug)]
pub struct ComponentRegistries {
    clock: ClockSource,
    peak_profiles: PeakProfileRegistry,
    peak_widths: PeakWidthModelRegistry,
    scattering_tables: ScatteringFactorTableRegistry,
}

impl Default for ComponentRegistries {
    fn default() -> Self {
        Self::new()
    }
}

impl ComponentRegistries {
    /// Empty registries around a new clock.
    pub fn new() -> Self {
        let clock = ClockSource::new();
        Self {
            peak_profiles: PeakProfileRegistry::new(clock.clone()),
            peak_widths: PeakWidthModelRegistry::new(clock.clone()),
            scattering_tables: ScatteringFactorTableRegistry::new(clock.clone()),
            clock,
        }
    }

    /// Registries holding every built-in type and alias.
    pub fn with_builtins() -> Result<Self, RegistryError> {
        let mut registries = Self::new();
        register_builtin_peak_profiles(&mut registries.peak_profiles)?;
        register_builtin_peak_width_models(&mut registries.peak_widths)?;
        register_builtin_scattering_factor_tables(&mut registries.scattering_tables)?;
        debug!(
            peak_profiles = registries.peak_profiles.len(),
            peak_widths = registries.peak_widths.len(),
            scattering_tables = registries.scattering_tables.len(),
            "Registered built-in component types."
        );
        Ok(registries)
    }

    pub fn clock(&self) -> &ClockSource {
        &self.clock
    }

    pub fn peak_profiles(&self) -> &PeakProfileRegistry {
        &self.peak_profiles
    }

    pub fn peak_profiles_mut(&mut self) -> &mut PeakProfileRegistry {
        &mut self.peak_profiles
    }

    pub fn peak_widths(&self) -> &PeakWidthModelRegistry {
        &self.peak_widths
    }

    pub fn peak_widths_mut(&mut self) -> &mut PeakWidthModelRegistry {
        &mut self.peak_widths
    }

    pub fn scattering_tables(&self) -> &ScatteringFactorTableRegistry {
        &self.scattering_tables
    }

    pub fn scattering_tables_mut(&mut self) -> &mut ScatteringFactorTableRegistry {
        &mut self.scattering_tables
    }

    pub fn create_by_type(
        &self,
        kind: ComponentKind,
        name: &str,
    ) -> Result<AnyComponent, RegistryError> {
        Ok(match kind {
            ComponentKind::PeakProfile => AnyComponent::PeakProfile(self.peak_profiles.create(name)?),
            ComponentKind::PeakWidth => AnyComponent::PeakWidth(self.peak_widths.create(name)?),
            ComponentKind::ScatteringFactorTable => {
                AnyComponent::ScatteringFactorTable(self.scattering_tables.create(name)?)
            }
        })
    }

    /// Registers `prototype` with the registry of its kind.
    pub fn register_type(&mut self, prototype: AnyComponent) -> Result<bool, RegistryError> {
        match prototype {
            AnyComponent::PeakProfile(p) => self.peak_profiles.add(p),
            AnyComponent::PeakWidth(p) => self.peak_widths.add(p),
            AnyComponent::ScatteringFactorTable(p) => self.scattering_tables.add(p),
        }
    }

    pub fn alias_type(
        &mut self,
        kind: ComponentKind,
        existing: &str,
        alias: &str,
    ) -> Result<(), RegistryError> {
        match kind {
            ComponentKind::PeakProfile => self.peak_profiles.alias(existing, alias),
            ComponentKind::PeakWidth => self.peak_widths.alias(existing, alias),
            ComponentKind::ScatteringFactorTable => self.scattering_tables.alias(existing, alias),
        }
    }

    pub fn resolve(&self, kind: ComponentKind, name: &str) -> Result<String, RegistryError> {
        let canonical = match kind {
            ComponentKind::PeakProfile => self.peak_profiles.resolve(name)?,
            ComponentKind::PeakWidth => self.peak_widths.resolve(name)?,
            ComponentKind::ScatteringFactorTable => self.scattering_tables.resolve(name)?,
        };
        Ok(canonical.to_string())
    }

    /// Canonical type names of `kind`; aliases are not included.
    pub fn list_types(&self, kind: ComponentKind) -> BTreeSet<String> {
        match kind {
            ComponentKind::PeakProfile => self.peak_profiles.types(),
            ComponentKind::PeakWidth => self.peak_widths.types(),
            ComponentKind::ScatteringFactorTable => self.scattering_tables.types(),
        }
    }

    /// Alias to canonical name pairs of `kind`.
    pub fn list_aliases(&self, kind: ComponentKind) -> BTreeMap<String, String> {
        match kind {
            ComponentKind::PeakProfile => self.peak_profiles.aliases(),
            ComponentKind::PeakWidth => self.peak_widths.aliases(),
            ComponentKind::ScatteringFactorTable => self.scattering_tables.aliases(),
        }
    }

    pub fn describe_type(
        &self,
        kind: ComponentKind,
        name: &str,
    ) -> Result<TypeDescription, SnapshotError> {
        let instance = self.create_by_type(kind, name)?;
        let component = instance.as_component();
        let attributes = component
            .attribute_names()
            .into_iter()
            .map(|attr| -> Result<AttributeInfo, SnapshotError> {
                Ok(AttributeInfo {
                    value: component.get_attribute(&attr)?,
                    writable: component.attribute_is_writable(&attr)?,
                    name: attr,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(TypeDescription {
            kind,
            type_name: component.type_name().to_string(),
            attributes,
        })
    }
}
