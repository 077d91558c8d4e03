use super::registries::ComponentKind;
use crate::components::scattering::CustomFactorRecord;
use crate::core::snapshot::ComponentSnapshot;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
}

/// Everything needed to assemble a [`super::setup::CalculationSetup`].
///
/// Component type names may be aliases. Grid attributes not listed keep their
/// defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct SetupConfig {
    pub peak_profile: ComponentSnapshot,
    pub peak_width: ComponentSnapshot,
    pub scattering_table: ComponentSnapshot,
    pub grid: BTreeMap<String, f64>,
    pub custom_factors: Vec<CustomFactorRecord>,
}

impl SetupConfig {
    pub fn component(&self, kind: ComponentKind) -> &ComponentSnapshot {
        match kind {
            ComponentKind::PeakProfile => &self.peak_profile,
            ComponentKind::PeakWidth => &self.peak_width,
            ComponentKind::ScatteringFactorTable => &self.scattering_table,
        }
    }
}

#[derive(Default)]
pub struct SetupConfigBuilder {
    peak_profile: Option<String>,
    peak_width: Option<String>,
    scattering_table: Option<String>,
    attributes: BTreeMap<ComponentKind, BTreeMap<String, f64>>,
    grid: BTreeMap<String, f64>,
    custom_factors: Vec<CustomFactorRecord>,
}

impl SetupConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn peak_profile(mut self, type_name: impl Into<String>) -> Self {
        self.peak_profile = Some(type_name.into());
        self
    }
    pub fn peak_width(mut self, type_name: impl Into<String>) -> Self {
        self.peak_width = Some(type_name.into());
        self
    }
    pub fn scattering_table(mut self, type_name: impl Into<String>) -> Self {
        self.scattering_table = Some(type_name.into());
        self
    }
    pub fn component_type(self, kind: ComponentKind, type_name: impl Into<String>) -> Self {
        match kind {
            ComponentKind::PeakProfile => self.peak_profile(type_name),
            ComponentKind::PeakWidth => self.peak_width(type_name),
            ComponentKind::ScatteringFactorTable => self.scattering_table(type_name),
        }
    }
    pub fn component_attribute(
        mut self,
        kind: ComponentKind,
        name: impl Into<String>,
        value: f64,
    ) -> Self {
        self.attributes
            .entry(kind)
            .or_default()
            .insert(name.into(), value);
        self
    }
    pub fn grid_attribute(mut self, name: impl Into<String>, value: f64) -> Self {
        self.grid.insert(name.into(), value);
        self
    }
    pub fn custom_factor(mut self, record: CustomFactorRecord) -> Self {
        self.custom_factors.push(record);
        self
    }
    pub fn custom_factors(mut self, records: impl IntoIterator<Item = CustomFactorRecord>) -> Self {
        self.custom_factors.extend(records);
        self
    }

    pub fn build(mut self) -> Result<SetupConfig, ConfigError> {
        let mut snapshot = |kind: ComponentKind,
                            type_name: Option<String>,
                            field: &'static str|
         -> Result<ComponentSnapshot, ConfigError> {
            let type_name = type_name.ok_or(ConfigError::MissingParameter(field))?;
            Ok(ComponentSnapshot {
                type_name,
                attributes: self.attributes.remove(&kind).unwrap_or_default(),
            })
        };
        Ok(SetupConfig {
            peak_profile: snapshot(
                ComponentKind::PeakProfile,
                self.peak_profile.take(),
                "peak_profile",
            )?,
            peak_width: snapshot(ComponentKind::PeakWidth, self.peak_width.take(), "peak_width")?,
            scattering_table: snapshot(
                ComponentKind::ScatteringFactorTable,
                self.scattering_table.take(),
                "scattering_table",
            )?,
            grid: self.grid,
            custom_factors: self.custom_factors,
        })
    }
}
