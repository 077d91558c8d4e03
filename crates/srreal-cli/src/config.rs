use crate::cli::SetupArgs;
use crate::error::{CliError, Result};
use serde::Deserialize;
use srreal::components::scattering::{CustomFactorRecord, load_custom_factors};
use srreal::engine::config::{SetupConfig, SetupConfigBuilder};
use srreal::engine::error::SetupError;
use srreal::engine::registries::ComponentKind;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

const DEFAULT_PEAK_PROFILE: &str = "gauss";
const DEFAULT_PEAK_WIDTH: &str = "jeong";
const DEFAULT_SCATTERING_TABLE: &str = "electronnumber";

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialGridConfig {
    rmin: Option<f64>,
    rmax: Option<f64>,
    rstep: Option<f64>,
    qmin: Option<f64>,
    qmax: Option<f64>,
    scale: Option<f64>,
}

impl PartialGridConfig {
    fn slot(&mut self, name: &str) -> Option<&mut Option<f64>> {
        match name {
            "rmin" => Some(&mut self.rmin),
            "rmax" => Some(&mut self.rmax),
            "rstep" => Some(&mut self.rstep),
            "qmin" => Some(&mut self.qmin),
            "qmax" => Some(&mut self.qmax),
            "scale" => Some(&mut self.scale),
            _ => None,
        }
    }

    fn values(&self) -> impl Iterator<Item = (&'static str, f64)> {
        [
            ("rmin", self.rmin),
            ("rmax", self.rmax),
            ("rstep", self.rstep),
            ("qmin", self.qmin),
            ("qmax", self.qmax),
            ("scale", self.scale),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name, v)))
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialComponentConfig {
    #[serde(rename = "type")]
    type_name: Option<String>,
    #[serde(default)]
    attributes: BTreeMap<String, f64>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
struct PartialCustomFactor {
    symbol: String,
    source: Option<String>,
    value: f64,
    q: Option<f64>,
}

impl From<PartialCustomFactor> for CustomFactorRecord {
    fn from(p: PartialCustomFactor) -> Self {
        Self {
            symbol: p.symbol,
            source: p.source,
            value: p.value,
            q: p.q,
        }
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialCustomFactorsConfig {
    file: Option<PathBuf>,
    #[serde(default)]
    values: Vec<PartialCustomFactor>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialSetupConfig {
    grid: Option<PartialGridConfig>,
    #[serde(rename = "peak-profile")]
    peak_profile: Option<PartialComponentConfig>,
    #[serde(rename = "peak-width")]
    peak_width: Option<PartialComponentConfig>,
    #[serde(rename = "scattering-table")]
    scattering_table: Option<PartialComponentConfig>,
    #[serde(rename = "custom-factors")]
    custom_factors: Option<PartialCustomFactorsConfig>,
}

impl PartialSetupConfig {
    /// Reads a TOML setup file. A relative custom factor file is resolved
    /// against the directory of the setup file.
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })?;

        if let (Some(base), Some(file)) = (
            path.parent(),
            config.custom_factors.as_mut().and_then(|c| c.file.as_mut()),
        ) {
            if file.is_relative() {
                *file = base.join(&*file);
            }
        }
        Ok(config)
    }

    pub fn merge_with_cli(mut self, args: &SetupArgs) -> Result<SetupConfig> {
        self.apply_set_values(&args.set_values)?;
        if let Some(path) = &args.custom_factors {
            self.custom_factors
                .get_or_insert_with(Default::default)
                .file = Some(path.clone());
        }
        self.into_setup_config()
    }

    fn into_setup_config(mut self) -> Result<SetupConfig> {
        let mut builder = SetupConfigBuilder::new();
        for (kind, default_type) in [
            (ComponentKind::PeakProfile, DEFAULT_PEAK_PROFILE),
            (ComponentKind::PeakWidth, DEFAULT_PEAK_WIDTH),
            (ComponentKind::ScatteringFactorTable, DEFAULT_SCATTERING_TABLE),
        ] {
            let component = self.component_mut(kind);
            let type_name = component
                .type_name
                .take()
                .unwrap_or_else(|| default_type.to_string());
            let attributes = std::mem::take(&mut component.attributes);

            builder = builder.component_type(kind, type_name);
            for (name, value) in attributes {
                builder = builder.component_attribute(kind, name, value);
            }
        }

        if let Some(grid) = &self.grid {
            for (name, value) in grid.values() {
                builder = builder.grid_attribute(name, value);
            }
        }

        if let Some(custom) = self.custom_factors.take() {
            if let Some(path) = &custom.file {
                builder = builder.custom_factors(load_custom_factors(path)?);
            }
            builder = builder.custom_factors(custom.values.into_iter().map(Into::into));
        }

        Ok(builder.build().map_err(SetupError::from)?)
    }

    fn component_mut(&mut self, kind: ComponentKind) -> &mut PartialComponentConfig {
        let slot = match kind {
            ComponentKind::PeakProfile => &mut self.peak_profile,
            ComponentKind::PeakWidth => &mut self.peak_width,
            ComponentKind::ScatteringFactorTable => &mut self.scattering_table,
        };
        slot.get_or_insert_with(Default::default)
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let (key, value_str) = kv_pair.split_once('=').ok_or_else(|| {
                CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                ))
            })?;
            let (section, field) = key.split_once('.').ok_or_else(|| {
                CliError::Config(format!(
                    "Invalid --set key: '{}'. Expected SECTION.NAME.",
                    key
                ))
            })?;
            let parse_float = || {
                value_str.trim().parse::<f64>().map_err(|_| {
                    CliError::Config(format!("Invalid float value for {}: {}", key, value_str))
                })
            };

            match section {
                "grid" => {
                    let value = parse_float()?;
                    let slot = self
                        .grid
                        .get_or_insert_with(Default::default)
                        .slot(field)
                        .ok_or_else(|| {
                            CliError::Config(format!("Unknown grid attribute for --set: '{}'", key))
                        })?;
                    *slot = Some(value);
                }
                "peak-profile" | "peak-width" | "scattering-table" => {
                    let kind: ComponentKind = section
                        .parse()
                        .map_err(|e| CliError::Config(format!("{}", e)))?;
                    if field == "type" {
                        self.component_mut(kind).type_name = Some(value_str.trim().to_string());
                    } else {
                        let name = field.strip_prefix("attributes.").unwrap_or(field);
                        let value = parse_float()?;
                        self.component_mut(kind)
                            .attributes
                            .insert(name.to_string(), value);
                    }
                }
                "custom-factors" if field == "file" => {
                    self.custom_factors
                        .get_or_insert_with(Default::default)
                        .file = Some(PathBuf::from(value_str.trim()));
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(())
    }
}
