use super::config::SetupConfig;
use super::error::SetupError;
use super::registries::{ComponentKind, ComponentRegistries};
use crate::components::peak_profile::PeakProfileOwner;
use crate::components::peak_width::PeakWidthModelOwner;
use crate::components::scattering::{
    CustomFactorRecord, ScatteringFactorTableOwner, apply_custom_factors,
};
use crate::core::attributes::{
    AttributeError, AttributeTable, Attributes, HasAttributeTable, require_finite,
};
use crate::core::registry::RegistryError;
use crate::core::snapshot::ComponentSnapshot;
use crate::core::ticker::EventTicker;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, instrument};

const DEFAULT_RMIN: f64 = 0.0;
const DEFAULT_RMAX: f64 = 10.0;
const DEFAULT_RSTEP: f64 = 0.01;
const DEFAULT_QMIN: f64 = 0.0;
const DEFAULT_QMAX: f64 = f64::INFINITY;
const DEFAULT_SCALE: f64 = 1.0;

/// Upper bound on the number of points [`CalculationSetup::r_grid`] will build.
pub const MAX_GRID_POINTS: usize = 50_000_000;

fn invalid(name: &str, value: f64, reason: &'static str) -> AttributeError {
    AttributeError::InvalidValue {
        name: name.to_string(),
        value,
        reason,
    }
}

fn require_non_negative(name: &str, value: f64) -> Result<f64, AttributeError> {
    let value = require_finite(name, value)?;
    if value < 0.0 {
        return Err(invalid(name, value, "value must not be negative"));
    }
    Ok(value)
}

fn require_positive(name: &str, value: f64) -> Result<f64, AttributeError> {
    let value = require_finite(name, value)?;
    if value <= 0.0 {
        return Err(invalid(name, value, "value must be positive"));
    }
    Ok(value)
}

/// The components and grid of one PDF calculation.
///
/// Grid quantities are attributes of the setup itself. The setup ticker clicks
/// whenever one of them changes; [`CalculationSetup::ticker_value`] folds in the
/// three owned components, so any change anywhere in the setup is visible as a
/// newer value.
#[derive(Debug, Clone)]
pub struct CalculationSetup {
    rmin: f64,
    rmax: f64,
    rstep: f64,
    qmin: f64,
    qmax: f64,
    scale: f64,
    ticker: EventTicker,
    attributes: AttributeTable<CalculationSetup>,
    peak_profile: PeakProfileOwner,
    peak_width: PeakWidthModelOwner,
    scattering_table: ScatteringFactorTableOwner,
}

impl CalculationSetup {
    /// Setup with default grid and fresh instances of the named types.
    pub fn new(
        registries: &ComponentRegistries,
        peak_profile: &str,
        peak_width: &str,
        scattering_table: &str,
    ) -> Result<Self, RegistryError> {
        Ok(Self::from_owners(
            PeakProfileOwner::with_type(registries.peak_profiles(), peak_profile)?,
            PeakWidthModelOwner::with_type(registries.peak_widths(), peak_width)?,
            ScatteringFactorTableOwner::with_type(registries.scattering_tables(), scattering_table)?,
        ))
    }

    fn from_owners(
        peak_profile: PeakProfileOwner,
        peak_width: PeakWidthModelOwner,
        scattering_table: ScatteringFactorTableOwner,
    ) -> Self {
        Self {
            rmin: DEFAULT_RMIN,
            rmax: DEFAULT_RMAX,
            rstep: DEFAULT_RSTEP,
            qmin: DEFAULT_QMIN,
            qmax: DEFAULT_QMAX,
            scale: DEFAULT_SCALE,
            ticker: EventTicker::new(peak_profile.clock()),
            attributes: Self::build_attributes(),
            peak_profile,
            peak_width,
            scattering_table,
        }
    }

    fn build_attributes() -> AttributeTable<Self> {
        let mut table = AttributeTable::new();
        table
            .register("rmin", |s: &Self| s.rmin, Some(Self::set_rmin))
            .and_then(|t| t.register("rmax", |s: &Self| s.rmax, Some(Self::set_rmax)))
            .and_then(|t| t.register("rstep", |s: &Self| s.rstep, Some(Self::set_rstep)))
            .and_then(|t| t.register("qmin", |s: &Self| s.qmin, Some(Self::set_qmin)))
            .and_then(|t| t.register("qmax", |s: &Self| s.qmax, Some(Self::set_qmax)))
            .and_then(|t| t.register("scale", |s: &Self| s.scale, Some(Self::set_scale)))
            .expect("CalculationSetup attribute names are unique");
        table
    }

    /// Builds a setup from `config`: creates each component from its snapshot,
    /// applies grid attributes and finally the custom scattering factors.
    #[instrument(
        skip_all,
        name = "calculation_setup",
        fields(
            peak_profile = %config.peak_profile.type_name,
            peak_width = %config.peak_width.type_name,
            scattering_table = %config.scattering_table.type_name,
        )
    )]
    pub fn from_config(
        registries: &ComponentRegistries,
        config: &SetupConfig,
    ) -> Result<Self, SetupError> {
        let peak_profile = config
            .peak_profile
            .restore(registries.peak_profiles())
            .map_err(|e| SetupError::component(ComponentKind::PeakProfile, e))?;
        let peak_width = config
            .peak_width
            .restore(registries.peak_widths())
            .map_err(|e| SetupError::component(ComponentKind::PeakWidth, e))?;
        let scattering_table = config
            .scattering_table
            .restore(registries.scattering_tables())
            .map_err(|e| SetupError::component(ComponentKind::ScatteringFactorTable, e))?;

        let mut setup = Self::from_owners(
            PeakProfileOwner::new(peak_profile),
            PeakWidthModelOwner::new(peak_width),
            ScatteringFactorTableOwner::new(scattering_table),
        );
        for (name, value) in &config.grid {
            setup
                .set_attribute(name, *value)
                .map_err(SetupError::grid)?;
        }
        apply_custom_factors(setup.scattering_table.get_mut(), &config.custom_factors)?;

        info!(
            rmin = setup.rmin,
            rmax = setup.rmax,
            rstep = setup.rstep,
            custom_factors = config.custom_factors.len(),
            "Calculation setup assembled."
        );
        Ok(setup)
    }

    pub fn rmin(&self) -> f64 {
        self.rmin
    }
    pub fn rmax(&self) -> f64 {
        self.rmax
    }
    pub fn rstep(&self) -> f64 {
        self.rstep
    }
    pub fn qmin(&self) -> f64 {
        self.qmin
    }
    pub fn qmax(&self) -> f64 {
        self.qmax
    }
    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn set_rmin(&mut self, value: f64) -> Result<(), AttributeError> {
        self.rmin = require_non_negative("rmin", value)?;
        self.ticker.click();
        Ok(())
    }

    pub fn set_rmax(&mut self, value: f64) -> Result<(), AttributeError> {
        self.rmax = require_non_negative("rmax", value)?;
        self.ticker.click();
        Ok(())
    }

    pub fn set_rstep(&mut self, value: f64) -> Result<(), AttributeError> {
        self.rstep = require_positive("rstep", value)?;
        self.ticker.click();
        Ok(())
    }

    pub fn set_qmin(&mut self, value: f64) -> Result<(), AttributeError> {
        self.qmin = require_non_negative("qmin", value)?;
        self.ticker.click();
        Ok(())
    }

    /// Infinite `qmax` disables the Q cutoff.
    pub fn set_qmax(&mut self, value: f64) -> Result<(), AttributeError> {
        if value.is_nan() || value <= 0.0 {
            return Err(invalid("qmax", value, "value must be positive"));
        }
        self.qmax = value;
        self.ticker.click();
        Ok(())
    }

    pub fn set_scale(&mut self, value: f64) -> Result<(), AttributeError> {
        self.scale = require_finite("scale", value)?;
        self.ticker.click();
        Ok(())
    }

    /// Points `rmin + i * rstep` below `rmax`.
    pub fn r_grid(&self) -> Result<Vec<f64>, SetupError> {
        let span = self.rmax - self.rmin;
        if span <= 0.0 {
            return Ok(Vec::new());
        }
        let points = (span / self.rstep).ceil();
        if points > MAX_GRID_POINTS as f64 {
            return Err(SetupError::GridTooLarge {
                points,
                limit: MAX_GRID_POINTS,
            });
        }
        let count = points as usize;
        Ok((0..count)
            .map(|i| self.rmin + i as f64 * self.rstep)
            .collect())
    }

    pub fn peak_profile(&self) -> &PeakProfileOwner {
        &self.peak_profile
    }

    pub fn peak_profile_mut(&mut self) -> &mut PeakProfileOwner {
        &mut self.peak_profile
    }

    pub fn peak_width(&self) -> &PeakWidthModelOwner {
        &self.peak_width
    }

    pub fn peak_width_mut(&mut self) -> &mut PeakWidthModelOwner {
        &mut self.peak_width
    }

    pub fn scattering_table(&self) -> &ScatteringFactorTableOwner {
        &self.scattering_table
    }

    pub fn scattering_table_mut(&mut self) -> &mut ScatteringFactorTableOwner {
        &mut self.scattering_table
    }

    /// Replaces the component of `kind` with a fresh instance of `name`.
    pub fn set_component_type(
        &mut self,
        registries: &ComponentRegistries,
        kind: ComponentKind,
        name: &str,
    ) -> Result<(), RegistryError> {
        match kind {
            ComponentKind::PeakProfile => self
                .peak_profile
                .set_by_type(registries.peak_profiles(), name),
            ComponentKind::PeakWidth => self.peak_width.set_by_type(registries.peak_widths(), name),
            ComponentKind::ScatteringFactorTable => self
                .scattering_table
                .set_by_type(registries.scattering_tables(), name),
        }
    }

    /// Latest modification of the grid or any owned component.
    pub fn ticker_value(&self) -> u64 {
        self.ticker.combined_value([
            self.peak_profile.ticker_value(),
            self.peak_width.ticker_value(),
            self.scattering_table.ticker_value(),
        ])
    }

    /// Grid values, component snapshots and the custom scattering factors of
    /// the owned table.
    pub fn snapshot(&self) -> Result<SetupSnapshot, AttributeError> {
        let grid = self
            .attribute_names()
            .into_iter()
            .map(|name| self.get_attribute(&name).map(|value| (name, value)))
            .collect::<Result<_, _>>()?;
        Ok(SetupSnapshot {
            grid,
            peak_profile: ComponentSnapshot::capture(self.peak_profile.get())?,
            peak_width: ComponentSnapshot::capture(self.peak_width.get())?,
            scattering_table: ComponentSnapshot::capture(self.scattering_table.get())?,
            custom_factors: self.scattering_table.get().custom_factors().records(),
        })
    }
}

impl HasAttributeTable for CalculationSetup {
    fn attribute_table(&self) -> &AttributeTable<Self> {
        &self.attributes
    }
}

/// Serializable state of a [`CalculationSetup`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SetupSnapshot {
    #[serde(default)]
    pub grid: BTreeMap<String, f64>,
    pub peak_profile: ComponentSnapshot,
    pub peak_width: ComponentSnapshot,
    pub scattering_table: ComponentSnapshot,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_factors: Vec<CustomFactorRecord>,
}

impl SetupSnapshot {
    pub fn into_config(self) -> SetupConfig {
        SetupConfig {
            peak_profile: self.peak_profile,
            peak_width: self.peak_width,
            scattering_table: self.scattering_table,
            grid: self.grid,
            custom_factors: self.custom_factors,
        }
    }

    pub fn restore(&self, registries: &ComponentRegistries) -> Result<CalculationSetup, SetupError> {
        debug!("Restoring calculation setup from snapshot.");
        CalculationSetup::from_config(registries, &self.clone().into_config())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::peak_profile::PeakProfile;
    use crate::components::peak_width::ConstantPeakWidth;
    use crate::components::scattering::ScatteringFactorTable;
    use crate::core::ticker::ClockSource;
    use crate::engine::config::SetupConfigBuilder;

    fn registries() -> ComponentRegistries {
        ComponentRegistries::with_builtins().unwrap()
    }

    fn setup(registries: &ComponentRegistries) -> CalculationSetup {
        CalculationSetup::new(registries, "gauss", "jeong", "EN").unwrap()
    }

    #[test]
    fn new_setup_has_default_grid() {
        let registries = registries();
        let setup = setup(&registries);
        assert_eq!(setup.get_attribute("rmin"), Ok(0.0));
        assert_eq!(setup.get_attribute("rmax"), Ok(10.0));
        assert_eq!(setup.get_attribute("rstep"), Ok(0.01));
        assert_eq!(setup.qmax(), f64::INFINITY);
        assert_eq!(setup.scattering_table().type_name(), "electronnumber");
    }

    #[test]
    fn grid_setters_validate_and_click() {
        let registries = registries();
        let mut setup = setup(&registries);
        let before = setup.ticker_value();

        assert!(matches!(
            setup.set_attribute("rstep", 0.0),
            Err(AttributeError::InvalidValue { .. })
        ));
        assert!(setup.set_attribute("rmin", -1.0).is_err());
        assert!(setup.set_attribute("qmax", f64::NAN).is_err());
        assert_eq!(setup.ticker_value(), before);

        setup.set_attribute("rmax", 20.0).unwrap();
        assert_eq!(setup.rmax(), 20.0);
        assert!(setup.ticker_value() > before);
    }

    #[test]
    fn component_changes_advance_setup_ticker() {
        let registries = registries();
        let mut setup = setup(&registries);

        let stamp = setup.ticker_value();
        setup
            .peak_width_mut()
            .get_mut()
            .set_attribute("qbroad", 0.02)
            .unwrap();
        assert!(setup.ticker_value() > stamp);

        let stamp = setup.ticker_value();
        setup
            .scattering_table_mut()
            .get_mut()
            .set_custom("Na", 7.0)
            .unwrap();
        assert!(setup.ticker_value() > stamp);

        let stamp = setup.ticker_value();
        setup
            .set_component_type(&registries, ComponentKind::PeakWidth, "constant")
            .unwrap();
        assert_eq!(setup.peak_width().type_name(), "constant");
        assert!(setup.ticker_value() > stamp);
    }

    #[test]
    fn failed_component_swap_keeps_previous_component() {
        let registries = registries();
        let mut setup = setup(&registries);
        let stamp = setup.ticker_value();
        assert!(
            setup
                .set_component_type(&registries, ComponentKind::PeakProfile, "lorentz")
                .is_err()
        );
        assert_eq!(setup.peak_profile().type_name(), "gauss");
        assert_eq!(setup.ticker_value(), stamp);
    }

    #[test]
    fn r_grid_spans_rmin_to_rmax() {
        let registries = registries();
        let mut setup = setup(&registries);
        setup.set_rmin(1.0).unwrap();
        setup.set_rmax(2.0).unwrap();
        setup.set_rstep(0.25).unwrap();
        assert_eq!(setup.r_grid().unwrap(), vec![1.0, 1.25, 1.5, 1.75]);

        setup.set_rmax(0.5).unwrap();
        assert!(setup.r_grid().unwrap().is_empty());
    }

    #[test]
    fn r_grid_refuses_oversized_grids() {
        let registries = registries();
        let mut setup = setup(&registries);
        setup.set_rstep(1e-300).unwrap();
        assert!(matches!(
            setup.r_grid(),
            Err(SetupError::GridTooLarge { limit: MAX_GRID_POINTS, .. })
        ));
    }

    #[test]
    fn from_config_resolves_aliases_and_applies_everything() {
        let registries = registries();
        let config = SetupConfigBuilder::new()
            .peak_profile("gauss")
            .peak_width("debye_waller")
            .scattering_table("EN")
            .component_attribute(ComponentKind::PeakProfile, "precision", 1e-6)
            .grid_attribute("rmax", 30.0)
            .custom_factor(CustomFactorRecord {
                symbol: "Na".to_string(),
                source: None,
                value: 7.0,
                q: None,
            })
            .build()
            .unwrap();

        let setup = CalculationSetup::from_config(&registries, &config).unwrap();
        assert_eq!(setup.peak_width().type_name(), "debye-waller");
        assert_eq!(setup.peak_profile().get().precision(), 1e-6);
        assert_eq!(setup.rmax(), 30.0);
        assert_eq!(setup.scattering_table().get().lookup("Na", 0.0), Ok(7.0));
    }

    #[test]
    fn from_config_reports_which_part_failed() {
        let registries = registries();
        let base = || {
            SetupConfigBuilder::new()
                .peak_profile("gauss")
                .peak_width("constant")
                .scattering_table("EN")
        };

        let unknown_type = base().peak_width("lorentz").build().unwrap();
        assert!(matches!(
            CalculationSetup::from_config(&registries, &unknown_type),
            Err(SetupError::Registry {
                source: RegistryError::NotFound { .. }
            })
        ));

        let bad_attribute = base()
            .component_attribute(ComponentKind::PeakWidth, "width", -1.0)
            .build()
            .unwrap();
        assert!(matches!(
            CalculationSetup::from_config(&registries, &bad_attribute),
            Err(SetupError::Attribute {
                target: "peak-width",
                ..
            })
        ));

        let bad_grid = base().grid_attribute("rstep", -0.1).build().unwrap();
        assert!(matches!(
            CalculationSetup::from_config(&registries, &bad_grid),
            Err(SetupError::Attribute { target: "grid", .. })
        ));

        let bad_custom = base()
            .custom_factor(CustomFactorRecord {
                symbol: "Xx".to_string(),
                source: Some("Qq".to_string()),
                value: 1.0,
                q: None,
            })
            .build()
            .unwrap();
        assert!(matches!(
            CalculationSetup::from_config(&registries, &bad_custom),
            Err(SetupError::CustomFactor { .. })
        ));
    }

    #[test]
    fn snapshot_restores_equivalent_setup() {
        let registries = registries();
        let mut setup = setup(&registries);
        setup.set_rmax(15.0).unwrap();
        setup
            .peak_width_mut()
            .get_mut()
            .set_attribute("delta1", 0.4)
            .unwrap();
        setup
            .scattering_table_mut()
            .get_mut()
            .set_custom("Na", 7.0)
            .unwrap();

        let snapshot = setup.snapshot().unwrap();
        assert_eq!(snapshot.peak_width.type_name, "jeong");
        assert_eq!(snapshot.grid.get("rmax"), Some(&15.0));
        assert_eq!(snapshot.custom_factors.len(), 1);

        let restored = snapshot.restore(&registries).unwrap();
        assert_eq!(restored.snapshot().unwrap(), snapshot);
        assert_eq!(
            restored.scattering_table().get().lookup("Na", 0.0),
            Ok(7.0)
        );
    }

    #[test]
    fn peak_width_owner_refuses_model_from_other_clock() {
        let registries = registries();
        let mut setup = setup(&registries);
        let stamp = setup.ticker_value();

        let foreign = ClockSource::new();
        let result = setup
            .peak_width_mut()
            .set(Box::new(ConstantPeakWidth::new(&foreign)));
        assert!(matches!(result, Err(RegistryError::ForeignClock { .. })));
        assert_eq!(setup.peak_width().type_name(), "jeong");

        setup
            .peak_width_mut()
            .get_mut()
            .set_attribute("delta1", 0.5)
            .unwrap();
        assert!(setup.ticker_value() > stamp);
    }

    #[test]
    fn clone_is_independent_of_original() {
        let registries = registries();
        let mut setup = setup(&registries);
        let copy = setup.clone();
        let copy_stamp = copy.ticker_value();
        setup.set_scale(2.0).unwrap();
        assert_eq!(copy.scale(), 1.0);
        assert_eq!(copy.ticker_value(), copy_stamp);
    }
}
