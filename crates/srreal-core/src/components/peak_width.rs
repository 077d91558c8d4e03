use crate::core::attributes::{AttributeError, AttributeTable, HasAttributeTable, require_finite};
use crate::core::component::Component;
use crate::core::owner::ComponentOwner;
use crate::core::registry::{Prototype, RegistryError, TypeRegistry};
use crate::core::ticker::{ClockSource, EventTicker};
use std::collections::BTreeSet;
use std::f64::consts::LN_2;

pub type PeakWidthModelRegistry = TypeRegistry<dyn PeakWidthModel>;
pub type PeakWidthModelOwner = ComponentOwner<dyn PeakWidthModel>;

/// Bond quantities a width model needs, supplied by the bond generator of the
/// calculation pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BondWidthInput {
    /// Interatomic distance in Angstroms.
    pub distance: f64,
    /// Mean square displacement of the two atoms along the bond, in square Angstroms.
    pub msd: f64,
}

/// Strategy for the full width at half maximum of a PDF peak.
pub trait PeakWidthModel: Component {
    fn create(&self) -> Box<dyn PeakWidthModel>;

    fn clone_boxed(&self) -> Box<dyn PeakWidthModel>;

    fn calculate(&self, bond: &BondWidthInput) -> f64;

    /// Upper estimate of the peak width for bonds in `[rmin, rmax]` whose
    /// displacement does not exceed `max_msd`.
    fn max_width(&self, max_msd: f64, rmin: f64, rmax: f64) -> f64;
}

impl Prototype for dyn PeakWidthModel {
    const KIND: &'static str = "PeakWidthModel";

    fn create_instance(&self) -> Box<Self> {
        self.create()
    }

    fn clone_instance(&self) -> Box<Self> {
        self.clone_boxed()
    }
}

/// FWHM of a Gaussian with variance `msd`.
fn msd_to_fwhm(msd: f64) -> f64 {
    if msd <= 0.0 {
        0.0
    } else {
        (8.0 * LN_2 * msd).sqrt()
    }
}

fn require_non_negative(name: &str, value: f64) -> Result<f64, AttributeError> {
    let value = require_finite(name, value)?;
    if value < 0.0 {
        return Err(AttributeError::InvalidValue {
            name: name.to_string(),
            value,
            reason: "value must not be negative",
        });
    }
    Ok(value)
}

/// Same width for every peak, registered as `"constant"`.
#[derive(Debug, Clone)]
pub struct ConstantPeakWidth {
    width: f64,
    ticker: EventTicker,
    attributes: AttributeTable<ConstantPeakWidth>,
}

impl ConstantPeakWidth {
    pub const TYPE_NAME: &'static str = "constant";

    pub fn new(clock: &ClockSource) -> Self {
        Self {
            width: 0.0,
            ticker: clock.ticker(),
            attributes: Self::build_attributes(),
        }
    }

    fn build_attributes() -> AttributeTable<Self> {
        let mut table = AttributeTable::new();
        table
            .register("width", |w: &Self| w.width, Some(Self::set_width))
            .and_then(|t| t.register_read_only("uisowidth", Self::uiso_width))
            .expect("ConstantPeakWidth attribute names are unique");
        table
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn set_width(&mut self, width: f64) -> Result<(), AttributeError> {
        self.width = require_non_negative("width", width)?;
        self.ticker.click();
        Ok(())
    }

    /// Isotropic displacement of two equal atoms that yields the same width.
    fn uiso_width(&self) -> f64 {
        self.width * self.width / (16.0 * LN_2)
    }
}

impl HasAttributeTable for ConstantPeakWidth {
    fn attribute_table(&self) -> &AttributeTable<Self> {
        &self.attributes
    }
}

impl Component for ConstantPeakWidth {
    fn type_name(&self) -> &str {
        Self::TYPE_NAME
    }

    fn ticker(&self) -> &EventTicker {
        &self.ticker
    }

    fn ticker_mut(&mut self) -> &mut EventTicker {
        &mut self.ticker
    }
}

impl PeakWidthModel for ConstantPeakWidth {
    fn create(&self) -> Box<dyn PeakWidthModel> {
        Box::new(Self::new(self.ticker.source()))
    }

    fn clone_boxed(&self) -> Box<dyn PeakWidthModel> {
        Box::new(self.clone())
    }

    fn calculate(&self, _bond: &BondWidthInput) -> f64 {
        self.width
    }

    fn max_width(&self, _max_msd: f64, _rmin: f64, _rmax: f64) -> f64 {
        self.width
    }
}

/// Width from thermal displacements only, registered as `"debye-waller"`.
#[derive(Debug, Clone)]
pub struct DebyeWallerPeakWidth {
    ticker: EventTicker,
    attributes: AttributeTable<DebyeWallerPeakWidth>,
}

impl DebyeWallerPeakWidth {
    pub const TYPE_NAME: &'static str = "debye-waller";

    pub fn new(clock: &ClockSource) -> Self {
        Self {
            ticker: clock.ticker(),
            attributes: AttributeTable::new(),
        }
    }
}

impl HasAttributeTable for DebyeWallerPeakWidth {
    fn attribute_table(&self) -> &AttributeTable<Self> {
        &self.attributes
    }
}

impl Component for DebyeWallerPeakWidth {
    fn type_name(&self) -> &str {
        Self::TYPE_NAME
    }

    fn ticker(&self) -> &EventTicker {
        &self.ticker
    }

    fn ticker_mut(&mut self) -> &mut EventTicker {
        &mut self.ticker
    }
}

impl PeakWidthModel for DebyeWallerPeakWidth {
    fn create(&self) -> Box<dyn PeakWidthModel> {
        Box::new(Self::new(self.ticker.source()))
    }

    fn clone_boxed(&self) -> Box<dyn PeakWidthModel> {
        Box::new(self.clone())
    }

    fn calculate(&self, bond: &BondWidthInput) -> f64 {
        msd_to_fwhm(bond.msd)
    }

    fn max_width(&self, max_msd: f64, _rmin: f64, _rmax: f64) -> f64 {
        msd_to_fwhm(max_msd)
    }
}

/// Debye-Waller width with correlated-motion and resolution corrections,
/// registered as `"jeong"`.
///
/// The thermal width is scaled by `sqrt(1 - delta1/r - delta2/r^2 + qbroad^2 r^2)`.
#[derive(Debug, Clone)]
pub struct JeongPeakWidth {
    delta1: f64,
    delta2: f64,
    qbroad: f64,
    ticker: EventTicker,
    attributes: AttributeTable<JeongPeakWidth>,
}

impl JeongPeakWidth {
    pub const TYPE_NAME: &'static str = "jeong";

    pub fn new(clock: &ClockSource) -> Self {
        Self {
            delta1: 0.0,
            delta2: 0.0,
            qbroad: 0.0,
            ticker: clock.ticker(),
            attributes: Self::build_attributes(),
        }
    }

    fn build_attributes() -> AttributeTable<Self> {
        let mut table = AttributeTable::new();
        table
            .register("delta1", |j: &Self| j.delta1, Some(Self::set_delta1))
            .and_then(|t| t.register("delta2", |j: &Self| j.delta2, Some(Self::set_delta2)))
            .and_then(|t| t.register("qbroad", |j: &Self| j.qbroad, Some(Self::set_qbroad)))
            .expect("JeongPeakWidth attribute names are unique");
        table
    }

    pub fn set_delta1(&mut self, value: f64) -> Result<(), AttributeError> {
        self.delta1 = require_finite("delta1", value)?;
        self.ticker.click();
        Ok(())
    }

    pub fn set_delta2(&mut self, value: f64) -> Result<(), AttributeError> {
        self.delta2 = require_finite("delta2", value)?;
        self.ticker.click();
        Ok(())
    }

    pub fn set_qbroad(&mut self, value: f64) -> Result<(), AttributeError> {
        self.qbroad = require_finite("qbroad", value)?;
        self.ticker.click();
        Ok(())
    }

    fn correction(&self, r: f64) -> f64 {
        let correction =
            1.0 - self.delta1 / r - self.delta2 / (r * r) + self.qbroad * self.qbroad * r * r;
        correction.max(0.0)
    }
}

impl HasAttributeTable for JeongPeakWidth {
    fn attribute_table(&self) -> &AttributeTable<Self> {
        &self.attributes
    }
}

impl Component for JeongPeakWidth {
    fn type_name(&self) -> &str {
        Self::TYPE_NAME
    }

    fn ticker(&self) -> &EventTicker {
        &self.ticker
    }

    fn ticker_mut(&mut self) -> &mut EventTicker {
        &mut self.ticker
    }
}

impl PeakWidthModel for JeongPeakWidth {
    fn create(&self) -> Box<dyn PeakWidthModel> {
        Box::new(Self::new(self.ticker.source()))
    }

    fn clone_boxed(&self) -> Box<dyn PeakWidthModel> {
        Box::new(self.clone())
    }

    fn calculate(&self, bond: &BondWidthInput) -> f64 {
        let thermal = msd_to_fwhm(bond.msd);
        if bond.distance <= 0.0 {
            return thermal;
        }
        thermal * self.correction(bond.distance).sqrt()
    }

    fn max_width(&self, max_msd: f64, rmin: f64, rmax: f64) -> f64 {
        [rmin, rmax]
            .into_iter()
            .map(|distance| {
                self.calculate(&BondWidthInput {
                    distance,
                    msd: max_msd,
                })
            })
            .fold(msd_to_fwhm(max_msd), f64::max)
    }
}

pub fn create_peak_width_model(
    registry: &PeakWidthModelRegistry,
    name: &str,
) -> Result<Box<dyn PeakWidthModel>, RegistryError> {
    registry.create(name)
}

pub fn register_peak_width_model(
    registry: &mut PeakWidthModelRegistry,
    prototype: Box<dyn PeakWidthModel>,
) -> Result<bool, RegistryError> {
    registry.add(prototype)
}

pub fn alias_peak_width_model(
    registry: &mut PeakWidthModelRegistry,
    existing: &str,
    alias: &str,
) -> Result<(), RegistryError> {
    registry.alias(existing, alias)
}

pub fn peak_width_model_types(registry: &PeakWidthModelRegistry) -> BTreeSet<String> {
    registry.types()
}

pub fn register_builtin_peak_width_models(
    registry: &mut PeakWidthModelRegistry,
) -> Result<(), RegistryError> {
    let clock = registry.clock().clone();
    register_peak_width_model(registry, Box::new(ConstantPeakWidth::new(&clock)))?;
    register_peak_width_model(registry, Box::new(DebyeWallerPeakWidth::new(&clock)))?;
    register_peak_width_model(registry, Box::new(JeongPeakWidth::new(&clock)))?;
    alias_peak_width_model(registry, DebyeWallerPeakWidth::TYPE_NAME, "debye_waller")?;
    Ok(())
}
