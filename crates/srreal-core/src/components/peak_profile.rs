use crate::core::attributes::{AttributeError, AttributeTable, HasAttributeTable};
use crate::core::component::Component;
use crate::core::owner::ComponentOwner;
use crate::core::registry::{Prototype, RegistryError, TypeRegistry};
use crate::core::ticker::{ClockSource, EventTicker};
use std::collections::BTreeSet;
use std::f64::consts::{LN_2, PI};

pub type PeakProfileRegistry = TypeRegistry<dyn PeakProfile>;
pub type PeakProfileOwner = ComponentOwner<dyn PeakProfile>;

/// Shape function of a single PDF peak, normalized to unit area.
pub trait PeakProfile: Component {
    fn create(&self) -> Box<dyn PeakProfile>;

    fn clone_boxed(&self) -> Box<dyn PeakProfile>;

    /// Profile value at offset `x` from the peak center.
    fn y(&self, x: f64, fwhm: f64) -> f64;

    /// Lower offset beyond which the profile stays below the precision.
    fn x_bound_low(&self, fwhm: f64) -> f64;

    /// Upper offset beyond which the profile stays below the precision.
    fn x_bound_high(&self, fwhm: f64) -> f64;

    fn precision(&self) -> f64;

    fn set_precision(&mut self, eps: f64) -> Result<(), AttributeError>;
}

impl Prototype for dyn PeakProfile {
    const KIND: &'static str = "PeakProfile";

    fn create_instance(&self) -> Box<Self> {
        self.create()
    }

    fn clone_instance(&self) -> Box<Self> {
        self.clone_boxed()
    }
}

/// Gaussian peak profile, registered as `"gauss"`.
#[derive(Debug, Clone)]
pub struct GaussPeakProfile {
    precision: f64,
    half_bound_rel: f64,
    ticker: EventTicker,
    attributes: AttributeTable<GaussPeakProfile>,
}

impl GaussPeakProfile {
    pub const TYPE_NAME: &'static str = "gauss";

    pub fn new(clock: &ClockSource) -> Self {
        Self {
            precision: 0.0,
            half_bound_rel: f64::INFINITY,
            ticker: clock.ticker(),
            attributes: Self::build_attributes(),
        }
    }

    fn build_attributes() -> AttributeTable<Self> {
        let mut table = AttributeTable::new();
        table
            .register(
                "precision",
                |p: &Self| p.precision,
                Some(<Self as PeakProfile>::set_precision),
            )
            .expect("GaussPeakProfile attribute names are unique");
        table
    }
}

impl HasAttributeTable for GaussPeakProfile {
    fn attribute_table(&self) -> &AttributeTable<Self> {
        &self.attributes
    }
}

impl Component for GaussPeakProfile {
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

impl PeakProfile for GaussPeakProfile {
    fn create(&self) -> Box<dyn PeakProfile> {
        Box::new(Self::new(self.ticker.source()))
    }

    fn clone_boxed(&self) -> Box<dyn PeakProfile> {
        Box::new(self.clone())
    }

    fn y(&self, x: f64, fwhm: f64) -> f64 {
        if fwhm <= 0.0 {
            return 0.0;
        }
        let xrel = x / fwhm;
        let norm = 2.0 * (LN_2 / PI).sqrt() / fwhm;
        norm * (-4.0 * LN_2 * xrel * xrel).exp()
    }

    fn x_bound_low(&self, fwhm: f64) -> f64 {
        -self.x_bound_high(fwhm)
    }

    fn x_bound_high(&self, fwhm: f64) -> f64 {
        if fwhm <= 0.0 {
            return 0.0;
        }
        self.half_bound_rel * fwhm
    }

    fn precision(&self) -> f64 {
        self.precision
    }

    fn set_precision(&mut self, eps: f64) -> Result<(), AttributeError> {
        if !(eps.is_finite() && eps >= 0.0) {
            return Err(AttributeError::InvalidValue {
                name: "precision".to_string(),
                value: eps,
                reason: "precision must be a finite non-negative number",
            });
        }
        self.precision = eps;
        self.half_bound_rel = if eps == 0.0 {
            f64::INFINITY
        } else if eps >= 1.0 {
            0.0
        } else {
            (-eps.ln() / (4.0 * LN_2)).sqrt()
        };
        self.ticker.click();
        Ok(())
    }
}

pub fn create_peak_profile(
    registry: &PeakProfileRegistry,
    name: &str,
) -> Result<Box<dyn PeakProfile>, RegistryError> {
    registry.create(name)
}

pub fn register_peak_profile(
    registry: &mut PeakProfileRegistry,
    prototype: Box<dyn PeakProfile>,
) -> Result<bool, RegistryError> {
    registry.add(prototype)
}

pub fn alias_peak_profile(
    registry: &mut PeakProfileRegistry,
    existing: &str,
    alias: &str,
) -> Result<(), RegistryError> {
    registry.alias(existing, alias)
}

pub fn peak_profile_types(registry: &PeakProfileRegistry) -> BTreeSet<String> {
    registry.types()
}

pub fn register_builtin_peak_profiles(
    registry: &mut PeakProfileRegistry,
) -> Result<(), RegistryError> {
    let clock = registry.clock().clone();
    register_peak_profile(registry, Box::new(GaussPeakProfile::new(&clock)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::attributes::Attributes;

    fn registry() -> PeakProfileRegistry {
        let mut registry = PeakProfileRegistry::new(ClockSource::new());
        register_builtin_peak_profiles(&mut registry).unwrap();
        registry
    }

    #[test]
    fn gauss_precision_defaults_to_zero() {
        let registry = registry();
        let profile = create_peak_profile(&registry, "gauss").unwrap();
        assert_eq!(profile.get_attribute("precision"), Ok(0.0));
    }

    #[test]
    fn setting_precision_updates_value_and_clicks_ticker() {
        let registry = registry();
        let mut profile = create_peak_profile(&registry, "gauss").unwrap();
        let before = profile.ticker_value();
        profile.set_attribute("precision", 0.01).unwrap();
        assert_eq!(profile.get_attribute("precision"), Ok(0.01));
        assert!(profile.ticker_value() >= before + 1);
    }

    #[test]
    fn negative_precision_is_rejected() {
        let registry = registry();
        let mut profile = create_peak_profile(&registry, "gauss").unwrap();
        let before = profile.ticker_value();
        assert!(matches!(
            profile.set_attribute("precision", -1.0),
            Err(AttributeError::InvalidValue { .. })
        ));
        assert_eq!(profile.precision(), 0.0);
        assert_eq!(profile.ticker_value(), before);
    }

    #[test]
    fn alias_default_is_not_listed_but_creates_gauss() {
        let mut registry = registry();
        alias_peak_profile(&mut registry, "gauss", "default").unwrap();
        assert_eq!(
            peak_profile_types(&registry).into_iter().collect::<Vec<_>>(),
            vec!["gauss"]
        );
        let profile = create_peak_profile(&registry, "default").unwrap();
        assert_eq!(profile.type_name(), "gauss");
    }

    #[test]
    fn registering_gauss_again_is_idempotent() {
        let mut registry = registry();
        let clock = registry.clock().clone();
        let again = register_peak_profile(&mut registry, Box::new(GaussPeakProfile::new(&clock)));
        assert_eq!(again, Ok(false));
    }

    #[test]
    fn gauss_drops_to_half_maximum_at_half_width() {
        let clock = ClockSource::new();
        let profile = GaussPeakProfile::new(&clock);
        let fwhm = 0.3;
        let peak = profile.y(0.0, fwhm);
        let half = profile.y(fwhm / 2.0, fwhm);
        assert!((half / peak - 0.5).abs() < 1e-12);
        assert_eq!(profile.y(0.1, 0.0), 0.0);
    }

    #[test]
    fn gauss_is_normalized() {
        let clock = ClockSource::new();
        let profile = GaussPeakProfile::new(&clock);
        let fwhm = 0.5;
        let dx = 1e-3;
        let area: f64 = (-5000..=5000)
            .map(|i| profile.y(i as f64 * dx, fwhm) * dx)
            .sum();
        assert!((area - 1.0).abs() < 1e-6);
    }

    #[test]
    fn bounds_follow_precision() {
        let clock = ClockSource::new();
        let mut profile = GaussPeakProfile::new(&clock);
        assert_eq!(profile.x_bound_high(0.2), f64::INFINITY);
        profile.set_precision(1e-6).unwrap();
        let hi = profile.x_bound_high(0.2);
        assert!(hi.is_finite() && hi > 0.1);
        assert_eq!(profile.x_bound_low(0.2), -hi);
        profile.set_precision(2.0).unwrap();
        assert_eq!(profile.x_bound_high(0.2), 0.0);
    }

    #[test]
    fn clone_keeps_precision_and_gets_own_ticker() {
        let registry = registry();
        let mut profile = create_peak_profile(&registry, "gauss").unwrap();
        profile.set_attribute("precision", 1e-5).unwrap();
        let copy = profile.clone_instance();
        assert_eq!(copy.get_attribute("precision"), Ok(1e-5));
        let copy_value = copy.ticker_value();
        profile.set_attribute("precision", 1e-4).unwrap();
        assert_eq!(copy.ticker_value(), copy_value);
    }
}
