use super::registry::{Prototype, RegistryError, TypeRegistry};
use super::ticker::{ClockSource, EventTicker};
use std::fmt;
use tracing::debug;

/// Holder of exactly one component of kind `K`.
///
/// The owner is never empty: it starts from a default instance and every
/// replacement is a single swap. Its private ticker clicks on each swap, so
/// replacing the component counts as a change even when the new instance has an
/// older modification time than the one it replaces.
pub struct ComponentOwner<K: ?Sized + Prototype> {
    component: Box<K>,
    ticker: EventTicker,
}

impl<K: ?Sized + Prototype> ComponentOwner<K> {
    pub fn new(component: Box<K>) -> Self {
        let ticker = EventTicker::new(component.ticker().source());
        Self { component, ticker }
    }

    /// Owner holding a fresh instance of the registered type `name`.
    pub fn with_type(registry: &TypeRegistry<K>, name: &str) -> Result<Self, RegistryError> {
        Ok(Self::new(registry.create(name)?))
    }

    pub fn get(&self) -> &K {
        &self.component
    }

    pub fn get_mut(&mut self) -> &mut K {
        &mut self.component
    }

    /// Installs `component` and returns the previously held one.
    ///
    /// The new component must tick on the owner's clock; otherwise its changes
    /// would not be ordered against values already recorded from this owner.
    pub fn set(&mut self, component: Box<K>) -> Result<Box<K>, RegistryError> {
        if !component.ticker().source().same_source(self.clock()) {
            return Err(RegistryError::ForeignClock {
                kind: K::KIND,
                name: component.type_name().to_string(),
            });
        }
        debug!(
            kind = K::KIND,
            from = self.component.type_name(),
            to = component.type_name(),
            "Replacing owned component."
        );
        let previous = std::mem::replace(&mut self.component, component);
        self.ticker.click();
        Ok(previous)
    }

    /// Installs a fresh instance of the registered type `name`. On failure the
    /// held component is left untouched.
    pub fn set_by_type(
        &mut self,
        registry: &TypeRegistry<K>,
        name: &str,
    ) -> Result<(), RegistryError> {
        let component = registry.create(name)?;
        self.set(component)?;
        Ok(())
    }

    pub fn type_name(&self) -> &str {
        self.component.type_name()
    }

    /// Latest modification of the owner or its component.
    pub fn ticker_value(&self) -> u64 {
        self.ticker
            .combined_value([self.component.ticker_value()])
    }

    pub fn clock(&self) -> &ClockSource {
        self.ticker.source()
    }
}

impl<K: ?Sized + Prototype> Clone for ComponentOwner<K> {
    fn clone(&self) -> Self {
        Self::new(self.component.clone_instance())
    }
}

impl<K: ?Sized + Prototype> fmt::Debug for ComponentOwner<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentOwner")
            .field("kind", &K::KIND)
            .field("type", &self.type_name())
            .field("ticker", &self.ticker_value())
            .finish()
    }
}
