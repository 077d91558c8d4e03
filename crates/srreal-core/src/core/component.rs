use super::attributes::Attributes;
use super::ticker::EventTicker;
use std::any::{Any, TypeId};

/// Capabilities shared by every pluggable calculation component.
///
/// `type_name` is the canonical registry name of the concrete type. The ticker
/// records the last modification of the component configuration.
pub trait Component: Attributes + Any {
    fn type_name(&self) -> &str;

    fn ticker(&self) -> &EventTicker;

    fn ticker_mut(&mut self) -> &mut EventTicker;

    /// Modification time used for staleness checks. Components that depend on
    /// other state may override this to fold in those dependencies.
    fn ticker_value(&self) -> u64 {
        self.ticker().value()
    }

    fn concrete_type(&self) -> TypeId {
        TypeId::of::<Self>()
    }
}
