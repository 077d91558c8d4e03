use super::attributes::AttributeError;
use super::component::Component;
use super::registry::{Prototype, RegistryError, TypeRegistry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SnapshotError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Attribute(#[from] AttributeError),
}

/// Persistable state of one component: its canonical type name and the values
/// of all its attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentSnapshot {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, f64>,
}

impl ComponentSnapshot {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: f64) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    pub fn capture<C: ?Sized + Component>(component: &C) -> Result<Self, AttributeError> {
        let attributes = component
            .attribute_names()
            .into_iter()
            .map(|name| component.get_attribute(&name).map(|value| (name, value)))
            .collect::<Result<_, _>>()?;
        Ok(Self {
            type_name: component.type_name().to_string(),
            attributes,
        })
    }

    /// Creates the recorded type and replays every writable attribute.
    ///
    /// Read-only attributes are derived state; they are checked for existence
    /// but not written.
    pub fn restore<K: ?Sized + Prototype>(
        &self,
        registry: &TypeRegistry<K>,
    ) -> Result<Box<K>, SnapshotError> {
        let mut component = registry.create(&self.type_name)?;
        self.apply_to(component.as_mut())?;
        Ok(component)
    }

    /// Replays the writable attributes onto an existing component.
    pub fn apply_to<C: ?Sized + Component>(&self, component: &mut C) -> Result<(), AttributeError> {
        for (name, value) in &self.attributes {
            if component.attribute_is_writable(name)? {
                component.set_attribute(name, *value)?;
            }
        }
        Ok(())
    }
}
