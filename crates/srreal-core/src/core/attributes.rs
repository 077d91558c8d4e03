use std::collections::{BTreeSet, HashMap};
use std::fmt;
use thiserror::Error;

pub type Getter<T> = fn(&T) -> f64;
pub type Setter<T> = fn(&mut T, f64) -> Result<(), AttributeError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AttributeError {
    #[error("Unknown attribute '{0}'")]
    NotFound(String),

    #[error("Attribute '{0}' is already registered")]
    Conflict(String),

    #[error("Attribute '{0}' is read-only")]
    ReadOnly(String),

    #[error("Invalid value {value} for attribute '{name}': {reason}")]
    InvalidValue {
        name: String,
        value: f64,
        reason: &'static str,
    },
}

struct AttributeEntry<T> {
    getter: Getter<T>,
    setter: Option<Setter<T>>,
}

impl<T> Clone for AttributeEntry<T> {
    fn clone(&self) -> Self {
        Self {
            getter: self.getter,
            setter: self.setter,
        }
    }
}

/// Named numeric accessors over an instance of `T`.
///
/// Accessors take the instance explicitly, so a table copied along with its
/// instance keeps working on the copy. Setters are responsible for clicking the
/// instance ticker; the table itself never does.
pub struct AttributeTable<T> {
    entries: HashMap<String, AttributeEntry<T>>,
}

impl<T> AttributeTable<T> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn register(
        &mut self,
        name: &str,
        getter: Getter<T>,
        setter: Option<Setter<T>>,
    ) -> Result<&mut Self, AttributeError> {
        if self.entries.contains_key(name) {
            return Err(AttributeError::Conflict(name.to_string()));
        }
        self.entries
            .insert(name.to_string(), AttributeEntry { getter, setter });
        Ok(self)
    }

    pub fn register_read_only(
        &mut self,
        name: &str,
        getter: Getter<T>,
    ) -> Result<&mut Self, AttributeError> {
        self.register(name, getter, None)
    }

    pub fn get(&self, instance: &T, name: &str) -> Result<f64, AttributeError> {
        self.getter(name).map(|getter| getter(instance))
    }

    pub fn getter(&self, name: &str) -> Result<Getter<T>, AttributeError> {
        self.entries
            .get(name)
            .map(|entry| entry.getter)
            .ok_or_else(|| AttributeError::NotFound(name.to_string()))
    }

    pub fn setter(&self, name: &str) -> Result<Setter<T>, AttributeError> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| AttributeError::NotFound(name.to_string()))?;
        entry
            .setter
            .ok_or_else(|| AttributeError::ReadOnly(name.to_string()))
    }

    pub fn has(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn is_writable(&self, name: &str) -> Result<bool, AttributeError> {
        self.entries
            .get(name)
            .map(|entry| entry.setter.is_some())
            .ok_or_else(|| AttributeError::NotFound(name.to_string()))
    }

    pub fn names(&self) -> BTreeSet<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for AttributeTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for AttributeTable<T> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<T> fmt::Debug for AttributeTable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

/// Types that carry their own attribute table.
pub trait HasAttributeTable: Sized {
    fn attribute_table(&self) -> &AttributeTable<Self>;
}

/// Name-based access to the numeric configuration of a component, independent
/// of its concrete type.
pub trait Attributes {
    fn get_attribute(&self, name: &str) -> Result<f64, AttributeError>;

    fn set_attribute(&mut self, name: &str, value: f64) -> Result<(), AttributeError>;

    fn has_attribute(&self, name: &str) -> bool;

    fn attribute_is_writable(&self, name: &str) -> Result<bool, AttributeError>;

    fn attribute_names(&self) -> BTreeSet<String>;
}

impl<T: HasAttributeTable> Attributes for T {
    fn get_attribute(&self, name: &str) -> Result<f64, AttributeError> {
        self.attribute_table().get(self, name)
    }

    fn set_attribute(&mut self, name: &str, value: f64) -> Result<(), AttributeError> {
        let setter = self.attribute_table().setter(name)?;
        setter(self, value)
    }

    fn has_attribute(&self, name: &str) -> bool {
        self.attribute_table().has(name)
    }

    fn attribute_is_writable(&self, name: &str) -> Result<bool, AttributeError> {
        self.attribute_table().is_writable(name)
    }

    fn attribute_names(&self) -> BTreeSet<String> {
        self.attribute_table().names()
    }
}

/// Rejects NaN and infinite values for attributes that must stay finite.
pub fn require_finite(name: &str, value: f64) -> Result<f64, AttributeError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(AttributeError::InvalidValue {
            name: name.to_string(),
            value,
            reason: "value must be finite",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Gauge {
        scale: f64,
        writes: usize,
        table: AttributeTable<Gauge>,
    }

    impl Gauge {
        fn new() -> Self {
            let mut table = AttributeTable::new();
            table
                .register(
                    "scale",
                    |p: &Gauge| p.scale,
                    Some(|p: &mut Gauge, v| {
                        p.scale = require_finite("scale", v)?;
                        p.writes += 1;
                        Ok(())
                    }),
                )
                .unwrap()
                .register_read_only("writes", |p: &Gauge| p.writes as f64)
                .unwrap();
            Self {
                scale: 1.0,
                writes: 0,
                table,
            }
        }
    }

    impl HasAttributeTable for Gauge {
        fn attribute_table(&self) -> &AttributeTable<Self> {
            &self.table
        }
    }

    #[test]
    fn get_returns_current_value() {
        let gauge = Gauge::new();
        assert_eq!(gauge.get_attribute("scale"), Ok(1.0));
        assert_eq!(gauge.get_attribute("writes"), Ok(0.0));
    }

    #[test]
    fn set_invokes_bound_setter() {
        let mut gauge = Gauge::new();
        gauge.set_attribute("scale", 2.5).unwrap();
        assert_eq!(gauge.get_attribute("scale"), Ok(2.5));
        assert_eq!(gauge.get_attribute("writes"), Ok(1.0));
    }

    #[test]
    fn unknown_attribute_is_not_found() {
        let mut gauge = Gauge::new();
        assert_eq!(
            gauge.get_attribute("nonexistent"),
            Err(AttributeError::NotFound("nonexistent".to_string()))
        );
        assert_eq!(
            gauge.set_attribute("nonexistent", 1.0),
            Err(AttributeError::NotFound("nonexistent".to_string()))
        );
    }

    #[test]
    fn write_to_read_only_attribute_fails_and_keeps_value() {
        let mut gauge = Gauge::new();
        assert_eq!(
            gauge.set_attribute("writes", 7.0),
            Err(AttributeError::ReadOnly("writes".to_string()))
        );
        assert_eq!(gauge.get_attribute("writes"), Ok(0.0));
    }

    #[test]
    fn rejected_value_leaves_attribute_unchanged() {
        let mut gauge = Gauge::new();
        let result = gauge.set_attribute("scale", f64::NAN);
        assert!(matches!(result, Err(AttributeError::InvalidValue { .. })));
        assert_eq!(gauge.get_attribute("scale"), Ok(1.0));
    }

    #[test]
    fn duplicate_registration_is_a_conflict() {
        let mut table: AttributeTable<Gauge> = AttributeTable::new();
        table.register_read_only("x", |p| p.scale).unwrap();
        let result = table.register_read_only("x", |p| p.scale);
        assert!(matches!(result, Err(AttributeError::Conflict(name)) if name == "x"));
    }

    #[test]
    fn names_lists_every_registered_attribute() {
        let gauge = Gauge::new();
        let names: Vec<_> = gauge.attribute_names().into_iter().collect();
        assert_eq!(names, vec!["scale", "writes"]);
        assert!(gauge.has_attribute("scale"));
        assert!(!gauge.has_attribute("offset"));
    }

    #[test]
    fn is_writable_distinguishes_read_only_entries() {
        let gauge = Gauge::new();
        assert_eq!(gauge.attribute_is_writable("scale"), Ok(true));
        assert_eq!(gauge.attribute_is_writable("writes"), Ok(false));
        assert!(gauge.attribute_is_writable("missing").is_err());
    }
}
