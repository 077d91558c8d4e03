use super::component::Component;
use super::snapshot::ComponentSnapshot;
use super::ticker::ClockSource;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Unknown {kind} type '{name}'")]
    NotFound { kind: &'static str, name: String },

    #[error("{kind} type '{name}' is already registered: {reason}")]
    Conflict {
        kind: &'static str,
        name: String,
        reason: &'static str,
    },

    #[error("{kind} prototype '{name}' does not implement '{capability}'")]
    NotImplemented {
        kind: &'static str,
        name: String,
        capability: &'static str,
    },

    #[error("{kind} prototype '{name}' uses a clock source foreign to this registry")]
    ForeignClock { kind: &'static str, name: String },
}

/// Factory capabilities of a component kind, implemented for the kind's trait
/// object (for example `dyn PeakProfile`).
pub trait Prototype: Component {
    /// Human readable name of the kind, used in error messages.
    const KIND: &'static str;

    /// New instance of the same concrete type with default configuration.
    fn create_instance(&self) -> Box<Self>;

    /// Copy of this instance with the same configuration and a fresh ticker.
    fn clone_instance(&self) -> Box<Self>;
}

/// Name keyed factory for one component kind.
///
/// Prototypes are registered once during initialization and never removed.
/// Aliases always point at a canonical name. The registry performs no internal
/// locking; all registration must happen before calculation threads read it.
pub struct TypeRegistry<K: ?Sized + Prototype> {
    clock: ClockSource,
    prototypes: HashMap<String, Box<K>>,
    aliases: HashMap<String, String>,
}

impl<K: ?Sized + Prototype> TypeRegistry<K> {
    pub fn new(clock: ClockSource) -> Self {
        Self {
            clock,
            prototypes: HashMap::new(),
            aliases: HashMap::new(),
        }
    }

    pub fn clock(&self) -> &ClockSource {
        &self.clock
    }

    /// Registers `prototype` under its own type name.
    ///
    /// Returns `Ok(true)` for a new registration and `Ok(false)` when an
    /// equivalent prototype (same concrete type and attribute values) is already
    /// present.
    pub fn add(&mut self, prototype: Box<K>) -> Result<bool, RegistryError> {
        let name = prototype.type_name().to_string();
        self.validate(&name, &prototype)?;

        if let Some(existing) = self.prototypes.get(&name) {
            if existing.concrete_type() == prototype.concrete_type()
                && same_configuration(existing.as_ref(), prototype.as_ref())
            {
                warn!(kind = K::KIND, name = %name, "Type is already registered; ignoring.");
                return Ok(false);
            }
            return Err(RegistryError::Conflict {
                kind: K::KIND,
                name,
                reason: "a different prototype owns this name",
            });
        }
        if self.aliases.contains_key(&name) {
            return Err(RegistryError::Conflict {
                kind: K::KIND,
                name,
                reason: "the name is in use as an alias",
            });
        }

        debug!(kind = K::KIND, name = %name, "Registered type.");
        self.prototypes.insert(name, prototype);
        Ok(true)
    }

    fn validate(&self, name: &str, prototype: &K) -> Result<(), RegistryError> {
        let not_implemented = |capability| RegistryError::NotImplemented {
            kind: K::KIND,
            name: name.to_string(),
            capability,
        };
        if name.is_empty() {
            return Err(not_implemented("type_name"));
        }
        let created = prototype.create_instance();
        if created.type_name() != name || created.concrete_type() != prototype.concrete_type() {
            return Err(not_implemented("create"));
        }
        let cloned = prototype.clone_instance();
        if cloned.type_name() != name || cloned.concrete_type() != prototype.concrete_type() {
            return Err(not_implemented("clone"));
        }
        if !prototype.ticker().source().same_source(&self.clock) {
            return Err(RegistryError::ForeignClock {
                kind: K::KIND,
                name: name.to_string(),
            });
        }
        Ok(())
    }

    /// Makes `alias` an accepted synonym of the type `existing`.
    pub fn alias(&mut self, existing: &str, alias: &str) -> Result<(), RegistryError> {
        let canonical = self.resolve(existing)?.to_string();
        if self.prototypes.contains_key(alias) {
            if alias == canonical {
                return Ok(());
            }
            return Err(RegistryError::Conflict {
                kind: K::KIND,
                name: alias.to_string(),
                reason: "the alias is a canonical type name",
            });
        }
        match self.aliases.get(alias) {
            Some(target) if *target == canonical => Ok(()),
            Some(_) => Err(RegistryError::Conflict {
                kind: K::KIND,
                name: alias.to_string(),
                reason: "the alias points to another type",
            }),
            None => {
                debug!(kind = K::KIND, alias, canonical = %canonical, "Registered alias.");
                self.aliases.insert(alias.to_string(), canonical);
                Ok(())
            }
        }
    }

    /// Canonical name for a type name or alias.
    pub fn resolve<'a>(&'a self, name: &'a str) -> Result<&'a str, RegistryError> {
        if self.prototypes.contains_key(name) {
            return Ok(name);
        }
        self.aliases
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| RegistryError::NotFound {
                kind: K::KIND,
                name: name.to_string(),
            })
    }

    pub fn create(&self, name: &str) -> Result<Box<K>, RegistryError> {
        let canonical = self.resolve(name)?;
        let prototype = self.prototype(canonical).ok_or_else(|| RegistryError::NotFound {
            kind: K::KIND,
            name: name.to_string(),
        })?;
        Ok(prototype.clone_instance())
    }

    pub fn prototype(&self, name: &str) -> Option<&K> {
        self.prototypes.get(name).map(|p| p.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name).is_ok()
    }

    pub fn types(&self) -> BTreeSet<String> {
        self.prototypes.keys().cloned().collect()
    }

    pub fn aliases(&self) -> BTreeMap<String, String> {
        self.aliases
            .iter()
            .map(|(alias, canonical)| (alias.clone(), canonical.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.prototypes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prototypes.is_empty()
    }
}

/// Created instances start as clones of their prototype, so two prototypes of
/// one type are only interchangeable when their attributes agree.
fn same_configuration<K: ?Sized + Component>(a: &K, b: &K) -> bool {
    match (ComponentSnapshot::capture(a), ComponentSnapshot::capture(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

impl<K: ?Sized + Prototype> fmt::Debug for TypeRegistry<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("kind", &K::KIND)
            .field("types", &self.types())
            .field("aliases", &self.aliases())
            .finish()
    }
}
