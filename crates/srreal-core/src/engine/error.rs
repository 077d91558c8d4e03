use thiserror::Error;

use super::config::ConfigError;
use super::registries::ComponentKind;
use crate::components::scattering::LookupError;
use crate::core::attributes::AttributeError;
use crate::core::registry::RegistryError;
use crate::core::snapshot::SnapshotError;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SetupError {
    #[error("Configuration error: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Component registry error: {source}")]
    Registry {
        #[from]
        source: RegistryError,
    },

    #[error("Invalid {target} attribute: {source}")]
    Attribute {
        target: &'static str,
        #[source]
        source: AttributeError,
    },

    #[error("Grid of {points} points exceeds the limit of {limit}")]
    GridTooLarge { points: f64, limit: usize },

    #[error("Custom scattering factor rejected: {source}")]
    CustomFactor {
        #[from]
        source: LookupError,
    },
}

impl SetupError {
    pub(crate) fn grid(source: AttributeError) -> Self {
        SetupError::Attribute {
            target: "grid",
            source,
        }
    }

    pub(crate) fn component(kind: ComponentKind, source: SnapshotError) -> Self {
        match source {
            SnapshotError::Registry(source) => SetupError::Registry { source },
            SnapshotError::Attribute(source) => SetupError::Attribute {
                target: kind.as_str(),
                source,
            },
        }
    }
}
