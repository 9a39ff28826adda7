use thiserror::Error;

use crate::{EntityId, VitalKind};

#[derive(Error, Debug)]
pub enum VitalsError {
    #[error("No {kind} vital is tracked for entity {entity:?}")]
    NotFound { entity: EntityId, kind: VitalKind },

    #[error("Entity not found: {0:?}")]
    EntityNotFound(EntityId),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl VitalsError {
    /// Determines whether this error just means the entity or vital isn't tracked (anymore).
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            VitalsError::NotFound { .. } | VitalsError::EntityNotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, VitalsError>;
