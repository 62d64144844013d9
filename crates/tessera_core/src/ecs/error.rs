use crate::ecs::EntityId;
use thiserror::Error;

/// Errors returned by registry, view and prefab operations.
///
/// Each variant is a contract violation by the caller; expected absence
/// (`has` returning false, an empty view) is never reported through here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("entity {entity} does not exist")]
    NoSuchEntity { entity: EntityId },

    #[error("entity {entity} has no '{component}' component")]
    MissingComponent {
        entity: EntityId,
        component: &'static str,
    },

    #[error("component '{component}' is not registered")]
    UnregisteredComponent { component: &'static str },

    #[error("cannot register '{component}': registry already holds {limit} component types")]
    TooManyComponentTypes {
        limit: usize,
        component: &'static str,
    },

    #[error("query names component '{component}' more than once")]
    DuplicateQueryComponent { component: &'static str },

    #[error("dense slot {index} is out of bounds for '{component}' (len {len})")]
    SlotOutOfBounds {
        component: &'static str,
        index: usize,
        len: usize,
    },
}

/// Errors raised while ordering signal listeners.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignalError {
    #[error("listener dependencies form a cycle through {}", listeners.join(" -> "))]
    Cycle { listeners: Vec<String> },

    #[error("listener '{name}' cannot depend on itself")]
    SelfDependency { name: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_culprit() {
        let err = RegistryError::MissingComponent {
            entity: EntityId::new(3),
            component: "Position",
        };
        assert_eq!(err.to_string(), "entity #3 has no 'Position' component");

        let err = SignalError::Cycle {
            listeners: vec!["physics".into(), "render".into()],
        };
        assert_eq!(
            err.to_string(),
            "listener dependencies form a cycle through physics -> render"
        );
    }
}
