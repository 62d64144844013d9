//! Entity Component System core types.
//!
//! Sparse-set storage: every component type lives in its own pool, each
//! entity carries a 64-bit signature of the types it holds, and views walk
//! the smallest pool a query names. Structural changes are announced through
//! per-registry and per-type [`Signal`]s.

mod bundle;
mod component;
mod config;
mod entity;
mod error;
mod free_ids;
mod prefab;
mod registry;
mod signal;
mod signature;
pub mod storage;
mod type_map;
mod view;

pub use bundle::Bundle;
pub use component::{Component, ComponentSet};
pub use config::RegistryConfig;
pub use entity::EntityId;
pub use error::{RegistryError, SignalError};
pub use prefab::Prefab;
pub use registry::{Registry, RegistrySignal};
pub use signal::{Callback, ListenerId, Signal};
pub use signature::Signature;
pub use storage::{ComponentPool, Detached, ErasedComponent, ErasedPool};
pub use type_map::{TypeIndex, TypeMap};
pub use view::{Query, View};
