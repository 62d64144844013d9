// mod.rs - Storage module exports

mod component_pool;
mod erased;

pub use component_pool::ComponentPool;
pub use erased::{Detached, ErasedComponent, ErasedPool};
