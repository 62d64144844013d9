//! Tessera Core
//!
//! Entity-component storage for real-time simulation:
//! - Sparse-set component pools with paged id lookup
//! - Registry with id recycling, signatures and lifecycle signals
//! - Views with exclusion filters and partitioned parallel iteration
//! - Prefabs for stamping out preconfigured entities

pub mod ecs;
pub mod pool;

pub use glam;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
