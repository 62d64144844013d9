//! Sparse-set storage primitives shared by every component pool.

mod page;
mod pool;

pub use page::Page;
pub use pool::SparseSet;
