//! Built-in cache store implementations.

mod memory;

pub use memory::{glob_match, InMemoryCacheStore};
