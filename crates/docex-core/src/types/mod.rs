//! Core types for docex.

mod batch;
mod cached;
mod field;
mod history;
mod labels;
mod schema;

pub use batch::*;
pub use cached::*;
pub use field::*;
pub use history::*;
pub use labels::*;
pub use schema::*;
