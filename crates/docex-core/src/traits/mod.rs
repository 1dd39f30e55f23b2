//! Core traits for docex collaborators.

mod cache_store;
mod history;
mod label_detector;
mod semantic;
mod text_extractor;

pub use cache_store::*;
pub use history::*;
pub use label_detector::*;
pub use semantic::*;
pub use text_extractor::*;
