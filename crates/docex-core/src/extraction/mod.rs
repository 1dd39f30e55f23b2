//! Sequential field extraction.

mod extractor;
mod lines;
mod strategy;

pub use extractor::SequentialExtractor;
pub use lines::{LineStore, WorkingLine};
pub use strategy::{strategy_for, Strategy};
