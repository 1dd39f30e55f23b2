//! Field classification and enum value parsing.

mod classifier;
mod enum_parser;

pub use classifier::{classify, classify_schema};
pub use enum_parser::{extract_enum_values, find_best_match, EnumMatch};
