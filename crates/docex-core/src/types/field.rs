//! Field type tags and classified field specs.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Closed set of field kinds the extractor knows how to resolve.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Closed set of ALL-CAPS values listed in the description.
    Enum,
    Date,
    Currency,
    Percentage,
    Phone,
    Cpf,
    Cnpj,
    Email,
    Cep,
    Number,
    /// Short free text resolved by the semantic pass.
    Simple,
    /// Long free text (addresses, notes) resolved by the semantic pass.
    MultiLine,
}

impl FieldType {
    /// Extraction priority; lower values claim text first.
    pub fn priority(self) -> u8 {
        match self {
            FieldType::Enum => 1,
            FieldType::Simple => 3,
            FieldType::MultiLine => 4,
            _ => 2,
        }
    }

    /// Whether the field is resolved by the enum/regex claim pass.
    pub fn is_structured(self) -> bool {
        self.priority() <= 2
    }
}

/// A schema field after classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub description: String,
    pub field_type: FieldType,
    /// Position in the caller's schema.
    pub order: usize,
}

impl FieldSpec {
    pub fn priority(&self) -> u8 {
        self.field_type.priority()
    }
}
