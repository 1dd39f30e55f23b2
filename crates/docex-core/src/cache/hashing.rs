//! Content hashes and cache key layout.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::types::Schema;

/// Lowercase hex SHA-256, truncated to `len` characters.
pub fn sha256_hex(bytes: &[u8], len: usize) -> String {
    let mut digest = hex::encode(Sha256::digest(bytes));
    digest.truncate(len);
    digest
}

/// Hash of the raw document bytes.
pub fn pdf_hash(pdf_bytes: &[u8], len: usize) -> String {
    sha256_hex(pdf_bytes, len)
}

/// Hash of the schema's key-sorted JSON, independent of field order.
pub fn schema_hash(schema: &Schema, len: usize) -> String {
    let canonical: Map<String, Value> = schema
        .sorted()
        .into_iter()
        .map(|(name, description)| (name.to_string(), Value::String(description.to_string())))
        .collect();
    sha256_hex(Value::Object(canonical).to_string().as_bytes(), len)
}

/// `extraction:{label}:{pdfHash}:{schemaHash}`
pub fn cache_key(label: &str, pdf_hash: &str, schema_hash: &str) -> String {
    format!("extraction:{}:{}:{}", label, pdf_hash, schema_hash)
}

/// Scan pattern matching every cached extraction of one document.
pub fn pdf_scan_pattern(pdf_hash: &str) -> String {
    format!("extraction:*:{}:*", pdf_hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_hash_ignores_field_order() {
        let a: Schema = [("a", "x"), ("b", "y")].into_iter().collect();
        let b: Schema = [("b", "y"), ("a", "x")].into_iter().collect();
        assert_eq!(schema_hash(&a, 40), schema_hash(&b, 40));
    }

    #[test]
    fn test_schema_hash_depends_on_descriptions() {
        let a: Schema = [("a", "x")].into_iter().collect();
        let b: Schema = [("a", "z")].into_iter().collect();
        assert_ne!(schema_hash(&a, 40), schema_hash(&b, 40));
    }

    #[test]
    fn test_known_digest_and_truncation() {
        let full = sha256_hex(b"abc", 64);
        assert_eq!(
            full,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(pdf_hash(b"abc", 40), full[..40]);
    }

    #[test]
    fn test_key_layout() {
        assert_eq!(cache_key("cnh", "p", "s"), "extraction:cnh:p:s");
        assert_eq!(pdf_scan_pattern("p"), "extraction:*:p:*");
    }
}
