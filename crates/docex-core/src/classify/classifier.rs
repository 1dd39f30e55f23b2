//! Field type classification from a field's name and description.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use std::collections::HashSet;

use super::enum_parser::INDICATOR_PHRASES;
use crate::types::{FieldSpec, FieldType, Schema};

/// Keyword table, checked top to bottom; the first hit decides the type.
///
/// A name like `data_valor` hits both Date and Currency and resolves to
/// Date because Date is listed first.
const KEYWORDS: &[(FieldType, &[&str])] = &[
    (
        FieldType::Date,
        &["data", "date", "nascimento", "validade", "vencimento", "emissão", "emissao"],
    ),
    (
        FieldType::Currency,
        &["valor", "price", "preco", "preço", "salario", "salário", "custo", "receita"],
    ),
    (
        FieldType::Percentage,
        &["percentual", "percent", "taxa", "juros", "desconto", "alíquota", "aliquota"],
    ),
    (
        FieldType::Phone,
        &["telefone", "phone", "celular", "fone", "contato"],
    ),
    (FieldType::Cpf, &["cpf"]),
    (FieldType::Cnpj, &["cnpj"]),
    (FieldType::Email, &["email", "e-mail", "mail"]),
    (
        FieldType::Cep,
        &["cep", "codigo postal", "código postal", "postal code"],
    ),
    (
        FieldType::Number,
        &["numero", "número", "number", "quantidade", "qtd", "idade", "ano"],
    ),
    (
        FieldType::MultiLine,
        &[
            "endereço",
            "endereco",
            "address",
            "descrição",
            "descricao",
            "description",
            "observação",
            "observacao",
            "histórico",
            "historico",
            "comentário",
            "comentario",
        ],
    ),
];

static INDICATOR_RE: Lazy<Regex> = Lazy::new(|| {
    let alternation = INDICATOR_PHRASES
        .iter()
        .map(|p| regex::escape(p))
        .collect::<Vec<_>>()
        .join("|");
    RegexBuilder::new(&alternation)
        .case_insensitive(true)
        .build()
        .unwrap()
});

static CAPS_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-ZÀÁÂÃÇÉÊÍÓÔÕÚ]{3,}\b").unwrap());

/// Classify a field. Pure and deterministic.
pub fn classify(name: &str, description: &str) -> FieldType {
    if looks_like_enum(description) {
        return FieldType::Enum;
    }

    let haystack = format!("{} {}", name, description).to_lowercase();
    KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| haystack.contains(k)))
        .map(|(field_type, _)| *field_type)
        .unwrap_or(FieldType::Simple)
}

/// Classify every field of a schema, keeping schema positions.
pub fn classify_schema(schema: &Schema) -> Vec<FieldSpec> {
    schema
        .iter()
        .enumerate()
        .map(|(order, (name, description))| FieldSpec {
            name: name.to_string(),
            description: description.to_string(),
            field_type: classify(name, description),
            order,
        })
        .collect()
}

/// An indicator phrase followed by at least two distinct ALL-CAPS tokens.
fn looks_like_enum(description: &str) -> bool {
    INDICATOR_RE.find_iter(description).any(|m| {
        let distinct: HashSet<&str> = CAPS_TOKEN
            .find_iter(&description[m.end()..])
            .map(|t| t.as_str())
            .collect();
        distinct.len() >= 2
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_detection() {
        assert_eq!(
            classify("situacao", "Situação: pode ser REGULAR, IRREGULAR ou SUSPENSA"),
            FieldType::Enum
        );
        assert_eq!(
            classify("plano", "Plano contratado, escolha entre BASICO ou PREMIUM"),
            FieldType::Enum
        );
    }

    #[test]
    fn test_enum_phrases_are_the_parser_phrases() {
        // No parser phrase, so not an enum.
        assert_eq!(
            classify("status", "Status, one of ACTIVE or INACTIVE"),
            FieldType::Simple
        );
        for phrase in INDICATOR_PHRASES {
            let description = format!("Campo {} ALPHA ou BRAVO", phrase);
            assert_eq!(classify("campo", &description), FieldType::Enum, "{phrase}");
            assert_eq!(
                crate::classify::extract_enum_values(&description),
                vec!["ALPHA", "BRAVO"],
                "{phrase}"
            );
        }
    }

    #[test]
    fn test_enum_needs_two_distinct_caps_tokens() {
        // Only one caps token after the phrase: falls through to keywords.
        assert_eq!(
            classify("tipo", "pode ser CNH apenas"),
            FieldType::Simple
        );
        assert_eq!(
            classify("tipo", "pode ser CNH ou CNH"),
            FieldType::Simple
        );
    }

    #[test]
    fn test_keyword_types() {
        assert_eq!(classify("cpf", "CPF do titular"), FieldType::Cpf);
        assert_eq!(classify("cnpj_empresa", "CNPJ"), FieldType::Cnpj);
        assert_eq!(classify("nascimento", "Data de nascimento"), FieldType::Date);
        assert_eq!(classify("total", "Valor total em reais"), FieldType::Currency);
        assert_eq!(classify("juros", "Taxa de juros"), FieldType::Percentage);
        assert_eq!(classify("celular", "Telefone celular"), FieldType::Phone);
        assert_eq!(classify("contato", "E-mail de contato"), FieldType::Phone);
        assert_eq!(classify("email", "Endereço eletrônico"), FieldType::Email);
        assert_eq!(classify("cep", "Código postal"), FieldType::Cep);
        assert_eq!(classify("inscricao", "Número de inscrição"), FieldType::Number);
        assert_eq!(classify("endereco", "Endereço completo"), FieldType::MultiLine);
        assert_eq!(classify("nome", "Nome completo"), FieldType::Simple);
    }

    #[test]
    fn test_table_order_breaks_ties() {
        assert_eq!(classify("data_valor", "Valor pago"), FieldType::Date);
    }

    #[test]
    fn test_keywords_match_inside_words() {
        assert_eq!(classify("dtNascimento", "Quando o titular nasceu"), FieldType::Date);
        assert_eq!(classify("numeroCpf", "Documento do titular"), FieldType::Cpf);
        assert_eq!(classify("telefones", "Lista"), FieldType::Phone);
    }

    #[test]
    fn test_classify_schema_keeps_order() {
        let schema: Schema = [("nome", "Nome"), ("cpf", "CPF")].into_iter().collect();
        let specs = classify_schema(&schema);
        assert_eq!(specs[0].order, 0);
        assert_eq!(specs[1].field_type, FieldType::Cpf);
    }
}
