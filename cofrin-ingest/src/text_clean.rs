//! Document text hygiene before anything reaches the oracle: PII masking,
//! banking-noise stripping and a hard size cap.

use regex::{Regex, RegexBuilder};
use std::sync::LazyLock;

/// Cap on text sent to the oracle, to bound cost and latency.
pub const MAX_ORACLE_CHARS: usize = 15_000;

static CPF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{3}\.?\d{3}\.?\d{3}-?\d{2}\b").expect("cpf regex"));
static CNPJ_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{2}\.?\d{3}\.?\d{3}/?\d{4}-?\d{2}\b").expect("cnpj regex"));
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    // The bounded unicode classes push the compiled program past regex's
    // default 10 MiB cap; raise the limit without altering the pattern.
    RegexBuilder::new(r"\b[\w.-]{1,64}@[\w.-]{1,255}\.[a-zA-Z]{2,10}\b")
        .size_limit(64 * (1 << 20))
        .build()
        .expect("email regex")
});
// Card first: a hyphenated card number would otherwise half-match as a phone.
static CARD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:\d{4}[-\s]?){3}\d{4}\b").expect("card regex"));
static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\(?\d{2}\)?\s?)?(?:9\d{4}|\d{4})-?\d{4}\b").expect("phone regex")
});

static PAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:Page\s+\d+\s+of\s+\d+|Página\s+\d+\s+de\s+\d+)").expect("page regex")
});
static RULER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_{5,}|-{5,}").expect("ruler regex"));
static SPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s{2,}").expect("space regex"));
static FOOTER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:Ouvidoria|SAC|Atendimento)[^0-9-]{0,200}?[\d-]{8,}").expect("footer regex")
});

/// Mask CPF, CNPJ, email, phone and card numbers before the text leaves
/// the process. Monetary amounts are untouched.
pub fn redact_pii(text: &str) -> String {
    let s = CPF_RE.replace_all(text, "[CPF]");
    let s = CNPJ_RE.replace_all(&s, "[CNPJ]");
    let s = EMAIL_RE.replace_all(&s, "[EMAIL]");
    let s = CARD_RE.replace_all(&s, "[CARD]");
    let s = PHONE_RE.replace_all(&s, "[PHONE]");
    s.into_owned()
}

/// Full cleaning pass for extracted document text: redact PII, strip page
/// markers, rulers and bank-footer noise, collapse whitespace.
pub fn clean_document_text(text: &str) -> String {
    let s = redact_pii(text);
    let s = PAGE_RE.replace_all(&s, "");
    let s = RULER_RE.replace_all(&s, "");
    let s = FOOTER_RE.replace_all(&s, "");
    let s = SPACE_RE.replace_all(&s, " ");
    s.trim().to_string()
}

/// Truncate to the oracle cap on a char boundary.
pub fn truncate_for_oracle(text: &str) -> &str {
    match text.char_indices().nth(MAX_ORACLE_CHARS) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redacts_cpf() {
        assert_eq!(redact_pii("CPF 123.456.789-09 do titular"), "CPF [CPF] do titular");
        assert_eq!(redact_pii("cpf 12345678909"), "cpf [CPF]");
    }

    #[test]
    fn test_redacts_cnpj() {
        assert_eq!(redact_pii("CNPJ 12.345.678/0001-90"), "CNPJ [CNPJ]");
    }

    #[test]
    fn test_redacts_email() {
        assert_eq!(redact_pii("fale com joao.silva@banco.com.br hoje"), "fale com [EMAIL] hoje");
    }

    #[test]
    fn test_redacts_phone() {
        assert_eq!(redact_pii("tel (11) 98765-4321"), "tel [PHONE]");
    }

    #[test]
    fn test_redacts_card() {
        assert_eq!(redact_pii("cartão 1234 5678 9012 3456"), "cartão [CARD]");
        assert_eq!(redact_pii("cartão 1234-5678-9012-3456"), "cartão [CARD]");
    }

    #[test]
    fn test_amounts_left_alone() {
        let s = redact_pii("Compra de R$ 1.234,56 em 10/03");
        assert!(s.contains("R$ 1.234,56"));
    }

    #[test]
    fn test_clean_strips_page_markers_and_rulers() {
        let s = clean_document_text("Extrato ______ Page 1 of 3 saldo --- ----- fim");
        assert!(!s.contains("Page 1 of 3"));
        assert!(!s.contains("_____"));
    }

    #[test]
    fn test_clean_collapses_whitespace() {
        assert_eq!(clean_document_text("a   b\n\n  c"), "a b c");
    }

    #[test]
    fn test_truncate_respects_cap_and_boundaries() {
        let long = "ç".repeat(MAX_ORACLE_CHARS + 10);
        let cut = truncate_for_oracle(&long);
        assert_eq!(cut.chars().count(), MAX_ORACLE_CHARS);
        let short = "pequeno";
        assert_eq!(truncate_for_oracle(short), short);
    }
}
