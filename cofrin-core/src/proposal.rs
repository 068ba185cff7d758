//! The oracle contract: tolerant parsing of the reasoning engine's JSON
//! proposal into a single normalized candidate list.
//!
//! The oracle is an untrusted input source. It may fence the JSON in
//! markdown, double-encode it as a string, wrap it in prose, emit amounts
//! as strings, or split transactions across more than one field name. All
//! of that is absorbed here, once, so downstream code only ever sees
//! `TransactionCandidate` lists.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::transaction::{TransactionCandidate, TransactionKind};

/// One raw transaction as the oracle states it. Every field is optional;
/// validation happens when converting to a candidate.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct RawTransaction {
    #[serde(default)]
    pub descricao: Option<String>,
    #[serde(default, deserialize_with = "flexible_amount")]
    pub valor: Option<f64>,
    #[serde(default)]
    pub moeda: Option<String>,
    #[serde(default)]
    pub categoria: Option<String>,
    #[serde(default, deserialize_with = "flexible_kind")]
    pub tipo: Option<TransactionKind>,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub raw_id: Option<String>,
}

impl RawTransaction {
    /// Convert to a candidate, dropping entries without a usable amount.
    pub fn into_candidate(self, today: NaiveDate) -> Option<TransactionCandidate> {
        let amount = self.valor?;
        if amount == 0.0 {
            return None;
        }
        Some(TransactionCandidate {
            description: self.descricao.unwrap_or_default(),
            amount: amount.abs(),
            currency_code: self.moeda.unwrap_or_default(),
            category: self.categoria.unwrap_or_default(),
            kind: self.tipo.unwrap_or_default(),
            date: parse_wire_date(self.data.as_deref(), today),
            raw_source_id: self.raw_id,
        })
    }
}

/// The oracle's whole reply. Field names are the wire convention shared
/// with the stored prompts and must stay verbatim.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct OracleProposal {
    #[serde(default)]
    pub transacoes: Vec<RawTransaction>,
    #[serde(default)]
    pub gastos: Vec<RawTransaction>,
    /// Legacy single-object shape: transaction fields at the top level.
    #[serde(default, deserialize_with = "flexible_amount")]
    pub valor: Option<f64>,
    #[serde(default)]
    pub descricao: Option<String>,
    #[serde(default)]
    pub moeda: Option<String>,
    #[serde(default)]
    pub categoria: Option<String>,
    #[serde(default, deserialize_with = "flexible_kind")]
    pub tipo: Option<TransactionKind>,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default, deserialize_with = "flexible_amount")]
    pub total_fatura: Option<f64>,
    #[serde(default)]
    pub vencimento: Option<String>,
    /// Clarification question back to the user; short-circuits persistence.
    #[serde(default)]
    pub pergunta: Option<String>,
    /// Off-topic / cancelled turn; reply with `resposta` and stop.
    #[serde(default)]
    pub ignorar: Option<bool>,
    #[serde(default)]
    pub resposta: Option<String>,
    /// The oracle's decision trail (date math etc). Informational only.
    #[serde(default)]
    pub raciocinio_logico: Option<String>,
    #[serde(default, deserialize_with = "flexible_amount")]
    pub confidence_score: Option<f64>,
    #[serde(default)]
    pub prompt_version: Option<String>,
}

impl OracleProposal {
    /// Merge every transaction-bearing field into one candidate list:
    /// `transacoes`, then `gastos`, then the legacy single object. When
    /// nothing is itemized but an invoice total is present, synthesize a
    /// single invoice-payment candidate.
    pub fn collect_candidates(&self, today: NaiveDate) -> Vec<TransactionCandidate> {
        let mut raw: Vec<RawTransaction> = Vec::new();
        raw.extend(self.transacoes.iter().cloned());
        raw.extend(self.gastos.iter().cloned());
        if raw.is_empty() && self.valor.is_some() {
            raw.push(RawTransaction {
                descricao: self.descricao.clone(),
                valor: self.valor,
                moeda: self.moeda.clone(),
                categoria: self.categoria.clone(),
                tipo: self.tipo,
                data: self.data.clone(),
                raw_id: None,
            });
        }

        if raw.is_empty() {
            if let Some(total) = self.total_fatura {
                raw.push(self.invoice_payment(total));
            }
        }

        raw.into_iter()
            .filter_map(|t| t.into_candidate(today))
            .collect()
    }

    fn invoice_payment(&self, total: f64) -> RawTransaction {
        let venc = self.vencimento.as_deref().unwrap_or("?");
        RawTransaction {
            descricao: Some(format!("Pagamento de Fatura (Venc: {venc})")),
            valor: Some(total),
            moeda: None,
            categoria: Some("Pagamento de Fatura".to_string()),
            tipo: Some(TransactionKind::Expense),
            data: self.vencimento.clone(),
            raw_id: None,
        }
    }
}

/// Parse whatever the oracle returned into a proposal.
///
/// Accepted shapes: a plain JSON object, a markdown-fenced block, a
/// double-encoded JSON string, or an object embedded in surrounding prose
/// (sliced from the first `{` to the last `}`). Anything else yields
/// `None` and the caller drops the turn.
pub fn parse_oracle_content(raw: &str) -> Option<OracleProposal> {
    let stripped = raw.replace("```json", "").replace("```", "");
    let trimmed = stripped.trim();
    if trimmed.is_empty() {
        return None;
    }

    let value = parse_value(trimmed).or_else(|| {
        let start = trimmed.find('{')?;
        let end = trimmed.rfind('}')?;
        if end <= start {
            return None;
        }
        parse_value(&trimmed[start..=end])
    })?;

    if !value.is_object() {
        return None;
    }
    serde_json::from_value(value).ok()
}

fn parse_value(s: &str) -> Option<Value> {
    let mut value: Value = serde_json::from_str(s).ok()?;
    // Double-encoded: the payload itself is a JSON string.
    if let Value::String(inner) = &value {
        value = serde_json::from_str(inner).ok()?;
    }
    Some(value)
}

fn parse_wire_date(s: Option<&str>, today: NaiveDate) -> NaiveDate {
    let Some(s) = s else { return today };
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%d/%m/%Y"))
        .unwrap_or(today)
}

fn flexible_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(deserializer)?;
    Ok(v.and_then(|v| match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', ".").parse().ok(),
        _ => None,
    }))
}

fn flexible_kind<'de, D>(deserializer: D) -> Result<Option<TransactionKind>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(deserializer)?;
    Ok(v.and_then(|v| v.as_str().map(kind_from_str)))
}

fn kind_from_str(s: &str) -> TransactionKind {
    match s.trim().to_lowercase().as_str() {
        "receita" | "entrada" | "income" => TransactionKind::Income,
        _ => TransactionKind::Expense,
    }
}
