//! Transaction types shared across the extraction pipeline

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Confidence at or above this marks a batch as confirmed.
pub const CONFIDENCE_THRESHOLD: f64 = 0.7;

/// Tag stamped on rows when the oracle does not report a prompt version.
pub const DEFAULT_PROMPT_VERSION: &str = "v1_stable";

/// Direction of a transaction. Wire values match the stored data
/// ("despesa"/"receita"), so renames must not change.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum TransactionKind {
    #[serde(rename = "despesa")]
    #[default]
    Expense,
    #[serde(rename = "receita")]
    Income,
}

/// Review status of a persisted batch, mirrored per row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BatchStatus {
    #[serde(rename = "confirmed")]
    Confirmed,
    #[serde(rename = "pending_review")]
    PendingReview,
}

impl BatchStatus {
    /// Gate on extraction confidence. Missing confidence counts as 1.0.
    pub fn from_confidence(confidence: Option<f64>) -> Self {
        if confidence.unwrap_or(1.0) >= CONFIDENCE_THRESHOLD {
            BatchStatus::Confirmed
        } else {
            BatchStatus::PendingReview
        }
    }

    pub fn is_validated(&self) -> bool {
        matches!(self, BatchStatus::Confirmed)
    }
}

/// An unvalidated transaction proposal, produced by the oracle or a
/// document parser. Exists only during one processing pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransactionCandidate {
    pub description: String,
    pub amount: f64,
    pub currency_code: String,
    pub category: String,
    pub kind: TransactionKind,
    pub date: NaiveDate,
    /// External identifier (e.g. OFX FITID) kept for future dedup.
    pub raw_source_id: Option<String>,
}

impl TransactionCandidate {
    /// Fill missing description/category with the stock defaults.
    /// Idempotent: a second pass is a no-op.
    pub fn apply_defaults(&mut self) {
        if self.description.trim().is_empty() {
            self.description = "Item".to_string();
        }
        if self.category.trim().is_empty() {
            self.category = "Outros".to_string();
        }
        if self.currency_code.trim().is_empty() {
            self.currency_code = crate::currency::CANONICAL_CURRENCY.to_string();
        }
    }

    /// Text fed to the embedding generator for similarity search.
    pub fn embedding_text(&self) -> String {
        format!("{} - {}", self.description, self.category)
    }
}

/// A finalized, insert-ready transaction row. Serialized field names are
/// the store's column names and must stay stable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NormalizedTransaction {
    pub user_id: String,
    /// Amount in the canonical currency.
    #[serde(rename = "valor")]
    pub amount_converted: f64,
    #[serde(rename = "valor_original")]
    pub original_amount: f64,
    #[serde(rename = "moeda_original")]
    pub original_currency: String,
    #[serde(rename = "taxa_cambio")]
    pub exchange_rate: f64,
    #[serde(rename = "descricao")]
    pub description: String,
    #[serde(rename = "categoria")]
    pub category: String,
    #[serde(rename = "tipo")]
    pub kind: TransactionKind,
    #[serde(rename = "data")]
    pub date: NaiveDate,
    /// Semantic vector over description + category. Null when the
    /// embedding service is down; the row still saves.
    pub embedding: Option<Vec<f32>>,
    pub status: BatchStatus,
    pub is_validated: bool,
    pub confidence_score: f64,
    pub prompt_version: String,
}
