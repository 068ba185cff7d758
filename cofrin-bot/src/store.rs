//! Persistence gateway: one batch insert, all-or-nothing from the user's
//! point of view.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use cofrin_core::NormalizedTransaction;
use tokio::sync::Mutex;

/// Batch insert capability. The store is transactional only at batch
/// granularity: either every row is reported saved or the batch failed.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn create_many(
        &self,
        records: &[NormalizedTransaction],
    ) -> Result<Vec<NormalizedTransaction>>;
}

/// PostgREST-style gateway (Supabase-compatible): POST the batch, ask for
/// the saved representation back.
#[derive(Clone)]
pub struct RestStore {
    http: reqwest::Client,
    base_url: String,
    service_key: String,
    table: String,
}

impl RestStore {
    pub fn new(base_url: impl Into<String>, service_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            service_key: service_key.into(),
            table: "transacoes".to_string(),
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }
}

#[async_trait]
impl TransactionStore for RestStore {
    async fn create_many(
        &self,
        records: &[NormalizedTransaction],
    ) -> Result<Vec<NormalizedTransaction>> {
        let url = format!("{}/rest/v1/{}", self.base_url, self.table);
        let resp = self
            .http
            .post(&url)
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .header("Prefer", "return=representation")
            .json(records)
            .send()
            .await
            .context("store request")?;

        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            bail!("store error: {status} {txt}");
        }

        let saved: Vec<NormalizedTransaction> =
            resp.json().await.context("parse store response")?;
        Ok(saved)
    }
}

/// In-memory store for local runs and tests.
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<NormalizedTransaction>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn rows(&self) -> Vec<NormalizedTransaction> {
        self.rows.lock().await.clone()
    }
}

#[async_trait]
impl TransactionStore for MemoryStore {
    async fn create_many(
        &self,
        records: &[NormalizedTransaction],
    ) -> Result<Vec<NormalizedTransaction>> {
        let mut rows = self.rows.lock().await;
        rows.extend_from_slice(records);
        Ok(records.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use cofrin_core::{BatchStatus, TransactionKind};

    fn row() -> NormalizedTransaction {
        NormalizedTransaction {
            user_id: "u".to_string(),
            amount_converted: 10.0,
            original_amount: 10.0,
            original_currency: "BRL".to_string(),
            exchange_rate: 1.0,
            description: "Item".to_string(),
            category: "Outros".to_string(),
            kind: TransactionKind::Expense,
            date: NaiveDate::from_ymd_opt(2026, 1, 3).unwrap(),
            embedding: None,
            status: BatchStatus::Confirmed,
            is_validated: true,
            confidence_score: 1.0,
            prompt_version: "v1_stable".to_string(),
        }
    }

    #[tokio::test]
    async fn test_memory_store_returns_all_rows() {
        let store = MemoryStore::new();
        let batch = vec![row(), row()];
        let saved = store.create_many(&batch).await.unwrap();
        assert_eq!(saved.len(), 2);
        assert_eq!(store.rows().await.len(), 2);
    }

    #[test]
    fn test_row_serializes_with_store_column_names() {
        let json = serde_json::to_value(row()).unwrap();
        for key in [
            "user_id",
            "valor",
            "valor_original",
            "moeda_original",
            "taxa_cambio",
            "descricao",
            "categoria",
            "tipo",
            "data",
            "embedding",
            "status",
            "is_validated",
            "confidence_score",
            "prompt_version",
        ] {
            assert!(json.get(key).is_some(), "missing column {key}");
        }
        assert_eq!(json["tipo"], "despesa");
        assert_eq!(json["status"], "confirmed");
        assert_eq!(json["data"], "2026-01-03");
    }
}
