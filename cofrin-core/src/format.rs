//! User-facing confirmation and error messages (pt-BR).

use chrono::NaiveDate;

use crate::transaction::{NormalizedTransaction, TransactionKind};

/// Reply when a document/extraction produced nothing usable.
pub const MSG_NOTHING_IN_DOCUMENT: &str =
    "🤔 Não encontrei transações nem valor total nesta fatura.";

/// Reply when every candidate was dropped for lacking an amount.
pub const MSG_NO_VALID_AMOUNT: &str = "🤔 Nenhum valor válido encontrado.";

/// Generic persistence failure; the user never sees row-level detail.
pub const MSG_SAVE_FAILED: &str = "Erro ao salvar dados.";

/// Format a value as Brazilian currency: `R$ 1.234,56`.
pub fn format_brl(value: f64) -> String {
    let cents = (value.abs() * 100.0).round() as u64;
    let int = cents / 100;
    let frac = cents % 100;

    let digits = int.to_string();
    let mut grouped = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    format!("R$ {grouped},{frac:02}")
}

/// Display date as `DD/MM/YYYY`.
pub fn display_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// One confirmation block per saved row.
pub fn success_message(tx: &NormalizedTransaction) -> String {
    let title = match tx.kind {
        TransactionKind::Income => "✅ Entrada Registrada!",
        TransactionKind::Expense => "✅ Gasto Registrado!",
    };
    format!(
        "{title}\n\n🪙 {} ({})\n💰 {}\n🗓️ {}\n\n",
        tx.category,
        tx.description,
        format_brl(tx.amount_converted),
        display_date(tx.date),
    )
}

/// Consolidated confirmation enumerating every saved row.
pub fn batch_message(txs: &[NormalizedTransaction]) -> String {
    let mut out = String::new();
    for tx in txs {
        out.push_str(&success_message(tx));
    }
    out.trim().to_string()
}

pub fn error_message(msg: &str) -> String {
    format!("❌ {msg}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::BatchStatus;

    fn tx(kind: TransactionKind) -> NormalizedTransaction {
        NormalizedTransaction {
            user_id: "u".to_string(),
            amount_converted: 1234.56,
            original_amount: 1234.56,
            original_currency: "BRL".to_string(),
            exchange_rate: 1.0,
            description: "Mercado".to_string(),
            category: "Alimentação".to_string(),
            kind,
            date: NaiveDate::from_ymd_opt(2026, 1, 3).unwrap(),
            embedding: None,
            status: BatchStatus::Confirmed,
            is_validated: true,
            confidence_score: 1.0,
            prompt_version: "v1_stable".to_string(),
        }
    }

    #[test]
    fn test_format_brl_grouping() {
        assert_eq!(format_brl(1234.56), "R$ 1.234,56");
        assert_eq!(format_brl(10.5), "R$ 10,50");
        assert_eq!(format_brl(0.99), "R$ 0,99");
        assert_eq!(format_brl(1_000_000.0), "R$ 1.000.000,00");
    }

    #[test]
    fn test_format_brl_uses_absolute_value() {
        assert_eq!(format_brl(-45.0), "R$ 45,00");
    }

    #[test]
    fn test_success_message_expense_title() {
        let msg = success_message(&tx(TransactionKind::Expense));
        assert!(msg.starts_with("✅ Gasto Registrado!"));
        assert!(msg.contains("Alimentação (Mercado)"));
        assert!(msg.contains("R$ 1.234,56"));
        assert!(msg.contains("03/01/2026"));
    }

    #[test]
    fn test_success_message_income_title() {
        let msg = success_message(&tx(TransactionKind::Income));
        assert!(msg.starts_with("✅ Entrada Registrada!"));
    }

    #[test]
    fn test_batch_message_enumerates_all_rows() {
        let rows = vec![tx(TransactionKind::Expense), tx(TransactionKind::Income)];
        let msg = batch_message(&rows);
        assert!(msg.contains("Gasto Registrado"));
        assert!(msg.contains("Entrada Registrada"));
        assert!(!msg.ends_with('\n'));
    }

    #[test]
    fn test_error_message_prefix() {
        assert_eq!(error_message("Erro ao salvar dados."), "❌ Erro ao salvar dados.");
    }
}
