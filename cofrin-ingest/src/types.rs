//! Common output contract shared by every document parser.

use chrono::NaiveDate;
use cofrin_core::TransactionCandidate;
use thiserror::Error;

/// What a document yielded: itemized candidates and/or invoice totals.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedDocument {
    pub transactions: Vec<TransactionCandidate>,
    pub invoice_total: Option<f64>,
    pub invoice_due_date: Option<NaiveDate>,
}

#[derive(Debug, Error)]
pub enum ParseError {
    /// A well-formed statement with zero entries is reportable, not fatal.
    #[error("no transactions found in the statement")]
    NoTransactions,

    #[error("invalid document: {0}")]
    InvalidDocument(String),

    #[error("unreadable workbook: {0}")]
    Workbook(String),
}
