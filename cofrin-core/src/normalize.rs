//! Turns an oracle proposal into a finalized, insert-ready batch.
//!
//! The async pieces (rate lookup, embeddings, persistence) live in the bot
//! pipeline; everything here is pure so the merge/default/gating rules stay
//! directly testable.

use chrono::NaiveDate;

use crate::currency::Converted;
use crate::proposal::OracleProposal;
use crate::transaction::{
    BatchStatus, NormalizedTransaction, TransactionCandidate, DEFAULT_PROMPT_VERSION,
};

/// Short-circuit decision taken before any normalization work.
#[derive(Debug, Clone, PartialEq)]
pub enum Screened {
    /// The oracle asked the user something; forward it, persist nothing.
    Question(String),
    /// Off-topic or cancelled turn; forward the friendly reply.
    Ignored(String),
    /// Transactions may be present, continue the pipeline.
    Proceed,
}

/// Apply the proposal's short-circuit flags.
pub fn screen(proposal: &OracleProposal) -> Screened {
    if let Some(q) = &proposal.pergunta {
        return Screened::Question(q.clone());
    }
    if proposal.ignorar.unwrap_or(false) {
        let reply = proposal
            .resposta
            .clone()
            .unwrap_or_else(|| "🤖 Olá!".to_string());
        return Screened::Ignored(reply);
    }
    Screened::Proceed
}

/// Collect, validate and default-fill the proposal's candidates.
/// Returns an empty vec when nothing usable was extracted.
pub fn prepare_candidates(proposal: &OracleProposal, today: NaiveDate) -> Vec<TransactionCandidate> {
    let mut candidates = proposal.collect_candidates(today);
    for c in &mut candidates {
        c.apply_defaults();
    }
    candidates
}

/// A finalized batch, ready for one `create_many` call.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub status: BatchStatus,
    pub confidence: f64,
    pub transactions: Vec<NormalizedTransaction>,
}

/// Assemble the insert payload: one row per prepared candidate, in order.
///
/// `conversions` and `embeddings` are positional, produced from the same
/// candidate list. A missing entry degrades (rate 1.0 / null embedding)
/// instead of dropping the row; enrichment never blocks the save.
pub fn assemble_batch(
    candidates: &[TransactionCandidate],
    conversions: &[Converted],
    embeddings: &[Option<Vec<f32>>],
    user_id: &str,
    proposal: &OracleProposal,
) -> Batch {
    let confidence = proposal.confidence_score.unwrap_or(1.0);
    let status = BatchStatus::from_confidence(proposal.confidence_score);
    let prompt_version = proposal
        .prompt_version
        .clone()
        .unwrap_or_else(|| DEFAULT_PROMPT_VERSION.to_string());

    let transactions = candidates
        .iter()
        .enumerate()
        .map(|(idx, c)| {
            let conv = conversions.get(idx).copied().unwrap_or(Converted {
                amount_converted: c.amount,
                rate: 1.0,
            });
            NormalizedTransaction {
                user_id: user_id.to_string(),
                amount_converted: conv.amount_converted,
                original_amount: c.amount,
                original_currency: c.currency_code.clone(),
                exchange_rate: conv.rate,
                description: c.description.clone(),
                category: c.category.clone(),
                kind: c.kind,
                date: c.date,
                embedding: embeddings.get(idx).cloned().flatten(),
                status,
                is_validated: status.is_validated(),
                confidence_score: confidence,
                prompt_version: prompt_version.clone(),
            }
        })
        .collect();

    Batch {
        status,
        confidence,
        transactions,
    }
}
