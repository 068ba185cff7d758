//! cofrin-core: domain types and pure pipeline logic for the Cofrin finance bot

pub mod conversation;
pub mod correction;
pub mod currency;
pub mod format;
pub mod normalize;
pub mod proposal;
pub mod transaction;

pub use conversation::{ConversationState, ConversationTurn, Role, CONTEXT_TTL_SECS};
pub use correction::{resolve_utterance, Resolution};
pub use currency::{convert, Converted, CANONICAL_CURRENCY};
pub use normalize::{assemble_batch, prepare_candidates, screen, Batch, Screened};
pub use proposal::{parse_oracle_content, OracleProposal, RawTransaction};
pub use transaction::{
    BatchStatus, NormalizedTransaction, TransactionCandidate, TransactionKind,
    CONFIDENCE_THRESHOLD, DEFAULT_PROMPT_VERSION,
};

/// Today's calendar date in the user's timezone.
pub fn today_in(tz: chrono_tz::Tz) -> chrono::NaiveDate {
    chrono::Utc::now().with_timezone(&tz).date_naive()
}
