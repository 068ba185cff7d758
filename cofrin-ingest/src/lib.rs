//! cofrin-ingest: document-to-candidates parsers (OFX) and tabular/text
//! flattening for the oracle's document prompt.

pub mod ofx;
pub mod tabular;
pub mod text_clean;
pub mod types;

pub use ofx::parse_ofx;
pub use tabular::{csv_to_text, xlsx_to_text};
pub use text_clean::{clean_document_text, redact_pii, truncate_for_oracle, MAX_ORACLE_CHARS};
pub use types::{ParseError, ParsedDocument};
