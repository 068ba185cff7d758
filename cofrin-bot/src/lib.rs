//! cofrin-bot: session store, guardrails, the message pipeline and its
//! background worker, and the persistence gateway.

pub mod config;
pub mod guardrail;
pub mod pipeline;
pub mod session;
pub mod store;
pub mod transport;
pub mod worker;

pub use pipeline::Pipeline;
pub use session::{PendingDocument, SessionStore};
pub use store::{MemoryStore, RestStore, TransactionStore};
pub use transport::{
    ExtractError, InboundMedia, InboundMessage, MediaType, ReplyChannel, StdoutReply,
    TextExtractor, UnavailableExtractor,
};
pub use worker::{run_worker, Job, JobKind};
