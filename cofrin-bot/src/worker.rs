//! Background job worker. The inbound handler acknowledges fast and sends
//! jobs here; the worker drains them in arrival order, which also gives
//! per-user ordering (conversation state is read-modify-write and not safe
//! under reordering). There is no mid-pipeline cancellation: a dispatched
//! job runs to completion or failure.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::pipeline::Pipeline;
use crate::transport::ReplyChannel;

pub struct Job {
    pub user_id: String,
    pub kind: JobKind,
    pub reply: Arc<dyn ReplyChannel>,
}

pub enum JobKind {
    Text { body: String },
    Ofx { bytes: Vec<u8> },
    Csv { bytes: Vec<u8> },
    Xlsx { bytes: Vec<u8> },
    Pdf { bytes: Vec<u8>, filename: String },
    Image { bytes: Vec<u8>, mime_type: String },
    Audio { bytes: Vec<u8> },
    PasswordRetry { password: String },
}

pub async fn run_worker(mut rx: mpsc::UnboundedReceiver<Job>, pipeline: Arc<Pipeline>) {
    while let Some(job) = rx.recv().await {
        pipeline.process_job(job).await;
    }
}
