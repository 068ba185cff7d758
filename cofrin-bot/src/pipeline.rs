//! The message pipeline: fast inbound acknowledgement, then one strictly
//! ordered pass per job (parse, oracle, normalize, persist, reply).
//!
//! Every failure is converted here into a friendly reply or silence;
//! nothing propagates to the user as a fault.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono_tz::Tz;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, warn};

use cofrin_core::format::{
    batch_message, error_message, MSG_NOTHING_IN_DOCUMENT, MSG_NO_VALID_AMOUNT, MSG_SAVE_FAILED,
};
use cofrin_core::normalize::{assemble_batch, prepare_candidates, screen, Screened};
use cofrin_core::proposal::{parse_oracle_content, OracleProposal};
use cofrin_core::{convert, resolve_utterance, today_in, TransactionCandidate, CANONICAL_CURRENCY};
use cofrin_ingest::{clean_document_text, parse_ofx, truncate_for_oracle, ParseError};
use cofrin_oracle::{conversational_prompt, document_prompt, Embedder, Oracle, RateSource, UserContent};

use crate::guardrail;
use crate::session::{PendingDocument, SessionStore};
use crate::store::TransactionStore;
use crate::transport::{
    ExtractError, InboundMedia, InboundMessage, MediaType, ReplyChannel, TextExtractor,
};
use crate::worker::{Job, JobKind};

const ACK_FILE: &str = "⏳ Recebi seu arquivo! Estou processando e te aviso em instantes...";
const ACK_PASSWORD: &str = "⏳ Verificando senha e processando...";
const MSG_UNSUPPORTED_FILE: &str = "❌ Não consegui processar esse tipo de arquivo.";
const MSG_OFX_EMPTY: &str = "Não encontrei transações neste arquivo OFX.";
const MSG_OFX_ERROR: &str = "Erro ao ler arquivo OFX.";
const MSG_DOC_ERROR: &str = "Erro ao ler o documento.";
const MSG_AUDIO_ERROR: &str = "Não consegui entender o áudio.";
const MSG_LOCKED: &str = "🔒 Este documento está protegido por senha. Envie a senha para continuar.";
const MSG_WRONG_PASSWORD: &str = "Senha incorreta. Tente novamente.";
const MSG_NO_PENDING: &str = "Não há documento aguardando senha.";
const MSG_CANCELLED: &str = "Ok, nada foi anotado.";
const MSG_GENERIC: &str = "Tive um problema ao processar sua mensagem. Tente novamente.";

pub struct Pipeline {
    oracle: Arc<dyn Oracle>,
    embedder: Arc<dyn Embedder>,
    rates: Arc<dyn RateSource>,
    store: Arc<dyn TransactionStore>,
    extractor: Arc<dyn TextExtractor>,
    sessions: SessionStore,
    timezone: Tz,
}

impl Pipeline {
    pub fn new(
        oracle: Arc<dyn Oracle>,
        embedder: Arc<dyn Embedder>,
        rates: Arc<dyn RateSource>,
        store: Arc<dyn TransactionStore>,
        extractor: Arc<dyn TextExtractor>,
        timezone: Tz,
    ) -> Self {
        Self {
            oracle,
            embedder,
            rates,
            store,
            extractor,
            sessions: SessionStore::new(),
            timezone,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Fast inbound path: classify the message, acknowledge, and hand the
    /// heavy work to the background worker. Never blocks on the oracle.
    pub async fn accept(
        &self,
        msg: InboundMessage,
        reply: Arc<dyn ReplyChannel>,
        jobs: &UnboundedSender<Job>,
    ) -> Result<()> {
        let user_id = msg.sender_id.clone();

        if let Some(media) = msg.media {
            match classify_media(media) {
                Some(kind) => {
                    reply.reply(ACK_FILE).await?;
                    self.enqueue(jobs, Job { user_id, kind, reply })?;
                }
                None => {
                    reply.reply(MSG_UNSUPPORTED_FILE).await?;
                }
            }
            return Ok(());
        }

        // A locked document is pending: the next text from this user is a
        // password attempt, not a new command.
        if self.sessions.pending_document(&user_id).await.is_some() {
            reply.reply(ACK_PASSWORD).await?;
            self.enqueue(
                jobs,
                Job {
                    user_id,
                    kind: JobKind::PasswordRetry {
                        password: msg.body.trim().to_string(),
                    },
                    reply,
                },
            )?;
            return Ok(());
        }

        let body = msg.body.trim().to_string();
        if body.is_empty() {
            return Ok(());
        }
        self.enqueue(
            jobs,
            Job {
                user_id,
                kind: JobKind::Text { body },
                reply,
            },
        )?;
        Ok(())
    }

    fn enqueue(&self, jobs: &UnboundedSender<Job>, job: Job) -> Result<()> {
        jobs.send(job)
            .map_err(|_| anyhow::anyhow!("worker channel closed"))
    }

    /// Run one job to completion. All errors are absorbed: logged, and
    /// surfaced to the user only as a generic apology.
    pub async fn process_job(&self, job: Job) {
        let user_id = job.user_id;
        let reply = job.reply;

        let result = match job.kind {
            JobKind::Text { body } => self.process_text(&user_id, &body, reply.as_ref()).await,
            JobKind::Ofx { bytes } => self.process_ofx(&user_id, &bytes, reply.as_ref()).await,
            JobKind::Csv { bytes } => self.process_csv(&user_id, &bytes, reply.as_ref()).await,
            JobKind::Xlsx { bytes } => self.process_xlsx(&user_id, &bytes, reply.as_ref()).await,
            JobKind::Pdf { bytes, filename } => {
                self.process_pdf(&user_id, bytes, filename, reply.as_ref()).await
            }
            JobKind::Image { bytes, mime_type } => {
                self.process_image(&user_id, &bytes, &mime_type, reply.as_ref()).await
            }
            JobKind::Audio { bytes } => self.process_audio(&user_id, &bytes, reply.as_ref()).await,
            JobKind::PasswordRetry { password } => {
                self.process_password_retry(&user_id, &password, reply.as_ref()).await
            }
        };

        if let Err(err) = result {
            error!(user_id = %user_id, error = %err, "pipeline job failed");
            let _ = reply.reply(&error_message(MSG_GENERIC)).await;
        }
    }

    async fn process_text(
        &self,
        user_id: &str,
        body: &str,
        reply: &dyn ReplyChannel,
    ) -> Result<()> {
        if guardrail::is_malicious(body) {
            warn!(user_id = %user_id, input = %body, "blocked malicious input");
            reply.reply(guardrail::REFUSAL).await?;
            return Ok(());
        }

        let window = self.sessions.context(user_id).await;
        let today = today_in(self.timezone);
        let raw = self
            .oracle
            .complete(
                &conversational_prompt(today, None),
                window.turns(),
                UserContent::Text(body.to_string()),
            )
            .await?;

        self.finish_extraction(&raw, user_id, Some(body), reply).await?;
        self.sessions.append_exchange(user_id, body, &raw).await;
        Ok(())
    }

    async fn process_ofx(
        &self,
        user_id: &str,
        bytes: &[u8],
        reply: &dyn ReplyChannel,
    ) -> Result<()> {
        let content = String::from_utf8_lossy(bytes);
        match parse_ofx(&content) {
            Ok(doc) => {
                let mut candidates = doc.transactions;
                for c in &mut candidates {
                    c.apply_defaults();
                }
                info!(user_id = %user_id, count = candidates.len(), "parsed OFX statement");
                self.persist_and_confirm(candidates, &OracleProposal::default(), user_id, reply)
                    .await
            }
            Err(ParseError::NoTransactions) => {
                reply.reply(MSG_OFX_EMPTY).await?;
                Ok(())
            }
            Err(err) => {
                warn!(user_id = %user_id, error = %err, "OFX parse failed");
                reply.reply(&error_message(MSG_OFX_ERROR)).await?;
                Ok(())
            }
        }
    }

    async fn process_csv(
        &self,
        user_id: &str,
        bytes: &[u8],
        reply: &dyn ReplyChannel,
    ) -> Result<()> {
        match cofrin_ingest::csv_to_text(bytes) {
            Ok(text) => self.process_document_text(user_id, &text, reply).await,
            Err(err) => {
                warn!(user_id = %user_id, error = %err, "CSV flatten failed");
                reply.reply(&error_message(MSG_DOC_ERROR)).await?;
                Ok(())
            }
        }
    }

    async fn process_xlsx(
        &self,
        user_id: &str,
        bytes: &[u8],
        reply: &dyn ReplyChannel,
    ) -> Result<()> {
        match cofrin_ingest::xlsx_to_text(bytes) {
            Ok(text) => self.process_document_text(user_id, &text, reply).await,
            Err(err) => {
                warn!(user_id = %user_id, error = %err, "XLSX flatten failed");
                reply.reply(&error_message(MSG_DOC_ERROR)).await?;
                Ok(())
            }
        }
    }

    async fn process_pdf(
        &self,
        user_id: &str,
        bytes: Vec<u8>,
        filename: String,
        reply: &dyn ReplyChannel,
    ) -> Result<()> {
        match self.extractor.extract_text(&bytes, None).await {
            Ok(text) => self.process_document_text(user_id, &text, reply).await,
            Err(ExtractError::PasswordRequired) => {
                self.sessions
                    .set_pending_document(user_id, PendingDocument { bytes, filename })
                    .await;
                reply.reply(MSG_LOCKED).await?;
                Ok(())
            }
            Err(err) => {
                warn!(user_id = %user_id, error = %err, "document extraction failed");
                reply.reply(&error_message(MSG_DOC_ERROR)).await?;
                Ok(())
            }
        }
    }

    async fn process_image(
        &self,
        user_id: &str,
        bytes: &[u8],
        mime_type: &str,
        reply: &dyn ReplyChannel,
    ) -> Result<()> {
        let raw = self
            .oracle
            .complete(
                document_prompt(),
                &[],
                UserContent::TextWithImage {
                    text: "Extraia as transações desta imagem.".to_string(),
                    base64: BASE64.encode(bytes),
                    mime_type: mime_type.to_string(),
                },
            )
            .await?;
        self.finish_extraction(&raw, user_id, None, reply).await
    }

    async fn process_audio(
        &self,
        user_id: &str,
        bytes: &[u8],
        reply: &dyn ReplyChannel,
    ) -> Result<()> {
        match self.extractor.extract_text(bytes, None).await {
            // A voice note is just a spoken text turn.
            Ok(transcript) => self.process_text(user_id, &transcript, reply).await,
            Err(err) => {
                warn!(user_id = %user_id, error = %err, "audio transcription failed");
                reply.reply(&error_message(MSG_AUDIO_ERROR)).await?;
                Ok(())
            }
        }
    }

    async fn process_password_retry(
        &self,
        user_id: &str,
        password: &str,
        reply: &dyn ReplyChannel,
    ) -> Result<()> {
        let Some(doc) = self.sessions.pending_document(user_id).await else {
            reply.reply(MSG_NO_PENDING).await?;
            return Ok(());
        };

        match self.extractor.extract_text(&doc.bytes, Some(password)).await {
            Ok(text) => {
                self.sessions.clear_pending_document(user_id).await;
                self.process_document_text(user_id, &text, reply).await
            }
            Err(ExtractError::WrongPassword) | Err(ExtractError::PasswordRequired) => {
                // Keep the slot; the user can try another password.
                reply.reply(&error_message(MSG_WRONG_PASSWORD)).await?;
                Ok(())
            }
            Err(err) => {
                warn!(user_id = %user_id, error = %err, "locked document retry failed");
                self.sessions.clear_pending_document(user_id).await;
                reply.reply(&error_message(MSG_DOC_ERROR)).await?;
                Ok(())
            }
        }
    }

    /// Document path: clean + cap the text, ask the document variant, and
    /// run the shared extraction tail.
    async fn process_document_text(
        &self,
        user_id: &str,
        raw_text: &str,
        reply: &dyn ReplyChannel,
    ) -> Result<()> {
        let cleaned = clean_document_text(raw_text);
        let capped = truncate_for_oracle(&cleaned);
        let raw = self
            .oracle
            .complete(
                document_prompt(),
                &[],
                UserContent::Text(format!("Texto do Documento:\n{capped}")),
            )
            .await?;
        self.finish_extraction(&raw, user_id, None, reply).await
    }

    /// Shared tail: parse the oracle output, apply the short-circuits and
    /// the local cancellation guard, then normalize and persist.
    async fn finish_extraction(
        &self,
        raw: &str,
        user_id: &str,
        utterance: Option<&str>,
        reply: &dyn ReplyChannel,
    ) -> Result<()> {
        let Some(proposal) = parse_oracle_content(raw) else {
            // Defect surface: the oracle broke its JSON contract.
            warn!(user_id = %user_id, output = %raw, "unparseable oracle output, turn dropped");
            return Ok(());
        };

        if let Some(reasoning) = &proposal.raciocinio_logico {
            debug!(user_id = %user_id, reasoning = %reasoning, "oracle decision trail");
        }

        match screen(&proposal) {
            Screened::Question(q) => {
                reply.reply(&q).await?;
                return Ok(());
            }
            Screened::Ignored(r) => {
                reply.reply(&r).await?;
                return Ok(());
            }
            Screened::Proceed => {}
        }

        let today = today_in(self.timezone);
        let candidates = prepare_candidates(&proposal, today);

        // The deterministic resolver outranks the oracle on cancellation:
        // if the user called the turn off, nothing persists.
        if let Some(utterance) = utterance {
            let local = resolve_utterance(utterance);
            if local.cancelled && !candidates.is_empty() {
                warn!(user_id = %user_id, "oracle missed a cancellation, dropping turn");
                reply.reply(MSG_CANCELLED).await?;
                return Ok(());
            }
        }

        if candidates.is_empty() {
            let stated = proposal.transacoes.len()
                + proposal.gastos.len()
                + usize::from(proposal.valor.is_some());
            let msg = if stated > 0 {
                MSG_NO_VALID_AMOUNT
            } else {
                MSG_NOTHING_IN_DOCUMENT
            };
            reply.reply(msg).await?;
            return Ok(());
        }

        self.persist_and_confirm(candidates, &proposal, user_id, reply).await
    }

    /// Convert currency, batch-generate embeddings, assemble and insert in
    /// one call, and confirm every saved row, or fail as a whole.
    async fn persist_and_confirm(
        &self,
        candidates: Vec<TransactionCandidate>,
        proposal: &OracleProposal,
        user_id: &str,
        reply: &dyn ReplyChannel,
    ) -> Result<()> {
        let mut rate_cache: HashMap<String, f64> = HashMap::new();
        let mut conversions = Vec::with_capacity(candidates.len());
        for c in &candidates {
            let code = c.currency_code.trim().to_uppercase();
            let rate = if code.is_empty() || code == CANONICAL_CURRENCY {
                None
            } else if let Some(r) = rate_cache.get(&code) {
                Some(*r)
            } else {
                let r = self.rates.get_rate(&code).await;
                rate_cache.insert(code, r);
                Some(r)
            };
            conversions.push(convert(c.amount, &c.currency_code, rate));
        }

        let texts: Vec<String> = candidates.iter().map(|c| c.embedding_text()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await;

        let batch = assemble_batch(&candidates, &conversions, &embeddings, user_id, proposal);

        match self.store.create_many(&batch.transactions).await {
            Ok(saved) if !saved.is_empty() => {
                info!(
                    user_id = %user_id,
                    rows = saved.len(),
                    status = ?batch.status,
                    "batch persisted"
                );
                reply.reply(&batch_message(&saved)).await?;
            }
            Ok(_) => {
                error!(user_id = %user_id, "store returned no rows for a non-empty batch");
                reply.reply(&error_message(MSG_SAVE_FAILED)).await?;
            }
            Err(err) => {
                error!(user_id = %user_id, error = %err, "batch insert failed");
                reply.reply(&error_message(MSG_SAVE_FAILED)).await?;
            }
        }
        Ok(())
    }
}

/// Map an attachment to its job type. `None` means we can't handle it.
fn classify_media(media: InboundMedia) -> Option<JobKind> {
    let filename = media.filename.to_lowercase();
    let mime = media.mime_type.to_lowercase();
    match media.media_type {
        MediaType::Image => Some(JobKind::Image {
            bytes: media.bytes,
            mime_type: media.mime_type,
        }),
        MediaType::Audio => Some(JobKind::Audio { bytes: media.bytes }),
        MediaType::Document => {
            if filename.ends_with(".pdf") || mime == "application/pdf" {
                Some(JobKind::Pdf {
                    bytes: media.bytes,
                    filename: media.filename,
                })
            } else if filename.ends_with(".ofx") || mime.contains("ofx") {
                Some(JobKind::Ofx { bytes: media.bytes })
            } else if filename.ends_with(".csv") || mime.contains("csv") {
                Some(JobKind::Csv { bytes: media.bytes })
            } else if filename.ends_with(".xlsx")
                || filename.ends_with(".xls")
                || mime.contains("excel")
                || mime.contains("spreadsheet")
            {
                Some(JobKind::Xlsx { bytes: media.bytes })
            } else {
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(filename: &str, mime: &str) -> InboundMedia {
        InboundMedia {
            media_type: MediaType::Document,
            mime_type: mime.to_string(),
            filename: filename.to_string(),
            bytes: vec![1],
        }
    }

    #[test]
    fn test_classify_document_kinds() {
        assert!(matches!(
            classify_media(doc("extrato.ofx", "application/octet-stream")),
            Some(JobKind::Ofx { .. })
        ));
        assert!(matches!(
            classify_media(doc("fatura.PDF", "application/pdf")),
            Some(JobKind::Pdf { .. })
        ));
        assert!(matches!(
            classify_media(doc("planilha.xlsx", "application/vnd.ms-excel")),
            Some(JobKind::Xlsx { .. })
        ));
        assert!(matches!(
            classify_media(doc("dados.csv", "text/csv")),
            Some(JobKind::Csv { .. })
        ));
        assert!(classify_media(doc("virus.exe", "application/x-msdownload")).is_none());
    }

    #[test]
    fn test_classify_image_and_audio() {
        let img = InboundMedia {
            media_type: MediaType::Image,
            mime_type: "image/jpeg".to_string(),
            filename: "recibo.jpg".to_string(),
            bytes: vec![1],
        };
        assert!(matches!(classify_media(img), Some(JobKind::Image { .. })));

        let audio = InboundMedia {
            media_type: MediaType::Audio,
            mime_type: "audio/ogg".to_string(),
            filename: "nota.ogg".to_string(),
            bytes: vec![1],
        };
        assert!(matches!(classify_media(audio), Some(JobKind::Audio { .. })));
    }
}
