//! Chunk-loop driver shared by every provider.
//!
//! A [`TranslationJob`] owns one request, runs on its own tokio task and walks
//! the text chunk by chunk: pause, fetch, parse, append. The first chunk may
//! flip the target language once when the detected source already equals it.

use crate::config::{AppConfig, ChunkSize, LangCode, Pacing};
use crate::split::split_chunks;
use crate::translate::{
    HttpFetch, LanguageDetector, Notifier, TranslateError, Translation, TranslationProvider,
    FAILURE_MESSAGE,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

const LOG_TARGET: &str = "translate::job";

/// Label shown when the provider could not tell the source language.
pub const LANG_UNAVAILABLE: &str = "unavailable";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TranslationRequest {
    pub from: LangCode,
    pub to: LangCode,
    pub text: String,
    pub swap: Option<LangCode>,
    pub chunk_size: ChunkSize,
}

impl TranslationRequest {
    pub fn new<S: Into<String>>(from: LangCode, to: LangCode, text: S) -> Self {
        Self {
            from,
            to,
            text: text.into(),
            swap: None,
            chunk_size: ChunkSize::default(),
        }
    }

    pub fn from_config<S: Into<String>>(cfg: &AppConfig, text: S) -> Self {
        Self {
            from: cfg.from.clone(),
            to: cfg.to.clone(),
            text: text.into(),
            swap: cfg.swap.clone(),
            chunk_size: cfg.chunk_size,
        }
    }

    pub fn with_swap(mut self, swap: LangCode) -> Self {
        self.swap = Some(swap);
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: ChunkSize) -> Self {
        self.chunk_size = chunk_size;
        self
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TranslationResult {
    pub text: String,
    pub detected_lang: Option<String>,
    /// Target actually used; differs from the request after a swap.
    pub target: LangCode,
    pub swapped: bool,
    pub chunks: usize,
}

impl TranslationResult {
    fn new(target: LangCode) -> Self {
        Self {
            text: String::new(),
            detected_lang: None,
            target,
            swapped: false,
            chunks: 0,
        }
    }

    pub fn detected_lang_label(&self) -> &str {
        self.detected_lang.as_deref().unwrap_or(LANG_UNAVAILABLE)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(TranslationResult),
    /// Stopped between chunks; holds whatever was translated so far.
    Cancelled(TranslationResult),
    /// A chunk request failed. The host has been notified and no text is kept.
    Failed,
}

impl RunOutcome {
    pub fn result(&self) -> Option<&TranslationResult> {
        match self {
            RunOutcome::Completed(r) | RunOutcome::Cancelled(r) => Some(r),
            RunOutcome::Failed => None,
        }
    }
}

pub struct TranslationJob {
    provider: Arc<dyn TranslationProvider>,
    fetch: Arc<dyn HttpFetch>,
    notifier: Arc<dyn Notifier>,
    request: TranslationRequest,
    pacing: Pacing,
}

impl TranslationJob {
    pub fn new(
        provider: Arc<dyn TranslationProvider>,
        fetch: Arc<dyn HttpFetch>,
        notifier: Arc<dyn Notifier>,
        request: TranslationRequest,
    ) -> Self {
        Self {
            provider,
            fetch,
            notifier,
            request,
            pacing: Pacing::default(),
        }
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn service_name(&self) -> &'static str {
        self.provider.service_name()
    }

    /// Spawns the run on the current tokio runtime.
    pub fn start(self) -> TranslationHandle {
        let service_name = self.service_name();
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);
        let task = tokio::spawn(async move { self.run(flag).await });

        TranslationHandle {
            service_name,
            cancelled,
            task,
        }
    }

    async fn run(self, cancelled: Arc<AtomicBool>) -> Result<RunOutcome, TranslateError> {
        let service = self.service_name();
        let request = &self.request;
        let mut result = TranslationResult::new(request.to.clone());
        let mut source = request.from.clone();

        if request.from.is_auto() && !request.text.is_empty() {
            if let Some(detector) = self.provider.detector() {
                let lang = self
                    .detect(detector)
                    .await
                    .map_err(|e| TranslateError::Detection(Box::new(e)))?;
                tracing::info!(target: LOG_TARGET, service, detected = %lang, "source language detected");
                result.detected_lang = Some(lang.as_str().to_owned());
                source = lang;
            }
        }

        let mut first = true;
        for chunk in split_chunks(&request.text, request.chunk_size.get()) {
            if chunk.is_empty() {
                continue;
            }
            if cancelled.load(Ordering::Relaxed) {
                tracing::info!(target: LOG_TARGET, service, chunks = result.chunks, "run cancelled");
                return Ok(RunOutcome::Cancelled(result));
            }

            if !first {
                let delay = self.pacing.next_delay();
                tracing::debug!(target: LOG_TARGET, delay_ms = delay.as_millis() as u64, "pausing before next chunk");
                tokio::time::sleep(delay).await;

                if cancelled.load(Ordering::Relaxed) {
                    tracing::info!(target: LOG_TARGET, service, chunks = result.chunks, "run cancelled");
                    return Ok(RunOutcome::Cancelled(result));
                }
            }

            match self.translate_chunk(chunk, &source, first, &mut result).await {
                Ok(text) => {
                    result.text.push_str(&text);
                    result.chunks += 1;
                }
                Err(e) => {
                    tracing::error!(target: LOG_TARGET, service, error = %e, chunk = result.chunks, "chunk translation failed");
                    self.notifier.notify(FAILURE_MESSAGE);
                    return Ok(RunOutcome::Failed);
                }
            }
            first = false;
        }

        tracing::debug!(target: LOG_TARGET, service, chunks = result.chunks, "run completed");
        Ok(RunOutcome::Completed(result))
    }

    /// Detection only needs a representative sample, so the first chunk is sent.
    async fn detect(&self, detector: &dyn LanguageDetector) -> Result<LangCode, TranslateError> {
        let sample = split_chunks(&self.request.text, self.request.chunk_size.get())
            .next()
            .unwrap_or_default();
        let body = self.fetch.get(detector.detection_url(sample)?).await?;
        detector.parse_detection(&body)
    }

    async fn translate_chunk(
        &self,
        chunk: &str,
        source: &LangCode,
        first: bool,
        result: &mut TranslationResult,
    ) -> Result<String, TranslateError> {
        let translation = self.request_chunk(chunk, source, &result.target).await?;

        if !first {
            return Ok(translation.text);
        }
        if result.detected_lang.is_none() {
            result.detected_lang = translation.detected_source_lang;
        }

        match self.swap_target(result) {
            Some(swap) => {
                tracing::info!(
                    target: LOG_TARGET,
                    detected = result.detected_lang_label(),
                    from = %result.target,
                    to = %swap,
                    "source equals target, swapping target language"
                );
                result.target = swap;
                result.swapped = true;
                let retry = self.request_chunk(chunk, source, &result.target).await?;
                Ok(retry.text)
            }
            None => Ok(translation.text),
        }
    }

    fn swap_target(&self, result: &TranslationResult) -> Option<LangCode> {
        let swap = self.request.swap.as_ref()?;
        let detected = result.detected_lang.as_deref()?;
        if self.request.from.is_auto() && detected == self.request.to.as_str() {
            Some(swap.clone())
        } else {
            None
        }
    }

    async fn request_chunk(
        &self,
        chunk: &str,
        from: &LangCode,
        to: &LangCode,
    ) -> Result<Translation, TranslateError> {
        let url = self.provider.translate_url(chunk, from, to)?;
        tracing::debug!(
            target: LOG_TARGET,
            from = %from,
            to = %to,
            chars = chunk.chars().count(),
            "sending chunk"
        );
        let body = self.fetch.get(url).await?;
        self.provider.parse_translation(&body)
    }
}

/// Caller side of a running job.
pub struct TranslationHandle {
    service_name: &'static str,
    cancelled: Arc<AtomicBool>,
    task: JoinHandle<Result<RunOutcome, TranslateError>>,
}

impl TranslationHandle {
    pub fn service_name(&self) -> &'static str {
        self.service_name
    }

    /// Takes effect before the next chunk; an in-flight request still completes.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Waits for the run. Only a failed up-front detection surfaces as `Err`;
    /// chunk failures are reported through the notifier and [`RunOutcome::Failed`].
    pub async fn join(self) -> Result<RunOutcome, TranslateError> {
        self.task
            .await
            .map_err(|e| TranslateError::Task(e.to_string()))?
    }
}
