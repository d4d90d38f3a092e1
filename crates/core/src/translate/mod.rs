mod google;
mod http;
mod job;
mod notify;
mod yandex;

use crate::config::LangCode;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use url::Url;

pub use google::{GoogleProvider, GOOGLE_SERVICE_NAME};
pub use http::{ReqwestFetcher, USER_AGENT};
pub use job::{
    RunOutcome, TranslationHandle, TranslationJob, TranslationRequest, TranslationResult,
    LANG_UNAVAILABLE,
};
pub use notify::{ChannelNotifier, Notifier, FAILURE_MESSAGE};
pub use yandex::{YandexProvider, YANDEX_SERVICE_NAME};

/// Translation of a single chunk as reported by a provider.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Translation {
    pub text: String,
    pub detected_source_lang: Option<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum TranslateError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("invalid request url: {0}")]
    Url(#[from] url::ParseError),
    #[error("language detection failed: {0}")]
    Detection(#[source] Box<TranslateError>),
    #[error("{service} requires an api key")]
    MissingApiKey { service: &'static str },
    #[error("translation task aborted: {0}")]
    Task(String),
}

/// Plain GET transport used by the chunk loop.
pub trait HttpFetch: Send + Sync {
    fn get(&self, url: Url) -> BoxFuture<'_, Result<String, TranslateError>>;
}

/// Per-provider strategy: how to address the remote API and read its answers.
pub trait TranslationProvider: Send + Sync {
    fn service_name(&self) -> &'static str;

    fn translate_url(
        &self,
        chunk: &str,
        from: &LangCode,
        to: &LangCode,
    ) -> Result<Url, TranslateError>;

    fn parse_translation(&self, body: &str) -> Result<Translation, TranslateError>;

    /// Providers that cannot translate from `auto` resolve the source first.
    fn detector(&self) -> Option<&dyn LanguageDetector> {
        None
    }
}

pub trait LanguageDetector: Send + Sync {
    fn detection_url(&self, text: &str) -> Result<Url, TranslateError>;

    fn parse_detection(&self, body: &str) -> Result<LangCode, TranslateError>;
}
