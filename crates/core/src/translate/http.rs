use crate::translate::{HttpFetch, TranslateError};
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::Client;
use url::Url;

/// Browser-like agent; the public endpoints reject bare library clients.
pub const USER_AGENT: &str = "Mozilla/5.0";
const LOG_TARGET: &str = "translate::http";

#[derive(Clone)]
pub struct ReqwestFetcher {
    client: Client,
}

impl ReqwestFetcher {
    pub fn new() -> Result<Self, TranslateError> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self { client })
    }
}

impl HttpFetch for ReqwestFetcher {
    fn get(&self, url: Url) -> BoxFuture<'_, Result<String, TranslateError>> {
        async move {
            tracing::trace!(target: LOG_TARGET, host = url.host_str().unwrap_or_default(), "GET");

            let response = self.client.get(url).send().await?;

            let status = response.status();
            if !status.is_success() {
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                return Err(TranslateError::Status {
                    status: status.as_u16(),
                    body,
                });
            }

            Ok(response.text().await?)
        }
        .boxed()
    }
}
