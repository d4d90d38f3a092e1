use crate::config::LangCode;
use crate::translate::{TranslateError, Translation, TranslationProvider};
use serde_json::Value;
use url::Url;

pub const GOOGLE_SERVICE_NAME: &str = "Google translator";
const GOOGLE_ENDPOINT: &str = "https://translate.googleapis.com/translate_a/single";
const GOOGLE_CLIENT: &str = "gtx";

/// Keyless web endpoint answering with nested arrays.
#[derive(Clone, Debug)]
pub struct GoogleProvider {
    base_url: String,
}

impl GoogleProvider {
    pub fn new() -> Self {
        Self {
            base_url: GOOGLE_ENDPOINT.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

impl Default for GoogleProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TranslationProvider for GoogleProvider {
    fn service_name(&self) -> &'static str {
        GOOGLE_SERVICE_NAME
    }

    fn translate_url(
        &self,
        chunk: &str,
        from: &LangCode,
        to: &LangCode,
    ) -> Result<Url, TranslateError> {
        let url = format!(
            "{}?client={}&sl={}&tl={}&dt=t&q={}",
            self.base_url,
            GOOGLE_CLIENT,
            urlencoding::encode(from.as_str()),
            urlencoding::encode(to.as_str()),
            urlencoding::encode(chunk),
        );
        Ok(Url::parse(&url)?)
    }

    fn parse_translation(&self, body: &str) -> Result<Translation, TranslateError> {
        let value: Value = serde_json::from_str(body)
            .map_err(|e| TranslateError::InvalidResponse(format!("Failed to parse JSON: {}", e)))?;
        let root = value
            .as_array()
            .ok_or_else(|| TranslateError::InvalidResponse("expected a top-level array".into()))?;

        // Each sentence row is [translated, original, ...]; rows without text are skipped.
        let text = match root.first() {
            Some(Value::Array(rows)) => rows
                .iter()
                .filter_map(|row| row.get(0).and_then(Value::as_str))
                .collect(),
            Some(Value::Null) | None => String::new(),
            Some(other) => {
                return Err(TranslateError::InvalidResponse(format!(
                    "unexpected sentence block: {}",
                    other
                )))
            }
        };

        Ok(Translation {
            text,
            detected_source_lang: detected_language(root),
        })
    }
}

/// Auto-detection results sit in the trailing element; otherwise element 2
/// echoes the source language.
fn detected_language(root: &[Value]) -> Option<String> {
    let trailing = root
        .get(3..)
        .and_then(|_| root.last())
        .and_then(Value::as_array)
        .filter(|entries| !entries.is_empty());

    let lang = match trailing {
        Some(entries) => entries
            .last()
            .and_then(|entry| entry.get(0))
            .and_then(Value::as_str),
        None => root.get(2).and_then(Value::as_str),
    };

    lang.filter(|l| !l.is_empty()).map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lang(code: &str) -> LangCode {
        LangCode::new(code).expect("valid lang")
    }

    #[test]
    fn builds_percent_encoded_url() {
        let url = GoogleProvider::new()
            .translate_url("Grüße, Welt & co?", &LangCode::auto(), &lang("en"))
            .expect("valid url");
        assert_eq!(url.host_str(), Some("translate.googleapis.com"));
        let query = url.query().expect("query");
        assert!(query.contains("client=gtx"));
        assert!(query.contains("sl=auto"));
        assert!(query.contains("tl=en"));
        assert!(query.contains("dt=t"));
        assert!(query.contains("q=Gr%C3%BC%C3%9Fe%2C%20Welt%20%26%20co%3F"));
    }

    #[test]
    fn base_url_can_be_redirected() {
        let url = GoogleProvider::new()
            .with_base_url("http://127.0.0.1:8080/translate_a/single".to_string())
            .translate_url("Hi", &lang("en"), &lang("de"))
            .expect("valid url");
        assert_eq!(url.host_str(), Some("127.0.0.1"));
        assert_eq!(url.port(), Some(8080));
        assert_eq!(url.path(), "/translate_a/single");
        assert!(url.query().expect("query").contains("sl=en&tl=de"));
    }

    #[test]
    fn concatenates_sentence_rows() {
        let body = r#"[[["Bonjour. ","Hello. ",null,null,10],["Le monde.","World.",null,null,10]],null,"en",null,null,null,null,[]]"#;
        let t = GoogleProvider::new().parse_translation(body).expect("parsed");
        assert_eq!(t.text, "Bonjour. Le monde.");
        assert_eq!(t.detected_source_lang.as_deref(), Some("en"));
    }

    #[test]
    fn prefers_trailing_detection_block() {
        let body = r#"[[["Hello","Bonjour",null,null,10]],null,"fr",null,null,null,null,[["fr"],null,[0.9],["de","fr"]]]"#;
        let t = GoogleProvider::new().parse_translation(body).expect("parsed");
        assert_eq!(t.text, "Hello");
        assert_eq!(t.detected_source_lang.as_deref(), Some("de"));
    }

    #[test]
    fn empty_detection_is_none() {
        let body = r#"[[["x","y",null,null,1]],null,"",null,null,null,null,[]]"#;
        let t = GoogleProvider::new().parse_translation(body).expect("parsed");
        assert_eq!(t.detected_source_lang, None);
    }

    #[test]
    fn rejects_malformed_payloads() {
        let provider = GoogleProvider::new();
        assert!(matches!(
            provider.parse_translation("<html>blocked</html>"),
            Err(TranslateError::InvalidResponse(_))
        ));
        assert!(matches!(
            provider.parse_translation(r#"{"text":"nope"}"#),
            Err(TranslateError::InvalidResponse(_))
        ));
        assert!(matches!(
            provider.parse_translation(r#"["nope"]"#),
            Err(TranslateError::InvalidResponse(_))
        ));
    }
}
