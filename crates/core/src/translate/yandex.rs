use crate::config::{ApiKey, LangCode};
use crate::translate::{LanguageDetector, TranslateError, Translation, TranslationProvider};
use serde::Deserialize;
use url::Url;

pub const YANDEX_SERVICE_NAME: &str = "Yandex translator";
const YANDEX_ENDPOINT: &str = "https://translate.yandex.net/api/v1.5/tr.json";
const YANDEX_OK: u16 = 200;

/// Keyed JSON API. It has no `auto` source, so detection runs as a separate call.
#[derive(Clone, Debug)]
pub struct YandexProvider {
    api_key: ApiKey,
    base_url: String,
}

impl YandexProvider {
    pub fn new(api_key: ApiKey) -> Self {
        Self {
            api_key,
            base_url: YANDEX_ENDPOINT.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

#[derive(Deserialize)]
struct YandexTranslation {
    code: Option<u16>,
    message: Option<String>,
    /// Language pair actually used, e.g. `en-fr`.
    lang: Option<String>,
    #[serde(default)]
    text: Vec<String>,
}

#[derive(Deserialize)]
struct YandexDetection {
    code: Option<u16>,
    message: Option<String>,
    lang: Option<String>,
}

fn check_code(code: Option<u16>, message: Option<String>) -> Result<(), TranslateError> {
    match code {
        Some(code) if code != YANDEX_OK => Err(TranslateError::Status {
            status: code,
            body: message.unwrap_or_default(),
        }),
        _ => Ok(()),
    }
}

impl TranslationProvider for YandexProvider {
    fn service_name(&self) -> &'static str {
        YANDEX_SERVICE_NAME
    }

    fn translate_url(
        &self,
        chunk: &str,
        from: &LangCode,
        to: &LangCode,
    ) -> Result<Url, TranslateError> {
        let url = format!(
            "{}/translate?key={}&text={}&lang={}-{}",
            self.base_url,
            urlencoding::encode(self.api_key.expose()),
            urlencoding::encode(chunk),
            urlencoding::encode(from.as_str()),
            urlencoding::encode(to.as_str()),
        );
        Ok(Url::parse(&url)?)
    }

    fn parse_translation(&self, body: &str) -> Result<Translation, TranslateError> {
        let response: YandexTranslation = serde_json::from_str(body)
            .map_err(|e| TranslateError::InvalidResponse(format!("Failed to parse JSON: {}", e)))?;
        check_code(response.code, response.message)?;

        let detected_source_lang = response
            .lang
            .as_deref()
            .and_then(|pair| pair.split('-').next())
            .filter(|l| !l.is_empty())
            .map(str::to_owned);

        Ok(Translation {
            text: response.text.concat(),
            detected_source_lang,
        })
    }

    fn detector(&self) -> Option<&dyn LanguageDetector> {
        Some(self)
    }
}

impl LanguageDetector for YandexProvider {
    fn detection_url(&self, text: &str) -> Result<Url, TranslateError> {
        let url = format!(
            "{}/detect?key={}&text={}",
            self.base_url,
            urlencoding::encode(self.api_key.expose()),
            urlencoding::encode(text),
        );
        Ok(Url::parse(&url)?)
    }

    fn parse_detection(&self, body: &str) -> Result<LangCode, TranslateError> {
        let response: YandexDetection = serde_json::from_str(body)
            .map_err(|e| TranslateError::InvalidResponse(format!("Failed to parse JSON: {}", e)))?;
        check_code(response.code, response.message)?;

        let lang = response.lang.unwrap_or_default();
        LangCode::new(lang)
            .map_err(|_| TranslateError::InvalidResponse("no language detected".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> YandexProvider {
        YandexProvider::new(ApiKey::new("trnsl.test").expect("valid key"))
    }

    fn lang(code: &str) -> LangCode {
        LangCode::new(code).expect("valid lang")
    }

    #[test]
    fn builds_translate_url_with_language_pair() {
        let url = provider()
            .translate_url("Hello, world", &lang("en"), &lang("fr"))
            .expect("valid url");
        assert_eq!(url.path(), "/api/v1.5/tr.json/translate");
        let query = url.query().expect("query");
        assert!(query.contains("key=trnsl.test"));
        assert!(query.contains("text=Hello%2C%20world"));
        assert!(query.contains("lang=en-fr"));
    }

    #[test]
    fn base_url_applies_to_both_endpoints() {
        let p = provider().with_base_url("http://localhost:9000/tr.json".to_string());
        let translate = p
            .translate_url("Hi", &lang("en"), &lang("de"))
            .expect("valid url");
        let detect = p.detection_url("Hi").expect("valid url");
        assert_eq!(translate.host_str(), Some("localhost"));
        assert_eq!(translate.path(), "/tr.json/translate");
        assert_eq!(detect.port(), Some(9000));
        assert_eq!(detect.path(), "/tr.json/detect");
    }

    #[test]
    fn parses_keyed_translation() {
        let body = r#"{"code":200,"lang":"en-fr","text":["Bonjour, ","le monde"]}"#;
        let t = provider().parse_translation(body).expect("parsed");
        assert_eq!(t.text, "Bonjour, le monde");
        assert_eq!(t.detected_source_lang.as_deref(), Some("en"));
    }

    #[test]
    fn api_error_code_is_reported() {
        let body = r#"{"code":401,"message":"API key is invalid"}"#;
        match provider().parse_translation(body) {
            Err(TranslateError::Status { status, body }) => {
                assert_eq!(status, 401);
                assert_eq!(body, "API key is invalid");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn detection_round() {
        let p = provider();
        let url = p.detection_url("Bonjour").expect("valid url");
        assert_eq!(url.path(), "/api/v1.5/tr.json/detect");
        assert_eq!(
            p.parse_detection(r#"{"code":200,"lang":"fr"}"#)
                .expect("detected")
                .as_str(),
            "fr"
        );
        assert!(p.parse_detection(r#"{"code":200,"lang":""}"#).is_err());
        assert!(p.parse_detection("garbage").is_err());
    }

    #[test]
    fn exposes_detector() {
        assert!(provider().detector().is_some());
    }
}
