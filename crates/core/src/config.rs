use rand::Rng;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, time::Duration};

pub const AUTO_LANG: &str = "auto";
pub const DEFAULT_TARGET_LANG: &str = "en";
pub const DEFAULT_CHUNK_SIZE: usize = 3000;
pub const DEFAULT_MIN_DELAY_MS: u64 = 1_000;
pub const DEFAULT_MAX_DELAY_MS: u64 = 10_000;
pub const ENV_SERVICE_NAME: &str = "INSTANT_TRANSLATE_SERVICE";
pub const ENV_YANDEX_API_KEY: &str = "YANDEX_API_KEY";

/// Namespace under which the selected backend is stored.
pub const CONFIG_SECTION: &str = "instant_translate";
pub const KEY_SERVICE_NAME: &str = "service_name";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct LangCode(String);

impl LangCode {
    pub fn new<S: Into<String>>(value: S) -> Result<Self, ConfigError> {
        let v = value.into();
        let trimmed = v.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::EmptyLang);
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn auto() -> Self {
        Self(AUTO_LANG.to_owned())
    }

    pub fn is_auto(&self) -> bool {
        self.0 == AUTO_LANG
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for LangCode {
    fn default() -> Self {
        Self(DEFAULT_TARGET_LANG.to_owned())
    }
}

impl fmt::Display for LangCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new<S: Into<String>>(value: S) -> Result<Self, ConfigError> {
        let v = value.into();
        if v.trim().is_empty() {
            return Err(ConfigError::EmptyApiKey);
        }
        Ok(Self(v))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(**redacted**)")
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiKeys {
    pub yandex: Option<ApiKey>,
}

/// Upper bound for a single chunk, counted in chars.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkSize(usize);

impl ChunkSize {
    pub fn new(value: usize) -> Result<Self, ConfigError> {
        if value == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        Ok(Self(value))
    }

    pub fn get(&self) -> usize {
        self.0
    }
}

impl Default for ChunkSize {
    fn default() -> Self {
        Self(DEFAULT_CHUNK_SIZE)
    }
}

/// Randomized pause inserted before every chunk but the first.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "PacingBounds", into = "PacingBounds")]
pub struct Pacing {
    min_delay_ms: u64,
    max_delay_ms: u64,
}

#[derive(Serialize, Deserialize)]
struct PacingBounds {
    min_delay_ms: u64,
    max_delay_ms: u64,
}

impl TryFrom<PacingBounds> for Pacing {
    type Error = ConfigError;

    fn try_from(bounds: PacingBounds) -> Result<Self, Self::Error> {
        Self::new(bounds.min_delay_ms, bounds.max_delay_ms)
    }
}

impl From<Pacing> for PacingBounds {
    fn from(pacing: Pacing) -> Self {
        Self {
            min_delay_ms: pacing.min_delay_ms,
            max_delay_ms: pacing.max_delay_ms,
        }
    }
}

impl Pacing {
    pub fn new(min_delay_ms: u64, max_delay_ms: u64) -> Result<Self, ConfigError> {
        if min_delay_ms > max_delay_ms {
            return Err(ConfigError::InvalidPacing {
                min: min_delay_ms,
                max: max_delay_ms,
            });
        }
        Ok(Self {
            min_delay_ms,
            max_delay_ms,
        })
    }

    pub fn immediate() -> Self {
        Self {
            min_delay_ms: 0,
            max_delay_ms: 0,
        }
    }

    pub fn next_delay(&self) -> Duration {
        let max = self.max_delay_ms.max(self.min_delay_ms);
        if max == 0 {
            return Duration::ZERO;
        }
        let ms = rand::rng().random_range(self.min_delay_ms..=max);
        Duration::from_millis(ms)
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            min_delay_ms: DEFAULT_MIN_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    pub from: LangCode,
    pub to: LangCode,
    pub swap: Option<LangCode>,
    pub chunk_size: ChunkSize,
    /// Backend selected by the host; unknown names fall back to the default.
    pub service_name: Option<String>,
    pub api_keys: ApiKeys,
    pub pacing: Pacing,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            from: LangCode::auto(),
            to: LangCode::default(),
            swap: None,
            chunk_size: ChunkSize::default(),
            service_name: None,
            api_keys: ApiKeys::default(),
            pacing: Pacing::default(),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("language code must not be empty")]
    EmptyLang,
    #[error("api key must not be empty")]
    EmptyApiKey,
    #[error("chunk size must be > 0")]
    ZeroChunkSize,
    #[error("pacing minimum {min} ms exceeds maximum {max} ms")]
    InvalidPacing { min: u64, max: u64 },
}

/// Host-owned settings mapping, addressed by section and key.
pub trait ConfigStore {
    fn get(&self, section: &str, key: &str) -> Option<String>;
    fn set(&mut self, section: &str, key: &str, value: String);
}

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    values: BTreeMap<(String, String), String>,
}

impl MemoryStore {
    pub fn with_value(mut self, section: &str, key: &str, value: &str) -> Self {
        self.set(section, key, value.to_owned());
        self
    }
}

impl ConfigStore for MemoryStore {
    fn get(&self, section: &str, key: &str) -> Option<String> {
        self.values
            .get(&(section.to_owned(), key.to_owned()))
            .cloned()
    }

    fn set(&mut self, section: &str, key: &str, value: String) {
        self.values
            .insert((section.to_owned(), key.to_owned()), value);
    }
}

pub trait Env {
    fn var(&self, key: &str) -> Option<String>;
}

#[derive(Clone, Debug, Default)]
pub struct StdEnv;

impl Env for StdEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Clone, Debug, Default)]
pub struct MapEnv {
    vars: BTreeMap<String, String>,
}

impl MapEnv {
    pub fn with_var(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_owned(), value.to_owned());
        self
    }
}

impl Env for MapEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

pub fn resolve_api_key(
    cli_value: Option<String>,
    env_key: &str,
    env: &impl Env,
) -> Result<Option<ApiKey>, ConfigError> {
    match cli_value {
        Some(v) => Ok(Some(ApiKey::new(v)?)),
        None => match env.var(env_key) {
            Some(v) => Ok(Some(ApiKey::new(v)?)),
            None => Ok(None),
        },
    }
}

pub fn resolve_optional_string(
    cli_value: Option<String>,
    env_key: &str,
    env: &impl Env,
) -> Option<String> {
    match cli_value {
        Some(v) => Some(v),
        None => env.var(env_key),
    }
}
