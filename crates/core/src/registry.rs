//! Ordered table of translation backends.
//!
//! The selected backend is stored by service name in the host's
//! [`ConfigStore`]; lookups never fail, an unknown name resolves to the default.

use crate::config::{ApiKeys, ConfigStore, CONFIG_SECTION, KEY_SERVICE_NAME};
use crate::translate::{
    GoogleProvider, TranslateError, TranslationProvider, YandexProvider, GOOGLE_SERVICE_NAME,
    YANDEX_SERVICE_NAME,
};
use std::sync::Arc;

const LOG_TARGET: &str = "registry";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    Google,
    Yandex,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BackendDescriptor {
    pub name: &'static str,
    pub kind: BackendKind,
}

impl BackendDescriptor {
    pub const GOOGLE: Self = Self {
        name: GOOGLE_SERVICE_NAME,
        kind: BackendKind::Google,
    };
    pub const YANDEX: Self = Self {
        name: YANDEX_SERVICE_NAME,
        kind: BackendKind::Yandex,
    };

    pub fn build(&self, keys: &ApiKeys) -> Result<Arc<dyn TranslationProvider>, TranslateError> {
        match self.kind {
            BackendKind::Google => Ok(Arc::new(GoogleProvider::new())),
            BackendKind::Yandex => {
                let key = keys.yandex.clone().ok_or(TranslateError::MissingApiKey {
                    service: self.name,
                })?;
                Ok(Arc::new(YandexProvider::new(key)))
            }
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("registry needs at least one backend")]
    Empty,
    #[error("default backend {0:?} is not registered")]
    UnknownDefault(String),
}

#[derive(Clone, Debug)]
pub struct Registry {
    backends: Vec<BackendDescriptor>,
    default: usize,
}

impl Registry {
    pub fn new(backends: Vec<BackendDescriptor>, default_name: &str) -> Result<Self, RegistryError> {
        if backends.is_empty() {
            return Err(RegistryError::Empty);
        }
        let default = backends
            .iter()
            .position(|b| b.name == default_name)
            .ok_or_else(|| RegistryError::UnknownDefault(default_name.to_owned()))?;
        Ok(Self { backends, default })
    }

    pub fn backends(&self) -> &[BackendDescriptor] {
        &self.backends
    }

    pub fn default_backend(&self) -> &BackendDescriptor {
        &self.backends[self.default]
    }

    fn index_of(&self, configured: Option<&str>) -> usize {
        match configured {
            Some(name) => self
                .backends
                .iter()
                .position(|b| b.name == name)
                .unwrap_or_else(|| {
                    tracing::debug!(target: LOG_TARGET, configured = name, "unknown backend, using default");
                    self.default
                }),
            None => self.default,
        }
    }

    pub fn current(&self, configured: Option<&str>) -> &BackendDescriptor {
        &self.backends[self.index_of(configured)]
    }

    /// The backend after `configured`, wrapping to the first after the last.
    pub fn next(&self, configured: Option<&str>) -> &BackendDescriptor {
        let next = (self.index_of(configured) + 1) % self.backends.len();
        &self.backends[next]
    }

    pub fn selected(&self, store: &impl ConfigStore) -> &BackendDescriptor {
        self.current(store.get(CONFIG_SECTION, KEY_SERVICE_NAME).as_deref())
    }

    /// Moves the stored selection to the next backend and returns it.
    pub fn advance(&self, store: &mut impl ConfigStore) -> &BackendDescriptor {
        let next = self.next(store.get(CONFIG_SECTION, KEY_SERVICE_NAME).as_deref());
        store.set(CONFIG_SECTION, KEY_SERVICE_NAME, next.name.to_owned());
        tracing::info!(target: LOG_TARGET, service = next.name, "backend selected");
        next
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self {
            backends: vec![BackendDescriptor::GOOGLE, BackendDescriptor::YANDEX],
            default: 0,
        }
    }
}
