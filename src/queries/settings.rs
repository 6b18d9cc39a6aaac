//! Settings queries.
//!
//! Settings are free-form JSON values under string keys. They are written
//! when the user saves the settings form and read when a feature needs
//! them; nothing is validated on write.

use serde_json::Value;

use crate::appraisal::GeminiConfig;
use crate::config;
use crate::error::{NumismaError, Result};
use crate::store::RecordStore;

/// Query interface for the `settings` table.
pub struct SettingsQuery<'a> {
    store: &'a RecordStore,
}

impl<'a> SettingsQuery<'a> {
    /// Create a new `SettingsQuery` bound to the given store.
    pub fn new(store: &'a RecordStore) -> Self {
        Self { store }
    }

    pub fn get(&self, key: &str) -> Result<Option<Value>> {
        self.store.get_setting(key)
    }

    pub fn set(&self, key: &str, value: Value) -> Result<()> {
        self.store.set_setting(key, &value)
    }

    /// A setting read as a non-empty string.
    pub fn get_str(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .get(key)?
            .and_then(|v| v.as_str().map(str::to_string))
            .filter(|s| !s.trim().is_empty()))
    }

    pub fn api_key(&self) -> Result<Option<String>> {
        self.get_str(config::GEMINI_API_KEY_SETTING)
    }

    pub fn set_api_key(&self, key: &str) -> Result<()> {
        self.set(config::GEMINI_API_KEY_SETTING, Value::String(key.to_string()))
    }

    /// Saved model override for valuation calls.
    pub fn model(&self) -> Result<Option<String>> {
        self.get_str(config::GEMINI_MODEL_SETTING)
    }

    /// Client config assembled from the saved API key and model.
    ///
    /// Fails with [`NumismaError::NotFound`] when no key has been saved.
    pub fn gemini_config(&self) -> Result<GeminiConfig> {
        let key = self.api_key()?.ok_or_else(|| {
            NumismaError::NotFound("no API key saved in settings".into())
        })?;
        let mut cfg = GeminiConfig::new(key);
        if let Some(model) = self.model()? {
            cfg = cfg.model(model);
        }
        Ok(cfg)
    }
}
