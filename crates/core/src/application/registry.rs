// Strategy Registry - key -> extraction backend

use crate::domain::StrategyKey;
use crate::error::{AppError, Result};
use crate::port::ExtractionStrategy;
use std::collections::HashMap;
use std::sync::Arc;

/// Maps registry keys to extraction strategies.
///
/// Submission resolves the requested key once and stores it on the job;
/// workers look the stored key up again in their own registry.
#[derive(Default, Clone)]
pub struct StrategyRegistry {
    strategies: HashMap<StrategyKey, Arc<dyn ExtractionStrategy>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a strategy under `key` (replaces any previous entry)
    pub fn register(
        mut self,
        key: impl Into<String>,
        strategy: Arc<dyn ExtractionStrategy>,
    ) -> Self {
        self.strategies.insert(StrategyKey::new(key), strategy);
        self
    }

    /// Validate a caller-supplied key
    ///
    /// # Errors
    /// - AppError::Validation if no strategy is registered under `key`
    pub fn resolve(&self, key: &str) -> Result<StrategyKey> {
        let key = StrategyKey::new(key);
        if self.strategies.contains_key(&key) {
            Ok(key)
        } else {
            Err(AppError::Validation(format!(
                "Unknown strategy '{}' (registered: {})",
                key,
                self.keys().join(", ")
            )))
        }
    }

    pub fn get(&self, key: &StrategyKey) -> Option<Arc<dyn ExtractionStrategy>> {
        self.strategies.get(key).cloned()
    }

    /// Registered keys, sorted
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.strategies.keys().map(|k| k.as_str()).collect();
        keys.sort_unstable();
        keys
    }
}

impl std::fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyRegistry")
            .field("keys", &self.keys())
            .finish()
    }
}
