// Strategy key (registry lookup key)

use serde::{Deserialize, Serialize};

/// Registry key of an extraction strategy (e.g. `fast-local`, `ai-vision`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StrategyKey(String);

impl StrategyKey {
    pub const FAST_LOCAL: &'static str = "fast-local";
    pub const AI_VISION: &'static str = "ai-vision";

    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StrategyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
