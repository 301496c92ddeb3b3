// ID Provider Port (for deterministic testing)

/// ID provider interface (allows deterministic IDs in tests)
pub trait IdProvider: Send + Sync {
    /// Generate a new unique job ID
    fn generate_id(&self) -> String;
}

/// UUID v4 provider (production)
pub struct UuidProvider;

impl IdProvider for UuidProvider {
    fn generate_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

pub mod mocks {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Hands out a scripted sequence of IDs, then falls back to UUIDs
    pub struct ScriptedIdProvider {
        ids: Mutex<VecDeque<String>>,
    }

    impl ScriptedIdProvider {
        pub fn new<I, S>(ids: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            Self {
                ids: Mutex::new(ids.into_iter().map(Into::into).collect()),
            }
        }
    }

    impl IdProvider for ScriptedIdProvider {
        fn generate_id(&self) -> String {
            self.ids
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
        }
    }
}
