// Docpipe Infrastructure - Extraction Strategies
// Implements: ExtractionStrategy (fast-local, ai-vision)

mod ai_vision;
mod fast_local;
mod summary;

#[cfg(test)]
mod test_pdf;

pub use ai_vision::{AiVisionStrategy, GeminiConfig, DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL};
pub use fast_local::FastLocalStrategy;
pub use summary::extractive_summary;
