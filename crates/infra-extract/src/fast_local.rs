// Fast-local strategy: in-process PDF text extraction with lopdf

use crate::summary::extractive_summary;
use async_trait::async_trait;
use docpipe_core::port::{ExtractionError, ExtractionOutput, ExtractionStrategy, ProgressReporter};
use tracing::{debug, warn};

/// Extracts the text layer page by page; no network, no model.
///
/// Content is one `## Page N` section per page. Scanned documents without a
/// text layer fail with `EmptyContent`.
#[derive(Debug, Default, Clone)]
pub struct FastLocalStrategy;

impl FastLocalStrategy {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ExtractionStrategy for FastLocalStrategy {
    async fn extract(
        &self,
        document: &[u8],
        progress: &ProgressReporter,
    ) -> Result<ExtractionOutput, ExtractionError> {
        let bytes = document.to_vec();
        let progress = progress.clone();

        // lopdf parsing is CPU-bound
        tokio::task::spawn_blocking(move || extract_blocking(&bytes, &progress))
            .await
            .map_err(|e| ExtractionError::Io(format!("extraction task failed: {}", e)))?
    }
}

fn extract_blocking(
    bytes: &[u8],
    progress: &ProgressReporter,
) -> Result<ExtractionOutput, ExtractionError> {
    let _span = tracing::info_span!("extract.fast_local", size = bytes.len()).entered();

    let doc = lopdf::Document::load_mem(bytes)
        .map_err(|e| ExtractionError::MalformedDocument(format!("Failed to load PDF: {}", e)))?;

    let pages = doc.get_pages();
    if pages.is_empty() {
        return Err(ExtractionError::EmptyContent(
            "document has no pages".to_string(),
        ));
    }

    let total = pages.len();
    let mut sections = Vec::with_capacity(total);
    let mut body = String::new();

    for (index, page_num) in pages.keys().enumerate() {
        progress.report(format!("extracting text (page {}/{})", index + 1, total));

        let text = match doc.extract_text(&[*page_num]) {
            Ok(text) => normalize_page_text(&text),
            Err(e) => {
                warn!(page = page_num, error = %e, "Failed to extract page text");
                String::new()
            }
        };
        if !text.is_empty() {
            body.push_str(&text);
            body.push('\n');
        }
        sections.push(format!("## Page {}\n\n{}", page_num, text));
    }

    if body.trim().is_empty() {
        return Err(ExtractionError::EmptyContent(format!(
            "no text layer found in {} page(s)",
            total
        )));
    }

    progress.report("generating summary");
    let summary = extractive_summary(&body);
    let content = sections.join("\n\n");

    debug!(
        pages = total,
        content_len = content.len(),
        summary_len = summary.len(),
        "Local extraction finished"
    );

    Ok(ExtractionOutput { content, summary })
}

/// Trim each line and drop blank runs
fn normalize_page_text(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_pdf::build_pdf;

    #[tokio::test]
    async fn test_two_page_document() {
        let pdf = build_pdf(&[
            &["Quarterly report.", "Revenue grew by ten percent."],
            &["Outlook remains stable."],
        ]);
        let (reporter, mut rx) = ProgressReporter::channel();

        let output = FastLocalStrategy::new()
            .extract(&pdf, &reporter)
            .await
            .unwrap();

        assert!(output.content.contains("## Page 1"));
        assert!(output.content.contains("## Page 2"));
        assert!(output.content.contains("Quarterly report."));
        assert!(output.content.contains("Outlook remains stable."));
        assert!(!output.summary.is_empty());
        assert!(output.summary.len() < output.content.len());

        drop(reporter);
        let mut markers = Vec::new();
        while let Some(marker) = rx.recv().await {
            markers.push(marker);
        }
        assert_eq!(
            markers,
            vec![
                "extracting text (page 1/2)",
                "extracting text (page 2/2)",
                "generating summary"
            ]
        );
    }

    #[tokio::test]
    async fn test_garbage_bytes_are_malformed() {
        let err = FastLocalStrategy::new()
            .extract(b"%PDF-1.4 this is not really a pdf", &ProgressReporter::disabled())
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::MalformedDocument(_)));
    }

    #[tokio::test]
    async fn test_pages_without_text_are_empty_content() {
        let pdf = build_pdf(&[&[], &[]]);
        let err = FastLocalStrategy::new()
            .extract(&pdf, &ProgressReporter::disabled())
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::EmptyContent(_)));
    }
}
