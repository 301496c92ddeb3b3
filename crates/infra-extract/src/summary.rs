// Extractive summary: leading sentences within a character budget

/// Summary budget is a quarter of the source text, clamped to this range
const MIN_SUMMARY_CHARS: usize = 80;
const MAX_SUMMARY_CHARS: usize = 600;

/// Build a summary from the leading sentences of `text`.
///
/// The result is never longer than `text` (whitespace-normalized) and is
/// empty only when `text` has no visible characters.
pub fn extractive_summary(text: &str) -> String {
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let total = normalized.chars().count();
    let budget = (total / 4).clamp(MIN_SUMMARY_CHARS, MAX_SUMMARY_CHARS);

    let mut summary = String::new();
    let mut used = 0;
    for sentence in sentences(&normalized) {
        let len = sentence.chars().count();
        if summary.is_empty() {
            if len > budget {
                return truncate_at_word(sentence, budget);
            }
            summary.push_str(sentence);
            used = len;
        } else if used + 1 + len <= budget {
            summary.push(' ');
            summary.push_str(sentence);
            used += 1 + len;
        } else {
            break;
        }
    }
    summary
}

/// Split on `.`, `!` or `?` followed by a space (terminator kept)
fn sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            if let Some(&(_, ' ')) = chars.peek() {
                let end = i + c.len_utf8();
                out.push(text[start..end].trim());
                start = end;
            }
        }
    }
    let rest = text[start..].trim();
    if !rest.is_empty() {
        out.push(rest);
    }
    out.retain(|s| !s.is_empty());
    out
}

fn truncate_at_word(sentence: &str, budget: usize) -> String {
    let cut: String = sentence.chars().take(budget).collect();
    let cut = match cut.rfind(' ') {
        Some(pos) if pos > 0 => cut[..pos].to_string(),
        _ => cut,
    };
    format!("{}...", cut.trim_end())
}
