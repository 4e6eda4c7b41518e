use std::sync::LazyLock;

use ai_client::strip_code_fences;
use magpie_common::GenerationCandidate;
use regex::Regex;
use tracing::debug;

// A `"name": "…", "funFact": "…"` pair. String bodies honour JSON escapes, so an
// escaped quote does not end the value.
static ITEM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#""name"\s*:\s*"((?:[^"\\]|\\.)*)"\s*,\s*"funFact"\s*:\s*"((?:[^"\\]|\\.)*)""#,
    )
    .expect("valid regex")
});

/// Recovers hunt candidates from loosely formatted model output.
///
/// The model is asked for a bare JSON array but regularly adds prose, markdown
/// fences or trailing commentary, and occasionally emits a broken object. The
/// parser scans for each well-formed `name`/`funFact` pair instead of parsing
/// the whole response, so one bad fragment only costs that item.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseParser;

impl ResponseParser {
    pub fn new() -> Self {
        Self
    }

    /// Every recoverable candidate, in the order it appears. Never fails.
    pub fn parse(&self, raw: &str) -> Vec<GenerationCandidate> {
        let cleaned = strip_code_fences(raw);

        let mut skipped = 0usize;
        let candidates: Vec<GenerationCandidate> = ITEM_RE
            .captures_iter(&cleaned)
            .filter_map(|caps| {
                let candidate = unescape(&caps[1])
                    .zip(unescape(&caps[2]))
                    .filter(|(name, fact)| !name.trim().is_empty() && !fact.trim().is_empty())
                    .map(|(name, fact)| GenerationCandidate::new(name, fact));
                if candidate.is_none() {
                    skipped += 1;
                }
                candidate
            })
            .collect();

        if skipped > 0 {
            debug!(skipped, kept = candidates.len(), "Skipped malformed hunt fragments");
        }

        candidates
    }
}

/// Decode a JSON string body (without its surrounding quotes).
///
/// Strict JSON first. Models also emit raw tabs and newlines inside strings,
/// which strict JSON rejects, so those bodies are decoded leniently instead.
fn unescape(body: &str) -> Option<String> {
    serde_json::from_str::<String>(&format!("\"{body}\""))
        .ok()
        .or_else(|| Some(unescape_lenient(body)))
}

/// Decode the standard JSON escapes and pass everything else through as is.
/// An unknown or truncated escape is kept verbatim.
fn unescape_lenient(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('/') => out.push('/'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('u') => {
                let hex: String = chars.clone().take(4).collect();
                let decoded = Some(&hex)
                    .filter(|h| h.len() == 4 && h.chars().all(|c| c.is_ascii_hexdigit()))
                    .and_then(|h| u32::from_str_radix(h, 16).ok())
                    .and_then(char::from_u32);
                match decoded {
                    Some(decoded) => {
                        out.push(decoded);
                        for _ in 0..4 {
                            chars.next();
                        }
                    }
                    _ => out.push_str("\\u"),
                }
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }

    out
}
