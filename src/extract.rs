//! JSON recovery from free-form AI responses.
//!
//! Strategies run in order and the first one that parses wins:
//! 1. Direct parse of the whole response
//! 2. A ```json fenced block whose body starts with `{` or `[`
//! 3. First-bracket scan: the earlier of `{` / `[` picks object or array,
//!    the span runs to the last matching closer in the text
//!
//! Nothing is ever repaired or guessed; a candidate either parses or the
//! extraction fails.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use tracing::debug;

/// Strategy that produced the value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMethod {
    /// Whole response was valid JSON
    DirectParse,
    /// Body of a markdown code fence
    MarkdownFence,
    /// Span between the first opener and the last matching closer
    BracketScan,
}

/// Extracted value with the strategy that found it
#[derive(Debug, Clone)]
pub struct Extraction {
    pub json: Value,
    pub method: ExtractionMethod,
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("No JSON found in response ({0} bytes analyzed)")]
    NoJsonFound(usize),

    #[error("JSON candidate ({method:?}) failed to parse: {source}")]
    Malformed {
        method: ExtractionMethod,
        #[source]
        source: serde_json::Error,
    },
}

fn fence_pattern() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"(?s)```(?:json)?\s*([{\[].*?[}\]])\s*```").expect("fence pattern is valid")
    })
}

/// Extract a JSON value from an AI response
pub fn extract_json(raw: &str) -> Result<Extraction, ExtractionError> {
    if let Ok(json) = serde_json::from_str::<Value>(raw) {
        debug!("JSON extraction: direct parse succeeded");
        return Ok(Extraction {
            json,
            method: ExtractionMethod::DirectParse,
        });
    }

    let (candidate, method) = match fenced_block(raw) {
        Some(body) => (body, ExtractionMethod::MarkdownFence),
        None => match bracket_span(raw) {
            Some(span) => (span, ExtractionMethod::BracketScan),
            None => return Err(ExtractionError::NoJsonFound(raw.len())),
        },
    };

    debug!(
        "JSON extraction: trying {:?} candidate of {} bytes",
        method,
        candidate.len()
    );

    serde_json::from_str::<Value>(candidate)
        .map(|json| Extraction { json, method })
        .map_err(|source| ExtractionError::Malformed { method, source })
}

/// Body of the first fenced block that starts with a bracket
fn fenced_block(raw: &str) -> Option<&str> {
    fence_pattern()
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Span from the first opener to the last matching closer
fn bracket_span(raw: &str) -> Option<&str> {
    let (start, closer) = match (raw.find('{'), raw.find('[')) {
        (Some(brace), Some(bracket)) if brace < bracket => (brace, '}'),
        (_, Some(bracket)) => (bracket, ']'),
        (Some(brace), None) => (brace, '}'),
        (None, None) => return None,
    };

    let end = raw.rfind(closer)?;
    if end > start {
        Some(&raw[start..=end])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_json_passes_through() {
        for text in [r#"{"a": [1, 2, {"b": null}]}"#, "[true, false]", "42", r#""plain""#] {
            let extracted = extract_json(text).unwrap();
            assert_eq!(extracted.json, serde_json::from_str::<Value>(text).unwrap());
            assert_eq!(extracted.method, ExtractionMethod::DirectParse);
        }
    }

    #[test]
    fn test_fenced_block_amid_prose() {
        let text = "Sure! Here is the analysis:\n```json\n{\"a\":1}\n```\nLet me know if you need more.";
        let extracted = extract_json(text).unwrap();
        assert_eq!(extracted.json, json!({"a": 1}));
        assert_eq!(extracted.method, ExtractionMethod::MarkdownFence);
    }

    #[test]
    fn test_untagged_fence() {
        let text = "result:\n```\n[{\"filename\": \"a.png\"}]\n```";
        let extracted = extract_json(text).unwrap();
        assert_eq!(extracted.json, json!([{"filename": "a.png"}]));
    }

    #[test]
    fn test_multiple_fences_are_not_merged() {
        let text = "first:\n```json\n{\"n\": 1}\n```\nsecond:\n```json\n{\"n\": 2}\n```";
        let extracted = extract_json(text).unwrap();
        assert_eq!(extracted.json, json!({"n": 1}));
    }

    #[test]
    fn test_array_chosen_when_bracket_comes_first() {
        let text = "The ids are [1,2,3] and nothing else.";
        let extracted = extract_json(text).unwrap();
        assert_eq!(extracted.json, json!([1, 2, 3]));
        assert_eq!(extracted.method, ExtractionMethod::BracketScan);
    }

    #[test]
    fn test_object_branch_wins_when_brace_comes_first() {
        // `{` precedes `[`, so the object branch is taken even though the
        // array alone would parse; there is no closing brace, so it fails.
        let text = "use a { here, then [1,2,3]";
        assert!(matches!(
            extract_json(text),
            Err(ExtractionError::NoJsonFound(_))
        ));

        let text = "note {broken} then [1,2,3]";
        assert!(matches!(
            extract_json(text),
            Err(ExtractionError::Malformed {
                method: ExtractionMethod::BracketScan,
                ..
            })
        ));
    }

    #[test]
    fn test_object_scan_uses_last_closing_brace() {
        let text = "Analysis: {\"data\": {\"type\": \"coat\"}} hope this helps";
        let extracted = extract_json(text).unwrap();
        assert_eq!(extracted.json, json!({"data": {"type": "coat"}}));
    }

    #[test]
    fn test_no_brackets_fails() {
        assert!(matches!(
            extract_json("no json here at all"),
            Err(ExtractionError::NoJsonFound(19))
        ));
        assert!(matches!(extract_json(""), Err(ExtractionError::NoJsonFound(0))));
    }

    #[test]
    fn test_closer_before_opener_fails() {
        assert!(extract_json("] oops [").is_err());
    }

    #[test]
    fn test_malformed_fence_does_not_fall_back() {
        let text = "```json\n{\"a\": 1,}\n```\nbut also {\"b\": 2}";
        assert!(matches!(
            extract_json(text),
            Err(ExtractionError::Malformed {
                method: ExtractionMethod::MarkdownFence,
                ..
            })
        ));
    }
}
