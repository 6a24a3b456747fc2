use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::results::Question;

/// Reply shape of the question-formatter prompt:
/// `{"result": [{"id": "01", "question": "..."}]}`
#[derive(Debug, Clone, Deserialize)]
pub struct FormattedQuestions {
    pub result: Vec<Question>,
}

/// Reply shape of the page-analysis prompt
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageAnalysis {
    /// Whether the page content answers the question
    #[serde(default)]
    pub has_answer: bool,

    /// The answer text when `has_answer` is true
    #[serde(default)]
    pub answer: Option<String>,

    /// Up to a handful of links worth following next
    #[serde(default)]
    pub next_links: Vec<String>,

    #[serde(default)]
    pub reasoning: Option<String>,

    /// 0-100; missing or out-of-range values are normalized
    #[serde(default, deserialize_with = "de_confidence")]
    pub confidence: u8,
}

/// Reply shape of the link-selection prompt
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkChoice {
    /// The chosen URL, or None when nothing cached looks promising
    #[serde(default)]
    pub selected_link: Option<String>,

    #[serde(default, deserialize_with = "de_confidence")]
    pub confidence: u8,

    #[serde(default)]
    pub reasoning: Option<String>,
}

/// Accept any JSON number (or null) for confidence and clamp it into 0-100
fn de_confidence<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<f64>::deserialize(deserializer)?;
    Ok(value.unwrap_or(0.0).clamp(0.0, 100.0).round() as u8)
}

/// The model replied, but not with anything we can use
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("model returned malformed {expected}: {reason} (reply started with: {snippet:?})")]
pub struct MalformedModelOutput {
    /// What the caller was trying to parse ("page analysis", "link choice", ..)
    pub expected: &'static str,
    pub reason: String,
    pub snippet: String,
}

/// Parse a model reply into `T`.
///
/// Json-mode replies are normally the bare object, so a direct parse is tried
/// first. Models without json mode (or ignoring it) like to wrap the object in
/// a markdown fence or lead in with prose, so those forms are salvaged before
/// giving up.
pub fn parse_model_json<T: DeserializeOwned>(
    expected: &'static str,
    raw: &str,
) -> Result<T, MalformedModelOutput> {
    let trimmed = raw.trim();

    let direct_err = match serde_json::from_str::<T>(trimmed) {
        Ok(value) => return Ok(value),
        Err(err) => err,
    };

    if let Some(inner) = fenced_block(trimmed) {
        if let Ok(value) = serde_json::from_str::<T>(inner.trim()) {
            return Ok(value);
        }
    }

    if let Some(object) = first_balanced_object(trimmed) {
        if let Ok(value) = serde_json::from_str::<T>(object) {
            return Ok(value);
        }
    }

    Err(MalformedModelOutput {
        expected,
        reason: direct_err.to_string(),
        snippet: snippet(trimmed),
    })
}

/// Body of the first markdown code fence, tolerating trailing prose after the
/// closing fence. The language tag line ("json") is skipped.
fn fenced_block(content: &str) -> Option<&str> {
    let fence_start = content.find("```")?;
    let after_opening = &content[fence_start + 3..];

    let body_start = fence_start + 3 + after_opening.find('\n')? + 1;
    let body_end = body_start + content[body_start..].find("```")?;

    if body_start >= body_end {
        return None;
    }
    Some(&content[body_start..body_end])
}

/// First `{...}` object in the text, found by brace counting with string
/// literals and escapes respected
fn first_balanced_object(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let candidate = &content[start..];

    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in candidate.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&candidate[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Opening slice of the reply, for log and error context
fn snippet(raw: &str) -> String {
    const LIMIT: usize = 200;
    if raw.len() <= LIMIT {
        return raw.to_string();
    }
    let mut end = LIMIT;
    while !raw.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &raw[..end])
}
