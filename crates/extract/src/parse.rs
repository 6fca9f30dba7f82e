use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use thiserror::Error;

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

// Opening or closing Markdown fence, with an optional language tag.
re!(re_code_fence, r"```[A-Za-z]*[ \t]*\r?\n?");

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Model reply is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// A name / ID pair exactly as the model wrote it, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub name: String,
    pub national_id: String,
}

/// Parse the model's reply into raw records.
///
/// Code fences are stripped first. If the remainder is not JSON, the
/// outermost `{...}` span is tried before giving up. A reply that parses
/// but lacks a `records` array yields no records.
pub fn parse_reply(text: &str) -> Result<Vec<RawRecord>, ParseError> {
    let cleaned = re_code_fence().replace_all(text.trim(), "");
    let cleaned = cleaned.trim();

    let value: Value = match serde_json::from_str(cleaned) {
        Ok(v) => v,
        Err(first) => match outermost_object(cleaned) {
            Some(span) => serde_json::from_str(span).map_err(|_| first)?,
            None => return Err(first.into()),
        },
    };

    let Some(records) = value.get("records").and_then(Value::as_array) else {
        tracing::warn!("Model reply has no records array; treating as empty");
        return Ok(Vec::new());
    };

    Ok(records
        .iter()
        .filter(|r| r.is_object())
        .map(|r| RawRecord {
            name: field_as_string(r.get("name")),
            national_id: field_as_string(r.get("nationalId").or_else(|| r.get("national_id"))),
        })
        .collect())
}

fn outermost_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Strings pass through; numbers (IDs are sometimes emitted unquoted) are
/// rendered; anything else becomes empty.
fn field_as_string(v: Option<&Value>) -> String {
    match v {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}
