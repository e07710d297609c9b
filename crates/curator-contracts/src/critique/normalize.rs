use serde_json::{Map, Value};

use super::{CritiqueFields, CritiqueStatement, GalleryCritiqueResult};
use crate::error::CritiqueError;

/// A backend reply before normalization.
///
/// Hosted replies arrive as structured JSON; local completions usually arrive
/// as free text that is expected to contain a JSON object somewhere.
#[derive(Debug, Clone, PartialEq)]
pub enum RawReply {
    Structured(Value),
    Text(String),
}

const CRITIQUE_KEYS: &[&str] = &["critique", "critique_text", "review"];
const IS_AI_USED_KEYS: &[&str] = &["isAiUsed", "is_ai_used", "isAIUsed", "aiUsed", "ai_used"];
const AI_USAGE_FEEDBACK_KEYS: &[&str] = &["aiUsageFeedback", "ai_usage_feedback"];
const ART_TYPE_KEYS: &[&str] = &["artType", "art_type"];
const THEME_RELEVANCE_KEYS: &[&str] = &["themeRelevance", "theme_relevance"];
const INTENTION_RESPECT_KEYS: &[&str] = &["intentionRespectFeedback", "intention_respect_feedback"];

const OVERALL_KEYS: &[&str] = &["overallAssessment", "overall_assessment"];
const CURATION_KEYS: &[&str] = &["curationAndCoherence", "curation_and_coherence"];
const THREADS_KEYS: &[&str] = &["emergingThreads", "emerging_threads"];
const FUTURE_KEYS: &[&str] = &["futureDevelopment", "future_development"];
const STATEMENT_CRITIC_KEYS: &[&str] = &["critic", "persona", "name"];
const STATEMENT_TEXT_KEYS: &[&str] = &["statement", "text", "feedback"];

const THEME_LIST_KEYS: &[&str] = &["themes", "suggestions", "suggestedThemes", "suggested_themes"];

pub fn normalize_critique(reply: &RawReply) -> Result<CritiqueFields, CritiqueError> {
    let object = locate_object(reply)?;
    Ok(CritiqueFields {
        critique: text_field(&object, CRITIQUE_KEYS),
        is_ai_used: bool_field(&object, IS_AI_USED_KEYS),
        ai_usage_feedback: text_field(&object, AI_USAGE_FEEDBACK_KEYS),
        art_type: text_field(&object, ART_TYPE_KEYS),
        theme_relevance: text_field(&object, THEME_RELEVANCE_KEYS),
        intention_respect_feedback: text_field(&object, INTENTION_RESPECT_KEYS),
    })
}

pub fn normalize_gallery_critique(reply: &RawReply) -> Result<GalleryCritiqueResult, CritiqueError> {
    let object = locate_object(reply)?;
    Ok(GalleryCritiqueResult {
        overall_assessment: statements_field(&object, OVERALL_KEYS),
        curation_and_coherence: statements_field(&object, CURATION_KEYS),
        emerging_threads: statements_field(&object, THREADS_KEYS),
        future_development: statements_field(&object, FUTURE_KEYS),
    })
}

/// Normalizes a theme-suggestion reply into at most `limit` distinct themes.
pub fn normalize_theme_suggestions(
    reply: &RawReply,
    limit: usize,
) -> Result<Vec<String>, CritiqueError> {
    let list = match reply {
        RawReply::Structured(Value::Array(rows)) => rows.clone(),
        RawReply::Text(text) if looks_like_array(text) => {
            match serde_json::from_str::<Value>(strip_code_fence(text).as_str()) {
                Ok(Value::Array(rows)) => rows,
                _ => theme_list_from_object(&locate_object(reply)?),
            }
        }
        _ => theme_list_from_object(&locate_object(reply)?),
    };

    let mut themes: Vec<String> = Vec::new();
    for row in list {
        let Some(theme) = value_as_text(&row) else {
            continue;
        };
        if theme.is_empty()
            || themes
                .iter()
                .any(|existing| existing.eq_ignore_ascii_case(&theme))
        {
            continue;
        }
        themes.push(theme);
        if themes.len() >= limit {
            break;
        }
    }
    Ok(themes)
}

fn theme_list_from_object(object: &Map<String, Value>) -> Vec<Value> {
    pick(object, THEME_LIST_KEYS)
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

fn looks_like_array(text: &str) -> bool {
    strip_code_fence(text).starts_with('[')
}

fn locate_object(reply: &RawReply) -> Result<Map<String, Value>, CritiqueError> {
    match reply {
        RawReply::Structured(Value::Object(object)) => Ok(object.clone()),
        RawReply::Structured(Value::String(text)) | RawReply::Text(text) => {
            extract_json_object_from_text(text)
        }
        RawReply::Structured(other) => Err(CritiqueError::normalization(format!(
            "expected a JSON object, got {}",
            json_kind(other)
        ))),
    }
}

/// Finds the JSON object carried by a free-text completion.
///
/// The whole text (minus a markdown code fence) is tried first, then the
/// first balanced top-level `{...}` span. Text with no such span, or whose
/// span is not valid JSON, is a normalization error.
pub fn extract_json_object_from_text(text: &str) -> Result<Map<String, Value>, CritiqueError> {
    let raw = strip_code_fence(text);
    if let Ok(Value::Object(object)) = serde_json::from_str::<Value>(&raw) {
        return Ok(object);
    }
    let Some(span) = first_object_span(&raw) else {
        return Err(CritiqueError::normalization(
            "no JSON object found in backend reply",
        ));
    };
    match serde_json::from_str::<Value>(span) {
        Ok(Value::Object(object)) => Ok(object),
        Ok(other) => Err(CritiqueError::normalization(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
        Err(err) => Err(CritiqueError::normalization(format!(
            "JSON object in backend reply is malformed: {err}"
        ))),
    }
}

fn first_object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

fn strip_code_fence(text: &str) -> String {
    let raw = text.trim();
    if !(raw.starts_with("```") && raw.ends_with("```")) {
        return raw.to_string();
    }
    let lines: Vec<&str> = raw.lines().collect();
    if lines.len() < 2 {
        return raw.to_string();
    }
    let mut body = lines[1..lines.len() - 1].join("\n").trim().to_string();
    if body.to_ascii_lowercase().starts_with("json") {
        body = body[4..].trim().to_string();
    }
    body
}

fn pick<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| object.get(*key))
        .find(|value| !value.is_null())
}

fn text_field(object: &Map<String, Value>, keys: &[&str]) -> String {
    pick(object, keys)
        .and_then(value_as_text)
        .unwrap_or_default()
}

fn bool_field(object: &Map<String, Value>, keys: &[&str]) -> bool {
    pick(object, keys).and_then(value_as_bool).unwrap_or(false)
}

fn statements_field(object: &Map<String, Value>, keys: &[&str]) -> Vec<CritiqueStatement> {
    let Some(value) = pick(object, keys) else {
        return Vec::new();
    };
    let rows = match value {
        Value::Array(rows) => rows.clone(),
        Value::Object(_) => vec![value.clone()],
        Value::String(text) if !text.trim().is_empty() => {
            return vec![CritiqueStatement {
                critic: String::new(),
                statement: text.trim().to_string(),
            }];
        }
        _ => return Vec::new(),
    };
    rows.iter()
        .filter_map(|row| match row {
            Value::Object(entry) => {
                let statement = text_field(entry, STATEMENT_TEXT_KEYS);
                if statement.is_empty() {
                    return None;
                }
                Some(CritiqueStatement {
                    critic: text_field(entry, STATEMENT_CRITIC_KEYS),
                    statement,
                })
            }
            other => value_as_text(other)
                .filter(|text| !text.is_empty())
                .map(|statement| CritiqueStatement {
                    critic: String::new(),
                    statement,
                }),
        })
        .collect()
}

fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Array(rows) => {
            let parts = rows
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .collect::<Vec<&str>>();
            (!parts.is_empty()).then(|| parts.join("\n"))
        }
        _ => None,
    }
}

fn value_as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(raw) => Some(*raw),
        Value::Number(raw) => raw.as_i64().map(|value| value != 0),
        Value::String(raw) => {
            let lowered = raw.trim().to_ascii_lowercase();
            if matches!(lowered.as_str(), "1" | "true" | "yes" | "y" | "on") {
                Some(true)
            } else if matches!(lowered.as_str(), "0" | "false" | "no" | "n" | "off") {
                Some(false)
            } else {
                None
            }
        }
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
