//! Parsing of raw model replies into a structured [`Verdict`].
//!
//! The prompt asks for a constrained JSON object:
//! `{"status": "tidy"|"messy", "tasks": [...], "comment": "..."}`.
//! Models wrap that in markdown fences, bullets and prose often enough
//! that the parser has to dig the object out and normalise it. Anything
//! without a usable tidy/messy signal is a [`MalformedResponse`]; a
//! malformed reply never silently becomes a state transition.

use serde_json::Value;

use crate::state::Verdict;

/// The model reply could not be turned into a verdict.
#[derive(Debug, thiserror::Error)]
#[error("Malformed model response: {0}")]
pub struct MalformedResponse(pub String);

/// Parse a raw model reply into a [`Verdict`].
///
/// `max_tasks` caps the checklist; the first N tasks in the model's
/// reported order are kept, the rest dropped.
///
/// A "messy" signal with an empty (or whitespace-only) checklist is
/// rejected here, upstream of the state machine: `messy` with no tasks
/// is not a representable zone state.
pub fn parse_verdict(raw: &str, max_tasks: usize) -> Result<Verdict, MalformedResponse> {
    let object = extract_json_object(raw)?;

    let status = object
        .get("status")
        .and_then(Value::as_str)
        .map(str::trim)
        .ok_or_else(|| MalformedResponse("missing \"status\" field".into()))?;

    let is_tidy = match status.to_ascii_lowercase().as_str() {
        // "clean" is the wording some prompts/models settle on.
        "tidy" | "clean" => true,
        "messy" => false,
        other => {
            return Err(MalformedResponse(format!(
                "unrecognised status {other:?}"
            )))
        }
    };

    let mut tasks = collect_tasks(object.get("tasks"))?;
    tasks.truncate(max_tasks);

    if !is_tidy && tasks.is_empty() {
        return Err(MalformedResponse(
            "messy status with an empty task list".into(),
        ));
    }
    if is_tidy {
        // A tidy room has no checklist, whatever the model appended.
        tasks.clear();
    }

    let comment = object
        .get("comment")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(ToString::to_string);

    Ok(Verdict {
        is_tidy,
        tasks,
        comment,
    })
}

/// Locate and parse the JSON object inside a possibly-decorated reply.
///
/// Tries the trimmed reply as-is first, then the substring between the
/// first `{` and the last `}` (which strips markdown fences and any
/// leading/trailing prose).
fn extract_json_object(raw: &str) -> Result<Value, MalformedResponse> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(MalformedResponse("empty reply".into()));
    }

    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(trimmed) {
        return Ok(value);
    }

    let start = trimmed.find('{');
    let end = trimmed.rfind('}');
    if let (Some(start), Some(end)) = (start, end) {
        if start < end {
            if let Ok(value @ Value::Object(_)) =
                serde_json::from_str::<Value>(&trimmed[start..=end])
            {
                return Ok(value);
            }
        }
    }

    Err(MalformedResponse("no JSON object found in reply".into()))
}

/// Normalise the `tasks` array into clean strings.
///
/// Accepts plain strings and `{"title": ...}` objects, strips leading
/// bullet/numbering markers, trims whitespace and drops empties. A
/// missing or null `tasks` field reads as an empty list; any other type
/// is malformed.
fn collect_tasks(value: Option<&Value>) -> Result<Vec<String>, MalformedResponse> {
    let items = match value {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(MalformedResponse(format!(
                "\"tasks\" must be an array, got {other}"
            )))
        }
    };

    let mut tasks = Vec::new();
    for item in items {
        let text = match item {
            Value::String(s) => s.as_str(),
            Value::Object(map) => match map.get("title").and_then(Value::as_str) {
                Some(title) => title,
                // Task objects without a usable title are skipped, not fatal.
                None => continue,
            },
            _ => continue,
        };
        let cleaned = strip_list_marker(text);
        if !cleaned.is_empty() {
            tasks.push(cleaned.to_string());
        }
    }
    Ok(tasks)
}

/// Strip a leading markdown bullet or `1.` / `1)` numbering marker.
fn strip_list_marker(text: &str) -> &str {
    let trimmed = text.trim();
    if let Some(rest) = trimmed
        .strip_prefix("- ")
        .or_else(|| trimmed.strip_prefix("* "))
        .or_else(|| trimmed.strip_prefix("\u{2022} "))
    {
        return rest.trim();
    }

    let digits = trimmed.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        let rest = &trimmed[digits..];
        if let Some(rest) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            return rest.trim();
        }
    }
    trimmed
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
