//! Single choke point turning a stored `form_schema` value into a clean [`FormSchema`].
//!
//! Historical write paths stored the schema as a native JSON list, as a JSON-encoded
//! string, or not at all. Every shape collapses here; malformed input degrades to
//! "no custom questions" and never fails the surrounding operation.

use serde_json::Value;
use tracing::debug;

use super::schema::{FormSchema, KindTag, Question, QuestionId};

/// Stored schema as read from the project row, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum RawSchema {
    List(Vec<Value>),
    Encoded(String),
    Absent,
}

impl From<Option<Value>> for RawSchema {
    fn from(value: Option<Value>) -> Self {
        match value {
            Some(Value::Array(entries)) => RawSchema::List(entries),
            Some(Value::String(encoded)) => RawSchema::Encoded(encoded),
            // null, numbers and objects carry no usable questions
            Some(_) | None => RawSchema::Absent,
        }
    }
}

impl From<Value> for RawSchema {
    fn from(value: Value) -> Self {
        RawSchema::from(Some(value))
    }
}

impl From<Option<&Value>> for RawSchema {
    fn from(value: Option<&Value>) -> Self {
        RawSchema::from(value.cloned())
    }
}

/// Reasons a single schema entry is dropped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuestionShapeError {
    #[error("entry is not an object")]
    NotAnObject,
    #[error("missing or empty `id`")]
    MissingId,
    #[error("missing `label`")]
    MissingLabel,
    #[error("missing `type`")]
    MissingType,
    #[error("unknown question type `{0}`")]
    UnknownType(String),
    #[error("choice question declares no options")]
    MissingOptions,
    #[error("duplicate question id `{0}`")]
    DuplicateId(QuestionId),
}

/// Collapse any stored schema representation into an ordered list of valid questions.
pub fn normalize(raw: impl Into<RawSchema>) -> FormSchema {
    let entries = match raw.into() {
        RawSchema::List(entries) => entries,
        RawSchema::Encoded(encoded) => decode_entries(&encoded),
        RawSchema::Absent => Vec::new(),
    };

    let mut schema = FormSchema::empty();
    for (index, entry) in entries.iter().enumerate() {
        let outcome = question_from_value(entry).and_then(|question| {
            let id = question.id.clone();
            if schema.push_unique(question) {
                Ok(())
            } else {
                Err(QuestionShapeError::DuplicateId(id))
            }
        });

        if let Err(reason) = outcome {
            debug!(index, %reason, "dropping malformed form schema entry");
        }
    }

    schema
}

fn decode_entries(encoded: &str) -> Vec<Value> {
    match serde_json::from_str::<Value>(encoded) {
        Ok(Value::Array(entries)) => entries,
        Ok(other) => {
            debug!(kind = json_kind(&other), "encoded form schema is not a list");
            Vec::new()
        }
        Err(err) => {
            debug!(error = %err, "encoded form schema failed to decode");
            Vec::new()
        }
    }
}

/// Structural validation of one schema entry.
pub fn question_from_value(value: &Value) -> Result<Question, QuestionShapeError> {
    let object = value.as_object().ok_or(QuestionShapeError::NotAnObject)?;

    let id = match object.get("id") {
        Some(Value::String(id)) if !id.trim().is_empty() => id.trim().to_string(),
        // timestamp-derived ids sometimes arrive as bare numbers
        Some(Value::Number(number)) => number.to_string(),
        _ => return Err(QuestionShapeError::MissingId),
    };

    let label = object
        .get("label")
        .and_then(Value::as_str)
        .ok_or(QuestionShapeError::MissingLabel)?
        .to_string();

    let tag_name = object
        .get("type")
        .and_then(Value::as_str)
        .ok_or(QuestionShapeError::MissingType)?;
    let tag =
        KindTag::parse(tag_name).ok_or_else(|| QuestionShapeError::UnknownType(tag_name.into()))?;

    let options = if tag.needs_options() {
        let options = object.get("options").map(options_from_value).unwrap_or_default();
        if options.is_empty() {
            return Err(QuestionShapeError::MissingOptions);
        }
        options
    } else {
        Vec::new()
    };

    Ok(Question {
        id: QuestionId(id),
        label,
        kind: tag.with_options(options),
    })
}

/// Options arrive either as a list or as the legacy comma-separated string.
fn options_from_value(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|option| !option.is_empty())
            .map(str::to_string)
            .collect(),
        Value::String(joined) => split_comma_list(joined),
        _ => Vec::new(),
    }
}

/// Split `a, b,,c` into `["a", "b", "c"]`.
pub fn split_comma_list(joined: &str) -> Vec<String> {
    joined
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
