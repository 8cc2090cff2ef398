use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use super::schema::{FormSchema, QuestionId};

pub const PROJECT_ID_FIELD: &str = "projectId";
pub const APPLICATION_ID_FIELD: &str = "applicationId";

/// Multi-valued submitted field set, in the order the client sent the fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSet {
    pairs: Vec<(String, String)>,
}

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((name.into(), value.into()));
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(name, value);
        self
    }

    /// First value bound to `name`.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Every value bound to `name`, in submission order.
    pub fn all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.pairs
            .iter()
            .filter(move |(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn project_id(&self) -> Option<&str> {
        self.first(PROJECT_ID_FIELD).filter(|value| !value.is_empty())
    }

    pub fn application_id(&self) -> Option<&str> {
        self.first(APPLICATION_ID_FIELD)
            .filter(|value| !value.is_empty())
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Build from a JSON object whose values are strings or arrays of strings.
    ///
    /// Numbers and booleans are stringified the way an HTML form would send them;
    /// nested objects and nulls are skipped.
    pub fn from_json(value: &Value) -> Self {
        let mut fields = FieldSet::new();
        let Some(object) = value.as_object() else {
            return fields;
        };

        for (name, value) in object {
            match value {
                Value::Array(items) => {
                    for item in items {
                        if let Some(scalar) = scalar_text(item) {
                            fields.push(name.as_str(), scalar);
                        }
                    }
                }
                other => {
                    if let Some(scalar) = scalar_text(other) {
                        fields.push(name.as_str(), scalar);
                    }
                }
            }
        }

        fields
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

impl From<Vec<(String, String)>> for FieldSet {
    fn from(pairs: Vec<(String, String)>) -> Self {
        Self { pairs }
    }
}

impl<K, V> FromIterator<(K, V)> for FieldSet
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            pairs: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

/// One respondent answer, shaped by the question type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    Text(String),
    Choices(Vec<String>),
}

impl Answer {
    pub fn is_blank(&self) -> bool {
        match self {
            Answer::Text(text) => text.trim().is_empty(),
            Answer::Choices(choices) => choices.is_empty(),
        }
    }

    /// Single line rendering for review screens: lists joined by ` / `.
    pub fn display(&self) -> String {
        match self {
            Answer::Text(text) => text.clone(),
            Answer::Choices(choices) => choices.join(" / "),
        }
    }
}

impl From<&str> for Answer {
    fn from(value: &str) -> Self {
        Answer::Text(value.to_string())
    }
}

impl From<Vec<&str>> for Answer {
    fn from(values: Vec<&str>) -> Self {
        Answer::Choices(values.into_iter().map(str::to_string).collect())
    }
}

/// Question id to answer mapping, kept in schema order.
///
/// Serializes as a JSON object; key order on the wire follows the schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerSet {
    entries: Vec<(QuestionId, Answer)>,
}

impl AnswerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &QuestionId) -> Option<&Answer> {
        self.entries
            .iter()
            .find(|(key, _)| key == id)
            .map(|(_, answer)| answer)
    }

    /// Insert or replace the answer for `id`. Replacement keeps the original position.
    pub fn insert(&mut self, id: QuestionId, answer: Answer) {
        match self.entries.iter_mut().find(|(key, _)| *key == id) {
            Some((_, existing)) => *existing = answer,
            None => self.entries.push((id, answer)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&QuestionId, &Answer)> {
        self.entries.iter().map(|(id, answer)| (id, answer))
    }

    pub fn ids(&self) -> impl Iterator<Item = &QuestionId> {
        self.entries.iter().map(|(id, _)| id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop keys that no longer name a question in `schema`.
    pub fn retain_known(&mut self, schema: &FormSchema) {
        self.entries.retain(|(id, _)| schema.contains(id));
    }
}

impl<K: Into<String>> FromIterator<(K, Answer)> for AnswerSet {
    fn from_iter<T: IntoIterator<Item = (K, Answer)>>(iter: T) -> Self {
        let mut set = AnswerSet::new();
        for (id, answer) in iter {
            set.insert(QuestionId(id.into()), answer);
        }
        set
    }
}

impl Serialize for AnswerSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (id, answer) in &self.entries {
            map.serialize_entry(id, answer)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for AnswerSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct AnswerSetVisitor;

        impl<'de> Visitor<'de> for AnswerSetVisitor {
            type Value = AnswerSet;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of question ids to answers")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<AnswerSet, A::Error> {
                let mut set = AnswerSet::new();
                while let Some((id, answer)) = access.next_entry::<QuestionId, Answer>()? {
                    set.insert(id, answer);
                }
                Ok(set)
            }
        }

        deserializer.deserialize_map(AnswerSetVisitor)
    }
}

/// Build the canonical answer set for `schema` out of the raw submitted fields.
///
/// Keys are exactly the schema's question ids, in schema order. Fields that name
/// no question are ignored. Option membership is not checked here; see
/// [`AnswerPolicy`](super::AnswerPolicy).
pub fn extract(schema: &FormSchema, fields: &FieldSet) -> AnswerSet {
    let mut answers = AnswerSet::new();
    for question in schema {
        let name = question.id.as_str();
        let answer = if question.kind.collects_many() {
            Answer::Choices(fields.all(name).map(str::to_string).collect())
        } else {
            Answer::Text(fields.first(name).unwrap_or_default().to_string())
        };
        answers.insert(question.id.clone(), answer);
    }
    answers
}
