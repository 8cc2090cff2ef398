use std::fmt;

use serde::{Deserialize, Serialize};

/// Caller-supplied question identifier; the project-creation page derives it from a timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(pub String);

impl QuestionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for QuestionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// One item of a project's custom application form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Question {
    pub id: QuestionId,
    pub label: String,
    #[serde(flatten)]
    pub kind: QuestionKind,
}

impl Question {
    pub fn free_text(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: QuestionId(id.into()),
            label: label.into(),
            kind: QuestionKind::FreeText,
        }
    }

    pub fn single_choice<I, S>(id: impl Into<String>, label: impl Into<String>, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: QuestionId(id.into()),
            label: label.into(),
            kind: QuestionKind::SingleChoice {
                options: options.into_iter().map(Into::into).collect(),
            },
        }
    }

    pub fn multi_choice<I, S>(id: impl Into<String>, label: impl Into<String>, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: QuestionId(id.into()),
            label: label.into(),
            kind: QuestionKind::MultiChoice {
                options: options.into_iter().map(Into::into).collect(),
            },
        }
    }
}

/// Question type with its type-specific payload.
///
/// Choice questions always carry their options; the normalizer refuses to build
/// one with an empty list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum QuestionKind {
    FreeText,
    SingleChoice { options: Vec<String> },
    MultiChoice { options: Vec<String> },
}

impl QuestionKind {
    pub const fn tag(&self) -> &'static str {
        match self {
            QuestionKind::FreeText => "free-text",
            QuestionKind::SingleChoice { .. } => "single-choice",
            QuestionKind::MultiChoice { .. } => "multi-choice",
        }
    }

    pub fn options(&self) -> &[String] {
        match self {
            QuestionKind::FreeText => &[],
            QuestionKind::SingleChoice { options } | QuestionKind::MultiChoice { options } => {
                options
            }
        }
    }

    /// Whether the answer is a list of values rather than a single string.
    pub const fn collects_many(&self) -> bool {
        matches!(self, QuestionKind::MultiChoice { .. })
    }
}

/// Tag names accepted on read. The legacy names are the HTML input types older
/// project-creation pages stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KindTag {
    FreeText,
    SingleChoice,
    MultiChoice,
}

impl KindTag {
    pub(crate) fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "free-text" | "free_text" | "text" => Some(Self::FreeText),
            "single-choice" | "single_choice" | "radio" => Some(Self::SingleChoice),
            "multi-choice" | "multi_choice" | "checkbox" => Some(Self::MultiChoice),
            _ => None,
        }
    }

    pub(crate) const fn needs_options(self) -> bool {
        !matches!(self, KindTag::FreeText)
    }

    pub(crate) fn with_options(self, options: Vec<String>) -> QuestionKind {
        match self {
            KindTag::FreeText => QuestionKind::FreeText,
            KindTag::SingleChoice => QuestionKind::SingleChoice { options },
            KindTag::MultiChoice => QuestionKind::MultiChoice { options },
        }
    }
}

/// Ordered list of questions owned by one project. May be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormSchema(Vec<Question>);

impl FormSchema {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn questions(&self) -> &[Question] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Question> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, id: &QuestionId) -> Option<&Question> {
        self.0.iter().find(|question| &question.id == id)
    }

    pub fn contains(&self, id: &QuestionId) -> bool {
        self.get(id).is_some()
    }

    /// Storage representation; always the canonical list form.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::Value::Array(Vec::new()))
    }

    /// Appends `question` unless its id is already taken. Returns whether it was kept.
    pub(crate) fn push_unique(&mut self, question: Question) -> bool {
        if self.contains(&question.id) {
            return false;
        }
        self.0.push(question);
        true
    }
}

impl<'a> IntoIterator for &'a FormSchema {
    type Item = &'a Question;
    type IntoIter = std::slice::Iter<'a, Question>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<Question> for FormSchema {
    fn from_iter<T: IntoIterator<Item = Question>>(iter: T) -> Self {
        let mut schema = FormSchema::empty();
        for question in iter {
            schema.push_unique(question);
        }
        schema
    }
}
