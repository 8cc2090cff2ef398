use serde::Serialize;

use super::extractor::{Answer, AnswerSet};
use super::schema::{FormSchema, QuestionId, QuestionKind};

/// How strictly submitted answers are held to the declared options and required hints.
///
/// `Lenient` treats options as presentation hints only. `Strict` rejects empty
/// text/single-choice answers and any value outside the declared options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerPolicy {
    #[default]
    Lenient,
    Strict,
}

/// A single answer that failed the strict policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnswerViolation {
    #[error("question `{question}` requires an answer")]
    MissingAnswer { question: QuestionId },
    #[error("`{value}` is not an option of question `{question}`")]
    UnknownOption { question: QuestionId, value: String },
    #[error("answer to question `{question}` has the wrong shape")]
    ShapeMismatch { question: QuestionId },
}

/// All violations for one submission, in schema order.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{} answer(s) rejected", .violations.len())]
pub struct RejectedAnswers {
    pub violations: Vec<AnswerViolation>,
}

impl AnswerPolicy {
    pub fn check(&self, schema: &FormSchema, answers: &AnswerSet) -> Result<(), RejectedAnswers> {
        if matches!(self, AnswerPolicy::Lenient) {
            return Ok(());
        }

        let mut violations = Vec::new();
        for question in schema {
            let id = &question.id;
            match (&question.kind, answers.get(id)) {
                (QuestionKind::FreeText, Some(Answer::Text(text))) => {
                    if text.trim().is_empty() {
                        violations.push(AnswerViolation::MissingAnswer { question: id.clone() });
                    }
                }
                (QuestionKind::SingleChoice { options }, Some(Answer::Text(value))) => {
                    if value.is_empty() {
                        violations.push(AnswerViolation::MissingAnswer { question: id.clone() });
                    } else if !options.contains(value) {
                        violations.push(AnswerViolation::UnknownOption {
                            question: id.clone(),
                            value: value.clone(),
                        });
                    }
                }
                (QuestionKind::MultiChoice { options }, Some(Answer::Choices(values))) => {
                    violations.extend(
                        values
                            .iter()
                            .filter(|value| !options.contains(value))
                            .map(|value| AnswerViolation::UnknownOption {
                                question: id.clone(),
                                value: value.clone(),
                            }),
                    );
                }
                (_, None) => {
                    violations.push(AnswerViolation::MissingAnswer { question: id.clone() });
                }
                (_, Some(_)) => {
                    violations.push(AnswerViolation::ShapeMismatch { question: id.clone() });
                }
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(RejectedAnswers { violations })
        }
    }
}
