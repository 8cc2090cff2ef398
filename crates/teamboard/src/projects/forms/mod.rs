//! Per-project application forms: the question schema, normalization of stored
//! schemas, and extraction of answers from submitted fields.

mod extractor;
mod normalizer;
mod policy;
mod schema;

pub use extractor::{extract, Answer, AnswerSet, FieldSet, APPLICATION_ID_FIELD, PROJECT_ID_FIELD};
pub use normalizer::{normalize, question_from_value, split_comma_list, QuestionShapeError, RawSchema};
pub use policy::{AnswerPolicy, AnswerViolation, RejectedAnswers};
pub use schema::{FormSchema, Question, QuestionId, QuestionKind};
