use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::projects::forms::{normalize, AnswerSet, FormSchema, QuestionId, RawSchema};

use super::identity::ActorId;

/// Identifier wrapper for projects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(pub String);

/// Identifier wrapper for submitted applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub String);

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Project row as held by the store. `form_schema` stays semi-structured here and is
/// only ever read through [`ProjectRecord::schema`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub id: ProjectId,
    pub author_id: ActorId,
    pub title: String,
    pub description: String,
    pub required_skills: Vec<String>,
    pub contact_info: Option<String>,
    pub form_schema: Option<Value>,
    pub created_at: DateTime<Utc>,
}

impl ProjectRecord {
    pub fn schema(&self) -> FormSchema {
        normalize(self.form_schema.as_ref())
    }

    pub fn is_owned_by(&self, actor: &ActorId) -> bool {
        &self.author_id == actor
    }
}

/// Caller input for a new project. The schema is normalized before it is stored.
#[derive(Debug, Clone)]
pub struct ProjectDraft {
    pub title: String,
    pub description: String,
    pub required_skills: Vec<String>,
    pub contact_info: Option<String>,
    pub form_schema: RawSchema,
}

/// One actor's answers against one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub id: ApplicationId,
    pub project_id: ProjectId,
    pub applicant_id: ActorId,
    pub answers: AnswerSet,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Whether `actor` holds one of `applications`.
pub fn has_applied_in(applications: &[ApplicationRecord], actor: &ActorId) -> bool {
    applications
        .iter()
        .any(|application| &application.applicant_id == actor)
}

/// What the viewer can do with a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Affordance {
    Apply,
    AlreadyApplied,
    ManageApplicants,
}

impl Affordance {
    pub fn derive(project: &ProjectRecord, applications: &[ApplicationRecord], viewer: &ActorId) -> Self {
        if project.is_owned_by(viewer) {
            Affordance::ManageApplicants
        } else if has_applied_in(applications, viewer) {
            Affordance::AlreadyApplied
        } else {
            Affordance::Apply
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Affordance::Apply => "apply",
            Affordance::AlreadyApplied => "already applied",
            Affordance::ManageApplicants => "manage applicants",
        }
    }
}

/// Board entry shown on the landing page.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectCard {
    pub project_id: ProjectId,
    pub title: String,
    pub description: String,
    pub required_skills: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_info: Option<String>,
    pub created_at: DateTime<Utc>,
    pub applicant_count: usize,
    pub affordance: Affordance,
}

/// Per-viewer status of one project.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectStatusView {
    pub project_id: ProjectId,
    pub has_applied: bool,
    pub affordance: Affordance,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_id: Option<ApplicationId>,
}

pub const NO_ANSWER: &str = "No answer";

/// Question label next to the rendered answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewedAnswer {
    pub question_id: QuestionId,
    pub label: String,
    pub display: String,
}

/// Render `answers` against `schema`, in schema order. Answers to questions no longer
/// in the schema are not shown.
pub fn render_answers(schema: &FormSchema, answers: &AnswerSet) -> Vec<ReviewedAnswer> {
    schema
        .iter()
        .map(|question| {
            let display = answers
                .get(&question.id)
                .filter(|answer| !answer.is_blank())
                .map(|answer| answer.display())
                .unwrap_or_else(|| NO_ANSWER.to_string());
            ReviewedAnswer {
                question_id: question.id.clone(),
                label: question.label.clone(),
                display,
            }
        })
        .collect()
}

/// One applicant as seen by the project owner.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicantReview {
    pub application_id: ApplicationId,
    pub applicant_id: ActorId,
    pub submitted_at: DateTime<Utc>,
    pub answers: Vec<ReviewedAnswer>,
}

impl ApplicantReview {
    pub fn from_record(schema: &FormSchema, record: &ApplicationRecord) -> Self {
        Self {
            application_id: record.id.clone(),
            applicant_id: record.applicant_id.clone(),
            submitted_at: record.updated_at.unwrap_or(record.created_at),
            answers: render_answers(schema, &record.answers),
        }
    }
}
