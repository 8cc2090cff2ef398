use chrono::{DateTime, Utc};

use crate::projects::forms::AnswerSet;

use super::domain::{ApplicationId, ApplicationRecord, ProjectId, ProjectRecord};
use super::identity::ActorId;

/// Equality filter every application mutation goes through: the row id narrowed by the
/// acting applicant, so a forged id belonging to someone else matches nothing. Amend
/// also pins the project, since its answers are shaped by that project's schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedApplication {
    pub id: ApplicationId,
    pub applicant_id: ActorId,
    pub project_id: Option<ProjectId>,
}

impl OwnedApplication {
    pub fn new(id: ApplicationId, applicant_id: ActorId) -> Self {
        Self {
            id,
            applicant_id,
            project_id: None,
        }
    }

    pub fn in_project(mut self, project_id: ProjectId) -> Self {
        self.project_id = Some(project_id);
        self
    }

    pub fn matches(&self, record: &ApplicationRecord) -> bool {
        record.id == self.id
            && record.applicant_id == self.applicant_id
            && self
                .project_id
                .as_ref()
                .map_or(true, |project| &record.project_id == project)
    }
}

/// Project storage boundary.
pub trait ProjectRepository: Send + Sync {
    fn insert(&self, record: ProjectRecord) -> Result<ProjectRecord, RepositoryError>;
    fn fetch(&self, id: &ProjectId) -> Result<Option<ProjectRecord>, RepositoryError>;
    /// All projects, newest first.
    fn list(&self) -> Result<Vec<ProjectRecord>, RepositoryError>;
    /// Delete filtered by `id` and `author_id`; returns affected rows.
    fn delete_owned(&self, id: &ProjectId, author: &ActorId) -> Result<usize, RepositoryError>;
}

/// Application storage boundary.
///
/// Implementations must reject a second row for the same `(project_id, applicant_id)`
/// pair with [`RepositoryError::Conflict`]; each call is a single atomic row operation.
pub trait ApplicationRepository: Send + Sync {
    fn insert(&self, record: ApplicationRecord) -> Result<ApplicationRecord, RepositoryError>;
    /// Replace `answers` wholesale on the row matching `filter`; returns affected rows.
    fn update_answers(
        &self,
        filter: &OwnedApplication,
        answers: &AnswerSet,
        updated_at: DateTime<Utc>,
    ) -> Result<usize, RepositoryError>;
    /// Delete the row matching `filter`; returns affected rows.
    fn delete(&self, filter: &OwnedApplication) -> Result<usize, RepositoryError>;
    fn for_project(&self, project: &ProjectId) -> Result<Vec<ApplicationRecord>, RepositoryError>;
    /// Remove every application of a deleted project; returns affected rows.
    fn delete_for_project(&self, project: &ProjectId) -> Result<usize, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
