use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::projects::forms::{extract, normalize, AnswerPolicy, AnswerSet, FieldSet, FormSchema, RejectedAnswers};

use super::domain::{
    has_applied_in, Affordance, ApplicantReview, ApplicationId, ApplicationRecord, ProjectCard,
    ProjectDraft, ProjectId, ProjectRecord, ProjectStatusView,
};
use super::identity::ActorId;
use super::repository::{
    ApplicationRepository, OwnedApplication, ProjectRepository, RepositoryError,
};

/// Service composing the project and application stores with the form engine.
///
/// Holds no mutable state of its own; every call is an independent unit of work
/// that relies on the store's per-row atomicity.
pub struct ProjectApplicationService<P, A> {
    projects: Arc<P>,
    applications: Arc<A>,
    policy: AnswerPolicy,
}

static PROJECT_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static APPLICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_project_id() -> ProjectId {
    let id = PROJECT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ProjectId(format!("prj-{id:06}"))
}

fn next_application_id() -> ApplicationId {
    let id = APPLICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ApplicationId(format!("app-{id:06}"))
}

/// Result of `submit`.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Created(ApplicationRecord),
    /// The actor already holds an application for this project; nothing was written.
    AlreadyApplied,
}

/// Result of `amend`.
#[derive(Debug, Clone, PartialEq)]
pub enum AmendOutcome {
    Amended(AnswerSet),
    /// No row matched the id for this actor. Not distinguished from "not found".
    NothingAmended,
}

/// Result of `withdraw` and `delete_project`. Store failures are logged and folded in
/// here rather than surfaced as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalOutcome {
    Removed,
    NothingRemoved,
    StoreFailed,
}

impl<P, A> ProjectApplicationService<P, A>
where
    P: ProjectRepository + 'static,
    A: ApplicationRepository + 'static,
{
    pub fn new(projects: Arc<P>, applications: Arc<A>) -> Self {
        Self {
            projects,
            applications,
            policy: AnswerPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: AnswerPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> AnswerPolicy {
        self.policy
    }

    /// Create a project owned by `actor`. The schema is stored in canonical list form.
    pub fn create_project(
        &self,
        actor: &ActorId,
        draft: ProjectDraft,
    ) -> Result<ProjectRecord, ApplicationServiceError> {
        let title = draft.title.trim();
        if title.is_empty() {
            return Err(ApplicationServiceError::InvalidProject("title is required"));
        }

        let schema = normalize(draft.form_schema);
        let record = ProjectRecord {
            id: next_project_id(),
            author_id: actor.clone(),
            title: title.to_string(),
            description: draft.description,
            required_skills: draft.required_skills,
            contact_info: draft.contact_info.filter(|contact| !contact.trim().is_empty()),
            form_schema: Some(schema.to_value()),
            created_at: Utc::now(),
        };

        let stored = self.projects.insert(record)?;
        info!(project = %stored.id, questions = schema.len(), "project created");
        Ok(stored)
    }

    /// Delete a project owned by `actor`, together with its applications.
    pub fn delete_project(&self, project_id: &ProjectId, actor: &ActorId) -> RemovalOutcome {
        match self.projects.delete_owned(project_id, actor) {
            Ok(0) => {
                debug!(project = %project_id, "delete matched no project owned by actor");
                RemovalOutcome::NothingRemoved
            }
            Ok(_) => {
                if let Err(err) = self.applications.delete_for_project(project_id) {
                    warn!(project = %project_id, error = %err, "failed to purge applications of deleted project");
                }
                RemovalOutcome::Removed
            }
            Err(err) => {
                warn!(project = %project_id, error = %err, "project delete failed");
                RemovalOutcome::StoreFailed
            }
        }
    }

    /// Every project, newest first, with what `viewer` can do on each.
    pub fn board(&self, viewer: &ActorId) -> Result<Vec<ProjectCard>, ApplicationServiceError> {
        let projects = self.projects.list()?;
        let mut cards = Vec::with_capacity(projects.len());
        for project in projects {
            let applications = self.applications.for_project(&project.id)?;
            let affordance = Affordance::derive(&project, &applications, viewer);
            cards.push(ProjectCard {
                applicant_count: applications.len(),
                affordance,
                project_id: project.id,
                title: project.title,
                description: project.description,
                required_skills: project.required_skills,
                contact_info: project.contact_info,
                created_at: project.created_at,
            });
        }
        Ok(cards)
    }

    /// Whether `actor` holds an application for the project. Recomputed on every call.
    pub fn has_applied(
        &self,
        project_id: &ProjectId,
        actor: &ActorId,
    ) -> Result<bool, ApplicationServiceError> {
        let applications = self.applications.for_project(project_id)?;
        Ok(has_applied_in(&applications, actor))
    }

    pub fn project_status(
        &self,
        project_id: &ProjectId,
        actor: &ActorId,
    ) -> Result<ProjectStatusView, ApplicationServiceError> {
        let project = self.project(project_id)?;
        let applications = self.applications.for_project(project_id)?;
        let application_id = applications
            .iter()
            .find(|application| &application.applicant_id == actor)
            .map(|application| application.id.clone());

        Ok(ProjectStatusView {
            project_id: project.id.clone(),
            has_applied: application_id.is_some(),
            affordance: Affordance::derive(&project, &applications, actor),
            application_id,
        })
    }

    pub fn load_schema(&self, project_id: &ProjectId) -> Result<FormSchema, ApplicationServiceError> {
        Ok(self.project(project_id)?.schema())
    }

    pub fn my_application(
        &self,
        project_id: &ProjectId,
        actor: &ActorId,
    ) -> Result<Option<ApplicationRecord>, ApplicationServiceError> {
        let applications = self.applications.for_project(project_id)?;
        Ok(applications
            .into_iter()
            .find(|application| &application.applicant_id == actor))
    }

    pub fn load_my_answers(
        &self,
        project_id: &ProjectId,
        actor: &ActorId,
    ) -> Result<Option<AnswerSet>, ApplicationServiceError> {
        Ok(self
            .my_application(project_id, actor)?
            .map(|application| application.answers))
    }

    /// Create `actor`'s application. An existing application, whether found by the
    /// pre-check read or by the store's uniqueness constraint, yields `AlreadyApplied`.
    pub fn submit(
        &self,
        actor: &ActorId,
        project_id: &ProjectId,
        fields: &FieldSet,
    ) -> Result<SubmitOutcome, ApplicationServiceError> {
        let project = self.project(project_id)?;

        if self.has_applied(project_id, actor)? {
            debug!(project = %project_id, actor = %actor, "submit skipped, already applied");
            return Ok(SubmitOutcome::AlreadyApplied);
        }

        let answers = self.answers_for(&project, fields)?;
        let record = ApplicationRecord {
            id: next_application_id(),
            project_id: project.id.clone(),
            applicant_id: actor.clone(),
            answers,
            created_at: Utc::now(),
            updated_at: None,
        };

        match self.applications.insert(record) {
            Ok(stored) => {
                info!(project = %project_id, application = %stored.id, "application submitted");
                Ok(SubmitOutcome::Created(stored))
            }
            Err(RepositoryError::Conflict) => {
                debug!(project = %project_id, actor = %actor, "concurrent submit lost the uniqueness race");
                Ok(SubmitOutcome::AlreadyApplied)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Replace the answers of `application_id` wholesale, provided `actor` owns it and
    /// it belongs to `project_id`.
    pub fn amend(
        &self,
        actor: &ActorId,
        project_id: &ProjectId,
        application_id: &ApplicationId,
        fields: &FieldSet,
    ) -> Result<AmendOutcome, ApplicationServiceError> {
        let project = self.project(project_id)?;
        let answers = self.answers_for(&project, fields)?;
        let filter = OwnedApplication::new(application_id.clone(), actor.clone())
            .in_project(project_id.clone());

        let rows = self
            .applications
            .update_answers(&filter, &answers, Utc::now())?;
        if rows == 0 {
            debug!(application = %application_id, project = %project_id, actor = %actor, "amend matched no owned application in project");
            return Ok(AmendOutcome::NothingAmended);
        }

        info!(project = %project_id, application = %application_id, "application amended");
        Ok(AmendOutcome::Amended(answers))
    }

    /// Delete `application_id` if `actor` owns it. Never fails the caller.
    pub fn withdraw(&self, actor: &ActorId, application_id: &ApplicationId) -> RemovalOutcome {
        let filter = OwnedApplication::new(application_id.clone(), actor.clone());
        match self.applications.delete(&filter) {
            Ok(0) => {
                debug!(application = %application_id, actor = %actor, "withdraw matched no owned application");
                RemovalOutcome::NothingRemoved
            }
            Ok(_) => {
                info!(application = %application_id, "application withdrawn");
                RemovalOutcome::Removed
            }
            Err(err) => {
                warn!(application = %application_id, error = %err, "application withdraw failed");
                RemovalOutcome::StoreFailed
            }
        }
    }

    /// Owner-only view of every application against the project.
    pub fn review_applicants(
        &self,
        project_id: &ProjectId,
        actor: &ActorId,
    ) -> Result<Vec<ApplicantReview>, ApplicationServiceError> {
        let project = self.project(project_id)?;
        if !project.is_owned_by(actor) {
            return Err(ApplicationServiceError::NotProjectOwner);
        }

        let schema = project.schema();
        let applications = self.applications.for_project(project_id)?;
        Ok(applications
            .iter()
            .map(|application| ApplicantReview::from_record(&schema, application))
            .collect())
    }

    fn project(&self, project_id: &ProjectId) -> Result<ProjectRecord, ApplicationServiceError> {
        self.projects
            .fetch(project_id)?
            .ok_or_else(|| ApplicationServiceError::ProjectNotFound(project_id.clone()))
    }

    fn answers_for(
        &self,
        project: &ProjectRecord,
        fields: &FieldSet,
    ) -> Result<AnswerSet, ApplicationServiceError> {
        let schema = project.schema();
        let answers = extract(&schema, fields);
        self.policy.check(&schema, &answers)?;
        Ok(answers)
    }
}

/// Error raised by the application service.
#[derive(Debug, thiserror::Error)]
pub enum ApplicationServiceError {
    #[error("project {0} not found")]
    ProjectNotFound(ProjectId),
    #[error("only the project owner may review its applicants")]
    NotProjectOwner,
    #[error("invalid project: {0}")]
    InvalidProject(&'static str),
    #[error(transparent)]
    Answers(#[from] RejectedAnswers),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
