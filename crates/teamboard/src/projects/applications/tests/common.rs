use std::sync::{Arc, Mutex};

use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};

use crate::projects::applications::domain::{
    ApplicationRecord, ProjectDraft, ProjectId, ProjectRecord,
};
use crate::projects::applications::identity::{ActorId, HeaderIdentity};
use crate::projects::applications::repository::{
    ApplicationRepository, OwnedApplication, ProjectRepository, RepositoryError,
};
use crate::projects::applications::router::{project_router, Gatekeeper};
use crate::projects::applications::service::ProjectApplicationService;
use crate::projects::forms::{AnswerSet, FieldSet, RawSchema};

pub(super) const ACTOR_HEADER: &str = "x-actor-id";
pub(super) const SIGN_IN: &str = "/login";

pub(super) fn owner() -> ActorId {
    ActorId("owner-1".to_string())
}

pub(super) fn applicant() -> ActorId {
    ActorId("applicant-1".to_string())
}

pub(super) fn other_applicant() -> ActorId {
    ActorId("applicant-2".to_string())
}

pub(super) fn schema_value() -> Value {
    json!([
        { "id": "q1", "type": "free-text", "label": "Why?" },
        { "id": "q2", "type": "multi-choice", "label": "Skills", "options": ["A", "B", "C"] },
    ])
}

pub(super) fn project_record(id: &str, schema: Option<Value>, created_at: DateTime<Utc>) -> ProjectRecord {
    ProjectRecord {
        id: ProjectId(id.to_string()),
        author_id: owner(),
        title: format!("Project {id}"),
        description: "Build a bear deterrent".to_string(),
        required_skills: vec!["Rust".to_string()],
        contact_info: None,
        form_schema: schema,
        created_at,
    }
}

pub(super) fn draft() -> ProjectDraft {
    ProjectDraft {
        title: "Bearrier".to_string(),
        description: "Bear deterrent system".to_string(),
        required_skills: vec!["Rust".to_string(), "PyTorch".to_string()],
        contact_info: Some("team@example.com".to_string()),
        form_schema: RawSchema::Encoded(schema_value().to_string()),
    }
}

pub(super) fn answers_fields() -> FieldSet {
    FieldSet::new()
        .with("q1", "Because")
        .with("q2", "A")
        .with("q2", "C")
}

pub(super) fn timestamp(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, day, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

#[derive(Default, Clone)]
pub(super) struct MemoryProjects {
    pub(super) records: Arc<Mutex<Vec<ProjectRecord>>>,
}

impl MemoryProjects {
    pub(super) fn seeded(records: Vec<ProjectRecord>) -> Self {
        Self {
            records: Arc::new(Mutex::new(records)),
        }
    }
}

impl ProjectRepository for MemoryProjects {
    fn insert(&self, record: ProjectRecord) -> Result<ProjectRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.iter().any(|existing| existing.id == record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.push(record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &ProjectId) -> Result<Option<ProjectRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.iter().find(|record| &record.id == id).cloned())
    }

    fn list(&self) -> Result<Vec<ProjectRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        let mut records = guard.clone();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    fn delete_owned(&self, id: &ProjectId, author: &ActorId) -> Result<usize, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let before = guard.len();
        guard.retain(|record| !(&record.id == id && &record.author_id == author));
        Ok(before - guard.len())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryApplications {
    pub(super) records: Arc<Mutex<Vec<ApplicationRecord>>>,
}

impl MemoryApplications {
    pub(super) fn all(&self) -> Vec<ApplicationRecord> {
        self.records.lock().expect("repository mutex poisoned").clone()
    }
}

impl ApplicationRepository for MemoryApplications {
    fn insert(&self, record: ApplicationRecord) -> Result<ApplicationRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.iter().any(|existing| {
            existing.project_id == record.project_id && existing.applicant_id == record.applicant_id
        }) {
            return Err(RepositoryError::Conflict);
        }
        guard.push(record.clone());
        Ok(record)
    }

    fn update_answers(
        &self,
        filter: &OwnedApplication,
        answers: &AnswerSet,
        updated_at: DateTime<Utc>,
    ) -> Result<usize, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let mut rows = 0;
        for record in guard.iter_mut().filter(|record| filter.matches(record)) {
            record.answers = answers.clone();
            record.updated_at = Some(updated_at);
            rows += 1;
        }
        Ok(rows)
    }

    fn delete(&self, filter: &OwnedApplication) -> Result<usize, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let before = guard.len();
        guard.retain(|record| !filter.matches(record));
        Ok(before - guard.len())
    }

    fn for_project(&self, project: &ProjectId) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .iter()
            .filter(|record| &record.project_id == project)
            .cloned()
            .collect())
    }

    fn delete_for_project(&self, project: &ProjectId) -> Result<usize, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let before = guard.len();
        guard.retain(|record| &record.project_id != project);
        Ok(before - guard.len())
    }
}

/// Reads succeed but never see a prior application and every insert collides, the
/// way a concurrent double submit looks from the losing request.
pub(super) struct RacingApplications;

impl ApplicationRepository for RacingApplications {
    fn insert(&self, _record: ApplicationRecord) -> Result<ApplicationRecord, RepositoryError> {
        Err(RepositoryError::Conflict)
    }

    fn update_answers(
        &self,
        _filter: &OwnedApplication,
        _answers: &AnswerSet,
        _updated_at: DateTime<Utc>,
    ) -> Result<usize, RepositoryError> {
        Ok(0)
    }

    fn delete(&self, _filter: &OwnedApplication) -> Result<usize, RepositoryError> {
        Ok(0)
    }

    fn for_project(&self, _project: &ProjectId) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        Ok(Vec::new())
    }

    fn delete_for_project(&self, _project: &ProjectId) -> Result<usize, RepositoryError> {
        Ok(0)
    }
}

/// Reads succeed, writes fail.
pub(super) struct ReadOnlyApplications;

impl ApplicationRepository for ReadOnlyApplications {
    fn insert(&self, _record: ApplicationRecord) -> Result<ApplicationRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("read only".to_string()))
    }

    fn update_answers(
        &self,
        _filter: &OwnedApplication,
        _answers: &AnswerSet,
        _updated_at: DateTime<Utc>,
    ) -> Result<usize, RepositoryError> {
        Err(RepositoryError::Unavailable("read only".to_string()))
    }

    fn delete(&self, _filter: &OwnedApplication) -> Result<usize, RepositoryError> {
        Err(RepositoryError::Unavailable("read only".to_string()))
    }

    fn for_project(&self, _project: &ProjectId) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        Ok(Vec::new())
    }

    fn delete_for_project(&self, _project: &ProjectId) -> Result<usize, RepositoryError> {
        Err(RepositoryError::Unavailable("read only".to_string()))
    }
}

pub(super) fn seeded_projects() -> MemoryProjects {
    MemoryProjects::seeded(vec![
        project_record("prj-1", Some(schema_value()), timestamp(1)),
        project_record("prj-2", None, timestamp(2)),
    ])
}

pub(super) fn build_service() -> (
    ProjectApplicationService<MemoryProjects, MemoryApplications>,
    Arc<MemoryProjects>,
    Arc<MemoryApplications>,
) {
    let projects = Arc::new(seeded_projects());
    let applications = Arc::new(MemoryApplications::default());
    let service = ProjectApplicationService::new(projects.clone(), applications.clone());
    (service, projects, applications)
}

pub(super) fn gate() -> Arc<Gatekeeper> {
    let identity = HeaderIdentity::new(ACTOR_HEADER).expect("valid header name");
    Arc::new(Gatekeeper::new(Arc::new(identity), SIGN_IN))
}

pub(super) fn router_with_service(
    service: ProjectApplicationService<MemoryProjects, MemoryApplications>,
) -> axum::Router {
    project_router(Arc::new(service), gate())
}

pub(super) fn form_post(uri: &str, actor: Option<&ActorId>, body: &str) -> Request<axum::body::Body> {
    let mut builder = Request::post(uri).header(
        header::CONTENT_TYPE,
        "application/x-www-form-urlencoded",
    );
    if let Some(actor) = actor {
        builder = builder.header(ACTOR_HEADER, actor.0.as_str());
    }
    builder
        .body(axum::body::Body::from(body.to_string()))
        .expect("request builds")
}

pub(super) fn json_get(uri: &str, actor: Option<&ActorId>) -> Request<axum::body::Body> {
    let mut builder = Request::get(uri);
    if let Some(actor) = actor {
        builder = builder.header(ACTOR_HEADER, actor.0.as_str());
    }
    builder
        .body(axum::body::Body::empty())
        .expect("request builds")
}

pub(super) fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

pub(super) fn assert_redirect_to_sign_in(response: &Response) {
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(response), SIGN_IN);
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
