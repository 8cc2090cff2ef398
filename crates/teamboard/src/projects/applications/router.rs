use std::sync::Arc;

use axum::{
    extract::{
        rejection::{FormRejection, JsonRejection},
        Path, State,
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, warn};

use crate::projects::forms::{split_comma_list, FieldSet, RawSchema};

use super::domain::{render_answers, ApplicationId, ProjectDraft, ProjectId};
use super::identity::{ActorId, IdentityProvider};
use super::repository::{ApplicationRepository, ProjectRepository};
use super::service::{
    AmendOutcome, ApplicationServiceError, ProjectApplicationService, SubmitOutcome,
};

/// Resolves the acting user or sends the browser to the sign-in page.
pub struct Gatekeeper {
    identity: Arc<dyn IdentityProvider>,
    sign_in_path: String,
}

impl Gatekeeper {
    pub fn new(identity: Arc<dyn IdentityProvider>, sign_in_path: impl Into<String>) -> Self {
        Self {
            identity,
            sign_in_path: sign_in_path.into(),
        }
    }

    pub fn actor(&self, headers: &HeaderMap) -> Result<ActorId, Redirect> {
        self.identity
            .current_actor(headers)
            .ok_or_else(|| Redirect::to(&self.sign_in_path))
    }
}

/// Shared router state.
pub struct ProjectRoutes<P, A> {
    pub service: Arc<ProjectApplicationService<P, A>>,
    pub gate: Arc<Gatekeeper>,
}

impl<P, A> Clone for ProjectRoutes<P, A> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            gate: self.gate.clone(),
        }
    }
}

/// Router builder exposing the form posts and JSON queries for projects and applications.
pub fn project_router<P, A>(
    service: Arc<ProjectApplicationService<P, A>>,
    gate: Arc<Gatekeeper>,
) -> Router
where
    P: ProjectRepository + 'static,
    A: ApplicationRepository + 'static,
{
    Router::new()
        .route("/projects", post(create_project_handler::<P, A>))
        .route(
            "/projects/:project_id/delete",
            post(delete_project_handler::<P, A>),
        )
        .route(
            "/projects/:project_id/applications",
            post(submit_handler::<P, A>),
        )
        .route(
            "/projects/:project_id/applications/update",
            post(amend_handler::<P, A>),
        )
        .route(
            "/projects/:project_id/applications/cancel",
            post(withdraw_handler::<P, A>),
        )
        .route("/api/v1/projects", get(board_handler::<P, A>))
        .route(
            "/api/v1/projects/:project_id/schema",
            get(schema_handler::<P, A>),
        )
        .route(
            "/api/v1/projects/:project_id/status",
            get(status_handler::<P, A>),
        )
        .route(
            "/api/v1/projects/:project_id/answers",
            get(answers_handler::<P, A>),
        )
        .route(
            "/api/v1/projects/:project_id/applicants",
            get(applicants_handler::<P, A>),
        )
        .route(
            "/api/v1/projects/:project_id/applications",
            post(submit_json_handler::<P, A>),
        )
        .with_state(ProjectRoutes { service, gate })
}

fn project_page(project_id: &ProjectId, query: &str) -> Redirect {
    Redirect::to(&format!("/projects/{}?{}", project_id.0, query))
}

fn stamp() -> i64 {
    Utc::now().timestamp_millis()
}

/// Path id wins; a disagreeing `projectId` field is only noted.
fn reconcile_project(path_id: String, fields: &FieldSet) -> ProjectId {
    if let Some(field_id) = fields.project_id() {
        if field_id != path_id {
            debug!(path = %path_id, field = %field_id, "projectId field disagrees with path");
        }
    }
    ProjectId(path_id)
}

/// Body extraction runs after the sign-in check, so a rejection only ever reaches an
/// authenticated caller.
fn read_fields(pairs: Result<Form<Vec<(String, String)>>, FormRejection>) -> Option<FieldSet> {
    match pairs {
        Ok(Form(pairs)) => Some(FieldSet::from(pairs)),
        Err(rejection) => {
            warn!(error = %rejection, "unreadable application form");
            None
        }
    }
}

/// Raw form body from the project creation page.
#[derive(Debug, Deserialize)]
pub struct NewProjectForm {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub skills: String,
    #[serde(default)]
    pub contact_info: Option<String>,
    /// JSON-encoded question list written by the page's hidden input.
    #[serde(default)]
    pub form_schema: Option<String>,
}

impl NewProjectForm {
    pub fn into_draft(self) -> ProjectDraft {
        ProjectDraft {
            title: self.title,
            description: self.description,
            required_skills: split_comma_list(&self.skills),
            contact_info: self.contact_info,
            form_schema: match self.form_schema {
                Some(encoded) => RawSchema::Encoded(encoded),
                None => RawSchema::Absent,
            },
        }
    }
}

pub(crate) async fn create_project_handler<P, A>(
    State(routes): State<ProjectRoutes<P, A>>,
    headers: HeaderMap,
    form: Result<Form<NewProjectForm>, FormRejection>,
) -> Response
where
    P: ProjectRepository + 'static,
    A: ApplicationRepository + 'static,
{
    let actor = match routes.gate.actor(&headers) {
        Ok(actor) => actor,
        Err(redirect) => return redirect.into_response(),
    };

    let Form(form) = match form {
        Ok(form) => form,
        Err(rejection) => {
            warn!(error = %rejection, "unreadable project form");
            return Redirect::to("/projects/new?error=true").into_response();
        }
    };

    match routes.service.create_project(&actor, form.into_draft()) {
        Ok(_) => Redirect::to("/").into_response(),
        Err(err) => {
            error!(error = %err, "project creation failed");
            Redirect::to("/projects/new?error=true").into_response()
        }
    }
}

pub(crate) async fn delete_project_handler<P, A>(
    State(routes): State<ProjectRoutes<P, A>>,
    Path(project_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    P: ProjectRepository + 'static,
    A: ApplicationRepository + 'static,
{
    let actor = match routes.gate.actor(&headers) {
        Ok(actor) => actor,
        Err(redirect) => return redirect.into_response(),
    };

    routes
        .service
        .delete_project(&ProjectId(project_id), &actor);
    Redirect::to("/").into_response()
}

pub(crate) async fn submit_handler<P, A>(
    State(routes): State<ProjectRoutes<P, A>>,
    Path(project_id): Path<String>,
    headers: HeaderMap,
    pairs: Result<Form<Vec<(String, String)>>, FormRejection>,
) -> Response
where
    P: ProjectRepository + 'static,
    A: ApplicationRepository + 'static,
{
    let actor = match routes.gate.actor(&headers) {
        Ok(actor) => actor,
        Err(redirect) => return redirect.into_response(),
    };
    let fields = match read_fields(pairs) {
        Some(fields) => fields,
        None => return project_page(&ProjectId(project_id), "error=true").into_response(),
    };
    let project_id = reconcile_project(project_id, &fields);

    match routes.service.submit(&actor, &project_id, &fields) {
        Ok(SubmitOutcome::Created(_)) => {
            project_page(&project_id, &format!("success={}", stamp())).into_response()
        }
        Ok(SubmitOutcome::AlreadyApplied) => {
            project_page(&project_id, "applied=true").into_response()
        }
        Err(err) => {
            error!(project = %project_id, error = %err, "application submit failed");
            project_page(&project_id, "error=true").into_response()
        }
    }
}

pub(crate) async fn amend_handler<P, A>(
    State(routes): State<ProjectRoutes<P, A>>,
    Path(project_id): Path<String>,
    headers: HeaderMap,
    pairs: Result<Form<Vec<(String, String)>>, FormRejection>,
) -> Response
where
    P: ProjectRepository + 'static,
    A: ApplicationRepository + 'static,
{
    let actor = match routes.gate.actor(&headers) {
        Ok(actor) => actor,
        Err(redirect) => return redirect.into_response(),
    };
    let fields = match read_fields(pairs) {
        Some(fields) => fields,
        None => return project_page(&ProjectId(project_id), "error=true").into_response(),
    };
    let project_id = reconcile_project(project_id, &fields);
    let Some(application_id) = fields.application_id().map(|id| ApplicationId(id.to_string()))
    else {
        return project_page(&project_id, "error=true").into_response();
    };

    match routes
        .service
        .amend(&actor, &project_id, &application_id, &fields)
    {
        Ok(AmendOutcome::Amended(_) | AmendOutcome::NothingAmended) => {
            project_page(&project_id, &format!("updated={}", stamp())).into_response()
        }
        Err(err) => {
            error!(application = %application_id, error = %err, "application amend failed");
            project_page(&project_id, "error=true").into_response()
        }
    }
}

pub(crate) async fn withdraw_handler<P, A>(
    State(routes): State<ProjectRoutes<P, A>>,
    Path(project_id): Path<String>,
    headers: HeaderMap,
    pairs: Result<Form<Vec<(String, String)>>, FormRejection>,
) -> Response
where
    P: ProjectRepository + 'static,
    A: ApplicationRepository + 'static,
{
    let actor = match routes.gate.actor(&headers) {
        Ok(actor) => actor,
        Err(redirect) => return redirect.into_response(),
    };
    let fields = read_fields(pairs).unwrap_or_default();
    let project_id = reconcile_project(project_id, &fields);

    if let Some(application_id) = fields.application_id() {
        routes
            .service
            .withdraw(&actor, &ApplicationId(application_id.to_string()));
    }
    project_page(&project_id, &format!("canceled={}", stamp())).into_response()
}

pub(crate) async fn submit_json_handler<P, A>(
    State(routes): State<ProjectRoutes<P, A>>,
    Path(project_id): Path<String>,
    headers: HeaderMap,
    body: Result<axum::Json<serde_json::Value>, JsonRejection>,
) -> Response
where
    P: ProjectRepository + 'static,
    A: ApplicationRepository + 'static,
{
    let actor = match routes.gate.actor(&headers) {
        Ok(actor) => actor,
        Err(redirect) => return redirect.into_response(),
    };
    let axum::Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return rejection.into_response(),
    };
    let fields = FieldSet::from_json(&body);
    let project_id = reconcile_project(project_id, &fields);

    match routes.service.submit(&actor, &project_id, &fields) {
        Ok(SubmitOutcome::Created(record)) => (
            StatusCode::CREATED,
            axum::Json(json!({
                "application_id": record.id,
                "answers": record.answers,
            })),
        )
            .into_response(),
        Ok(SubmitOutcome::AlreadyApplied) => {
            let payload = json!({
                "error": "application already exists",
            });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        Err(other) => service_error_response(other),
    }
}

pub(crate) async fn board_handler<P, A>(
    State(routes): State<ProjectRoutes<P, A>>,
    headers: HeaderMap,
) -> Response
where
    P: ProjectRepository + 'static,
    A: ApplicationRepository + 'static,
{
    let actor = match routes.gate.actor(&headers) {
        Ok(actor) => actor,
        Err(redirect) => return redirect.into_response(),
    };

    match routes.service.board(&actor) {
        Ok(cards) => (StatusCode::OK, axum::Json(cards)).into_response(),
        Err(other) => service_error_response(other),
    }
}

pub(crate) async fn schema_handler<P, A>(
    State(routes): State<ProjectRoutes<P, A>>,
    Path(project_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    P: ProjectRepository + 'static,
    A: ApplicationRepository + 'static,
{
    if let Err(redirect) = routes.gate.actor(&headers) {
        return redirect.into_response();
    }

    match routes.service.load_schema(&ProjectId(project_id)) {
        Ok(schema) => (StatusCode::OK, axum::Json(schema)).into_response(),
        Err(other) => service_error_response(other),
    }
}

pub(crate) async fn status_handler<P, A>(
    State(routes): State<ProjectRoutes<P, A>>,
    Path(project_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    P: ProjectRepository + 'static,
    A: ApplicationRepository + 'static,
{
    let actor = match routes.gate.actor(&headers) {
        Ok(actor) => actor,
        Err(redirect) => return redirect.into_response(),
    };

    match routes.service.project_status(&ProjectId(project_id), &actor) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(other) => service_error_response(other),
    }
}

pub(crate) async fn answers_handler<P, A>(
    State(routes): State<ProjectRoutes<P, A>>,
    Path(project_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    P: ProjectRepository + 'static,
    A: ApplicationRepository + 'static,
{
    let actor = match routes.gate.actor(&headers) {
        Ok(actor) => actor,
        Err(redirect) => return redirect.into_response(),
    };
    let project_id = ProjectId(project_id);

    let lookup = routes.service.load_schema(&project_id).and_then(|schema| {
        routes
            .service
            .my_application(&project_id, &actor)
            .map(|application| (schema, application))
    });

    match lookup {
        Ok((schema, Some(application))) => {
            let payload = json!({
                "application_id": application.id,
                "answers": application.answers,
                "rendered": render_answers(&schema, &application.answers),
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Ok((_, None)) => {
            let payload = json!({
                "application_id": serde_json::Value::Null,
                "answers": serde_json::Value::Null,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(other) => service_error_response(other),
    }
}

pub(crate) async fn applicants_handler<P, A>(
    State(routes): State<ProjectRoutes<P, A>>,
    Path(project_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    P: ProjectRepository + 'static,
    A: ApplicationRepository + 'static,
{
    let actor = match routes.gate.actor(&headers) {
        Ok(actor) => actor,
        Err(redirect) => return redirect.into_response(),
    };

    match routes
        .service
        .review_applicants(&ProjectId(project_id), &actor)
    {
        Ok(reviews) => (StatusCode::OK, axum::Json(reviews)).into_response(),
        Err(other) => service_error_response(other),
    }
}

fn service_error_response(err: ApplicationServiceError) -> Response {
    let status = match &err {
        ApplicationServiceError::ProjectNotFound(_) => StatusCode::NOT_FOUND,
        ApplicationServiceError::NotProjectOwner => StatusCode::FORBIDDEN,
        ApplicationServiceError::InvalidProject(_) => StatusCode::BAD_REQUEST,
        ApplicationServiceError::Answers(rejected) => {
            let payload = json!({
                "error": rejected.to_string(),
                "violations": rejected.violations,
            });
            return (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response();
        }
        ApplicationServiceError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let payload = json!({
        "error": err.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
