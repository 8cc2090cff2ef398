use super::common::*;
use crate::projects::applications::domain::{Affordance, ApplicationId, ProjectId, NO_ANSWER};
use crate::projects::applications::identity::ActorId;
use crate::projects::applications::repository::ProjectRepository;
use crate::projects::applications::service::{
    AmendOutcome, ApplicationServiceError, ProjectApplicationService, RemovalOutcome,
    SubmitOutcome,
};
use crate::projects::forms::{Answer, AnswerPolicy, FieldSet, QuestionId};
use serde_json::json;
use std::sync::Arc;

fn project() -> ProjectId {
    ProjectId("prj-1".to_string())
}

fn submit_created(
    service: &ProjectApplicationService<MemoryProjects, MemoryApplications>,
    actor: &ActorId,
    fields: &FieldSet,
) -> ApplicationId {
    match service.submit(actor, &project(), fields) {
        Ok(SubmitOutcome::Created(record)) => record.id,
        other => panic!("expected created application, got {other:?}"),
    }
}

#[test]
fn submit_stores_answers_in_schema_order() {
    let (service, _, applications) = build_service();

    submit_created(&service, &applicant(), &answers_fields());

    let stored = applications.all();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].applicant_id, applicant());
    assert_eq!(
        serde_json::to_value(&stored[0].answers).expect("serializes"),
        json!({ "q1": "Because", "q2": ["A", "C"] })
    );
}

#[test]
fn submit_without_multi_choice_values_stores_empty_list() {
    let (service, _, _) = build_service();

    submit_created(&service, &applicant(), &FieldSet::new().with("q1", "Because"));

    let answers = service
        .load_my_answers(&project(), &applicant())
        .expect("read succeeds")
        .expect("answers present");
    assert_eq!(
        serde_json::to_value(&answers).expect("serializes"),
        json!({ "q1": "Because", "q2": [] })
    );
}

#[test]
fn submit_then_withdraw_toggles_has_applied() {
    let (service, _, _) = build_service();
    assert!(!service.has_applied(&project(), &applicant()).expect("read"));

    let id = submit_created(&service, &applicant(), &answers_fields());
    assert!(service.has_applied(&project(), &applicant()).expect("read"));

    assert_eq!(service.withdraw(&applicant(), &id), RemovalOutcome::Removed);
    assert!(!service.has_applied(&project(), &applicant()).expect("read"));
}

#[test]
fn second_submit_reports_already_applied() {
    let (service, _, applications) = build_service();
    submit_created(&service, &applicant(), &answers_fields());

    let outcome = service
        .submit(&applicant(), &project(), &answers_fields())
        .expect("submit succeeds");

    assert_eq!(outcome, SubmitOutcome::AlreadyApplied);
    assert_eq!(applications.all().len(), 1);
}

#[test]
fn uniqueness_conflict_is_reported_as_already_applied() {
    let service =
        ProjectApplicationService::new(Arc::new(seeded_projects()), Arc::new(RacingApplications));

    let outcome = service
        .submit(&applicant(), &project(), &answers_fields())
        .expect("conflict is not an error");

    assert_eq!(outcome, SubmitOutcome::AlreadyApplied);
}

#[test]
fn submit_to_unknown_project_is_rejected() {
    let (service, _, _) = build_service();

    match service.submit(&applicant(), &ProjectId("missing".to_string()), &answers_fields()) {
        Err(ApplicationServiceError::ProjectNotFound(id)) => assert_eq!(id.0, "missing"),
        other => panic!("expected project not found, got {other:?}"),
    }
}

#[test]
fn submit_surfaces_store_failures() {
    let service =
        ProjectApplicationService::new(Arc::new(seeded_projects()), Arc::new(ReadOnlyApplications));

    match service.submit(&applicant(), &project(), &answers_fields()) {
        Err(ApplicationServiceError::Repository(_)) => {}
        other => panic!("expected repository error, got {other:?}"),
    }
}

#[test]
fn project_without_schema_accepts_empty_answer_set() {
    let (service, _, applications) = build_service();

    let outcome = service
        .submit(
            &applicant(),
            &ProjectId("prj-2".to_string()),
            &FieldSet::new().with("q1", "ignored"),
        )
        .expect("submit succeeds");

    assert!(matches!(outcome, SubmitOutcome::Created(_)));
    assert!(applications.all()[0].answers.is_empty());
}

#[test]
fn amend_replaces_answers_wholesale() {
    let (service, _, applications) = build_service();
    let id = submit_created(&service, &applicant(), &answers_fields());

    let outcome = service
        .amend(
            &applicant(),
            &project(),
            &id,
            &FieldSet::new().with("q2", "B").with("stale", "value"),
        )
        .expect("amend succeeds");
    assert!(matches!(outcome, AmendOutcome::Amended(_)));

    let answers = service
        .load_my_answers(&project(), &applicant())
        .expect("read succeeds")
        .expect("answers present");
    assert_eq!(
        serde_json::to_value(&answers).expect("serializes"),
        json!({ "q1": "", "q2": ["B"] })
    );
    assert!(applications.all()[0].updated_at.is_some());
}

#[test]
fn amend_by_another_actor_changes_nothing() {
    let (service, _, _) = build_service();
    let id = submit_created(&service, &applicant(), &answers_fields());

    let outcome = service
        .amend(
            &other_applicant(),
            &project(),
            &id,
            &FieldSet::new().with("q1", "hijacked"),
        )
        .expect("amend does not error");
    assert_eq!(outcome, AmendOutcome::NothingAmended);

    let answers = service
        .load_my_answers(&project(), &applicant())
        .expect("read succeeds")
        .expect("answers present");
    assert_eq!(
        answers.get(&QuestionId::from("q1")),
        Some(&Answer::Text("Because".to_string()))
    );
}

#[test]
fn amend_through_another_project_changes_nothing() {
    let (service, projects, applications) = build_service();
    projects
        .insert(project_record(
            "prj-other",
            Some(json!([{ "id": "z9", "type": "free-text", "label": "Other" }])),
            timestamp(3),
        ))
        .expect("project seeded");
    let id = submit_created(&service, &applicant(), &answers_fields());

    let outcome = service
        .amend(
            &applicant(),
            &ProjectId("prj-other".to_string()),
            &id,
            &FieldSet::new().with("z9", "x"),
        )
        .expect("amend does not error");
    assert_eq!(outcome, AmendOutcome::NothingAmended);

    let stored = applications.all();
    assert_eq!(stored[0].project_id, project());
    assert!(stored[0].updated_at.is_none());
    assert_eq!(
        serde_json::to_value(&stored[0].answers).expect("serializes"),
        json!({ "q1": "Because", "q2": ["A", "C"] })
    );
}

#[test]
fn withdraw_of_foreign_application_is_a_silent_no_op() {
    let (service, _, applications) = build_service();
    let id = submit_created(&service, &applicant(), &answers_fields());

    assert_eq!(
        service.withdraw(&other_applicant(), &id),
        RemovalOutcome::NothingRemoved
    );
    assert_eq!(applications.all().len(), 1);
    assert!(service.has_applied(&project(), &applicant()).expect("read"));
}

#[test]
fn repeated_withdraw_is_harmless() {
    let (service, _, _) = build_service();
    let id = submit_created(&service, &applicant(), &answers_fields());

    assert_eq!(service.withdraw(&applicant(), &id), RemovalOutcome::Removed);
    assert_eq!(
        service.withdraw(&applicant(), &id),
        RemovalOutcome::NothingRemoved
    );
}

#[test]
fn withdraw_store_failure_is_not_an_error() {
    let service =
        ProjectApplicationService::new(Arc::new(seeded_projects()), Arc::new(ReadOnlyApplications));

    assert_eq!(
        service.withdraw(&applicant(), &ApplicationId("app-1".to_string())),
        RemovalOutcome::StoreFailed
    );
}

#[test]
fn strict_policy_rejects_undeclared_options() {
    let (service, _, applications) = build_service();
    let service = service.with_policy(AnswerPolicy::Strict);

    let fields = FieldSet::new().with("q1", "Because").with("q2", "Z");
    match service.submit(&applicant(), &project(), &fields) {
        Err(ApplicationServiceError::Answers(rejected)) => {
            assert_eq!(rejected.violations.len(), 1)
        }
        other => panic!("expected rejected answers, got {other:?}"),
    }
    assert!(applications.all().is_empty());
}

#[test]
fn create_project_normalizes_schema_and_skills() {
    let (service, projects, _) = build_service();

    let record = service
        .create_project(&owner(), draft())
        .expect("project created");

    assert_eq!(record.author_id, owner());
    assert_eq!(record.required_skills, ["Rust", "PyTorch"]);
    assert_eq!(record.form_schema, Some(schema_value()));
    assert_eq!(service.load_schema(&record.id).expect("schema").len(), 2);
    assert!(projects.fetch(&record.id).expect("read succeeds").is_some());
}

#[test]
fn create_project_requires_title() {
    let (service, _, _) = build_service();
    let mut draft = draft();
    draft.title = "   ".to_string();

    assert!(matches!(
        service.create_project(&owner(), draft),
        Err(ApplicationServiceError::InvalidProject(_))
    ));
}

#[test]
fn delete_project_is_owner_only_and_purges_applications() {
    let (service, _, applications) = build_service();
    submit_created(&service, &applicant(), &answers_fields());

    assert_eq!(
        service.delete_project(&project(), &applicant()),
        RemovalOutcome::NothingRemoved
    );
    assert_eq!(applications.all().len(), 1);

    assert_eq!(
        service.delete_project(&project(), &owner()),
        RemovalOutcome::Removed
    );
    assert!(applications.all().is_empty());
    assert!(matches!(
        service.load_schema(&project()),
        Err(ApplicationServiceError::ProjectNotFound(_))
    ));
}

#[test]
fn board_lists_newest_first_with_affordances() {
    let (service, _, _) = build_service();
    submit_created(&service, &applicant(), &answers_fields());

    let cards = service.board(&applicant()).expect("board builds");
    let ids: Vec<_> = cards.iter().map(|card| card.project_id.0.as_str()).collect();
    assert_eq!(ids, ["prj-2", "prj-1"]);
    assert_eq!(cards[0].affordance, Affordance::Apply);
    assert_eq!(cards[1].affordance, Affordance::AlreadyApplied);
    assert_eq!(cards[1].applicant_count, 1);

    let owner_cards = service.board(&owner()).expect("board builds");
    assert!(owner_cards
        .iter()
        .all(|card| card.affordance == Affordance::ManageApplicants));
}

#[test]
fn project_status_reports_application_id() {
    let (service, _, _) = build_service();
    let id = submit_created(&service, &applicant(), &answers_fields());

    let view = service
        .project_status(&project(), &applicant())
        .expect("status builds");
    assert!(view.has_applied);
    assert_eq!(view.application_id, Some(id));
    assert_eq!(view.affordance, Affordance::AlreadyApplied);

    let view = service
        .project_status(&project(), &other_applicant())
        .expect("status builds");
    assert!(!view.has_applied);
    assert_eq!(view.affordance, Affordance::Apply);
}

#[test]
fn review_applicants_renders_answers_for_owner_only() {
    let (service, _, _) = build_service();
    submit_created(&service, &applicant(), &FieldSet::new().with("q2", "A").with("q2", "B"));

    let reviews = service
        .review_applicants(&project(), &owner())
        .expect("owner can review");
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0].applicant_id, applicant());
    assert_eq!(reviews[0].answers[0].label, "Why?");
    assert_eq!(reviews[0].answers[0].display, NO_ANSWER);
    assert_eq!(reviews[0].answers[1].display, "A / B");

    assert!(matches!(
        service.review_applicants(&project(), &applicant()),
        Err(ApplicationServiceError::NotProjectOwner)
    ));
}

#[test]
fn load_my_answers_is_absent_without_application() {
    let (service, _, _) = build_service();
    assert_eq!(
        service
            .load_my_answers(&project(), &applicant())
            .expect("read succeeds"),
        None
    );
}
