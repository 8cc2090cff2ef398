use crate::infra::{InMemoryApplicationRepository, InMemoryProjectRepository};
use clap::Args;
use serde_json::json;
use std::sync::Arc;
use teamboard::error::AppError;
use teamboard::projects::applications::{
    ActorId, AmendOutcome, ProjectApplicationService, ProjectDraft, RemovalOutcome,
    SubmitOutcome,
};
use teamboard::projects::forms::{split_comma_list, AnswerPolicy, FieldSet, RawSchema};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Reject answers outside a question's declared options.
    #[arg(long)]
    pub(crate) strict_answers: bool,
    /// Keep the application instead of withdrawing it at the end.
    #[arg(long)]
    pub(crate) skip_withdraw: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        strict_answers,
        skip_withdraw,
    } = args;

    let policy = if strict_answers {
        AnswerPolicy::Strict
    } else {
        AnswerPolicy::Lenient
    };
    let service = ProjectApplicationService::new(
        Arc::new(InMemoryProjectRepository::default()),
        Arc::new(InMemoryApplicationRepository::default()),
    )
    .with_policy(policy);

    let owner = ActorId("owner-demo".to_string());
    let applicant = ActorId("applicant-demo".to_string());

    println!("Teamboard demo ({policy:?} answers)");
    let project = service.create_project(&owner, demo_draft())?;
    println!("- Created project {} \"{}\"", project.id, project.title);

    let schema = service.load_schema(&project.id)?;
    println!("  Application form ({} questions):", schema.len());
    for question in &schema {
        let options = question.kind.options();
        if options.is_empty() {
            println!("    - [{}] {} ({})", question.id, question.label, question.kind.tag());
        } else {
            println!(
                "    - [{}] {} ({}: {})",
                question.id,
                question.label,
                question.kind.tag(),
                options.join(", ")
            );
        }
    }

    let fields = FieldSet::new()
        .with("motivation", "I build rovers on weekends")
        .with("year", "Senior")
        .with("stack", "Rust")
        .with("stack", "Python");
    let application = match service.submit(&applicant, &project.id, &fields) {
        Ok(SubmitOutcome::Created(record)) => record,
        Ok(SubmitOutcome::AlreadyApplied) => {
            println!("  Applicant already applied");
            return Ok(());
        }
        Err(err) => {
            println!("  Submission rejected: {}", err);
            return Ok(());
        }
    };
    println!("- {} applied with {}", applicant, application.id);
    print_json("  Stored answers", &application.answers);

    match service.submit(&applicant, &project.id, &fields)? {
        SubmitOutcome::AlreadyApplied => println!("- Second submit ignored: already applied"),
        SubmitOutcome::Created(record) => println!("- Unexpected duplicate {}", record.id),
    }

    let amended = service.amend(
        &applicant,
        &project.id,
        &application.id,
        &FieldSet::new().with("year", "Junior").with("stack", "C++"),
    )?;
    match amended {
        AmendOutcome::Amended(answers) => print_json("- Amended answers", &answers),
        AmendOutcome::NothingAmended => println!("- Amend matched nothing"),
    }

    let intruder = ActorId("intruder-demo".to_string());
    let outcome = service.withdraw(&intruder, &application.id);
    println!("- Withdraw by {}: {:?}", intruder, outcome);

    println!("- Owner review:");
    for review in service.review_applicants(&project.id, &owner)? {
        println!("    {} ({})", review.applicant_id, review.application_id);
        for answer in review.answers {
            println!("      {}: {}", answer.label, answer.display);
        }
    }

    let status = service.project_status(&project.id, &applicant)?;
    println!(
        "- Board shows \"{}\" to the applicant",
        status.affordance.label()
    );

    if skip_withdraw {
        return Ok(());
    }

    match service.withdraw(&applicant, &application.id) {
        RemovalOutcome::Removed => println!("- Application withdrawn"),
        other => println!("- Withdraw outcome: {:?}", other),
    }
    println!(
        "- Has applied after withdraw: {}",
        service.has_applied(&project.id, &applicant)?
    );

    Ok(())
}

fn demo_draft() -> ProjectDraft {
    ProjectDraft {
        title: "Campus rover".to_string(),
        description: "Autonomous delivery rover for the quad".to_string(),
        required_skills: split_comma_list("Rust, ROS, Python"),
        contact_info: Some("rover@example.edu".to_string()),
        form_schema: RawSchema::from(json!([
            { "id": "motivation", "type": "text", "label": "Why do you want to join?" },
            { "id": "year", "type": "radio", "label": "Year", "options": "Junior, Senior" },
            { "id": "stack", "type": "multi-choice", "label": "Stack", "options": ["Rust", "C++", "Python"] },
        ])),
    }
}

fn print_json<T: serde::Serialize>(heading: &str, value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}:\n{}", heading, json),
        Err(err) => println!("{} unavailable: {}", heading, err),
    }
}
