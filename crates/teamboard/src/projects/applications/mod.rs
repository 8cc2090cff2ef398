//! Application lifecycle against a project's custom form: submit, amend and withdraw
//! with ownership enforced in every store filter, plus the derived "already applied"
//! reads used by the project board.

pub mod domain;
pub mod identity;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    has_applied_in, render_answers, Affordance, ApplicantReview, ApplicationId,
    ApplicationRecord, ProjectCard, ProjectDraft, ProjectId, ProjectRecord, ProjectStatusView,
    ReviewedAnswer, NO_ANSWER,
};
pub use identity::{ActorId, HeaderIdentity, IdentityProvider};
pub use repository::{ApplicationRepository, OwnedApplication, ProjectRepository, RepositoryError};
pub use router::{project_router, Gatekeeper, NewProjectForm, ProjectRoutes};
pub use service::{
    AmendOutcome, ApplicationServiceError, ProjectApplicationService, RemovalOutcome,
    SubmitOutcome,
};
