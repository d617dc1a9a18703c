//! atec-service
//!
//! Use cases behind the HTTP surface: package authoring with lock
//! integrity, the questionnaire orchestrator, child registration and
//! statistics, and user profiles. Every operation takes the caller as a
//! [`Requester`](atec_core::principal::Requester) value and fails with
//! [`ServiceError`](atec_core::error::ServiceError).

pub mod access;
pub mod child;
pub mod package;
pub mod pagination;
pub mod questionnaire;
pub mod users;

pub use child::ChildService;
pub use package::{PackageCacheSettings, PackageService};
pub use pagination::Page;
pub use questionnaire::QuestionnaireService;
pub use users::UserService;
