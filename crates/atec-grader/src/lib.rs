//! atec-grader
//!
//! The compiled-in ATEC template, structural validation of authored
//! packages, and the pure grading function. No I/O.

pub mod default_package;
pub mod error;
pub mod scoring;
pub mod template;
pub mod validation;

pub use error::{GradeError, ValidationError};
pub use scoring::{ensure_all_questions_answered, grade};
pub use validation::validate_content;
