//! atec-export
//!
//! Renders a graded questionnaire result as a PNG card.

pub mod card;
pub mod error;
pub mod render;
pub mod styles;

pub use card::ResultCard;
pub use error::ExportError;
pub use render::render_png;
pub use styles::CardStyle;

pub const CONTENT_TYPE: &str = "image/png";
