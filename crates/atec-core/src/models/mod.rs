pub mod child;
pub mod package;
pub mod result;
pub mod user;
