pub mod auth;
pub mod children;
pub mod health;
pub mod packages;
pub mod questionnaires;
pub mod users;
