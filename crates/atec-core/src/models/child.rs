use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Child {
    pub id: Uuid,
    pub parent_user_id: Uuid,
    pub date_of_birth: jiff::civil::Date,
    /// `true` for male.
    pub gender: bool,
    pub name: String,
    pub guardian_name: Option<String>,
    pub created_at: jiff::Timestamp,
    pub updated_at: jiff::Timestamp,
}
