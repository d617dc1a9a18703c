use atec_core::error::ServiceError;
use serde::Deserialize;

pub const MAX_LIMIT: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Page {
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

impl Page {
    pub fn new(limit: i64, offset: i64) -> Self {
        Self { limit, offset }
    }

    pub fn validate(self) -> Result<Self, ServiceError> {
        if !(1..=MAX_LIMIT).contains(&self.limit) {
            return Err(ServiceError::BadRequest(format!(
                "limit must be between 1 and {MAX_LIMIT}"
            )));
        }
        if self.offset < 0 {
            return Err(ServiceError::BadRequest("offset must not be negative".to_string()));
        }
        Ok(self)
    }
}
