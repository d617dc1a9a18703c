use axum::Json;
use axum::http::StatusCode;
use serde::Serialize;

/// Success envelope shared by every JSON route.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub status_code: u16,
    pub message: &'static str,
    pub data: T,
}

pub fn ok<T: Serialize>(data: T) -> Json<Envelope<T>> {
    Json(Envelope {
        status_code: StatusCode::OK.as_u16(),
        message: "OK",
        data,
    })
}

#[derive(Debug, Serialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Created {
    pub id: uuid::Uuid,
}
