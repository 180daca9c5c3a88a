use actix_web::{HttpResponse, http::StatusCode};
use thiserror::Error;

use crate::structs::send_request::ErrorResponse;

pub const MISSING_COORDINATES: &str = "Faltan parámetros de latitud o longitud.";
const PERSISTENCE_PREFIX: &str = "Error al escribir en el log";
const DELIVERY_PREFIX: &str = "Error al enviar el correo electrónico";

/// Failure while writing a record.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("file write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Sql(#[from] sqlx::Error),

    #[error("database error: {0}")]
    Mongo(#[from] mongodb::error::Error),
}

/// Failure while delivering an email.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Settings are missing or malformed. Raised before any network call.
    #[error("{0}")]
    Configuration(String),

    #[error("email service request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("email service rejected the request with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("email operation {id} ended with status {status}: {reason}")]
    Failed {
        id: String,
        status: String,
        reason: String,
    },

    #[error("email operation {id} still running after {polls} status checks")]
    Timeout { id: String, polls: u32 },
}

/// Request-level failure of the `/send` endpoint.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Faltan parámetros de latitud o longitud.")]
    Validation,

    #[error("Error al escribir en el log: {0}")]
    Persistence(#[from] StoreError),

    #[error("Error al enviar el correo electrónico: {0}")]
    Delivery(#[from] NotifyError),
}

impl IngestError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            IngestError::Validation => StatusCode::BAD_REQUEST,
            IngestError::Persistence(_) | IngestError::Delivery(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message returned to the caller. Underlying error text is only included
    /// when `expose_details` is set.
    pub fn public_message(&self, expose_details: bool) -> String {
        match self {
            IngestError::Validation => MISSING_COORDINATES.to_string(),
            _ if expose_details => self.to_string(),
            IngestError::Persistence(_) => format!("{}.", PERSISTENCE_PREFIX),
            IngestError::Delivery(_) => format!("{}.", DELIVERY_PREFIX),
        }
    }

    pub fn to_response(&self, expose_details: bool) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.public_message(expose_details),
        })
    }
}
