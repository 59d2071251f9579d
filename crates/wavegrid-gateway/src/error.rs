//! Error types for the classifier gateway.
//!
//! [`GatewayError`] covers everything a frame can run into between the
//! socket and the classifier. Over HTTP it becomes a JSON error response
//! via [`IntoResponse`]; over the duplex channel it becomes an
//! [`ErrorReply`] and the channel stays open.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use wavegrid_types::ErrorReply;

use crate::classifier::ClassifierError;

/// Errors that can occur while relaying a frame.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The message carried no usable `image_base64`.
    #[error("No image data received")]
    MissingImage,

    /// The classifier could not be reached or answered badly.
    #[error("ML service unavailable")]
    ClassifierUnavailable(#[from] ClassifierError),

    /// A reply could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GatewayError {
    /// The in-band reply sent back over the duplex channel.
    pub fn to_reply(&self) -> ErrorReply {
        ErrorReply::new(self.to_string())
    }

    const fn status(&self) -> StatusCode {
        match self {
            Self::MissingImage => StatusCode::BAD_REQUEST,
            Self::ClassifierUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });
        (status, axum::Json(body)).into_response()
    }
}
