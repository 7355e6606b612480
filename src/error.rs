use rocket::http::Status;
use rocket::request::Request;
use rocket::response::{self, Responder};
use rocket::serde::json::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::store::StoreError;
use crate::submission::{SubmissionError, SubmitError};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Invalid(#[from] SubmissionError),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Server error")]
    Store(#[from] StoreError),
}

impl From<SubmitError> for ApiError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::Invalid(e) => ApiError::Invalid(e),
            SubmitError::Store(e) => ApiError::Store(e),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            error: message.into(),
        })
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        let status = match &self {
            ApiError::Invalid(_) => Status::BadRequest,
            ApiError::Unauthorized => Status::Unauthorized,
            ApiError::Store(e) => {
                error!(error = %e, uri = %req.uri(), "store failure");
                Status::InternalServerError
            }
        };

        // Display for Store is generic, details stay in the log.
        (status, ErrorBody::new(self.to_string())).respond_to(req)
    }
}

#[catch(400)]
pub fn bad_request() -> Json<ErrorBody> {
    ErrorBody::new("Bad request")
}

#[catch(401)]
pub fn unauthorized() -> Json<ErrorBody> {
    ErrorBody::new("Unauthorized")
}

#[catch(404)]
pub fn not_found() -> Json<ErrorBody> {
    ErrorBody::new("Not found")
}

#[catch(422)]
pub fn unprocessable() -> Json<ErrorBody> {
    ErrorBody::new("Malformed request body")
}

#[catch(500)]
pub fn server_error() -> Json<ErrorBody> {
    ErrorBody::new("Server error")
}

#[catch(default)]
pub fn fallback(status: Status, _req: &Request<'_>) -> (Status, Json<ErrorBody>) {
    (status, ErrorBody::new(status.reason_lossy()))
}
