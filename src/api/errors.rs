use crate::JobScoutError;
use serde::Serialize;
use std::convert::Infallible;
use std::fmt::{Display, Formatter, Result as FResult};
use warp::http::StatusCode;
use warp::reject::Reject;
use warp::{Rejection, Reply};

/// A failed request, carrying the status and the message returned to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, detail)
    }

    /// Maps a service error to a response.
    ///
    /// Client mistakes keep their own message; anything else is a server error prefixed with `context`.
    pub fn from_service(context: &str, err: JobScoutError) -> Self {
        match err {
            JobScoutError::InvalidRequest(_) | JobScoutError::InvalidDocument(_) => {
                Self::bad_request(err.to_string())
            }
            JobScoutError::NotFound(_) => Self::not_found(err.to_string()),
            JobScoutError::NotAJobPosting(_) => Self::new(StatusCode::UNPROCESSABLE_ENTITY, err.to_string()),
            err => Self::new(StatusCode::INTERNAL_SERVER_ERROR, format!("{}: {}", context, err)),
        }
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FResult {
        write!(f, "{} ({})", self.detail, self.status)
    }
}

impl std::error::Error for ApiError {}

impl Reject for ApiError {}

#[derive(Serialize)]
struct ErrorBody<'a> {
    detail: &'a str,
}

/// Turns every rejection into a JSON `{"detail": ...}` body with a matching status.
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, detail) = if let Some(err) = err.find::<ApiError>() {
        (err.status, err.detail.clone())
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not Found".to_string())
    } else if let Some(err) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
    } else if let Some(err) = err.find::<warp::reject::InvalidQuery>() {
        (StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "Payload too large".to_string())
    } else if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        (StatusCode::UNSUPPORTED_MEDIA_TYPE, "Unsupported media type".to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed".to_string())
    } else {
        tracing::error!("Unhandled rejection: {:?}", err);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
    };

    if status.is_server_error() {
        tracing::error!("{}", detail);
    }

    Ok(warp::reply::with_status(
        warp::reply::json(&ErrorBody { detail: &detail }),
        status,
    ))
}
