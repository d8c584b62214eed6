use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use alivemon::MonitorError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Monitor(#[from] MonitorError),
    #[error("Bad request: {0}")]
    BadRequest(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Monitor(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            ApiError::Monitor(MonitorError::NotRunning(_)) => StatusCode::CONFLICT,
            ApiError::Monitor(MonitorError::LockTimeout(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Monitor(e) if e.is_validation() => StatusCode::BAD_REQUEST,
            ApiError::Monitor(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody { error: self.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alivemon::{MonitoringMode, StoreError};

    #[test]
    fn test_status_codes() {
        let status = |e: MonitorError| ApiError::from(e).status_code();

        assert_eq!(status(MonitorError::MonitorNotFound(1)), StatusCode::NOT_FOUND);
        assert_eq!(status(MonitorError::ProfileNotFound(1)), StatusCode::NOT_FOUND);
        assert_eq!(status(MonitorError::NotRunning(1)), StatusCode::CONFLICT);
        assert_eq!(status(MonitorError::UnsupportedMode(MonitoringMode::OneMany)), StatusCode::BAD_REQUEST);
        assert_eq!(status(MonitorError::MissingInterfaceName), StatusCode::BAD_REQUEST);
        assert_eq!(status(MonitorError::LockTimeout("k".into())), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            status(MonitorError::Store(StoreError::Backend("gone".into()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
