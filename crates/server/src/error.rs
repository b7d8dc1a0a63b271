use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

use tethered_api::{ApiError, ServiceError};

/// Unified API error type.
///
/// Produces `{"error": "<message>", "code": "<tag>"}` JSON responses.
#[derive(Debug)]
pub struct ApiErr {
    status: StatusCode,
    code: String,
    message: String,
}

impl ApiErr {
    fn new(status: StatusCode, code: &str, msg: impl Into<String>) -> Self {
        Self {
            status,
            code: code.to_string(),
            message: msg.into(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", msg)
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized", msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", msg)
    }

    /// Build a closure that logs a DB/IO error and returns `500 Internal Server Error`.
    pub fn from_db<E: fmt::Display>(context: &str) -> impl FnOnce(E) -> Self + '_ {
        move |e| {
            tracing::error!("{context}: {e}");
            Self::internal("internal server error")
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &str {
        &self.code
    }
}

impl From<ServiceError> for ApiErr {
    fn from(e: ServiceError) -> Self {
        if e.is_internal() {
            return Self::from_db("service")(e);
        }
        let body = ApiError::from(&e);
        let status =
            StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self::new(status, &body.code, body.error)
    }
}

impl From<tethered_core::Error> for ApiErr {
    fn from(e: tethered_core::Error) -> Self {
        ServiceError::from(e).into()
    }
}

impl IntoResponse for ApiErr {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ApiError {
                error: self.message,
                code: self.code,
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tethered_core::{Error, InviteError};

    #[test]
    fn domain_errors_keep_their_code() {
        let e = ApiErr::from(Error::Invite(InviteError::AlreadyUsed));
        assert_eq!(e.status(), StatusCode::CONFLICT);
        assert_eq!(e.code(), "already_used");

        let e = ApiErr::from(Error::Forbidden("not a party to this connection"));
        assert_eq!(e.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn internal_errors_are_opaque() {
        let e = ApiErr::from(Error::Store("disk I/O error".into()));
        assert_eq!(e.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(e.message, "internal server error");
    }
}
