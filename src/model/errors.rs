use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ErrorDTO {
	pub status: u16,
	pub error: String,
}

impl ErrorDTO {
	pub fn new(status: StatusCode, error: String) -> Self {
		Self {
			status: status.as_u16(),
			error,
		}
	}

	pub fn new_static(status: StatusCode, error: &str) -> Self {
		Self::new(status, error.to_owned())
	}

	pub fn bad_request(err: impl std::error::Error) -> Self {
		Self::new(StatusCode::BAD_REQUEST, err.to_string())
	}

	pub fn unauthorized() -> Self {
		Self::new_static(StatusCode::UNAUTHORIZED, "Missing or invalid API key")
	}
}

impl IntoResponse for ErrorDTO {
	fn into_response(self) -> Response {
		(
			StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
			Json(self),
		).into_response()
	}
}
