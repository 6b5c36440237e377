use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use orchea_core::ErrorKind;
use orchea_core::OrcheaError;
use serde_json::json;

/// Error returned by every handler. Rendered as `{"error": "<message>"}`.
#[derive(Debug)]
pub enum ApiError {
	Core(OrcheaError),
	/// The request body could not be read as JSON.
	Body(String),
	/// A blocking task panicked or was cancelled.
	Task(String),
}

impl ApiError {
	pub fn status(&self) -> StatusCode {
		match self {
			Self::Core(error) => {
				match error.kind() {
					ErrorKind::Invalid => StatusCode::BAD_REQUEST,
					ErrorKind::NotFound => StatusCode::NOT_FOUND,
					ErrorKind::Conflict => StatusCode::CONFLICT,
					ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
				}
			}
			Self::Body(_) => StatusCode::BAD_REQUEST,
			Self::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	pub fn message(&self) -> String {
		match self {
			Self::Core(error) => error.to_string(),
			Self::Body(message) | Self::Task(message) => message.clone(),
		}
	}
}

impl From<OrcheaError> for ApiError {
	fn from(error: OrcheaError) -> Self {
		Self::Core(error)
	}
}

impl From<JsonRejection> for ApiError {
	fn from(rejection: JsonRejection) -> Self {
		Self::Body(rejection.body_text())
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let status = self.status();
		let message = self.message();

		if status.is_server_error() {
			tracing::error!(%status, error = %message, "request failed");
		} else {
			tracing::debug!(%status, error = %message, "request rejected");
		}

		(status, Json(json!({ "error": message }))).into_response()
	}
}

pub type ApiResult<T> = Result<T, ApiError>;
