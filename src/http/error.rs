//! Maps the crate-wide error taxonomy onto HTTP statuses.

// lib
use axum::{
	http::StatusCode,
	response::{IntoResponse, Response},
	Json,
};
use serde_json::json;
// self
use crate::{brokerage::BrokerageError, error::Error};

impl IntoResponse for Error {
	fn into_response(self) -> Response {
		let (status, message) = match &self {
			Error::AlreadyLinked => (StatusCode::CONFLICT, self.to_string()),
			Error::NotLinked | Error::NotFound { .. } => (StatusCode::NOT_FOUND, self.to_string()),
			Error::BadRequest { .. } => (StatusCode::BAD_REQUEST, self.to_string()),
			Error::Brokerage(BrokerageError::Unauthorized) => {
				(StatusCode::BAD_REQUEST, "Brokerage rejected the stored credentials.".to_owned())
			},
			Error::Brokerage(BrokerageError::Api { detail, .. }) => {
				(StatusCode::BAD_REQUEST, detail.clone())
			},
			Error::Brokerage(_) => {
				(StatusCode::BAD_REQUEST, "Brokerage request failed.".to_owned())
			},
			Error::Crypto(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Could not decrypt stored secret.".to_owned()),
			Error::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Storage failure.".to_owned()),
		};

		(status, Json(json!({ "detail": message }))).into_response()
	}
}
