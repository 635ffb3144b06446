//! Bearer-JWT authentication extractor.
//!
//! Deliberately thin: it decodes a token and extracts the caller's `user_id`, nothing more.
//! Issuance, refresh, and revocation are handled by a system upstream of this crate.

// lib
use axum::{
	extract::FromRequestParts,
	http::{header::AUTHORIZATION, request::Parts, StatusCode},
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
// self
use crate::{_prelude::*, config::Config, domain::UserId, http::AppState};

/// The secret and algorithm used to verify inbound bearer tokens.
pub struct AuthConfig {
	decoding_key: DecodingKey,
	algorithm: Algorithm,
}
impl AuthConfig {
	/// Builds the verifier from the process configuration.
	pub fn from_config(config: &Config) -> Result<Self, AuthConfigError> {
		let algorithm = parse_algorithm(&config.json_web_token_algorithm)?;
		let decoding_key = DecodingKey::from_secret(config.json_web_token_secret.as_bytes());

		Ok(Self { decoding_key, algorithm })
	}
}

/// `json_web_token_algorithm` named something [`jsonwebtoken::Algorithm`] doesn't recognize.
#[derive(Debug, ThisError)]
#[error("Unsupported JWT algorithm `{0}`.")]
pub struct AuthConfigError(String);

fn parse_algorithm(name: &str) -> Result<Algorithm, AuthConfigError> {
	match name {
		"HS256" => Ok(Algorithm::HS256),
		"HS384" => Ok(Algorithm::HS384),
		"HS512" => Ok(Algorithm::HS512),
		"RS256" => Ok(Algorithm::RS256),
		"RS384" => Ok(Algorithm::RS384),
		"RS512" => Ok(Algorithm::RS512),
		other => Err(AuthConfigError(other.to_owned())),
	}
}

#[derive(Deserialize)]
struct Claims {
	user_id: i64,
}

/// The authenticated caller, extracted from a verified bearer token.
#[derive(Clone, Copy, Debug)]
pub struct AuthUser {
	/// The user carried in the token's `user_id` claim.
	pub user_id: UserId,
}
impl FromRequestParts<AppState> for AuthUser {
	type Rejection = (StatusCode, &'static str);

	async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
		let header = parts
			.headers
			.get(AUTHORIZATION)
			.and_then(|value| value.to_str().ok())
			.ok_or((StatusCode::UNAUTHORIZED, "Missing Authorization header."))?;

		let token = header
			.strip_prefix("Bearer ")
			.ok_or((StatusCode::UNAUTHORIZED, "Authorization header is not a bearer token."))?;

		let claims = jsonwebtoken::decode::<Claims>(
			token,
			&state.auth.decoding_key,
			&Validation::new(state.auth.algorithm),
		)
		.map_err(|_| (StatusCode::UNAUTHORIZED, "Invalid bearer token."))?
		.claims;

		Ok(AuthUser { user_id: UserId::new(claims.user_id) })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn rejects_unknown_algorithm_name() {
		assert!(parse_algorithm("rot13").is_err());
	}

	#[test]
	fn accepts_hs256() {
		assert_eq!(parse_algorithm("HS256").unwrap(), Algorithm::HS256);
	}
}
