//! Wire-format request/response bodies for the REST boundary.

// self
use crate::{
	_prelude::*,
	domain::{Connection, Institution},
};

/// `GET /institutions` response envelope.
#[derive(Serialize)]
pub struct SupportedInstitutionsResponse {
	/// Response payload, nested under `records` to match the upstream envelope shape.
	pub records: SupportedInstitutionsRecords,
}
/// Nested payload of [`SupportedInstitutionsResponse`].
#[derive(Serialize)]
pub struct SupportedInstitutionsRecords {
	/// Every supported institution.
	pub supported_institutions: Vec<SupportedInstitutionDto>,
}
/// One supported institution.
#[derive(Serialize)]
pub struct SupportedInstitutionDto {
	/// Opaque institution identifier.
	pub institution_id: String,
	/// Human-readable name.
	pub name: String,
	/// Row creation timestamp.
	pub created_at: OffsetDateTime,
	/// Row last-update timestamp.
	pub updated_at: OffsetDateTime,
}
impl From<Institution> for SupportedInstitutionDto {
	fn from(institution: Institution) -> Self {
		Self {
			institution_id: institution.institution_id.to_string(),
			name: institution.name,
			created_at: institution.created_at,
			updated_at: institution.updated_at,
		}
	}
}

/// `GET /institutions/connections` response envelope.
#[derive(Serialize)]
pub struct UserActiveConnectionsResponse {
	/// Response payload, nested under `records`.
	pub records: UserActiveConnectionsRecords,
}
/// Nested payload of [`UserActiveConnectionsResponse`].
#[derive(Serialize)]
pub struct UserActiveConnectionsRecords {
	/// The caller's connections.
	pub active_connections: Vec<ActiveConnectionDto>,
}
/// One of the caller's connections, joined with institution name.
#[derive(Serialize)]
pub struct ActiveConnectionDto {
	/// Row primary key.
	pub connection_id: i64,
	/// Institution this connection links to.
	pub institution_id: String,
	/// Owning user.
	pub user_id: i64,
	/// Whether this connection currently holds a usable access token.
	pub is_active: bool,
	/// Institution display name.
	pub name: String,
	/// Row creation timestamp.
	pub created_at: OffsetDateTime,
	/// Row last-update timestamp.
	pub updated_at: OffsetDateTime,
}
impl From<Connection> for ActiveConnectionDto {
	fn from(connection: Connection) -> Self {
		Self {
			connection_id: connection.connection_id,
			institution_id: connection.institution_id.to_string(),
			user_id: connection.user_id.get(),
			is_active: connection.is_active,
			name: connection.institution_name,
			created_at: connection.created_at,
			updated_at: connection.updated_at,
		}
	}
}

/// Success envelope for a completed login or MFA verification.
#[derive(Serialize)]
pub struct SuccessfulConnectionResponse {
	/// Always `"connected"`.
	pub account_connection_status: &'static str,
	/// When the connection became active.
	pub connected_at: OffsetDateTime,
}
impl SuccessfulConnectionResponse {
	/// Builds the envelope, stamping `connected_at` with the current time.
	pub fn now() -> Self {
		Self { account_connection_status: "connected", connected_at: OffsetDateTime::now_utc() }
	}
}

/// `POST /institutions/login/{institution_id}` request body.
#[derive(Deserialize)]
pub struct LoginRequest {
	/// Brokerage username.
	pub username: String,
	/// Brokerage password.
	pub password: String,
}

/// `POST /institutions/login/{institution_id}/verify` request body.
///
/// Exactly one of `with_challenge` / `without_challenge` must be present; the handler rejects
/// zero or both with 400.
#[derive(Deserialize)]
pub struct VerifyMfaRequest {
	/// Set when the brokerage required a challenge handshake before the MFA code.
	pub with_challenge: Option<WithChallengeBody>,
	/// Set when the brokerage accepts the MFA code directly.
	pub without_challenge: Option<WithoutChallengeBody>,
}
/// Payload of [`VerifyMfaRequest::with_challenge`].
#[derive(Deserialize)]
pub struct WithChallengeBody {
	/// SMS code the user received.
	pub sms_code: String,
	/// Challenge identifier returned by the earlier login attempt.
	pub challenge_id: String,
}
/// Payload of [`VerifyMfaRequest::without_challenge`].
#[derive(Deserialize)]
pub struct WithoutChallengeBody {
	/// SMS code the user received.
	pub sms_code: String,
}
