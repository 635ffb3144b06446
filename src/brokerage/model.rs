//! Request and response shapes for the brokerage's REST API.

// lib
use rust_decimal::Decimal;
// self
use crate::_prelude::*;

/// Grant type requested from the brokerage's token endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
	/// Username/password exchange.
	Password,
	/// Exchange of a previously issued refresh token.
	RefreshToken,
}

/// Body of `POST /oauth2/token/`.
///
/// `username`/`password` are omitted when `grant_type = refresh_token`; `mfa_code` is omitted
/// whenever no MFA code is available yet.
#[derive(Clone, Debug, Serialize)]
pub struct LoginPayload {
	/// OAuth client id issued by the brokerage.
	pub client_id: String,
	/// Requested token lifetime in seconds.
	pub expires_in: u32,
	/// Grant type for this exchange.
	pub grant_type: GrantType,
	/// Plaintext username, present only for a password grant.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub username: Option<String>,
	/// Plaintext password, present only for a password grant.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub password: Option<String>,
	/// Requested scope string.
	pub scope: String,
	/// Always `"sms"` for this institution.
	pub challenge_type: String,
	/// Previously issued refresh token, present only for a refresh-token grant.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub refresh_token: Option<String>,
	/// Device identifier the brokerage expects on every call.
	pub device_token: String,
	/// SMS MFA code, present only once the user has supplied one.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub mfa_code: Option<String>,
}
impl LoginPayload {
	/// Builds a password-grant payload with no MFA code yet.
	pub fn password(
		client_id: String,
		device_token: String,
		username: String,
		password: String,
		scope: String,
	) -> Self {
		Self {
			client_id,
			expires_in: 86_400,
			grant_type: GrantType::Password,
			username: Some(username),
			password: Some(password),
			scope,
			challenge_type: "sms".to_owned(),
			refresh_token: None,
			device_token,
			mfa_code: None,
		}
	}

	/// Builds a refresh-token-grant payload.
	pub fn refresh(
		client_id: String,
		device_token: String,
		refresh_token: String,
		scope: String,
	) -> Self {
		Self {
			client_id,
			expires_in: 86_400,
			grant_type: GrantType::RefreshToken,
			username: None,
			password: None,
			scope,
			challenge_type: "sms".to_owned(),
			refresh_token: Some(refresh_token),
			device_token,
			mfa_code: None,
		}
	}

	/// Attaches an SMS MFA code to this payload, consuming and returning `self`.
	pub fn with_mfa_code(mut self, mfa_code: String) -> Self {
		self.mfa_code = Some(mfa_code);

		self
	}
}

/// Body of `POST /challenge/{id}/respond/`.
#[derive(Clone, Debug, Serialize)]
pub struct RespondToChallengePayload {
	/// The SMS code the user supplied.
	pub response: String,
}

/// One row returned by `GET /positions/?nonzero=true`.
#[derive(Clone, Debug, Deserialize)]
pub struct PositionRow {
	/// The brokerage's opaque instrument identifier.
	pub instrument_id: String,
	/// Full URL used to resolve the instrument's symbol.
	pub instrument_url: String,
	/// Average price paid per unit.
	pub average_buy_price: Decimal,
	/// Quantity currently held.
	pub quantity: Decimal,
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct PositionsEnvelope {
	pub results: Vec<PositionRow>,
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct SymbolEnvelope {
	pub symbol: String,
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct NameEntry {
	pub name: String,
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct NameEnvelope {
	pub results: Vec<NameEntry>,
}
