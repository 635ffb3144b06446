//! The institution service contract: login, MFA verification, holdings fetch, refresh.

// self
use crate::{_prelude::*, domain::HoldingsSnapshot, error::Result};

/// Future type returned by every [`InstitutionService`] method.
pub type InstitutionFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Plaintext credentials supplied by the end user for a password-grant login.
#[derive(Clone)]
pub struct LoginCredentials {
	/// Brokerage username.
	pub username: String,
	/// Brokerage password.
	pub password: String,
}
impl Debug for LoginCredentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("LoginCredentials").field("username", &self.username).finish_non_exhaustive()
	}
}

/// The three outcomes a login attempt can produce.
#[derive(Debug)]
pub enum LoginOutcome {
	/// The user has no MFA configured; the connection is now active and holdings were fetched.
	Linked {
		/// Holdings fetched immediately after linking.
		holdings: HoldingsSnapshot,
	},
	/// The brokerage requires an out-of-band challenge before accepting MFA.
	ChallengeRequired(serde_json::Value),
	/// The brokerage requires an MFA code, no challenge handshake needed first.
	MfaRequired(serde_json::Value),
}

/// A tagged MFA proof. The HTTP boundary enforces that exactly one variant is ever constructed.
#[derive(Clone, Debug)]
pub enum MfaProof {
	/// The brokerage required a challenge handshake before accepting the MFA code.
	WithChallenge {
		/// SMS code the user received.
		sms_code: String,
		/// Challenge identifier returned by the earlier login attempt.
		challenge_id: String,
	},
	/// The brokerage accepts the MFA code directly.
	WithoutChallenge {
		/// SMS code the user received.
		sms_code: String,
	},
}

/// Newly issued tokens from [`InstitutionService::refresh_token`], re-encrypted and ready to
/// persist. Plaintexts never leave the service.
pub struct RefreshedTokens {
	/// Newly encrypted access token.
	pub access_token_ct: crate::crypto::Ciphertext,
	/// Newly encrypted refresh token.
	pub refresh_token_ct: crate::crypto::Ciphertext,
}

/// One concrete implementation per supported institution.
///
/// All externally provided secrets are passed in plaintext and leave the service encrypted;
/// all tokens read from the store are decrypted inside the service and never surfaced to
/// callers.
pub trait InstitutionService
where
	Self: Send + Sync,
{
	/// Starts a new connection for `user_id` to this institution.
	fn login<'a>(
		&'a self,
		credentials: LoginCredentials,
		user_id: crate::domain::UserId,
	) -> InstitutionFuture<'a, LoginOutcome>;

	/// Completes MFA verification for a connection created by [`Self::login`].
	fn verify_mfa<'a>(
		&'a self,
		proof: MfaProof,
		user_id: crate::domain::UserId,
	) -> InstitutionFuture<'a, HoldingsSnapshot>;

	/// Fetches and resolves the current holdings for an active connection's access token.
	fn get_recent_holdings<'a>(
		&'a self,
		encrypted_access_token: &'a crate::crypto::Ciphertext,
	) -> InstitutionFuture<'a, HoldingsSnapshot>;

	/// Refreshes the access/refresh token pair for an active connection.
	fn refresh_token<'a>(
		&'a self,
		encrypted_refresh_token: &'a crate::crypto::Ciphertext,
	) -> InstitutionFuture<'a, RefreshedTokens>;
}
