//! Crate-wide error types shared across the institution service, stores, and HTTP boundary.

// self
use crate::{_prelude::*, brokerage::BrokerageError, crypto::DecryptError, store::StoreError};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Canonical error exposed by the institution service and HTTP handlers.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Persistence-layer failure.
	#[error(transparent)]
	Store(#[from] StoreError),
	/// Brokerage API or transport failure.
	#[error(transparent)]
	Brokerage(#[from] BrokerageError),
	/// Ciphertext failed to decrypt under the active key.
	#[error(transparent)]
	Crypto(#[from] DecryptError),

	/// A second login was attempted for a connection that is already active.
	#[error("Connection is already linked.")]
	AlreadyLinked,
	/// MFA verification was attempted before any login established a connection.
	#[error("No connection exists to verify.")]
	NotLinked,
	/// The request is malformed in a way the caller can fix.
	#[error("Bad request: {reason}.")]
	BadRequest {
		/// Human-readable reason surfaced to the caller.
		reason: String,
	},
	/// The referenced institution or connection does not exist.
	#[error("Not found: {reason}.")]
	NotFound {
		/// Human-readable reason surfaced to the caller.
		reason: String,
	},
}
