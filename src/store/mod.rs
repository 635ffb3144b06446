//! Persistence contracts and implementations for connections, assets, and the instrument cache.

pub mod asset;
pub mod connection;
pub mod memory;

pub use asset::{AssetStore, PgAssetStore};
pub use connection::{ConnectionClaim, ConnectionPage, ConnectionStore, PgConnectionStore};
pub use memory::{MemoryAssetStore, MemoryConnectionStore};

// self
use crate::_prelude::*;

/// Future type returned by every store method.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Error type produced by [`ConnectionStore`] and [`AssetStore`] implementations.
#[derive(Debug, ThisError)]
pub enum StoreError {
	/// The backing database returned an error.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
		/// Underlying driver error, when available.
		#[source]
		source: Option<sqlx::Error>,
	},
	/// A row violated a uniqueness constraint the caller should have already checked for.
	#[error("Conflicting row already exists: {message}.")]
	Conflict {
		/// Human-readable error payload.
		message: String,
	},
	/// The referenced row was not found.
	#[error("Row not found: {message}.")]
	NotFound {
		/// Human-readable error payload.
		message: String,
	},
}
impl From<sqlx::Error> for StoreError {
	fn from(source: sqlx::Error) -> Self {
		if let sqlx::Error::Database(db_error) = &source {
			if db_error.is_unique_violation() {
				return StoreError::Conflict { message: db_error.message().to_owned() };
			}
		}
		if matches!(source, sqlx::Error::RowNotFound) {
			return StoreError::NotFound { message: "row not found".to_owned() };
		}

		StoreError::Backend { message: source.to_string(), source: Some(source) }
	}
}
