//! The persisted link between one user and one institution.

// self
use crate::{_prelude::*, crypto::Ciphertext, domain::ids::{InstitutionId, UserId}};

/// A user's connection to one institution, holding encrypted credentials and tokens.
///
/// Invariant: at most one row exists per `(user_id, institution_id)`. A row with
/// `is_active = true` always has a non-null `access_token_ct`.
#[derive(Clone, Debug)]
pub struct Connection {
	/// Auto-incrementing primary key.
	pub connection_id: i64,
	/// Institution this connection links to.
	pub institution_id: InstitutionId,
	/// Institution display name, joined in by the store.
	pub institution_name: String,
	/// Owning user.
	pub user_id: UserId,
	/// Encrypted brokerage username, if one was ever supplied.
	pub username_ct: Option<Ciphertext>,
	/// Encrypted brokerage password, if one was ever supplied.
	pub password_ct: Option<Ciphertext>,
	/// Encrypted access token, present whenever `is_active` is true.
	pub access_token_ct: Option<Ciphertext>,
	/// Encrypted refresh token, if the brokerage issued one.
	pub refresh_token_ct: Option<Ciphertext>,
	/// Whether this connection currently holds a usable access token.
	pub is_active: bool,
	/// Row creation timestamp.
	pub created_at: OffsetDateTime,
	/// Row last-update timestamp.
	pub updated_at: OffsetDateTime,
}

/// Fields accepted by [`crate::store::ConnectionStore::upsert`].
///
/// On conflict with an existing `(user_id, institution_id)` row, every field here is
/// overwritten; every other column on the existing row is preserved.
#[derive(Clone, Debug)]
pub struct ConnectionUpsert {
	/// Owning user.
	pub user_id: UserId,
	/// Institution this connection links to.
	pub institution_id: InstitutionId,
	/// Encrypted brokerage username.
	pub username_ct: Option<Ciphertext>,
	/// Encrypted brokerage password.
	pub password_ct: Option<Ciphertext>,
	/// Encrypted access token.
	pub access_token_ct: Option<Ciphertext>,
	/// Encrypted refresh token.
	pub refresh_token_ct: Option<Ciphertext>,
	/// Whether the connection should be marked active.
	pub is_active: bool,
}

/// Tri-state filter predicates for [`crate::store::ConnectionStore::list`].
///
/// `None` means "unfiltered"; `Some(x)` means an exact match. This is a deliberate departure
/// from a filter shape that treats `Some(false)` the same as "unfiltered" (see the crate's
/// design notes on tri-state filters).
#[derive(Clone, Debug, Default)]
pub struct ConnectionFilter {
	/// Restrict to one user, if set.
	pub user_id: Option<UserId>,
	/// Restrict to one institution, if set.
	pub institution_id: Option<InstitutionId>,
	/// Restrict by active state, if set.
	pub is_active: Option<bool>,
	/// Restrict by presence/absence of a refresh token, if set.
	pub has_refresh_token: Option<bool>,
}

/// Paging and locking controls for [`crate::store::ConnectionStore::list`].
#[derive(Clone, Copy, Debug)]
pub struct ListOptions {
	/// Rows per page.
	pub page_size: u32,
	/// Zero-based page index.
	pub page_number: u32,
	/// When true, the read skips rows already locked by a concurrent transaction — the
	/// multi-replica sync coordination primitive.
	pub skip_locked: bool,
}
impl Default for ListOptions {
	fn default() -> Self {
		Self { page_size: 200, page_number: 0, skip_locked: false }
	}
}
