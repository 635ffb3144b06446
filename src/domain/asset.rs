//! A per-user, per-institution holding tracked locally.

// lib
use rust_decimal::Decimal;
// self
use crate::{_prelude::*, domain::ids::{InstitutionId, UserId}};

/// A locally tracked asset holding.
///
/// Uniqueness: `(user_id, asset_symbol, institution_id)`. Money/quantity fields are
/// [`Decimal`] rather than `f64` — the brokerage's decimal strings must be parsed without
/// silent rounding.
#[derive(Clone, Debug, PartialEq)]
pub struct Asset {
	/// Auto-incrementing primary key.
	pub asset_id: i64,
	/// Owning user.
	pub user_id: UserId,
	/// Institution this holding was observed through.
	pub institution_id: InstitutionId,
	/// Ticker symbol as reported by the brokerage.
	pub asset_symbol: String,
	/// Display name of the instrument.
	pub name: String,
	/// Quantity of shares/units held.
	pub quantity: Decimal,
	/// Average price paid per unit, if known.
	pub average_buy_price: Option<Decimal>,
	/// Identifier of the user-authored investment thesis this asset backs, if any.
	///
	/// Persisted to its own column; never written into `portfolio_id` or any other column.
	pub thesis_id: Option<i64>,
	/// User-assigned conviction rating for this holding, if any.
	pub skin_rating: Option<i32>,
	/// Cumulative amount the user has contributed toward this position, if tracked.
	pub total_contribution: Option<Decimal>,
	/// Last-known position value; never recomputed by the sync loop (no pricing source).
	pub position_value: Option<Decimal>,
	/// Whether this row reflects the most recent reconciliation pass.
	pub is_up_to_date: bool,
	/// Row creation timestamp.
	pub created_at: OffsetDateTime,
	/// Row last-update timestamp.
	pub updated_at: OffsetDateTime,
}

/// Fields accepted by [`crate::store::AssetStore::upsert`].
///
/// On conflict with an existing `(user_id, asset_symbol, institution_id)` row, only
/// `position_value`, `quantity`, `average_buy_price`, and `total_contribution` are
/// overwritten; every other column is preserved.
#[derive(Clone, Debug)]
pub struct AssetUpsert {
	/// Owning user.
	pub user_id: UserId,
	/// Institution this holding was observed through.
	pub institution_id: InstitutionId,
	/// Ticker symbol as reported by the brokerage.
	pub asset_symbol: String,
	/// Display name of the instrument.
	pub name: String,
	/// Quantity of shares/units held.
	pub quantity: Decimal,
	/// Average price paid per unit, if known.
	pub average_buy_price: Option<Decimal>,
	/// Last-known position value.
	pub position_value: Option<Decimal>,
	/// Cumulative contribution amount, if tracked.
	pub total_contribution: Option<Decimal>,
	/// Whether this row reflects the most recent reconciliation pass.
	pub is_up_to_date: bool,
}

/// Fields accepted by [`crate::store::AssetStore::update`] during reconciliation.
#[derive(Clone, Debug)]
pub struct AssetUpdate {
	/// Quantity of shares/units currently held.
	pub quantity: Decimal,
	/// Average price paid per unit, if known.
	pub average_buy_price: Option<Decimal>,
	/// Whether this row reflects the most recent reconciliation pass.
	pub is_up_to_date: bool,
}

/// Selector for [`crate::store::AssetStore::delete`].
#[derive(Clone, Debug)]
pub enum AssetDeleteTarget {
	/// Delete a single asset row by its primary key.
	ById {
		/// Row primary key.
		asset_id: i64,
	},
	/// Delete every asset row for one user's connection to one institution.
	ByConnection {
		/// Owning user.
		user_id: UserId,
		/// Institution to delete all asset rows for.
		institution_id: InstitutionId,
	},
}
