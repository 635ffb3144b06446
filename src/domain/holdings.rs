//! The remote holdings snapshot returned by an institution service.

// lib
use rust_decimal::Decimal;
// self
use crate::_prelude::*;

/// One position as resolved against the instrument cache.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RemoteHolding {
	/// Ticker symbol.
	pub asset_symbol: String,
	/// Display name of the instrument.
	pub asset_name: String,
	/// Quantity currently held.
	pub quantity: Decimal,
	/// Average buy price, if the brokerage reported one.
	pub average_buy_price: Option<Decimal>,
}

/// The aggregated result of [`crate::institution::InstitutionService::get_recent_holdings`].
///
/// The field is spelled `institution_name` consistently; the source this crate replaces
/// misspells it `insitution_name` in two places.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HoldingsSnapshot {
	/// Resolved positions.
	pub holdings: Vec<RemoteHolding>,
	/// Display name of the institution the holdings were fetched from.
	pub institution_name: String,
}
