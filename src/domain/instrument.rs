//! A write-mostly cache mapping the brokerage's opaque instrument identifiers to `(name, symbol)`.

// self
use crate::_prelude::*;

/// A cached instrument resolution.
///
/// Advisory: absence forces a remote lookup; presence must match the last `(name, symbol)`
/// the brokerage returned for this `instrument_id`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
	/// The brokerage's opaque identifier for this instrument.
	pub instrument_id: String,
	/// Display name (e.g. `"Tesla"`).
	pub name: String,
	/// Ticker symbol (e.g. `"TSLA"`).
	pub symbol: String,
}
