//! Core domain entities: institutions, connections, the instrument cache, and assets.

pub mod asset;
pub mod connection;
pub mod holdings;
pub mod ids;
pub mod instrument;

pub use asset::Asset;
pub use connection::{Connection, ConnectionFilter};
pub use holdings::{HoldingsSnapshot, RemoteHolding};
pub use ids::{InstitutionId, UserId};
pub use instrument::Instrument;

// self
use crate::_prelude::*;

/// A supported brokerage institution. Immutable once seeded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Institution {
	/// Opaque primary key identifying this institution.
	pub institution_id: InstitutionId,
	/// Human-readable institution name (e.g. `"Robinhood"`).
	pub name: String,
	/// Row creation timestamp.
	pub created_at: OffsetDateTime,
	/// Row last-update timestamp.
	pub updated_at: OffsetDateTime,
}
