//! The holdings reconciliation algorithm, kept as a pure function for unit testing.

// std
use std::collections::HashSet;
// self
use crate::domain::{Asset, RemoteHolding};

/// The set of store operations one reconciliation pass must apply.
#[derive(Debug, PartialEq)]
pub struct ReconciliationPlan {
	/// Locally tracked assets whose symbol no longer appears in the remote snapshot.
	pub to_delete: Vec<Asset>,
	/// Remote holdings with no locally tracked counterpart; newly inserted rows already carry
	/// correct values, so they are never also updated.
	pub to_insert: Vec<RemoteHolding>,
	/// Remote holdings with a locally tracked counterpart; only `quantity` and
	/// `average_buy_price` are refreshed.
	pub to_update: Vec<(Asset, RemoteHolding)>,
}

/// Computes the create/update/delete operations that bring `tracked` into agreement with
/// `remote`.
///
/// Position value is never recomputed here (no pricing source); deletions are hard.
pub fn reconcile(tracked: Vec<Asset>, remote: Vec<RemoteHolding>) -> ReconciliationPlan {
	let remote_symbols: HashSet<&str> =
		remote.iter().map(|holding| holding.asset_symbol.as_str()).collect();
	let tracked_symbols: HashSet<&str> =
		tracked.iter().map(|asset| asset.asset_symbol.as_str()).collect();

	let mut to_delete = Vec::new();
	let mut tracked_by_symbol = std::collections::HashMap::new();

	for asset in tracked {
		if remote_symbols.contains(asset.asset_symbol.as_str()) {
			tracked_by_symbol.insert(asset.asset_symbol.clone(), asset);
		} else {
			to_delete.push(asset);
		}
	}

	let mut to_insert = Vec::new();
	let mut to_update = Vec::new();

	for holding in remote {
		if !tracked_symbols.contains(holding.asset_symbol.as_str()) {
			to_insert.push(holding);
		} else if let Some(asset) = tracked_by_symbol.remove(&holding.asset_symbol) {
			to_update.push((asset, holding));
		}
	}

	ReconciliationPlan { to_delete, to_insert, to_update }
}

#[cfg(test)]
mod tests {
	// lib
	use rust_decimal::Decimal;
	use time::OffsetDateTime;
	// self
	use super::*;
	use crate::domain::{InstitutionId, UserId};

	fn asset(symbol: &str, quantity: i64) -> Asset {
		Asset {
			asset_id: 1,
			user_id: UserId::new(1),
			institution_id: InstitutionId::new("robinhood").unwrap(),
			asset_symbol: symbol.into(),
			name: symbol.into(),
			quantity: Decimal::new(quantity, 0),
			average_buy_price: None,
			thesis_id: None,
			skin_rating: None,
			total_contribution: None,
			position_value: None,
			is_up_to_date: false,
			created_at: OffsetDateTime::UNIX_EPOCH,
			updated_at: OffsetDateTime::UNIX_EPOCH,
		}
	}

	fn holding(symbol: &str, quantity: i64) -> RemoteHolding {
		RemoteHolding {
			asset_symbol: symbol.into(),
			asset_name: symbol.into(),
			quantity: Decimal::new(quantity, 0),
			average_buy_price: None,
		}
	}

	#[test]
	fn stale_assets_deleted_new_holdings_inserted_matching_holdings_updated() {
		let tracked = vec![asset("AAPL", 5), asset("TSLA", 5)];
		let remote = vec![holding("TSLA", 9), holding("BTC", 2)];

		let plan = reconcile(tracked, remote);

		assert_eq!(plan.to_delete.len(), 1);
		assert_eq!(plan.to_delete[0].asset_symbol, "AAPL");

		assert_eq!(plan.to_insert.len(), 1);
		assert_eq!(plan.to_insert[0].asset_symbol, "BTC");

		assert_eq!(plan.to_update.len(), 1);
		assert_eq!(plan.to_update[0].0.asset_symbol, "TSLA");
		assert_eq!(plan.to_update[0].1.quantity, Decimal::new(9, 0));
	}

	#[test]
	fn empty_remote_deletes_everything_tracked() {
		let plan = reconcile(vec![asset("AAPL", 1)], vec![]);

		assert_eq!(plan.to_delete.len(), 1);
		assert!(plan.to_insert.is_empty());
		assert!(plan.to_update.is_empty());
	}

	#[test]
	fn empty_tracked_inserts_everything_remote() {
		let plan = reconcile(vec![], vec![holding("TSLA", 1)]);

		assert!(plan.to_delete.is_empty());
		assert_eq!(plan.to_insert.len(), 1);
		assert!(plan.to_update.is_empty());
	}
}
