//! The holdings sync loop: periodic reconciliation of local assets with remote holdings.

// self
use crate::{
	_prelude::*,
	brokerage::BrokerageError,
	domain::{
		asset::{AssetDeleteTarget, AssetUpdate, AssetUpsert},
		connection::{ConnectionFilter, ListOptions},
		Connection, HoldingsSnapshot,
	},
	error::Error,
	institution::InstitutionRegistry,
	store::{AssetStore, ConnectionClaim, ConnectionStore},
	sync::{reconcile::reconcile, shutdown::ShutdownSignal},
};

/// Periodically reconciles every active connection's local assets with the brokerage's
/// current holdings.
///
/// On startup, sleeps `warmup` once, then repeatedly runs a pass and sleeps `period`. Only a
/// 401 from the brokerage changes durable per-connection state (deactivation); every other
/// per-connection error is logged and the loop moves on without writing anything for that
/// connection this cycle.
pub struct HoldingsSyncLoop {
	connections: Arc<dyn ConnectionStore>,
	assets: Arc<dyn AssetStore>,
	registry: InstitutionRegistry,
	warmup: Duration,
	period: Duration,
	shutdown: ShutdownSignal,
}
impl HoldingsSyncLoop {
	/// Builds the loop from its collaborators and schedule.
	pub fn new(
		connections: Arc<dyn ConnectionStore>,
		assets: Arc<dyn AssetStore>,
		registry: InstitutionRegistry,
		warmup: Duration,
		period: Duration,
		shutdown: ShutdownSignal,
	) -> Self {
		Self { connections, assets, registry, warmup, period, shutdown }
	}

	/// Runs until cancellation. Returns promptly, without completing an in-flight pass, once
	/// shutdown fires.
	pub async fn run(&self) {
		if self.sleep_or_cancelled(self.warmup).await {
			return;
		}

		loop {
			self.run_pass().await;

			if self.sleep_or_cancelled(self.period).await {
				return;
			}
		}
	}

	async fn sleep_or_cancelled(&self, duration: Duration) -> bool {
		let sleep = tokio::time::sleep(duration.unsigned_abs());

		tokio::select! {
			() = sleep => false,
			() = self.shutdown.cancelled() => true,
		}
	}

	async fn run_pass(&self) {
		let mut page_number = 0;
		let mut connections_processed = 0_u32;

		loop {
			let filter = ConnectionFilter { is_active: Some(true), ..Default::default() };
			let options = ListOptions { skip_locked: true, page_number, ..Default::default() };

			let mut page = match self.connections.claim_page(&filter, options).await {
				Ok(page) => page,
				Err(source) => {
					tracing::warn!(error = %source, "Holdings sync pass failed to claim connections.");

					break;
				},
			};

			let is_last_page = page.connections.is_empty();

			for connection in page.connections.drain(..) {
				self.process_connection(&mut *page.claim, connection).await;
				connections_processed += 1;
			}

			if let Err(source) = page.claim.release().await {
				tracing::warn!(error = %source, "Failed to release claimed connections.");
			}

			if is_last_page {
				break;
			}

			page_number += 1;
		}

		tracing::info!(connections_processed, "Holdings sync pass complete.");
	}

	async fn process_connection(&self, claim: &mut dyn ConnectionClaim, connection: Connection) {
		let service = match self.registry.get(&connection.institution_id) {
			Ok(service) => service,
			Err(source) => {
				record_failure("unregistered_institution");
				tracing::warn!(
					connection_id = connection.connection_id,
					error = %source,
					"No institution service registered for connection's institution.",
				);

				return;
			},
		};

		let Some(access_token_ct) = connection.access_token_ct.as_ref() else {
			record_failure("missing_access_token");
			tracing::warn!(
				connection_id = connection.connection_id,
				"Active connection has no access token.",
			);

			return;
		};

		match service.get_recent_holdings(access_token_ct).await {
			Ok(snapshot) => self.apply_reconciliation(&connection, snapshot).await,
			Err(Error::Brokerage(BrokerageError::Unauthorized)) => {
				record_failure("unauthorized");

				if let Err(source) = claim.deactivate(connection.connection_id).await {
					tracing::warn!(
						connection_id = connection.connection_id,
						error = %source,
						"Failed to deactivate connection after 401.",
					);
				}
			},
			Err(source) => {
				record_failure("brokerage_error");
				tracing::warn!(
					connection_id = connection.connection_id,
					error = %source,
					"Holdings fetch failed for connection; will retry next pass.",
				);
			},
		}
	}

	async fn apply_reconciliation(&self, connection: &Connection, snapshot: HoldingsSnapshot) {
		let tracked = match self
			.assets
			.list_by_connection(connection.user_id, &connection.institution_id)
			.await
		{
			Ok(tracked) => tracked,
			Err(source) => {
				record_failure("store_read");
				tracing::warn!(
					connection_id = connection.connection_id,
					error = %source,
					"Failed to read tracked assets for reconciliation.",
				);

				return;
			},
		};

		let plan = reconcile(tracked, snapshot.holdings);

		for asset in plan.to_delete {
			if let Err(source) =
				self.assets.delete(AssetDeleteTarget::ById { asset_id: asset.asset_id }).await
			{
				tracing::warn!(
					connection_id = connection.connection_id,
					asset_id = asset.asset_id,
					error = %source,
					"Failed to delete stale asset.",
				);
			}
		}

		for holding in plan.to_insert {
			if let Err(source) = self
				.assets
				.upsert(AssetUpsert {
					user_id: connection.user_id,
					institution_id: connection.institution_id.clone(),
					asset_symbol: holding.asset_symbol,
					name: holding.asset_name,
					quantity: holding.quantity,
					average_buy_price: holding.average_buy_price,
					position_value: None,
					total_contribution: None,
					is_up_to_date: true,
				})
				.await
			{
				tracing::warn!(
					connection_id = connection.connection_id,
					error = %source,
					"Failed to insert new asset during reconciliation.",
				);
			}
		}

		for (asset, holding) in plan.to_update {
			if let Err(source) = self
				.assets
				.update(
					asset.asset_id,
					AssetUpdate {
						quantity: holding.quantity,
						average_buy_price: holding.average_buy_price,
						is_up_to_date: true,
					},
				)
				.await
			{
				tracing::warn!(
					connection_id = connection.connection_id,
					asset_id = asset.asset_id,
					error = %source,
					"Failed to update asset during reconciliation.",
				);
			}
		}
	}
}

fn record_failure(reason: &'static str) {
	metrics::counter!("holdings_sync_connection_failures_total", "reason" => reason).increment(1);
}
