//! The token refresh loop: periodically rotates access/refresh tokens before they expire.

// self
use crate::{
	_prelude::*,
	brokerage::BrokerageError,
	domain::connection::{ConnectionFilter, ListOptions},
	error::Error,
	institution::InstitutionRegistry,
	store::{ConnectionClaim, ConnectionStore},
	sync::shutdown::ShutdownSignal,
};

/// Periodically refreshes the access/refresh token pair for every active connection that holds
/// a refresh token.
///
/// Shares the same cooperative-cancellation and pagination shape as [`crate::sync::HoldingsSyncLoop`];
/// kept as a separate loop since its schedule and failure handling differ.
pub struct TokenRefreshLoop {
	connections: Arc<dyn ConnectionStore>,
	registry: InstitutionRegistry,
	period: Duration,
	shutdown: ShutdownSignal,
}
impl TokenRefreshLoop {
	/// Builds the loop from its collaborators and schedule.
	pub fn new(
		connections: Arc<dyn ConnectionStore>,
		registry: InstitutionRegistry,
		period: Duration,
		shutdown: ShutdownSignal,
	) -> Self {
		Self { connections, registry, period, shutdown }
	}

	/// Runs until cancellation.
	pub async fn run(&self) {
		loop {
			self.run_pass().await;

			let sleep = tokio::time::sleep(self.period.unsigned_abs());

			tokio::select! {
				() = sleep => {},
				() = self.shutdown.cancelled() => return,
			}
		}
	}

	async fn run_pass(&self) {
		let mut page_number = 0;
		let mut connections_processed = 0_u32;

		loop {
			let filter = ConnectionFilter {
				is_active: Some(true),
				has_refresh_token: Some(true),
				..Default::default()
			};
			let options = ListOptions { skip_locked: true, page_number, ..Default::default() };

			let mut page = match self.connections.claim_page(&filter, options).await {
				Ok(page) => page,
				Err(source) => {
					tracing::warn!(error = %source, "Token refresh pass failed to claim connections.");

					break;
				},
			};

			let is_last_page = page.connections.is_empty();

			for connection in page.connections.drain(..) {
				let Some(refresh_token_ct) = connection.refresh_token_ct.as_ref() else {
					continue;
				};

				let service = match self.registry.get(&connection.institution_id) {
					Ok(service) => service,
					Err(source) => {
						tracing::warn!(
							connection_id = connection.connection_id,
							error = %source,
							"No institution service registered for connection's institution.",
						);

						continue;
					},
				};

				match service.refresh_token(refresh_token_ct).await {
					Ok(tokens) => {
						if let Err(source) = page
							.claim
							.update_tokens(
								connection.connection_id,
								tokens.access_token_ct,
								Some(tokens.refresh_token_ct),
							)
							.await
						{
							tracing::warn!(
								connection_id = connection.connection_id,
								error = %source,
								"Failed to persist refreshed tokens.",
							);
						}
					},
					Err(Error::Brokerage(BrokerageError::Unauthorized)) => {
						if let Err(source) =
							page.claim.deactivate(connection.connection_id).await
						{
							tracing::warn!(
								connection_id = connection.connection_id,
								error = %source,
								"Failed to deactivate connection after refresh 401.",
							);
						}
					},
					Err(source) => {
						tracing::warn!(
							connection_id = connection.connection_id,
							error = %source,
							"Token refresh failed for connection; will retry next pass.",
						);
					},
				}

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

		tracing::info!(connections_processed, "Token refresh pass complete.");
	}
}
