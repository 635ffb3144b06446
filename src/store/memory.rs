//! Thread-safe in-memory store implementations for tests and local development.

// self
use crate::{
	_prelude::*,
	crypto::Ciphertext,
	domain::{
		asset::{AssetDeleteTarget, AssetUpdate, AssetUpsert},
		connection::{ConnectionUpsert, ListOptions},
		Asset, Connection, ConnectionFilter, Institution, InstitutionId, Instrument, UserId,
	},
	store::{
		asset::AssetStore,
		connection::{ConnectionClaim, ConnectionPage, ConnectionStore},
		StoreError, StoreFuture,
	},
};

#[derive(Default)]
struct ConnectionState {
	connections: HashMap<(UserId, InstitutionId), Connection>,
	institutions: HashMap<InstitutionId, Institution>,
	instruments: HashMap<String, Instrument>,
	next_connection_id: i64,
}

/// In-memory [`ConnectionStore`] used by unit and integration tests.
#[derive(Clone, Default)]
pub struct MemoryConnectionStore(Arc<RwLock<ConnectionState>>);
impl MemoryConnectionStore {
	/// Builds an empty store.
	pub fn new() -> Self {
		Self::default()
	}

	/// Seeds a supported institution, as a real deployment's migration data would.
	pub fn seed_institution(&self, institution: Institution) {
		self.0.write().institutions.insert(institution.institution_id.clone(), institution);
	}
}
impl ConnectionStore for MemoryConnectionStore {
	fn upsert(&self, data: ConnectionUpsert) -> StoreFuture<'_, Connection> {
		let state = self.0.clone();

		Box::pin(async move {
			let mut guard = state.write();

			let institution_name = guard
				.institutions
				.get(&data.institution_id)
				.map(|institution| institution.name.clone())
				.unwrap_or_default();

			let key = (data.user_id, data.institution_id.clone());
			let now = OffsetDateTime::now_utc();

			let connection = if let Some(existing) = guard.connections.get(&key) {
				Connection {
					username_ct: data.username_ct,
					password_ct: data.password_ct,
					access_token_ct: data.access_token_ct,
					refresh_token_ct: data.refresh_token_ct,
					is_active: data.is_active,
					updated_at: now,
					..existing.clone()
				}
			} else {
				guard.next_connection_id += 1;

				Connection {
					connection_id: guard.next_connection_id,
					institution_id: data.institution_id,
					institution_name,
					user_id: data.user_id,
					username_ct: data.username_ct,
					password_ct: data.password_ct,
					access_token_ct: data.access_token_ct,
					refresh_token_ct: data.refresh_token_ct,
					is_active: data.is_active,
					created_at: now,
					updated_at: now,
				}
			};

			guard.connections.insert(key, connection.clone());

			Ok(connection)
		})
	}

	fn fetch<'a>(
		&'a self,
		user_id: UserId,
		institution_id: &'a InstitutionId,
	) -> StoreFuture<'a, Option<Connection>> {
		let state = self.0.clone();
		let key = (user_id, institution_id.clone());

		Box::pin(async move { Ok(state.read().connections.get(&key).cloned()) })
	}

	fn list<'a>(
		&'a self,
		filter: &'a ConnectionFilter,
		options: ListOptions,
	) -> StoreFuture<'a, Vec<Connection>> {
		let state = self.0.clone();
		let filter = filter.clone();

		Box::pin(async move { Ok(matching_page(&state, &filter, options)) })
	}

	fn claim_page<'a>(
		&'a self,
		filter: &'a ConnectionFilter,
		options: ListOptions,
	) -> StoreFuture<'a, ConnectionPage> {
		let state = self.0.clone();
		let filter = filter.clone();

		Box::pin(async move {
			let connections = matching_page(&state, &filter, options);

			Ok(ConnectionPage {
				connections,
				claim: Box::new(MemoryConnectionClaim { state: state.clone() }),
			})
		})
	}

	fn deactivate(&self, connection_id: i64) -> StoreFuture<'_, ()> {
		let state = self.0.clone();

		Box::pin(async move {
			let mut guard = state.write();

			if let Some(connection) =
				guard.connections.values_mut().find(|c| c.connection_id == connection_id)
			{
				connection.is_active = false;
				connection.updated_at = OffsetDateTime::now_utc();
			}

			Ok(())
		})
	}

	fn update_tokens(
		&self,
		connection_id: i64,
		access_token_ct: Ciphertext,
		refresh_token_ct: Option<Ciphertext>,
	) -> StoreFuture<'_, ()> {
		let state = self.0.clone();

		Box::pin(async move {
			let mut guard = state.write();

			if let Some(connection) =
				guard.connections.values_mut().find(|c| c.connection_id == connection_id)
			{
				connection.access_token_ct = Some(access_token_ct);
				connection.refresh_token_ct = refresh_token_ct;
				connection.updated_at = OffsetDateTime::now_utc();
			}

			Ok(())
		})
	}

	fn delete<'a>(
		&'a self,
		user_id: UserId,
		institution_id: &'a InstitutionId,
	) -> StoreFuture<'a, ()> {
		let state = self.0.clone();
		let key = (user_id, institution_id.clone());

		Box::pin(async move {
			state.write().connections.remove(&key);

			Ok(())
		})
	}

	fn list_institutions(&self) -> StoreFuture<'_, Vec<Institution>> {
		let state = self.0.clone();

		Box::pin(async move {
			let mut institutions: Vec<Institution> =
				state.read().institutions.values().cloned().collect();

			institutions.sort_by(|a, b| a.name.cmp(&b.name));

			Ok(institutions)
		})
	}

	fn fetch_instrument<'a>(
		&'a self,
		instrument_id: &'a str,
	) -> StoreFuture<'a, Option<Instrument>> {
		let state = self.0.clone();
		let instrument_id = instrument_id.to_owned();

		Box::pin(async move { Ok(state.read().instruments.get(&instrument_id).cloned()) })
	}

	fn insert_instrument(&self, instrument: Instrument) -> StoreFuture<'_, ()> {
		let state = self.0.clone();

		Box::pin(async move {
			state.write().instruments.insert(instrument.instrument_id.clone(), instrument);

			Ok(())
		})
	}
}

fn matching_page(
	state: &RwLock<ConnectionState>,
	filter: &ConnectionFilter,
	options: ListOptions,
) -> Vec<Connection> {
	let guard = state.read();
	let mut matched: Vec<Connection> = guard
		.connections
		.values()
		.filter(|c| filter.user_id.is_none_or(|u| u == c.user_id))
		.filter(|c| filter.institution_id.as_ref().is_none_or(|i| *i == c.institution_id))
		.filter(|c| filter.is_active.is_none_or(|a| a == c.is_active))
		.filter(|c| filter.has_refresh_token.is_none_or(|h| h == c.refresh_token_ct.is_some()))
		.cloned()
		.collect();

	matched.sort_by_key(|c| std::cmp::Reverse(c.created_at));

	let start = (options.page_number as usize) * (options.page_size as usize);

	matched.into_iter().skip(start).take(options.page_size as usize).collect()
}

/// [`ConnectionClaim`] for [`MemoryConnectionStore`]; there is no real lock to hold, so writes
/// go straight through to the shared state and `release` is a no-op.
struct MemoryConnectionClaim {
	state: Arc<RwLock<ConnectionState>>,
}
impl ConnectionClaim for MemoryConnectionClaim {
	fn deactivate(&mut self, connection_id: i64) -> StoreFuture<'_, ()> {
		let state = self.state.clone();

		Box::pin(async move {
			let mut guard = state.write();

			if let Some(connection) =
				guard.connections.values_mut().find(|c| c.connection_id == connection_id)
			{
				connection.is_active = false;
				connection.updated_at = OffsetDateTime::now_utc();
			}

			Ok(())
		})
	}

	fn update_tokens(
		&mut self,
		connection_id: i64,
		access_token_ct: Ciphertext,
		refresh_token_ct: Option<Ciphertext>,
	) -> StoreFuture<'_, ()> {
		let state = self.state.clone();

		Box::pin(async move {
			let mut guard = state.write();

			if let Some(connection) =
				guard.connections.values_mut().find(|c| c.connection_id == connection_id)
			{
				connection.access_token_ct = Some(access_token_ct);
				connection.refresh_token_ct = refresh_token_ct;
				connection.updated_at = OffsetDateTime::now_utc();
			}

			Ok(())
		})
	}

	fn release(self: Box<Self>) -> StoreFuture<'static, ()> {
		Box::pin(async move { Ok(()) })
	}
}

type AssetKey = (UserId, String, InstitutionId);

#[derive(Default)]
struct AssetState {
	assets: HashMap<AssetKey, Asset>,
	next_asset_id: i64,
}

/// In-memory [`AssetStore`] used by unit and integration tests.
#[derive(Clone, Default)]
pub struct MemoryAssetStore(Arc<RwLock<AssetState>>);
impl MemoryAssetStore {
	/// Builds an empty store.
	pub fn new() -> Self {
		Self::default()
	}
}
impl AssetStore for MemoryAssetStore {
	fn upsert(&self, data: AssetUpsert) -> StoreFuture<'_, Asset> {
		let state = self.0.clone();

		Box::pin(async move {
			let mut guard = state.write();
			let key = (data.user_id, data.asset_symbol.clone(), data.institution_id.clone());
			let now = OffsetDateTime::now_utc();

			let asset = if let Some(existing) = guard.assets.get(&key) {
				Asset {
					position_value: data.position_value,
					quantity: data.quantity,
					average_buy_price: data.average_buy_price,
					total_contribution: data.total_contribution,
					updated_at: now,
					..existing.clone()
				}
			} else {
				guard.next_asset_id += 1;

				Asset {
					asset_id: guard.next_asset_id,
					user_id: data.user_id,
					institution_id: data.institution_id,
					asset_symbol: data.asset_symbol,
					name: data.name,
					quantity: data.quantity,
					average_buy_price: data.average_buy_price,
					thesis_id: None,
					skin_rating: None,
					total_contribution: data.total_contribution,
					position_value: data.position_value,
					is_up_to_date: data.is_up_to_date,
					created_at: now,
					updated_at: now,
				}
			};

			guard.assets.insert(key, asset.clone());

			Ok(asset)
		})
	}

	fn update(&self, asset_id: i64, data: AssetUpdate) -> StoreFuture<'_, ()> {
		let state = self.0.clone();

		Box::pin(async move {
			let mut guard = state.write();

			if let Some(asset) = guard.assets.values_mut().find(|a| a.asset_id == asset_id) {
				asset.quantity = data.quantity;
				asset.average_buy_price = data.average_buy_price;
				asset.is_up_to_date = data.is_up_to_date;
				asset.updated_at = OffsetDateTime::now_utc();
			}

			Ok(())
		})
	}

	fn delete(&self, target: AssetDeleteTarget) -> StoreFuture<'_, ()> {
		let state = self.0.clone();

		Box::pin(async move {
			let mut guard = state.write();

			match target {
				AssetDeleteTarget::ById { asset_id } => {
					guard.assets.retain(|_, asset| asset.asset_id != asset_id);
				},
				AssetDeleteTarget::ByConnection { user_id, institution_id } => {
					guard.assets.retain(|(u, _, i), _| {
						!(*u == user_id && *i == institution_id)
					});
				},
			}

			Ok(())
		})
	}

	fn list_by_connection<'a>(
		&'a self,
		user_id: UserId,
		institution_id: &'a InstitutionId,
	) -> StoreFuture<'a, Vec<Asset>> {
		let state = self.0.clone();
		let institution_id = institution_id.clone();

		Box::pin(async move {
			Ok(state
				.read()
				.assets
				.values()
				.filter(|a| a.user_id == user_id && a.institution_id == institution_id)
				.cloned()
				.collect())
		})
	}
}
