//! Persistent repository of per-user, per-institution asset holdings.

// lib
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
// self
use crate::{
	_prelude::*,
	domain::{
		asset::{AssetDeleteTarget, AssetUpdate, AssetUpsert},
		Asset, InstitutionId, UserId,
	},
	store::{StoreError, StoreFuture},
};

/// Persistence contract for asset holdings.
pub trait AssetStore
where
	Self: Send + Sync,
{
	/// Inserts an asset by `(user_id, asset_symbol, institution_id)`; on conflict, overwrites
	/// `position_value, quantity, average_buy_price, total_contribution` and preserves every
	/// other column. Returns the current row.
	fn upsert(&self, data: AssetUpsert) -> StoreFuture<'_, Asset>;

	/// Refreshes `quantity`, `average_buy_price`, and `is_up_to_date` on an existing row.
	fn update(&self, asset_id: i64, data: AssetUpdate) -> StoreFuture<'_, ()>;

	/// Deletes one asset row, or every asset row for one user's connection to one institution.
	fn delete(&self, target: AssetDeleteTarget) -> StoreFuture<'_, ()>;

	/// Lists every asset row tracked for one user's connection to one institution.
	fn list_by_connection<'a>(
		&'a self,
		user_id: UserId,
		institution_id: &'a InstitutionId,
	) -> StoreFuture<'a, Vec<Asset>>;
}

/// Production [`AssetStore`] backed by Postgres.
#[derive(Clone)]
pub struct PgAssetStore {
	pool: PgPool,
}
impl PgAssetStore {
	/// Builds a store over an already-connected pool.
	pub fn new(pool: PgPool) -> Self {
		Self { pool }
	}
}
impl AssetStore for PgAssetStore {
	fn upsert(&self, data: AssetUpsert) -> StoreFuture<'_, Asset> {
		Box::pin(async move {
			let row: AssetRow = sqlx::query_as(
				r#"
				insert into public.assets
					(user_id, institution_id, asset_symbol, name, quantity, average_buy_price,
					 position_value, total_contribution, is_up_to_date)
				values ($1, $2, $3, $4, $5, $6, $7, $8, $9)
				on conflict (user_id, asset_symbol, institution_id) do update set
					position_value = excluded.position_value,
					quantity = excluded.quantity,
					average_buy_price = excluded.average_buy_price,
					total_contribution = excluded.total_contribution,
					updated_at = now()
				returning
					asset_id, user_id, institution_id, asset_symbol, name, quantity,
					average_buy_price, thesis_id, skin_rating, total_contribution,
					position_value, is_up_to_date, created_at, updated_at
				"#,
			)
			.bind(data.user_id.get())
			.bind(data.institution_id.as_ref())
			.bind(&data.asset_symbol)
			.bind(&data.name)
			.bind(data.quantity)
			.bind(data.average_buy_price)
			.bind(data.position_value)
			.bind(data.total_contribution)
			.bind(data.is_up_to_date)
			.fetch_one(&self.pool)
			.await?;

			row.into_asset()
		})
	}

	fn update(&self, asset_id: i64, data: AssetUpdate) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			sqlx::query(
				r#"
				update public.assets
				set quantity = $2, average_buy_price = $3, is_up_to_date = $4, updated_at = now()
				where asset_id = $1
				"#,
			)
			.bind(asset_id)
			.bind(data.quantity)
			.bind(data.average_buy_price)
			.bind(data.is_up_to_date)
			.execute(&self.pool)
			.await?;

			Ok(())
		})
	}

	fn delete(&self, target: AssetDeleteTarget) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			match target {
				AssetDeleteTarget::ById { asset_id } => {
					sqlx::query("delete from public.assets where asset_id = $1")
						.bind(asset_id)
						.execute(&self.pool)
						.await?;
				},
				AssetDeleteTarget::ByConnection { user_id, institution_id } => {
					sqlx::query(
						"delete from public.assets where user_id = $1 and institution_id = $2",
					)
					.bind(user_id.get())
					.bind(institution_id.as_ref())
					.execute(&self.pool)
					.await?;
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
		Box::pin(async move {
			let rows: Vec<AssetRow> = sqlx::query_as(
				r#"
				select
					asset_id, user_id, institution_id, asset_symbol, name, quantity,
					average_buy_price, thesis_id, skin_rating, total_contribution,
					position_value, is_up_to_date, created_at, updated_at
				from public.assets
				where user_id = $1 and institution_id = $2
				"#,
			)
			.bind(user_id.get())
			.bind(institution_id.as_ref())
			.fetch_all(&self.pool)
			.await?;

			rows.into_iter().map(AssetRow::into_asset).collect()
		})
	}
}

#[derive(FromRow)]
struct AssetRow {
	asset_id: i64,
	user_id: i64,
	institution_id: String,
	asset_symbol: String,
	name: String,
	quantity: Decimal,
	average_buy_price: Option<Decimal>,
	thesis_id: Option<i64>,
	skin_rating: Option<i32>,
	total_contribution: Option<Decimal>,
	position_value: Option<Decimal>,
	is_up_to_date: bool,
	created_at: OffsetDateTime,
	updated_at: OffsetDateTime,
}
impl AssetRow {
	fn into_asset(self) -> Result<Asset, StoreError> {
		Ok(Asset {
			asset_id: self.asset_id,
			user_id: UserId::new(self.user_id),
			institution_id: InstitutionId::new(&self.institution_id).map_err(|source| {
				StoreError::Backend { message: source.to_string(), source: None }
			})?,
			asset_symbol: self.asset_symbol,
			name: self.name,
			quantity: self.quantity,
			average_buy_price: self.average_buy_price,
			thesis_id: self.thesis_id,
			skin_rating: self.skin_rating,
			total_contribution: self.total_contribution,
			position_value: self.position_value,
			is_up_to_date: self.is_up_to_date,
			created_at: self.created_at,
			updated_at: self.updated_at,
		})
	}
}
