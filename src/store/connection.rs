//! Persistent repository of institutions, user↔institution connections, and the instrument cache.

// lib
use sqlx::{FromRow, PgPool, Row};
// self
use crate::{
	_prelude::*,
	crypto::Ciphertext,
	domain::{
		connection::{ConnectionUpsert, ListOptions},
		Connection, ConnectionFilter, Institution, InstitutionId, Instrument, UserId,
	},
	store::{StoreError, StoreFuture},
};

/// Persistence contract for institutions, connections, and the instrument cache.
pub trait ConnectionStore
where
	Self: Send + Sync,
{
	/// Inserts a connection by `(user_id, institution_id)`; on conflict, overwrites
	/// `username_ct, password_ct, access_token_ct, refresh_token_ct, is_active` and preserves
	/// every other column. Returns the current row.
	fn upsert(&self, data: ConnectionUpsert) -> StoreFuture<'_, Connection>;

	/// Fetches the connection for one `(user_id, institution_id)` pair, if any, joined with the
	/// institution's name.
	fn fetch<'a>(
		&'a self,
		user_id: UserId,
		institution_id: &'a InstitutionId,
	) -> StoreFuture<'a, Option<Connection>>;

	/// Lists connections matching `filter`, joined with institution name. Never takes row locks;
	/// use [`ConnectionStore::claim_page`] when the caller needs to coordinate with concurrent
	/// readers.
	///
	/// `filter` fields are tri-state: `None` means unfiltered, `Some(x)` means an exact match.
	fn list<'a>(
		&'a self,
		filter: &'a ConnectionFilter,
		options: ListOptions,
	) -> StoreFuture<'a, Vec<Connection>>;

	/// Claims one page of connections matching `filter` for exclusive processing.
	///
	/// When `options.skip_locked` is true, the read acquires a row-level lock on every returned
	/// row that skips rows already locked by a concurrent transaction — the coordination
	/// primitive multiple sync-loop replicas use to claim a disjoint subset of connections. Those
	/// locks are held until the caller calls [`ConnectionClaim::release`] on the returned
	/// [`ConnectionPage::claim`], not merely until this method returns; a caller must finish
	/// reconciling every connection in the page, writing any per-connection updates through that
	/// same claim, before releasing it.
	fn claim_page<'a>(
		&'a self,
		filter: &'a ConnectionFilter,
		options: ListOptions,
	) -> StoreFuture<'a, ConnectionPage>;

	/// Marks a connection inactive, e.g. after a 401 from the brokerage.
	fn deactivate(&self, connection_id: i64) -> StoreFuture<'_, ()>;

	/// Persists newly issued encrypted tokens for an already-linked connection.
	fn update_tokens(
		&self,
		connection_id: i64,
		access_token_ct: Ciphertext,
		refresh_token_ct: Option<Ciphertext>,
	) -> StoreFuture<'_, ()>;

	/// Deletes a user's connection to one institution. The caller is responsible for also
	/// deleting that connection's asset rows.
	fn delete<'a>(
		&'a self,
		user_id: UserId,
		institution_id: &'a InstitutionId,
	) -> StoreFuture<'a, ()>;

	/// Lists every supported institution.
	fn list_institutions(&self) -> StoreFuture<'_, Vec<Institution>>;

	/// Looks up a cached instrument resolution.
	fn fetch_instrument<'a>(
		&'a self,
		instrument_id: &'a str,
	) -> StoreFuture<'a, Option<Instrument>>;

	/// Inserts or replaces a cached instrument resolution.
	fn insert_instrument(&self, instrument: Instrument) -> StoreFuture<'_, ()>;
}

/// A held claim on one page of connections returned by [`ConnectionStore::claim_page`].
///
/// For [`PgConnectionStore`] this wraps the open transaction that took the row locks; those
/// locks, and any writes made through [`ConnectionClaim::deactivate`] or
/// [`ConnectionClaim::update_tokens`], are only visible to other transactions once
/// [`ConnectionClaim::release`] commits. Writing through a connection's own store methods
/// instead of through the claim while a page is outstanding would block on the very lock the
/// claim holds.
pub trait ConnectionClaim
where
	Self: Send,
{
	/// Marks a connection inactive, within the held transaction.
	fn deactivate(&mut self, connection_id: i64) -> StoreFuture<'_, ()>;

	/// Persists newly issued encrypted tokens, within the held transaction.
	fn update_tokens(
		&mut self,
		connection_id: i64,
		access_token_ct: Ciphertext,
		refresh_token_ct: Option<Ciphertext>,
	) -> StoreFuture<'_, ()>;

	/// Commits the transaction (or, for an in-memory store, does nothing), releasing every row
	/// lock this claim held.
	fn release(self: Box<Self>) -> StoreFuture<'static, ()>;
}

/// One page of connections claimed for exclusive processing, plus the handle that must stay
/// open until every connection in `connections` has been reconciled.
pub struct ConnectionPage {
	/// Connections claimed for this page.
	pub connections: Vec<Connection>,
	/// The handle to write through and then release once the page is fully reconciled.
	pub claim: Box<dyn ConnectionClaim>,
}

/// Production [`ConnectionStore`] backed by Postgres.
#[derive(Clone)]
pub struct PgConnectionStore {
	pool: PgPool,
}
impl PgConnectionStore {
	/// Builds a store over an already-connected pool.
	pub fn new(pool: PgPool) -> Self {
		Self { pool }
	}
}
impl ConnectionStore for PgConnectionStore {
	fn upsert(&self, data: ConnectionUpsert) -> StoreFuture<'_, Connection> {
		Box::pin(async move {
			let row: ConnectionRow = sqlx::query_as(
				r#"
				insert into account_connections.institution_connections
					(user_id, institution_id, username_ct, password_ct, access_token_ct,
					 refresh_token_ct, is_active)
				values ($1, $2, $3, $4, $5, $6, $7)
				on conflict (user_id, institution_id) do update set
					username_ct = excluded.username_ct,
					password_ct = excluded.password_ct,
					access_token_ct = excluded.access_token_ct,
					refresh_token_ct = excluded.refresh_token_ct,
					is_active = excluded.is_active,
					updated_at = now()
				returning
					connection_id, user_id, institution_id, username_ct, password_ct,
					access_token_ct, refresh_token_ct, is_active, created_at, updated_at
				"#,
			)
			.bind(data.user_id.get())
			.bind(data.institution_id.as_ref())
			.bind(data.username_ct.as_ref().map(Ciphertext::as_str))
			.bind(data.password_ct.as_ref().map(Ciphertext::as_str))
			.bind(data.access_token_ct.as_ref().map(Ciphertext::as_str))
			.bind(data.refresh_token_ct.as_ref().map(Ciphertext::as_str))
			.bind(data.is_active)
			.fetch_one(&self.pool)
			.await?;

			let name = institution_name(&self.pool, &row.institution_id).await?;

			row.into_connection(name)
		})
	}

	fn fetch<'a>(
		&'a self,
		user_id: UserId,
		institution_id: &'a InstitutionId,
	) -> StoreFuture<'a, Option<Connection>> {
		Box::pin(async move {
			let row: Option<ConnectionRow> = sqlx::query_as(
				r#"
				select
					connection_id, user_id, institution_id, username_ct, password_ct,
					access_token_ct, refresh_token_ct, is_active, created_at, updated_at
				from account_connections.institution_connections
				where user_id = $1 and institution_id = $2
				"#,
			)
			.bind(user_id.get())
			.bind(institution_id.as_ref())
			.fetch_optional(&self.pool)
			.await?;

			match row {
				Some(row) => {
					let name = institution_name(&self.pool, &row.institution_id).await?;

					Ok(Some(row.into_connection(name)?))
				},
				None => Ok(None),
			}
		})
	}

	fn list<'a>(
		&'a self,
		filter: &'a ConnectionFilter,
		options: ListOptions,
	) -> StoreFuture<'a, Vec<Connection>> {
		Box::pin(async move {
			let limit = i64::from(options.page_size);
			let offset = i64::from(options.page_number) * limit;

			let rows: Vec<ConnectionJoinedRow> = sqlx::query_as(&list_sql(""))
				.bind(filter.user_id.map(UserId::get))
				.bind(filter.institution_id.as_deref())
				.bind(filter.is_active)
				.bind(filter.has_refresh_token)
				.bind(limit)
				.bind(offset)
				.fetch_all(&self.pool)
				.await?;

			rows.into_iter().map(ConnectionJoinedRow::into_connection).collect()
		})
	}

	fn claim_page<'a>(
		&'a self,
		filter: &'a ConnectionFilter,
		options: ListOptions,
	) -> StoreFuture<'a, ConnectionPage> {
		Box::pin(async move {
			let mut tx = self.pool.begin().await?;

			let limit = i64::from(options.page_size);
			let offset = i64::from(options.page_number) * limit;
			let lock_clause = if options.skip_locked { "for update of c skip locked" } else { "" };

			let rows: Vec<ConnectionJoinedRow> = sqlx::query_as(&list_sql(lock_clause))
				.bind(filter.user_id.map(UserId::get))
				.bind(filter.institution_id.as_deref())
				.bind(filter.is_active)
				.bind(filter.has_refresh_token)
				.bind(limit)
				.bind(offset)
				.fetch_all(&mut *tx)
				.await?;

			let connections =
				rows.into_iter().map(ConnectionJoinedRow::into_connection).collect::<Result<_, _>>()?;

			Ok(ConnectionPage { connections, claim: Box::new(PgConnectionClaim { tx }) })
		})
	}

	fn deactivate(&self, connection_id: i64) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			sqlx::query(
				r#"
				update account_connections.institution_connections
				set is_active = false, updated_at = now()
				where connection_id = $1
				"#,
			)
			.bind(connection_id)
			.execute(&self.pool)
			.await?;

			Ok(())
		})
	}

	fn update_tokens(
		&self,
		connection_id: i64,
		access_token_ct: Ciphertext,
		refresh_token_ct: Option<Ciphertext>,
	) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			sqlx::query(
				r#"
				update account_connections.institution_connections
				set access_token_ct = $2, refresh_token_ct = $3, updated_at = now()
				where connection_id = $1
				"#,
			)
			.bind(connection_id)
			.bind(access_token_ct.as_str())
			.bind(refresh_token_ct.as_ref().map(Ciphertext::as_str))
			.execute(&self.pool)
			.await?;

			Ok(())
		})
	}

	fn delete<'a>(
		&'a self,
		user_id: UserId,
		institution_id: &'a InstitutionId,
	) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			sqlx::query(
				r#"
				delete from account_connections.institution_connections
				where user_id = $1 and institution_id = $2
				"#,
			)
			.bind(user_id.get())
			.bind(institution_id.as_ref())
			.execute(&self.pool)
			.await?;

			Ok(())
		})
	}

	fn list_institutions(&self) -> StoreFuture<'_, Vec<Institution>> {
		Box::pin(async move {
			let rows: Vec<InstitutionRow> = sqlx::query_as(
				r#"
				select institution_id, name, created_at, updated_at
				from account_connections.institutions
				order by name asc
				"#,
			)
			.fetch_all(&self.pool)
			.await?;

			rows.into_iter().map(InstitutionRow::into_institution).collect()
		})
	}

	fn fetch_instrument<'a>(
		&'a self,
		instrument_id: &'a str,
	) -> StoreFuture<'a, Option<Instrument>> {
		Box::pin(async move {
			let row: Option<(String, String, String)> = sqlx::query_as(
				r#"
				select instrument_id, name, symbol
				from account_connections.robinhood_instruments
				where instrument_id = $1
				"#,
			)
			.bind(instrument_id)
			.fetch_optional(&self.pool)
			.await?;

			Ok(row.map(|(instrument_id, name, symbol)| Instrument { instrument_id, name, symbol }))
		})
	}

	fn insert_instrument(&self, instrument: Instrument) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			sqlx::query(
				r#"
				insert into account_connections.robinhood_instruments (instrument_id, name, symbol)
				values ($1, $2, $3)
				on conflict (instrument_id) do update set name = excluded.name, symbol = excluded.symbol
				"#,
			)
			.bind(instrument.instrument_id)
			.bind(instrument.name)
			.bind(instrument.symbol)
			.execute(&self.pool)
			.await?;

			Ok(())
		})
	}
}

/// Builds the `list`/`claim_page` query, appending `lock_clause` (empty, or `for update ...`)
/// to the end.
fn list_sql(lock_clause: &str) -> String {
	format!(
		r#"
		select
			c.connection_id, c.user_id, c.institution_id, i.name as institution_name,
			c.username_ct, c.password_ct, c.access_token_ct, c.refresh_token_ct,
			c.is_active, c.created_at, c.updated_at
		from account_connections.institution_connections c
		join account_connections.institutions i on i.institution_id = c.institution_id
		where
			($1::bigint is null or c.user_id = $1)
			and ($2::text is null or c.institution_id = $2)
			and ($3::bool is null or c.is_active = $3)
			and ($4::bool is null or (c.refresh_token_ct is not null) = $4)
		order by c.created_at desc
		limit $5 offset $6
		{lock_clause}
		"#
	)
}

/// [`ConnectionClaim`] backed by the open transaction [`PgConnectionStore::claim_page`] began.
struct PgConnectionClaim {
	tx: sqlx::Transaction<'static, sqlx::Postgres>,
}
impl ConnectionClaim for PgConnectionClaim {
	fn deactivate(&mut self, connection_id: i64) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			sqlx::query(
				r#"
				update account_connections.institution_connections
				set is_active = false, updated_at = now()
				where connection_id = $1
				"#,
			)
			.bind(connection_id)
			.execute(&mut *self.tx)
			.await?;

			Ok(())
		})
	}

	fn update_tokens(
		&mut self,
		connection_id: i64,
		access_token_ct: Ciphertext,
		refresh_token_ct: Option<Ciphertext>,
	) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			sqlx::query(
				r#"
				update account_connections.institution_connections
				set access_token_ct = $2, refresh_token_ct = $3, updated_at = now()
				where connection_id = $1
				"#,
			)
			.bind(connection_id)
			.bind(access_token_ct.as_str())
			.bind(refresh_token_ct.as_ref().map(Ciphertext::as_str))
			.execute(&mut *self.tx)
			.await?;

			Ok(())
		})
	}

	fn release(self: Box<Self>) -> StoreFuture<'static, ()> {
		Box::pin(async move {
			self.tx.commit().await?;

			Ok(())
		})
	}
}

async fn institution_name(pool: &PgPool, institution_id: &str) -> Result<String, StoreError> {
	let row = sqlx::query("select name from account_connections.institutions where institution_id = $1")
		.bind(institution_id)
		.fetch_one(pool)
		.await?;

	Ok(row.try_get("name")?)
}

#[derive(FromRow)]
struct ConnectionRow {
	connection_id: i64,
	user_id: i64,
	institution_id: String,
	username_ct: Option<String>,
	password_ct: Option<String>,
	access_token_ct: Option<String>,
	refresh_token_ct: Option<String>,
	is_active: bool,
	created_at: OffsetDateTime,
	updated_at: OffsetDateTime,
}
impl ConnectionRow {
	fn into_connection(self, institution_name: String) -> Result<Connection, StoreError> {
		Ok(Connection {
			connection_id: self.connection_id,
			institution_id: InstitutionId::new(&self.institution_id).map_err(|source| {
				StoreError::Backend { message: source.to_string(), source: None }
			})?,
			institution_name,
			user_id: UserId::new(self.user_id),
			username_ct: self.username_ct.map(Ciphertext::from_raw),
			password_ct: self.password_ct.map(Ciphertext::from_raw),
			access_token_ct: self.access_token_ct.map(Ciphertext::from_raw),
			refresh_token_ct: self.refresh_token_ct.map(Ciphertext::from_raw),
			is_active: self.is_active,
			created_at: self.created_at,
			updated_at: self.updated_at,
		})
	}
}

#[derive(FromRow)]
struct ConnectionJoinedRow {
	connection_id: i64,
	user_id: i64,
	institution_id: String,
	institution_name: String,
	username_ct: Option<String>,
	password_ct: Option<String>,
	access_token_ct: Option<String>,
	refresh_token_ct: Option<String>,
	is_active: bool,
	created_at: OffsetDateTime,
	updated_at: OffsetDateTime,
}
impl ConnectionJoinedRow {
	fn into_connection(self) -> Result<Connection, StoreError> {
		Ok(Connection {
			connection_id: self.connection_id,
			institution_id: InstitutionId::new(&self.institution_id).map_err(|source| {
				StoreError::Backend { message: source.to_string(), source: None }
			})?,
			institution_name: self.institution_name,
			user_id: UserId::new(self.user_id),
			username_ct: self.username_ct.map(Ciphertext::from_raw),
			password_ct: self.password_ct.map(Ciphertext::from_raw),
			access_token_ct: self.access_token_ct.map(Ciphertext::from_raw),
			refresh_token_ct: self.refresh_token_ct.map(Ciphertext::from_raw),
			is_active: self.is_active,
			created_at: self.created_at,
			updated_at: self.updated_at,
		})
	}
}

#[derive(FromRow)]
struct InstitutionRow {
	institution_id: String,
	name: String,
	created_at: OffsetDateTime,
	updated_at: OffsetDateTime,
}
impl InstitutionRow {
	fn into_institution(self) -> Result<Institution, StoreError> {
		Ok(Institution {
			institution_id: InstitutionId::new(&self.institution_id).map_err(|source| {
				StoreError::Backend { message: source.to_string(), source: None }
			})?,
			name: self.name,
			created_at: self.created_at,
			updated_at: self.updated_at,
		})
	}
}
