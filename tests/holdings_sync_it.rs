//! Integration coverage for the holdings sync loop's reconciliation and failure isolation.

mod support;

// std
use std::{sync::Arc, time::Duration as StdDuration};
// lib
use account_connections::{
	brokerage::PositionRow,
	domain::{
		asset::AssetUpsert,
		connection::ConnectionUpsert,
		Institution, InstitutionId, Instrument, UserId,
	},
	institution::{InstitutionRegistry, RobinhoodInstitutionService},
	store::{AssetStore, ConnectionStore, MemoryAssetStore, MemoryConnectionStore},
	sync::{HoldingsSyncLoop, ShutdownSignal},
};
use rust_decimal::Decimal;
use support::{test_encryption, FakeBrokerageClient};
use time::{Duration, OffsetDateTime};

const CLIENT_ID: &str = "client-id";
const DEVICE_TOKEN: &str = "device-token";

fn institution_id() -> InstitutionId {
	InstitutionId::new("robinhood").expect("Fixture institution id should be valid.")
}

async fn run_one_pass(loop_: HoldingsSyncLoop, shutdown: ShutdownSignal) {
	let handle = tokio::spawn(async move { loop_.run().await });

	tokio::time::sleep(StdDuration::from_millis(100)).await;
	shutdown.shutdown();
	handle.await.expect("The sync loop task should not panic.");
}

#[tokio::test]
async fn reconciliation_deletes_inserts_and_updates_in_one_pass() {
	let brokerage = Arc::new(FakeBrokerageClient::new());
	let connections = Arc::new(MemoryConnectionStore::new());
	let assets = Arc::new(MemoryAssetStore::new());
	let encryption = test_encryption();

	connections.seed_institution(Institution {
		institution_id: institution_id(),
		name: "Robinhood".into(),
		created_at: OffsetDateTime::now_utc(),
		updated_at: OffsetDateTime::now_utc(),
	});

	let user_id = UserId::new(1);
	let access_token_ct = encryption.encrypt("A1");

	connections
		.upsert(ConnectionUpsert {
			user_id,
			institution_id: institution_id(),
			username_ct: None,
			password_ct: None,
			access_token_ct: Some(access_token_ct),
			refresh_token_ct: None,
			is_active: true,
		})
		.await
		.expect("Connection seed should succeed.");

	assets
		.upsert(AssetUpsert {
			user_id,
			institution_id: institution_id(),
			asset_symbol: "AAA".into(),
			name: "Stale Co".into(),
			quantity: Decimal::new(3, 0),
			average_buy_price: None,
			position_value: None,
			total_contribution: None,
			is_up_to_date: true,
		})
		.await
		.unwrap();
	assets
		.upsert(AssetUpsert {
			user_id,
			institution_id: institution_id(),
			asset_symbol: "BBB".into(),
			name: "Beta Inc".into(),
			quantity: Decimal::new(5, 0),
			average_buy_price: None,
			position_value: None,
			total_contribution: None,
			is_up_to_date: true,
		})
		.await
		.unwrap();

	connections
		.insert_instrument(Instrument {
			instrument_id: "bbb-id".into(),
			name: "Beta Inc".into(),
			symbol: "BBB".into(),
		})
		.await
		.unwrap();
	connections
		.insert_instrument(Instrument {
			instrument_id: "ccc-id".into(),
			name: "Gamma Corp".into(),
			symbol: "CCC".into(),
		})
		.await
		.unwrap();

	brokerage.set_positions(
		"A1",
		vec![
			PositionRow {
				instrument_id: "bbb-id".into(),
				instrument_url: "https://api.robinhood.com/instruments/bbb-id/".into(),
				average_buy_price: "20.0".parse().unwrap(),
				quantity: "10.0".parse::<Decimal>().unwrap(),
			},
			PositionRow {
				instrument_id: "ccc-id".into(),
				instrument_url: "https://api.robinhood.com/instruments/ccc-id/".into(),
				average_buy_price: "5.0".parse().unwrap(),
				quantity: "2.0".parse::<Decimal>().unwrap(),
			},
		],
	);

	let service = Arc::new(RobinhoodInstitutionService::new(
		brokerage,
		connections.clone(),
		assets.clone(),
		encryption,
		CLIENT_ID.to_owned(),
		DEVICE_TOKEN.to_owned(),
		institution_id(),
	));
	let mut registry = InstitutionRegistry::new();

	registry.register(institution_id(), service);

	let shutdown = ShutdownSignal::new();
	let loop_ = HoldingsSyncLoop::new(
		connections.clone(),
		assets.clone(),
		registry,
		Duration::ZERO,
		Duration::hours(1),
		shutdown.clone(),
	);

	run_one_pass(loop_, shutdown).await;

	let mut tracked = assets.list_by_connection(user_id, &institution_id()).await.unwrap();

	tracked.sort_by(|a, b| a.asset_symbol.cmp(&b.asset_symbol));

	assert_eq!(tracked.len(), 2, "AAA should be deleted, BBB updated, CCC inserted");
	assert_eq!(tracked[0].asset_symbol, "BBB");
	assert_eq!(tracked[0].quantity, "10.0".parse::<Decimal>().unwrap());
	assert_eq!(tracked[1].asset_symbol, "CCC");
	assert_eq!(tracked[1].quantity, "2.0".parse::<Decimal>().unwrap());
}

#[tokio::test]
async fn a_401_deactivates_only_the_offending_connection() {
	let brokerage = Arc::new(FakeBrokerageClient::new());
	let connections = Arc::new(MemoryConnectionStore::new());
	let assets = Arc::new(MemoryAssetStore::new());
	let encryption = test_encryption();

	connections.seed_institution(Institution {
		institution_id: institution_id(),
		name: "Robinhood".into(),
		created_at: OffsetDateTime::now_utc(),
		updated_at: OffsetDateTime::now_utc(),
	});

	let unauthorized_user = UserId::new(1);
	let healthy_user = UserId::new(2);

	let unauthorized_token_ct = encryption.encrypt("expired-token");
	let healthy_token_ct = encryption.encrypt("healthy-token");

	connections
		.upsert(ConnectionUpsert {
			user_id: unauthorized_user,
			institution_id: institution_id(),
			username_ct: None,
			password_ct: None,
			access_token_ct: Some(unauthorized_token_ct),
			refresh_token_ct: None,
			is_active: true,
		})
		.await
		.unwrap();
	let healthy_connection = connections
		.upsert(ConnectionUpsert {
			user_id: healthy_user,
			institution_id: institution_id(),
			username_ct: None,
			password_ct: None,
			access_token_ct: Some(healthy_token_ct),
			refresh_token_ct: None,
			is_active: true,
		})
		.await
		.unwrap();

	brokerage.set_positions_error(
		"expired-token",
		account_connections::brokerage::BrokerageError::Unauthorized,
	);
	brokerage.set_positions("healthy-token", vec![]);

	let service = Arc::new(RobinhoodInstitutionService::new(
		brokerage,
		connections.clone(),
		assets.clone(),
		encryption,
		CLIENT_ID.to_owned(),
		DEVICE_TOKEN.to_owned(),
		institution_id(),
	));
	let mut registry = InstitutionRegistry::new();

	registry.register(institution_id(), service);

	let shutdown = ShutdownSignal::new();
	let loop_ = HoldingsSyncLoop::new(
		connections.clone(),
		assets.clone(),
		registry,
		Duration::ZERO,
		Duration::hours(1),
		shutdown.clone(),
	);

	run_one_pass(loop_, shutdown).await;

	let unauthorized_after =
		connections.fetch(unauthorized_user, &institution_id()).await.unwrap().unwrap();
	let healthy_after = connections.fetch(healthy_user, &institution_id()).await.unwrap().unwrap();

	assert!(!unauthorized_after.is_active, "the 401'd connection must be deactivated");
	assert!(healthy_after.is_active, "other connections must be untouched");
	assert_eq!(healthy_after.connection_id, healthy_connection.connection_id);
}
