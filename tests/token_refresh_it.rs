//! Integration coverage for the token refresh loop.

mod support;

// std
use std::{sync::Arc, time::Duration as StdDuration};
// lib
use account_connections::{
	domain::{connection::ConnectionUpsert, Institution, InstitutionId, UserId},
	institution::{InstitutionRegistry, RobinhoodInstitutionService},
	store::{ConnectionStore, MemoryAssetStore, MemoryConnectionStore},
	sync::{ShutdownSignal, TokenRefreshLoop},
};
use serde_json::json;
use support::{test_encryption, FakeBrokerageClient};
use time::{Duration, OffsetDateTime};

const CLIENT_ID: &str = "client-id";
const DEVICE_TOKEN: &str = "device-token";

fn institution_id() -> InstitutionId {
	InstitutionId::new("robinhood").expect("Fixture institution id should be valid.")
}

#[tokio::test]
async fn refresh_loop_persists_both_rotated_tokens_encrypted() {
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
	let old_access_ct = encryption.encrypt("old-access");
	let old_refresh_ct = encryption.encrypt("old-refresh");

	connections
		.upsert(ConnectionUpsert {
			user_id,
			institution_id: institution_id(),
			username_ct: None,
			password_ct: None,
			access_token_ct: Some(old_access_ct),
			refresh_token_ct: Some(old_refresh_ct),
			is_active: true,
		})
		.await
		.unwrap();

	brokerage.push_login_response(json!({
		"access_token": "new-access",
		"refresh_token": "new-refresh",
	}));

	let service = Arc::new(RobinhoodInstitutionService::new(
		brokerage.clone(),
		connections.clone(),
		assets,
		encryption.clone(),
		CLIENT_ID.to_owned(),
		DEVICE_TOKEN.to_owned(),
		institution_id(),
	));
	let mut registry = InstitutionRegistry::new();

	registry.register(institution_id(), service);

	let shutdown = ShutdownSignal::new();
	let loop_ = TokenRefreshLoop::new(
		connections.clone(),
		registry,
		Duration::hours(1),
		shutdown.clone(),
	);

	let handle = tokio::spawn(async move { loop_.run().await });

	tokio::time::sleep(StdDuration::from_millis(100)).await;
	shutdown.shutdown();
	handle.await.expect("The refresh loop task should not panic.");

	let refreshed = connections.fetch(user_id, &institution_id()).await.unwrap().unwrap();

	assert!(refreshed.is_active);
	assert_eq!(
		encryption.decrypt(refreshed.access_token_ct.as_ref().unwrap()).unwrap(),
		"new-access"
	);
	assert_eq!(
		encryption.decrypt(refreshed.refresh_token_ct.as_ref().unwrap()).unwrap(),
		"new-refresh"
	);

	assert!(
		brokerage.calls().iter().any(|call| matches!(
			call,
			support::RecordedCall::Login { .. }
		)),
		"the brokerage should have been asked to refresh the token"
	);
}
