//! Integration coverage for the login, challenge, and MFA-verification flows.

mod support;

// std
use std::sync::Arc;
// lib
use account_connections::{
	brokerage::PositionRow,
	domain::{HoldingsSnapshot, InstitutionId, Institution, RemoteHolding, UserId},
	institution::{InstitutionService, LoginCredentials, LoginOutcome, MfaProof, RobinhoodInstitutionService},
	store::{AssetStore, ConnectionStore, MemoryAssetStore, MemoryConnectionStore},
};
use rust_decimal::Decimal;
use serde_json::json;
use support::{test_encryption, FakeBrokerageClient, RecordedCall};
use time::OffsetDateTime;

const CLIENT_ID: &str = "client-id";
const DEVICE_TOKEN: &str = "device-token";

fn institution_id() -> InstitutionId {
	InstitutionId::new("robinhood").expect("Fixture institution id should be valid.")
}

fn seeded_connections() -> Arc<MemoryConnectionStore> {
	let store = Arc::new(MemoryConnectionStore::new());

	store.seed_institution(Institution {
		institution_id: institution_id(),
		name: "Robinhood".into(),
		created_at: OffsetDateTime::now_utc(),
		updated_at: OffsetDateTime::now_utc(),
	});

	store
}

fn build_service(
	brokerage: Arc<FakeBrokerageClient>,
	connections: Arc<MemoryConnectionStore>,
	assets: Arc<MemoryAssetStore>,
) -> RobinhoodInstitutionService {
	RobinhoodInstitutionService::new(
		brokerage,
		connections,
		assets,
		test_encryption(),
		CLIENT_ID.to_owned(),
		DEVICE_TOKEN.to_owned(),
		institution_id(),
	)
}

#[tokio::test]
async fn no_mfa_login_links_connection_and_caches_holdings() {
	let brokerage = Arc::new(FakeBrokerageClient::new());
	let connections = seeded_connections();
	let assets = Arc::new(MemoryAssetStore::new());
	let encryption = test_encryption();
	let service =
		build_service(brokerage.clone(), connections.clone(), assets.clone());
	let user_id = UserId::new(1);

	brokerage.push_login_response(json!({
		"access_token": "A",
		"refresh_token": "R",
		"expires_in": 100_000,
		"token_type": "bearer",
		"scope": "s",
	}));
	brokerage.set_positions(
		"A",
		vec![PositionRow {
			instrument_id: "i1".into(),
			instrument_url: "https://api.robinhood.com/instruments/i1/".into(),
			average_buy_price: "10.0".parse::<Decimal>().unwrap(),
			quantity: "1.0".parse::<Decimal>().unwrap(),
		}],
	);
	brokerage.set_instrument_symbol("https://api.robinhood.com/instruments/i1/", "TSLA");
	brokerage.set_instrument_name("TSLA", "Tesla");

	let credentials =
		LoginCredentials { username: "user".to_owned(), password: "pass".to_owned() };

	let outcome =
		service.login(credentials, user_id).await.expect("No-MFA login should succeed.");

	let LoginOutcome::Linked { holdings } = outcome else {
		panic!("Expected a Linked outcome, got {outcome:?}");
	};

	assert_eq!(
		holdings,
		HoldingsSnapshot {
			holdings: vec![RemoteHolding {
				asset_symbol: "TSLA".into(),
				asset_name: "Tesla".into(),
				quantity: "1.0".parse().unwrap(),
				average_buy_price: Some("10.0".parse().unwrap()),
			}],
			institution_name: "Robinhood".into(),
		}
	);

	let connection = connections
		.fetch(user_id, &institution_id())
		.await
		.unwrap()
		.expect("Connection should have been created.");

	assert!(connection.is_active);
	assert_eq!(
		encryption.decrypt(connection.access_token_ct.as_ref().unwrap()).unwrap(),
		"A"
	);
	assert_eq!(
		encryption.decrypt(connection.refresh_token_ct.as_ref().unwrap()).unwrap(),
		"R"
	);
	assert_eq!(encryption.decrypt(connection.username_ct.as_ref().unwrap()).unwrap(), "user");
	assert_eq!(encryption.decrypt(connection.password_ct.as_ref().unwrap()).unwrap(), "pass");

	let tracked = assets.list_by_connection(user_id, &institution_id()).await.unwrap();

	assert_eq!(tracked.len(), 1);
	assert_eq!(tracked[0].asset_symbol, "TSLA");
	assert_eq!(tracked[0].name, "Tesla");
	assert_eq!(tracked[0].quantity, "1.0".parse::<Decimal>().unwrap());

	let instrument = connections.fetch_instrument("i1").await.unwrap().expect("Instrument should be cached.");

	assert_eq!(instrument.symbol, "TSLA");
	assert_eq!(instrument.name, "Tesla");
}

#[tokio::test]
async fn challenge_then_mfa_verify_links_connection() {
	let brokerage = Arc::new(FakeBrokerageClient::new());
	let connections = seeded_connections();
	let assets = Arc::new(MemoryAssetStore::new());
	let service =
		build_service(brokerage.clone(), connections.clone(), assets.clone());
	let user_id = UserId::new(7);

	brokerage.push_login_response(json!({ "challenge": { "id": "ch1" } }));

	let credentials =
		LoginCredentials { username: "user".to_owned(), password: "pass".to_owned() };
	let outcome = service
		.login(credentials, user_id)
		.await
		.expect("A challenge response is not an error.");

	match outcome {
		LoginOutcome::ChallengeRequired(body) => {
			assert_eq!(body["challenge"]["id"], "ch1");
		},
		other => panic!("Expected ChallengeRequired, got {other:?}"),
	}

	let connection = connections
		.fetch(user_id, &institution_id())
		.await
		.unwrap()
		.expect("An inactive connection should have been stored pending MFA.");

	assert!(!connection.is_active);
	assert!(connection.access_token_ct.is_none());

	brokerage.push_challenge_response(Ok(()));
	brokerage.push_login_response(json!({
		"access_token": "A2",
		"refresh_token": "R2",
	}));
	brokerage.set_positions("A2", vec![]);

	let holdings = service
		.verify_mfa(
			MfaProof::WithChallenge { sms_code: "471690".into(), challenge_id: "ch1".into() },
			user_id,
		)
		.await
		.expect("MFA verification should succeed.");

	assert!(holdings.holdings.is_empty());

	let calls = brokerage.calls();
	let challenge_index = calls
		.iter()
		.position(|call| {
			matches!(
				call,
				RecordedCall::RespondToChallenge { challenge_code, challenge_id }
					if challenge_code == "471690" && challenge_id == "ch1"
			)
		})
		.expect("respond_to_challenge should have been called.");
	let second_login_index = calls
		.iter()
		.position(|call| {
			matches!(
				call,
				RecordedCall::Login { challenge_id: Some(id), mfa_code: Some(code) }
					if id == "ch1" && code == "471690"
			)
		})
		.expect("The MFA login call should carry the challenge id and sms code.");

	assert!(
		challenge_index < second_login_index,
		"respond_to_challenge must precede the MFA-carrying login call"
	);

	let connection = connections
		.fetch(user_id, &institution_id())
		.await
		.unwrap()
		.expect("Connection should still exist.");

	assert!(connection.is_active);
}

#[tokio::test]
async fn verify_mfa_without_a_prior_login_is_not_linked() {
	let brokerage = Arc::new(FakeBrokerageClient::new());
	let connections = seeded_connections();
	let assets = Arc::new(MemoryAssetStore::new());
	let service = build_service(brokerage, connections, assets);

	let result = service
		.verify_mfa(MfaProof::WithoutChallenge { sms_code: "000000".into() }, UserId::new(99))
		.await;

	assert!(matches!(result, Err(account_connections::error::Error::NotLinked)));
}
