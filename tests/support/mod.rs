//! Shared test doubles for the integration suite.

// std
use std::collections::{HashMap, VecDeque};
// lib
use account_connections::brokerage::{BrokerageClient, BrokerageError, BrokerageFuture, PositionRow};
use parking_lot::Mutex;

/// One recorded call against a [`FakeBrokerageClient`], kept for order-sensitive assertions.
#[derive(Clone, Debug, PartialEq)]
pub enum RecordedCall {
	Login { challenge_id: Option<String>, mfa_code: Option<String> },
	RespondToChallenge { challenge_code: String, challenge_id: String },
	GetPositions,
	GetInstrumentByUrl(String),
	GetNameBySymbol(String),
}

/// A cloneable stand-in for a `get_positions` outcome. `BrokerageError` itself is not `Clone`
/// (it wraps `reqwest::Error`), so a fixture can be replayed across multiple sync passes.
#[derive(Clone)]
enum PositionsFixture {
	Ok(Vec<PositionRow>),
	Unauthorized,
}

/// An in-memory stand-in for a brokerage's HTTP API, driven entirely by canned responses.
///
/// `login` responses are consumed in FIFO order so a test can script a login attempt followed
/// by a later MFA-verification attempt; positions and instrument lookups are keyed by the
/// access token or url/symbol a real client would key them by.
#[derive(Default)]
pub struct FakeBrokerageClient {
	login_responses: Mutex<VecDeque<Result<serde_json::Value, BrokerageError>>>,
	challenge_responses: Mutex<VecDeque<Result<(), BrokerageError>>>,
	positions_by_token: Mutex<HashMap<String, PositionsFixture>>,
	symbol_by_instrument_url: Mutex<HashMap<String, String>>,
	name_by_symbol: Mutex<HashMap<String, String>>,
	calls: Mutex<Vec<RecordedCall>>,
}
impl FakeBrokerageClient {
	/// Builds a client with no canned responses configured.
	pub fn new() -> Self {
		Self::default()
	}

	/// Queues the next `login()` response, in call order.
	pub fn push_login_response(&self, body: serde_json::Value) {
		self.login_responses.lock().push_back(Ok(body));
	}

	/// Queues the next `login()` failure, in call order.
	pub fn push_login_error(&self, error: BrokerageError) {
		self.login_responses.lock().push_back(Err(error));
	}

	/// Queues the next `respond_to_challenge()` outcome, in call order.
	pub fn push_challenge_response(&self, outcome: Result<(), BrokerageError>) {
		self.challenge_responses.lock().push_back(outcome);
	}

	/// Configures `get_positions(access_token)` to return `positions`.
	pub fn set_positions(&self, access_token: impl Into<String>, positions: Vec<PositionRow>) {
		self.positions_by_token.lock().insert(access_token.into(), PositionsFixture::Ok(positions));
	}

	/// Configures `get_positions(access_token)` to fail. Only [`BrokerageError::Unauthorized`]
	/// is supported, since that is the one variant the sync loops branch on.
	pub fn set_positions_error(&self, access_token: impl Into<String>, error: BrokerageError) {
		assert!(
			matches!(error, BrokerageError::Unauthorized),
			"FakeBrokerageClient only supports Unauthorized position fixtures, got {error:?}"
		);

		self.positions_by_token.lock().insert(access_token.into(), PositionsFixture::Unauthorized);
	}

	/// Configures `get_instrument_by_url(instrument_url, ..)` to resolve to `symbol`.
	pub fn set_instrument_symbol(&self, instrument_url: impl Into<String>, symbol: impl Into<String>) {
		self.symbol_by_instrument_url.lock().insert(instrument_url.into(), symbol.into());
	}

	/// Configures `get_name_by_symbol(symbol, ..)` to resolve to `name`.
	pub fn set_instrument_name(&self, symbol: impl Into<String>, name: impl Into<String>) {
		self.name_by_symbol.lock().insert(symbol.into(), name.into());
	}

	/// Returns every call recorded so far, in order.
	pub fn calls(&self) -> Vec<RecordedCall> {
		self.calls.lock().clone()
	}
}
impl BrokerageClient for FakeBrokerageClient {
	fn login<'a>(
		&'a self,
		payload: &'a account_connections::brokerage::LoginPayload,
		challenge_id: Option<&'a str>,
	) -> BrokerageFuture<'a, serde_json::Value> {
		Box::pin(async move {
			self.calls.lock().push(RecordedCall::Login {
				challenge_id: challenge_id.map(str::to_owned),
				mfa_code: payload.mfa_code.clone(),
			});

			self.login_responses.lock().pop_front().unwrap_or_else(|| {
				Err(BrokerageError::Transport {
					status: 500,
					body: "no canned login response queued".into(),
				})
			})
		})
	}

	fn respond_to_challenge<'a>(
		&'a self,
		challenge_code: &'a str,
		challenge_id: &'a str,
	) -> BrokerageFuture<'a, ()> {
		Box::pin(async move {
			self.calls.lock().push(RecordedCall::RespondToChallenge {
				challenge_code: challenge_code.to_owned(),
				challenge_id: challenge_id.to_owned(),
			});

			self.challenge_responses.lock().pop_front().unwrap_or(Ok(()))
		})
	}

	fn get_positions<'a>(&'a self, access_token: &'a str) -> BrokerageFuture<'a, Vec<PositionRow>> {
		Box::pin(async move {
			self.calls.lock().push(RecordedCall::GetPositions);

			match self.positions_by_token.lock().get(access_token).cloned() {
				Some(PositionsFixture::Ok(rows)) => Ok(rows),
				Some(PositionsFixture::Unauthorized) => Err(BrokerageError::Unauthorized),
				None => Ok(Vec::new()),
			}
		})
	}

	fn get_instrument_by_url<'a>(
		&'a self,
		instrument_url: &'a str,
		_access_token: &'a str,
	) -> BrokerageFuture<'a, String> {
		Box::pin(async move {
			self.calls.lock().push(RecordedCall::GetInstrumentByUrl(instrument_url.to_owned()));

			self.symbol_by_instrument_url
				.lock()
				.get(instrument_url)
				.cloned()
				.ok_or_else(|| BrokerageError::Transport {
					status: 404,
					body: format!("no canned symbol for `{instrument_url}`"),
				})
		})
	}

	fn get_name_by_symbol<'a>(
		&'a self,
		symbol: &'a str,
		_access_token: &'a str,
	) -> BrokerageFuture<'a, String> {
		Box::pin(async move {
			self.calls.lock().push(RecordedCall::GetNameBySymbol(symbol.to_owned()));

			self.name_by_symbol.lock().get(symbol).cloned().ok_or_else(|| {
				BrokerageError::Transport { status: 404, body: format!("no canned name for `{symbol}`") }
			})
		})
	}
}

/// Builds a deterministic 32-byte encryption key for tests.
pub fn test_encryption() -> account_connections::crypto::EncryptionService {
	use base64::Engine;

	let key_b64 = base64::engine::general_purpose::STANDARD.encode([9_u8; 32]);
	let key = account_connections::crypto::EncryptionKey::from_base64(&key_b64)
		.expect("Fixture key should parse.");

	account_connections::crypto::EncryptionService::new(key)
}
