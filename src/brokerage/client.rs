//! Typed request/response wrapper around the brokerage HTTP API.

// std
use std::time::Duration as StdDuration;
// self
use crate::{
	_prelude::*,
	brokerage::{
		error::BrokerageError,
		model::{
			LoginPayload, NameEnvelope, PositionRow, PositionsEnvelope, RespondToChallengePayload,
			SymbolEnvelope,
		},
	},
	obs::{FlowKind, FlowOutcome, FlowSpan, record_flow_outcome},
};

/// Future type returned by every [`BrokerageClient`] method.
pub type BrokerageFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, BrokerageError>> + 'a + Send>>;

const CHALLENGE_HEADER: &str = "X-ROBINHOOD-CHALLENGE-RESPONSE-ID";

/// Brokerage API contract. A trait so institution services and sync loops can be exercised
/// against a mock without a live HTTP server.
pub trait BrokerageClient
where
	Self: Send + Sync,
{
	/// Issues `POST /oauth2/token/`, returning the raw response body.
	///
	/// When `challenge_id` is supplied it is attached as the `X-ROBINHOOD-CHALLENGE-RESPONSE-ID`
	/// header.
	fn login<'a>(
		&'a self,
		payload: &'a LoginPayload,
		challenge_id: Option<&'a str>,
	) -> BrokerageFuture<'a, serde_json::Value>;

	/// Issues `POST /challenge/{challenge_id}/respond/`.
	fn respond_to_challenge<'a>(
		&'a self,
		challenge_code: &'a str,
		challenge_id: &'a str,
	) -> BrokerageFuture<'a, ()>;

	/// Issues `GET /positions/?nonzero=true`.
	fn get_positions<'a>(&'a self, access_token: &'a str) -> BrokerageFuture<'a, Vec<PositionRow>>;

	/// Issues `GET` against the instrument's own URL; the URL is decomposed into its path
	/// portion before being re-issued against the configured base URL.
	fn get_instrument_by_url<'a>(
		&'a self,
		instrument_url: &'a str,
		access_token: &'a str,
	) -> BrokerageFuture<'a, String>;

	/// Issues `GET /instruments/?symbol={symbol}`, returning the first result's name.
	fn get_name_by_symbol<'a>(
		&'a self,
		symbol: &'a str,
		access_token: &'a str,
	) -> BrokerageFuture<'a, String>;
}

/// Production [`BrokerageClient`] backed by `reqwest`.
///
/// TLS verification is enabled (default certificate validation via `rustls-tls`); no
/// `danger_accept_invalid_certs` call appears outside test helpers.
#[derive(Clone)]
pub struct ReqwestBrokerageClient {
	http: reqwest::Client,
	base_url: Url,
}
impl ReqwestBrokerageClient {
	/// Builds a client with a 30-second per-call timeout against `base_url`.
	pub fn new(base_url: Url) -> Result<Self, BrokerageError> {
		let http = reqwest::Client::builder()
			.timeout(StdDuration::from_secs(30))
			.build()
			.map_err(BrokerageError::Request)?;

		Ok(Self { http, base_url })
	}

	fn url(&self, path: &str) -> Url {
		self.base_url.join(path).expect("Brokerage path should join onto the configured base URL.")
	}

	async fn parse_body(response: reqwest::Response) -> Result<serde_json::Value, BrokerageError> {
		let status = response.status();
		let body_text = response.text().await.map_err(BrokerageError::Request)?;

		let body: serde_json::Value = match serde_json::from_str(&body_text) {
			Ok(body) => body,
			Err(_) => {
				return Err(BrokerageError::Transport { status: status.as_u16(), body: body_text });
			},
		};

		if status.as_u16() >= 300 {
			if status.as_u16() == 401 {
				return Err(BrokerageError::Unauthorized);
			}
			if body.get("challenge").is_some() {
				return Ok(body);
			}
			if let Some(detail) = body.get("detail").and_then(serde_json::Value::as_str) {
				return Err(BrokerageError::Api {
					status: status.as_u16(),
					detail: detail.to_owned(),
				});
			}

			return Err(BrokerageError::Transport { status: status.as_u16(), body: body_text });
		}

		Ok(body)
	}

	async fn call(&self, span: FlowSpan, fut: impl Future<Output = Result<serde_json::Value, BrokerageError>>) -> Result<serde_json::Value, BrokerageError> {
		record_flow_outcome(FlowKind::BrokerageCall, FlowOutcome::Attempt);

		let result = span.instrument(fut).await;

		record_flow_outcome(
			FlowKind::BrokerageCall,
			if result.is_ok() { FlowOutcome::Success } else { FlowOutcome::Failure },
		);

		result
	}
}
impl BrokerageClient for ReqwestBrokerageClient {
	fn login<'a>(
		&'a self,
		payload: &'a LoginPayload,
		challenge_id: Option<&'a str>,
	) -> BrokerageFuture<'a, serde_json::Value> {
		Box::pin(async move {
			let span = FlowSpan::new(FlowKind::BrokerageCall, "login");

			self.call(span, async {
				let mut request = self.http.post(self.url("oauth2/token/")).json(payload);

				if let Some(challenge_id) = challenge_id {
					request = request.header(CHALLENGE_HEADER, challenge_id);
				}

				let response = request.send().await.map_err(BrokerageError::Request)?;

				Self::parse_body(response).await
			})
			.await
		})
	}

	fn respond_to_challenge<'a>(
		&'a self,
		challenge_code: &'a str,
		challenge_id: &'a str,
	) -> BrokerageFuture<'a, ()> {
		Box::pin(async move {
			let span = FlowSpan::new(FlowKind::BrokerageCall, "respond_to_challenge");

			self.call(span, async {
				let response = self
					.http
					.post(self.url(&format!("challenge/{challenge_id}/respond/")))
					.json(&RespondToChallengePayload { response: challenge_code.to_owned() })
					.send()
					.await
					.map_err(BrokerageError::Request)?;

				Self::parse_body(response).await
			})
			.await?;

			Ok(())
		})
	}

	fn get_positions<'a>(
		&'a self,
		access_token: &'a str,
	) -> BrokerageFuture<'a, Vec<PositionRow>> {
		Box::pin(async move {
			let span = FlowSpan::new(FlowKind::BrokerageCall, "get_positions");

			let body = self
				.call(span, async {
					let response = self
						.http
						.get(self.url("positions/?nonzero=true"))
						.bearer_auth(access_token)
						.send()
						.await
						.map_err(BrokerageError::Request)?;

					Self::parse_body(response).await
				})
				.await?;

			let envelope: PositionsEnvelope = serde_json::from_value(body).map_err(|_| {
				BrokerageError::Transport { status: 200, body: "malformed positions body".into() }
			})?;

			Ok(envelope.results)
		})
	}

	fn get_instrument_by_url<'a>(
		&'a self,
		instrument_url: &'a str,
		access_token: &'a str,
	) -> BrokerageFuture<'a, String> {
		Box::pin(async move {
			let span = FlowSpan::new(FlowKind::BrokerageCall, "get_instrument_by_url");

			let path = Url::parse(instrument_url)
				.map(|url| url.path().trim_start_matches('/').to_owned())
				.unwrap_or_else(|_| instrument_url.trim_start_matches('/').to_owned());

			let body = self
				.call(span, async {
					let response = self
						.http
						.get(self.url(&path))
						.bearer_auth(access_token)
						.send()
						.await
						.map_err(BrokerageError::Request)?;

					Self::parse_body(response).await
				})
				.await?;

			let envelope: SymbolEnvelope = serde_json::from_value(body).map_err(|_| {
				BrokerageError::Transport { status: 200, body: "malformed instrument body".into() }
			})?;

			Ok(envelope.symbol)
		})
	}

	fn get_name_by_symbol<'a>(
		&'a self,
		symbol: &'a str,
		access_token: &'a str,
	) -> BrokerageFuture<'a, String> {
		Box::pin(async move {
			let span = FlowSpan::new(FlowKind::BrokerageCall, "get_name_by_symbol");

			let body = self
				.call(span, async {
					let response = self
						.http
						.get(self.url(&format!("instruments/?symbol={symbol}")))
						.bearer_auth(access_token)
						.send()
						.await
						.map_err(BrokerageError::Request)?;

					Self::parse_body(response).await
				})
				.await?;

			let envelope: NameEnvelope = serde_json::from_value(body).map_err(|_| {
				BrokerageError::Transport { status: 200, body: "malformed instrument name body".into() }
			})?;

			envelope.results.into_iter().next().map(|entry| entry.name).ok_or_else(|| {
				BrokerageError::Transport { status: 200, body: "empty instrument name results".into() }
			})
		})
	}
}
