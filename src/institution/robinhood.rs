//! Robinhood's concrete [`InstitutionService`] implementation.

// self
use crate::{
	_prelude::*,
	brokerage::{BrokerageClient, LoginPayload},
	crypto::{Ciphertext, EncryptionService},
	domain::{
		asset::AssetUpsert, connection::ConnectionUpsert, holdings::RemoteHolding,
		HoldingsSnapshot, InstitutionId, Instrument, UserId,
	},
	error::{Error, Result},
	institution::service::{
		InstitutionFuture, InstitutionService, LoginCredentials, LoginOutcome, MfaProof,
		RefreshedTokens,
	},
	obs::{FlowKind, FlowOutcome, FlowSpan, record_flow_outcome},
	store::{AssetStore, ConnectionStore},
};

const SCOPE: &str = "internal";

/// [`InstitutionService`] for Robinhood, implementing the password + SMS-MFA + optional
/// challenge-handshake login flow and the holdings resolution/caching algorithm.
#[derive(Clone)]
pub struct RobinhoodInstitutionService {
	brokerage: Arc<dyn BrokerageClient>,
	connections: Arc<dyn ConnectionStore>,
	assets: Arc<dyn AssetStore>,
	encryption: EncryptionService,
	client_id: String,
	device_token: String,
	institution_id: InstitutionId,
}
impl RobinhoodInstitutionService {
	/// Builds the service from its collaborators.
	pub fn new(
		brokerage: Arc<dyn BrokerageClient>,
		connections: Arc<dyn ConnectionStore>,
		assets: Arc<dyn AssetStore>,
		encryption: EncryptionService,
		client_id: String,
		device_token: String,
		institution_id: InstitutionId,
	) -> Self {
		Self { brokerage, connections, assets, encryption, client_id, device_token, institution_id }
	}

	fn is_success_body(body: &serde_json::Value) -> bool {
		body.get("access_token").is_some() || body.get("refresh_token").is_some()
	}

	fn is_challenge_body(body: &serde_json::Value) -> bool {
		body.get("challenge").is_some()
	}

	fn extract_token(body: &serde_json::Value, field: &str) -> Result<String> {
		body.get(field)
			.and_then(serde_json::Value::as_str)
			.map(str::to_owned)
			.ok_or_else(|| Error::BadRequest {
				reason: format!("Brokerage login response is missing `{field}`."),
			})
	}

	async fn persist_holdings(
		&self,
		user_id: UserId,
		holdings: &HoldingsSnapshot,
	) -> Result<()> {
		for holding in &holdings.holdings {
			self.assets
				.upsert(AssetUpsert {
					user_id,
					institution_id: self.institution_id.clone(),
					asset_symbol: holding.asset_symbol.clone(),
					name: holding.asset_name.clone(),
					quantity: holding.quantity,
					average_buy_price: holding.average_buy_price,
					position_value: None,
					total_contribution: None,
					is_up_to_date: true,
				})
				.await?;
		}

		Ok(())
	}
}
impl InstitutionService for RobinhoodInstitutionService {
	fn login<'a>(
		&'a self,
		credentials: LoginCredentials,
		user_id: UserId,
	) -> InstitutionFuture<'a, LoginOutcome> {
		Box::pin(async move {
			let span = FlowSpan::new(FlowKind::Login, "login");

			span.instrument(async move {
				record_flow_outcome(FlowKind::Login, FlowOutcome::Attempt);

				let result = self.login_inner(credentials, user_id).await;

				record_flow_outcome(
					FlowKind::Login,
					if result.is_ok() { FlowOutcome::Success } else { FlowOutcome::Failure },
				);

				result
			})
			.await
		})
	}

	fn verify_mfa<'a>(
		&'a self,
		proof: MfaProof,
		user_id: UserId,
	) -> InstitutionFuture<'a, HoldingsSnapshot> {
		Box::pin(async move {
			let span = FlowSpan::new(FlowKind::VerifyMfa, "verify_mfa");

			span.instrument(async move {
				record_flow_outcome(FlowKind::VerifyMfa, FlowOutcome::Attempt);

				let result = self.verify_mfa_inner(proof, user_id).await;

				record_flow_outcome(
					FlowKind::VerifyMfa,
					if result.is_ok() { FlowOutcome::Success } else { FlowOutcome::Failure },
				);

				result
			})
			.await
		})
	}

	fn get_recent_holdings<'a>(
		&'a self,
		encrypted_access_token: &'a Ciphertext,
	) -> InstitutionFuture<'a, HoldingsSnapshot> {
		Box::pin(async move {
			let span = FlowSpan::new(FlowKind::HoldingsSync, "get_recent_holdings");

			span.instrument(async move {
				record_flow_outcome(FlowKind::HoldingsSync, FlowOutcome::Attempt);

				let result = self.get_recent_holdings_inner(encrypted_access_token).await;

				record_flow_outcome(
					FlowKind::HoldingsSync,
					if result.is_ok() { FlowOutcome::Success } else { FlowOutcome::Failure },
				);

				result
			})
			.await
		})
	}

	fn refresh_token<'a>(
		&'a self,
		encrypted_refresh_token: &'a Ciphertext,
	) -> InstitutionFuture<'a, RefreshedTokens> {
		Box::pin(async move {
			let span = FlowSpan::new(FlowKind::TokenRefresh, "refresh_token");

			span.instrument(async move {
				record_flow_outcome(FlowKind::TokenRefresh, FlowOutcome::Attempt);

				let result = self.refresh_token_inner(encrypted_refresh_token).await;

				record_flow_outcome(
					FlowKind::TokenRefresh,
					if result.is_ok() { FlowOutcome::Success } else { FlowOutcome::Failure },
				);

				result
			})
			.await
		})
	}
}

impl RobinhoodInstitutionService {
	async fn login_inner(
		&self,
		credentials: LoginCredentials,
		user_id: UserId,
	) -> Result<LoginOutcome> {
		if let Some(existing) = self.connections.fetch(user_id, &self.institution_id).await? {
			if existing.is_active {
				return Err(Error::AlreadyLinked);
			}
		}

		let payload = LoginPayload::password(
			self.client_id.clone(),
			self.device_token.clone(),
			credentials.username.clone(),
			credentials.password.clone(),
			SCOPE.to_owned(),
		);

		let body = self.brokerage.login(&payload, None).await?;

		let username_ct = self.encryption.encrypt(&credentials.username);
		let password_ct = self.encryption.encrypt(&credentials.password);

		if Self::is_success_body(&body) {
			let access_token = Self::extract_token(&body, "access_token")?;
			let refresh_token = body
				.get("refresh_token")
				.and_then(serde_json::Value::as_str)
				.map(|token| self.encryption.encrypt(token));

			let access_token_ct = self.encryption.encrypt(&access_token);

			self.connections
				.upsert(ConnectionUpsert {
					user_id,
					institution_id: self.institution_id.clone(),
					username_ct: Some(username_ct),
					password_ct: Some(password_ct),
					access_token_ct: Some(access_token_ct.clone()),
					refresh_token_ct: refresh_token,
					is_active: true,
				})
				.await?;

			let holdings = self.get_recent_holdings_inner(&access_token_ct).await?;

			self.persist_holdings(user_id, &holdings).await?;

			return Ok(LoginOutcome::Linked { holdings });
		}

		if Self::is_challenge_body(&body) {
			self.connections
				.upsert(ConnectionUpsert {
					user_id,
					institution_id: self.institution_id.clone(),
					username_ct: Some(username_ct),
					password_ct: Some(password_ct),
					access_token_ct: None,
					refresh_token_ct: None,
					is_active: false,
				})
				.await?;

			return Ok(LoginOutcome::ChallengeRequired(body));
		}

		self.connections
			.upsert(ConnectionUpsert {
				user_id,
				institution_id: self.institution_id.clone(),
				username_ct: Some(username_ct),
				password_ct: Some(password_ct),
				access_token_ct: None,
				refresh_token_ct: None,
				is_active: false,
			})
			.await?;

		Ok(LoginOutcome::MfaRequired(body))
	}

	async fn verify_mfa_inner(
		&self,
		proof: MfaProof,
		user_id: UserId,
	) -> Result<HoldingsSnapshot> {
		let connection = self
			.connections
			.fetch(user_id, &self.institution_id)
			.await?
			.ok_or(Error::NotLinked)?;

		if connection.is_active {
			return Err(Error::AlreadyLinked);
		}

		let username = self.encryption.decrypt(
			connection.username_ct.as_ref().ok_or(Error::NotLinked)?,
		)?;
		let password = self.encryption.decrypt(
			connection.password_ct.as_ref().ok_or(Error::NotLinked)?,
		)?;

		let sms_code = match &proof {
			MfaProof::WithChallenge { sms_code, .. } => sms_code.clone(),
			MfaProof::WithoutChallenge { sms_code } => sms_code.clone(),
		};

		let payload = LoginPayload::password(
			self.client_id.clone(),
			self.device_token.clone(),
			username,
			password,
			SCOPE.to_owned(),
		)
		.with_mfa_code(sms_code.clone());

		let body = match proof {
			MfaProof::WithChallenge { sms_code, challenge_id } => {
				self.brokerage.respond_to_challenge(&sms_code, &challenge_id).await?;
				self.brokerage.login(&payload, Some(&challenge_id)).await?
			},
			MfaProof::WithoutChallenge { .. } => self.brokerage.login(&payload, None).await?,
		};

		let access_token = Self::extract_token(&body, "access_token")?;
		let refresh_token =
			body.get("refresh_token").and_then(serde_json::Value::as_str).map(str::to_owned);

		let access_token_ct = self.encryption.encrypt(&access_token);
		let refresh_token_ct = refresh_token.map(|token| self.encryption.encrypt(&token));

		self.connections
			.upsert(ConnectionUpsert {
				user_id,
				institution_id: self.institution_id.clone(),
				username_ct: connection.username_ct,
				password_ct: connection.password_ct,
				access_token_ct: Some(access_token_ct.clone()),
				refresh_token_ct,
				is_active: true,
			})
			.await?;

		let holdings = self.get_recent_holdings_inner(&access_token_ct).await?;

		self.persist_holdings(user_id, &holdings).await?;

		Ok(holdings)
	}

	async fn get_recent_holdings_inner(
		&self,
		encrypted_access_token: &Ciphertext,
	) -> Result<HoldingsSnapshot> {
		let access_token = self.encryption.decrypt(encrypted_access_token)?;

		let positions = self.brokerage.get_positions(&access_token).await?;

		let mut holdings = Vec::with_capacity(positions.len());

		for position in positions {
			let (symbol, name) = match self.connections.fetch_instrument(&position.instrument_id).await? {
				Some(instrument) => (instrument.symbol, instrument.name),
				None => {
					let symbol = self
						.brokerage
						.get_instrument_by_url(&position.instrument_url, &access_token)
						.await?;
					let name = self.brokerage.get_name_by_symbol(&symbol, &access_token).await?;

					self.connections
						.insert_instrument(Instrument {
							instrument_id: position.instrument_id.clone(),
							name: name.clone(),
							symbol: symbol.clone(),
						})
						.await?;

					(symbol, name)
				},
			};

			holdings.push(RemoteHolding {
				asset_symbol: symbol,
				asset_name: name,
				quantity: position.quantity,
				average_buy_price: Some(position.average_buy_price),
			});
		}

		let institution_name = self
			.connections
			.list_institutions()
			.await?
			.into_iter()
			.find(|institution| institution.institution_id == self.institution_id)
			.map(|institution| institution.name)
			.unwrap_or_else(|| self.institution_id.to_string());

		Ok(HoldingsSnapshot { holdings, institution_name })
	}

	async fn refresh_token_inner(
		&self,
		encrypted_refresh_token: &Ciphertext,
	) -> Result<RefreshedTokens> {
		let refresh_token = self.encryption.decrypt(encrypted_refresh_token)?;

		let payload = LoginPayload::refresh(
			self.client_id.clone(),
			self.device_token.clone(),
			refresh_token,
			SCOPE.to_owned(),
		);

		let body = self.brokerage.login(&payload, None).await?;

		let access_token = Self::extract_token(&body, "access_token")?;
		let refresh_token = Self::extract_token(&body, "refresh_token")?;

		Ok(RefreshedTokens {
			access_token_ct: self.encryption.encrypt(&access_token),
			refresh_token_ct: self.encryption.encrypt(&refresh_token),
		})
	}
}
