//! Handler functions for the REST endpoints.

// lib
use axum::{extract::Path, extract::State, http::StatusCode, Json};
// self
use crate::{
	domain::{
		asset::AssetDeleteTarget,
		connection::{ConnectionFilter, ListOptions},
		InstitutionId,
	},
	error::{Error, Result},
	http::{
		auth::AuthUser,
		dto::{
			LoginRequest, SuccessfulConnectionResponse, SupportedInstitutionsRecords,
			SupportedInstitutionsResponse, UserActiveConnectionsRecords,
			UserActiveConnectionsResponse, VerifyMfaRequest,
		},
		AppState,
	},
	institution::{LoginCredentials, LoginOutcome, MfaProof},
};

/// `GET /institutions`
pub async fn list_institutions(
	State(state): State<AppState>,
) -> Result<Json<SupportedInstitutionsResponse>> {
	let institutions = state.connections.list_institutions().await?;

	Ok(Json(SupportedInstitutionsResponse {
		records: SupportedInstitutionsRecords {
			supported_institutions: institutions.into_iter().map(Into::into).collect(),
		},
	}))
}

/// `GET /institutions/connections`
pub async fn list_connections(
	State(state): State<AppState>,
	auth: AuthUser,
) -> Result<Json<UserActiveConnectionsResponse>> {
	let filter = ConnectionFilter { user_id: Some(auth.user_id), ..Default::default() };
	let connections = state.connections.list(&filter, ListOptions::default()).await?;

	Ok(Json(UserActiveConnectionsResponse {
		records: UserActiveConnectionsRecords {
			active_connections: connections.into_iter().map(Into::into).collect(),
		},
	}))
}

/// `DELETE /institutions/{institution_id}`
pub async fn delete_connection(
	State(state): State<AppState>,
	auth: AuthUser,
	Path(institution_id): Path<InstitutionId>,
) -> Result<StatusCode> {
	if state.connections.fetch(auth.user_id, &institution_id).await?.is_none() {
		return Err(Error::NotFound {
			reason: format!("No connection to `{institution_id}` for this user."),
		});
	}

	state
		.assets
		.delete(AssetDeleteTarget::ByConnection {
			user_id: auth.user_id,
			institution_id: institution_id.clone(),
		})
		.await?;
	state.connections.delete(auth.user_id, &institution_id).await?;

	Ok(StatusCode::OK)
}

/// `POST /institutions/login/{institution_id}`
pub async fn login(
	State(state): State<AppState>,
	auth: AuthUser,
	Path(institution_id): Path<InstitutionId>,
	Json(body): Json<LoginRequest>,
) -> Result<Json<serde_json::Value>> {
	let service = state.institutions.get(&institution_id)?;
	let credentials = LoginCredentials { username: body.username, password: body.password };

	let outcome = service.login(credentials, auth.user_id).await?;

	let value = match outcome {
		LoginOutcome::Linked { .. } => {
			serde_json::to_value(SuccessfulConnectionResponse::now())
				.expect("SuccessfulConnectionResponse always serializes.")
		},
		LoginOutcome::ChallengeRequired(body) | LoginOutcome::MfaRequired(body) => body,
	};

	Ok(Json(value))
}

/// Resolves the request body into exactly one [`MfaProof`] variant, rejecting zero or two.
fn resolve_mfa_proof(body: VerifyMfaRequest) -> Result<MfaProof> {
	match (body.with_challenge, body.without_challenge) {
		(Some(with_challenge), None) => Ok(MfaProof::WithChallenge {
			sms_code: with_challenge.sms_code,
			challenge_id: with_challenge.challenge_id,
		}),
		(None, Some(without_challenge)) => {
			Ok(MfaProof::WithoutChallenge { sms_code: without_challenge.sms_code })
		},
		(None, None) => Err(Error::BadRequest {
			reason: "Exactly one of `with_challenge` or `without_challenge` is required."
				.to_owned(),
		}),
		(Some(_), Some(_)) => Err(Error::BadRequest {
			reason: "Only one of `with_challenge` or `without_challenge` may be set.".to_owned(),
		}),
	}
}

/// `POST /institutions/login/{institution_id}/verify`
pub async fn verify_mfa(
	State(state): State<AppState>,
	auth: AuthUser,
	Path(institution_id): Path<InstitutionId>,
	Json(body): Json<VerifyMfaRequest>,
) -> Result<(StatusCode, Json<SuccessfulConnectionResponse>)> {
	let proof = resolve_mfa_proof(body)?;
	let service = state.institutions.get(&institution_id)?;

	service.verify_mfa(proof, auth.user_id).await?;

	Ok((StatusCode::CREATED, Json(SuccessfulConnectionResponse::now())))
}
