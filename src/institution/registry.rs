//! Registry mapping an institution identifier to its [`InstitutionService`].
//!
//! Replaces runtime dispatch by institution name with a typed lookup (design note: polymorphism
//! over institutions).

// self
use crate::{_prelude::*, domain::InstitutionId, error::{Error, Result}, institution::InstitutionService};

/// A registry of every institution this deployment supports.
#[derive(Clone, Default)]
pub struct InstitutionRegistry {
	services: HashMap<InstitutionId, Arc<dyn InstitutionService>>,
}
impl InstitutionRegistry {
	/// Builds an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a service for one institution.
	pub fn register(&mut self, institution_id: InstitutionId, service: Arc<dyn InstitutionService>) {
		self.services.insert(institution_id, service);
	}

	/// Looks up the service for one institution.
	pub fn get(&self, institution_id: &InstitutionId) -> Result<Arc<dyn InstitutionService>> {
		self.services.get(institution_id).cloned().ok_or_else(|| Error::NotFound {
			reason: format!("No institution service registered for `{institution_id}`."),
		})
	}

	/// Iterates over every registered `(institution_id, service)` pair.
	pub fn iter(&self) -> impl Iterator<Item = (&InstitutionId, &Arc<dyn InstitutionService>)> {
		self.services.iter()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::institution::service::{
		InstitutionFuture, LoginCredentials, LoginOutcome, MfaProof, RefreshedTokens,
	};
	use crate::domain::{HoldingsSnapshot, UserId};
	use crate::crypto::Ciphertext;

	struct StubService;
	impl InstitutionService for StubService {
		fn login<'a>(
			&'a self,
			_credentials: LoginCredentials,
			_user_id: UserId,
		) -> InstitutionFuture<'a, LoginOutcome> {
			Box::pin(async {
				Ok(LoginOutcome::Linked {
					holdings: HoldingsSnapshot { holdings: vec![], institution_name: "Stub".into() },
				})
			})
		}

		fn verify_mfa<'a>(
			&'a self,
			_proof: MfaProof,
			_user_id: UserId,
		) -> InstitutionFuture<'a, HoldingsSnapshot> {
			Box::pin(async {
				Ok(HoldingsSnapshot { holdings: vec![], institution_name: "Stub".into() })
			})
		}

		fn get_recent_holdings<'a>(
			&'a self,
			_encrypted_access_token: &'a Ciphertext,
		) -> InstitutionFuture<'a, HoldingsSnapshot> {
			Box::pin(async {
				Ok(HoldingsSnapshot { holdings: vec![], institution_name: "Stub".into() })
			})
		}

		fn refresh_token<'a>(
			&'a self,
			_encrypted_refresh_token: &'a Ciphertext,
		) -> InstitutionFuture<'a, RefreshedTokens> {
			Box::pin(async {
				Ok(RefreshedTokens {
					access_token_ct: Ciphertext::from_raw("a".into()),
					refresh_token_ct: Ciphertext::from_raw("r".into()),
				})
			})
		}
	}

	#[test]
	fn get_returns_not_found_for_unregistered_institution() {
		let registry = InstitutionRegistry::new();
		let institution_id = InstitutionId::new("robinhood").unwrap();

		assert!(matches!(registry.get(&institution_id), Err(Error::NotFound { .. })));
	}

	#[test]
	fn get_returns_the_registered_service() {
		let mut registry = InstitutionRegistry::new();
		let institution_id = InstitutionId::new("robinhood").unwrap();

		registry.register(institution_id.clone(), Arc::new(StubService));

		assert!(registry.get(&institution_id).is_ok());
	}
}
