//! Orchestrates login, MFA verification, holdings fetch, and token refresh for one institution.

pub mod registry;
pub mod robinhood;
pub mod service;

pub use registry::InstitutionRegistry;
pub use robinhood::RobinhoodInstitutionService;
pub use service::{
	InstitutionFuture, InstitutionService, LoginCredentials, LoginOutcome, MfaProof,
	RefreshedTokens,
};
