//! REST boundary driving the interactive portion of the institution service.

pub mod auth;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod routes;

pub use routes::router;

// self
use crate::_prelude::*;

/// State shared by every handler, built once at startup and cloned per request.
#[derive(Clone)]
pub struct AppState {
	/// Connection + institution + instrument persistence.
	pub connections: Arc<dyn crate::store::ConnectionStore>,
	/// Asset persistence, used only by the delete endpoint to cascade.
	pub assets: Arc<dyn crate::store::AssetStore>,
	/// Supported institutions' services.
	pub institutions: crate::institution::InstitutionRegistry,
	/// Secret and algorithm used to verify inbound bearer tokens.
	pub auth: Arc<auth::AuthConfig>,
}
