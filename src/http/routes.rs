//! Router assembly for the REST boundary.

// lib
use axum::{
	routing::{delete, get, post},
	Router,
};
use tower_http::trace::TraceLayer;
// self
use crate::http::{handlers, AppState};

/// Builds the full router, wrapped in a request-tracing layer.
pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/institutions", get(handlers::list_institutions))
		.route("/institutions/connections", get(handlers::list_connections))
		.route("/institutions/{institution_id}", delete(handlers::delete_connection))
		.route("/institutions/login/{institution_id}", post(handlers::login))
		.route("/institutions/login/{institution_id}/verify", post(handlers::verify_mfa))
		.layer(TraceLayer::new_for_http())
		.with_state(state)
}
