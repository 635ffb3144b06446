//! Environment-bound configuration, loaded once at process startup.

// self
use crate::_prelude::*;

fn default_log_level() -> String {
	"info".to_owned()
}

fn default_server_prefix() -> String {
	String::new()
}

fn default_asset_update_task_frequency() -> u64 {
	86_400
}

fn default_refresh_tokens_task_frequency() -> u64 {
	86_400
}

/// Process configuration, loaded via [`Config::from_env`].
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
	/// Human-readable application name, used in logs and spans.
	pub application_name: String,
	/// Deployment environment label (e.g. `production`, `staging`).
	pub environment: String,
	/// `tracing-subscriber` filter directive, defaulting to `info`.
	#[serde(default = "default_log_level")]
	pub log_level: String,

	/// Postgres connection string for [`sqlx::PgPool`].
	pub database_url: String,

	/// Host the HTTP server binds to.
	pub server_host: String,
	/// Port the HTTP server binds to.
	pub server_port: u16,
	/// Path prefix prepended to every route, defaulting to empty.
	#[serde(default = "default_server_prefix")]
	pub server_prefix: String,

	/// HMAC secret used to verify inbound bearer JWTs.
	pub json_web_token_secret: String,
	/// JWT signing algorithm name (e.g. `HS256`).
	pub json_web_token_algorithm: String,

	/// OAuth client id issued by Robinhood.
	pub robinhood_client_id: String,
	/// Device token Robinhood expects on every login/refresh call.
	pub robinhood_device_token: String,

	/// Base64-encoded 32-byte AES key used to encrypt credentials and tokens at rest.
	pub encryption_secret_key: String,

	/// Seconds between holdings sync passes.
	#[serde(default = "default_asset_update_task_frequency")]
	pub asset_update_task_frequency: u64,
	/// Seconds between token refresh passes.
	#[serde(default = "default_refresh_tokens_task_frequency")]
	pub refresh_tokens_task_frequency: u64,
}
impl Config {
	/// Loads configuration from process environment variables.
	///
	/// A missing required variable is a fatal startup error; this mirrors the eager validation
	/// the system this crate replaces performed when its settings module was imported.
	pub fn from_env() -> Result<Self, envy::Error> {
		envy::from_env()
	}

	/// Returns the configured holdings sync period as a [`Duration`].
	pub fn asset_update_task_period(&self) -> Duration {
		Duration::seconds(self.asset_update_task_frequency as i64)
	}

	/// Returns the configured token refresh period as a [`Duration`].
	pub fn refresh_tokens_task_period(&self) -> Duration {
		Duration::seconds(self.refresh_tokens_task_frequency as i64)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn periods_convert_seconds_to_duration() {
		let config = Config {
			application_name: "account-connections".into(),
			environment: "test".into(),
			log_level: default_log_level(),
			database_url: "postgres://localhost/test".into(),
			server_host: "0.0.0.0".into(),
			server_port: 8080,
			server_prefix: default_server_prefix(),
			json_web_token_secret: "secret".into(),
			json_web_token_algorithm: "HS256".into(),
			robinhood_client_id: "client".into(),
			robinhood_device_token: "device".into(),
			encryption_secret_key: "a".repeat(44),
			asset_update_task_frequency: 3_600,
			refresh_tokens_task_frequency: 7_200,
		};

		assert_eq!(config.asset_update_task_period(), Duration::seconds(3_600));
		assert_eq!(config.refresh_tokens_task_period(), Duration::seconds(7_200));
	}
}
