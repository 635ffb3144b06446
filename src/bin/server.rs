//! Process entrypoint: wires config, persistence, the brokerage client, and the HTTP boundary,
//! then runs the server alongside the two background sync loops until shutdown.

use std::sync::Arc;

use account_connections::{
	brokerage::ReqwestBrokerageClient,
	config::Config,
	crypto::{EncryptionKey, EncryptionService},
	domain::InstitutionId,
	http::{self, auth::AuthConfig, AppState},
	institution::{InstitutionRegistry, RobinhoodInstitutionService},
	store::{PgAssetStore, PgConnectionStore},
	sync::{HoldingsSyncLoop, ShutdownSignal, TokenRefreshLoop},
};
use sqlx::postgres::PgPoolOptions;
use time::Duration;

const ROBINHOOD_BASE_URL: &str = "https://api.robinhood.com/";
const ROBINHOOD_INSTITUTION_ID: &str = "robinhood";
const HOLDINGS_SYNC_WARMUP: Duration = Duration::hours(12);

#[tokio::main]
async fn main() {
	let config = Config::from_env().unwrap_or_else(|source| {
		eprintln!("Fatal: failed to load configuration: {source}");

		std::process::exit(1);
	});

	tracing_subscriber::fmt()
		.with_env_filter(tracing_subscriber::EnvFilter::new(config.log_level.clone()))
		.init();

	tracing::info!(application = %config.application_name, environment = %config.environment, "Starting.");

	let pool = PgPoolOptions::new()
		.connect(&config.database_url)
		.await
		.unwrap_or_else(|source| {
			tracing::error!(error = %source, "Failed to connect to the database.");

			std::process::exit(1);
		});

	let encryption_key =
		EncryptionKey::from_base64(&config.encryption_secret_key).unwrap_or_else(|source| {
			tracing::error!(error = %source, "Invalid encryption key configuration.");

			std::process::exit(1);
		});
	let encryption = EncryptionService::new(encryption_key);

	let auth_config = AuthConfig::from_config(&config).unwrap_or_else(|source| {
		tracing::error!(error = %source, "Invalid JWT configuration.");

		std::process::exit(1);
	});

	let connections: Arc<dyn account_connections::store::ConnectionStore> =
		Arc::new(PgConnectionStore::new(pool.clone()));
	let assets: Arc<dyn account_connections::store::AssetStore> =
		Arc::new(PgAssetStore::new(pool.clone()));

	let robinhood_base_url =
		url::Url::parse(ROBINHOOD_BASE_URL).expect("Robinhood base URL is a fixed valid constant.");
	let brokerage = Arc::new(
		ReqwestBrokerageClient::new(robinhood_base_url).unwrap_or_else(|source| {
			tracing::error!(error = %source, "Failed to build the brokerage HTTP client.");

			std::process::exit(1);
		}),
	);

	let robinhood_institution_id = InstitutionId::new(ROBINHOOD_INSTITUTION_ID)
		.expect("Robinhood institution id is a fixed valid constant.");

	let robinhood_service = Arc::new(RobinhoodInstitutionService::new(
		brokerage,
		connections.clone(),
		assets.clone(),
		encryption,
		config.robinhood_client_id.clone(),
		config.robinhood_device_token.clone(),
		robinhood_institution_id.clone(),
	));

	let mut registry = InstitutionRegistry::new();

	registry.register(robinhood_institution_id, robinhood_service);

	let shutdown = ShutdownSignal::new();

	let holdings_loop = HoldingsSyncLoop::new(
		connections.clone(),
		assets.clone(),
		registry.clone(),
		HOLDINGS_SYNC_WARMUP,
		config.asset_update_task_period(),
		shutdown.clone(),
	);
	let refresh_loop = TokenRefreshLoop::new(
		connections.clone(),
		registry.clone(),
		config.refresh_tokens_task_period(),
		shutdown.clone(),
	);

	let holdings_task = tokio::spawn(async move { holdings_loop.run().await });
	let refresh_task = tokio::spawn(async move { refresh_loop.run().await });

	let state =
		AppState { connections, assets, institutions: registry, auth: Arc::new(auth_config) };
	let app = http::router(state);

	let address = format!("{}:{}", config.server_host, config.server_port);
	let listener = tokio::net::TcpListener::bind(address.as_str()).await.unwrap_or_else(|source| {
		tracing::error!(error = %source, address, "Failed to bind the HTTP listener.");

		std::process::exit(1);
	});

	tracing::info!(address, "Listening.");

	let server_shutdown = shutdown.clone();
	let serve_result = axum::serve(listener, app)
		.with_graceful_shutdown(async move {
			let _ = tokio::signal::ctrl_c().await;

			tracing::info!("Shutdown signal received.");

			server_shutdown.shutdown();
		})
		.await;

	if let Err(source) = serve_result {
		tracing::error!(error = %source, "HTTP server exited with an error.");
	}

	shutdown.shutdown();

	let _ = tokio::join!(holdings_task, refresh_task);
}
