mod api;
mod dao;
mod model;
mod service;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::api::middleware::timing_middleware;
use crate::api::state::AppState;
use crate::dao::coordinates::CoordinateTable;
use crate::dao::prices::PriceDao;
use crate::model::apperror::{ApplicationError, ErrorType};
use crate::model::config::{ApplicationArguments, DatabaseType, HttpsConfig, LoggingConfig};
use crate::service::chart::PlottersChartRenderer;
use crate::service::prices::PriceService;

use actix_web::middleware::from_fn;
use actix_web::{App, HttpServer, web};
use actix_web_prom::{PrometheusMetrics, PrometheusMetricsBuilder};
use clap::Parser;
use prometheus::IntGauge;
use rustls::pki_types::PrivateKeyDer;
use rustls::{ServerConfig, SupportedProtocolVersion};
use rustls_pemfile::{certs, pkcs8_private_keys};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/**
 * Loads configuration and reference data, then serves the pages until shut down.
 */
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let args = ApplicationArguments::parse();

    let config = get_config(&args.config_file)?;

    init_tracing(&config.logging)?;

    let coordinates = CoordinateTable::load(&config.data.coordinates_file).map_err(|err| std::io::Error::other(format!("Failed to load coordinates: {err}")))?;
    let coordinate_count = coordinates.len();

    let connection_pool: Pool<Sqlite> = match config.clone().database.db_type {
        DatabaseType::Sqlite { connection_string, max_connections, min_connections, acquire_timeout, idle_timeout, max_lifetime } => SqlitePoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_millis(acquire_timeout))
            .idle_timeout(Duration::from_millis(idle_timeout))
            .max_lifetime(Duration::from_millis(max_lifetime))
            .connect(connection_string.as_str())
            .await
            .map_err(|err| std::io::Error::other(format!("Failed to create database pool: {err}")))?,
    };
    let connection_pool = Arc::new(connection_pool);

    let price_service = PriceService::new(PriceDao::new(), connection_pool.as_ref().clone(), Arc::new(PlottersChartRenderer::new()));

    let state = web::Data::new(AppState::new(coordinates, price_service, config.data.dashboard_url.clone()));

    let prometheus = PrometheusMetricsBuilder::new("zip_prices")
        .endpoint("/metrics")
        .mask_unmatched_patterns("UNKNOWN")
        .build()
        .map_err(|err| std::io::Error::other(format!("Failed to create Prometheus metrics: {err}")))?;

    let coordinates_gauge = IntGauge::new("coordinate_entries", "Postal codes with known coordinates").map_err(|err| std::io::Error::other(format!("Failed to create coordinate_entries gauge: {err}")))?;
    let active_connections_gauge = IntGauge::new("active_connections", "Connection pool active").map_err(|err| std::io::Error::other(format!("Failed to create active_connections gauge: {err}")))?;
    let idle_connections_gauge = IntGauge::new("idle_connections", "Connection pool idle").map_err(|err| std::io::Error::other(format!("Failed to create idle_connections gauge: {err}")))?;
    register_prometheus_metrics(&prometheus, &coordinates_gauge)?;
    register_prometheus_metrics(&prometheus, &active_connections_gauge)?;
    register_prometheus_metrics(&prometheus, &idle_connections_gauge)?;
    coordinates_gauge.set(i64::try_from(coordinate_count).unwrap_or(i64::MAX));

    gather_db_metrics(active_connections_gauge, idle_connections_gauge, connection_pool);

    let server_init = HttpServer::new(move || App::new().wrap(prometheus.clone()).wrap(from_fn(timing_middleware)).app_data(state.clone()).configure(api::endpoints::configure));

    let bind_address = config.server.bind_address.as_str();
    let server_init = if let Some(http_port) = config.server.http_port {
        tracing::info!("Listening for HTTP on {}:{}", bind_address, http_port);
        server_init.bind((bind_address, http_port))?
    } else {
        server_init
    };
    let server_init = if let Some(https_config) = &config.server.https_config {
        let ssl_builder = ssl_builder(https_config).map_err(|err| std::io::Error::other(format!("Failed to create SSL/TLS configuration: {err}")))?;
        tracing::info!("Listening for HTTPS on {}:{}", bind_address, https_config.port);
        server_init.bind_rustls_0_23((bind_address, https_config.port), ssl_builder).map_err(|err| std::io::Error::other(format!("Failed to bind HTTPS server: {err}")))?
    } else {
        server_init
    };

    server_init.workers(config.server.workers).run().await
}

/**
 * Initializes the tracing subscriber for the application.
 *
 * #Arguments
 * `logging`: Output flags and extra filter directives. `RUST_LOG` is used as the base filter when set.
 *
 * #Returns
 * A `Result` indicating success or failure.
 */
fn init_tracing(logging: &LoggingConfig) -> Result<(), std::io::Error> {
    let mut env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    for directive in &logging.directives {
        env_filter = env_filter.add_directive(directive.parse().map_err(|err| std::io::Error::other(format!("Invalid logging directive {directive}: {err}")))?);
    }

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(logging.target)
        .with_thread_ids(logging.thread_ids)
        .with_thread_names(logging.thread_names)
        .with_line_number(logging.line_number)
        .with_level(logging.level)
        .with_ansi(logging.ansi)
        .with_file(logging.file);

    tracing_subscriber::registry().with(env_filter).with(fmt_layer).try_init().map_err(|err| std::io::Error::other(format!("Failed to initialize logging: {err}")))?;

    Ok(())
}

/**
 * Registers custom Prometheus metrics.
 *
 * #Arguments
 * `prometheus_metrics`: The Prometheus metrics instance to register the gauge with.
 * `gauge`: The gauge to register.
 */
fn register_prometheus_metrics(prometheus_metrics: &PrometheusMetrics, gauge: &IntGauge) -> Result<(), std::io::Error> {
    prometheus_metrics.registry.register(Box::new(gauge.clone())).map_err(|err| std::io::Error::other(format!("Failed to register Prometheus gauge: {err}")))?;
    Ok(())
}

/**
 * Gathers database metrics in a separate thread.
 *
 * #Arguments
 * `active_connections_gauge`: Gauge for open connections.
 * `idle_connections_gauge`: Gauge for idle connections.
 * `connection_pool`: The connection pool to gather metrics from.
 */
fn gather_db_metrics(active_connections_gauge: IntGauge, idle_connections_gauge: IntGauge, connection_pool: Arc<Pool<Sqlite>>) {
    thread::spawn(move || {
        loop {
            active_connections_gauge.set(i64::from(connection_pool.size()));
            idle_connections_gauge.set(i64::try_from(connection_pool.num_idle()).unwrap_or(i64::MAX));
            thread::sleep(Duration::from_secs(1));
        }
    });
}

/**
 * Initializes the SSL/TLS configuration for the server.
 *
 * #Arguments
 * `https_config`: The HTTPS configuration containing the certificate and private key files.
 *
 * #Returns
 * A `Result` containing the initialized `ServerConfig` or an `ApplicationError` if initialization fails.
 */
fn ssl_builder(https_config: &HttpsConfig) -> Result<ServerConfig, ApplicationError> {
    let config_builder = ServerConfig::builder_with_protocol_versions(&get_protocol_versions());
    let cert_file = &mut std::io::BufReader::new(
        std::fs::File::open(&https_config.certificate_file).map_err(|err| ApplicationError::new(ErrorType::Initialization, format!("Failed to read certificate file: {err}")))?,
    );
    let key_file = &mut std::io::BufReader::new(
        std::fs::File::open(&https_config.private_key_file).map_err(|err| ApplicationError::new(ErrorType::Initialization, format!("Failed to read private key file: {err}")))?,
    );
    let cert_chain = certs(cert_file).collect::<Result<Vec<_>, _>>().map_err(|err| ApplicationError::new(ErrorType::Initialization, format!("Failed to convert certificate to der: {err}")))?;
    let private_key = pkcs8_private_keys(key_file)
        .next()
        .ok_or_else(|| ApplicationError::new(ErrorType::Initialization, "Private key file contains no PKCS#8 key".to_string()))?
        .map(PrivateKeyDer::Pkcs8)
        .map_err(|err| ApplicationError::new(ErrorType::Initialization, format!("Failed to convert private key to der: {err}")))?;
    config_builder
        .with_no_client_auth()
        .with_single_cert(cert_chain, private_key)
        .map_err(|err| ApplicationError::new(ErrorType::Initialization, format!("Failed to create server config: {err}")))
}

/**
 * Returns the supported TLS protocol versions.
 */
fn get_protocol_versions() -> Vec<&'static SupportedProtocolVersion> {
    vec![&rustls::version::TLS13]
}

/**
 * Reads the configuration from the specified file.
 *
 * #Arguments
 * `config_file`: The path to the configuration file.
 *
 * #Returns
 * A `Result` containing the parsed `Config` or an `std::io::Error` if reading or parsing fails.
*/
fn get_config(config_file: &str) -> Result<model::config::Config, std::io::Error> {
    let config_str: String = std::fs::read_to_string(config_file).map_err(|err| std::io::Error::other(format!("Failed to read config file: {err}")))?;
    let config: model::config::Config = toml::from_str(&config_str).map_err(|err| std::io::Error::other(format!("Failed to parse config file: {err}")))?;
    Ok(config)
}
