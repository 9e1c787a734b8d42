use clap::{Parser, command};
use serde::{Deserialize, Serialize};

/**
 * Command-line arguments for the application.
 */
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct ApplicationArguments {
    /**
     * Path to the configuration file.
     */
    #[arg(short, long)]
    pub config_file: String,
}

/**
 * Represents the configuration for the application.
 */
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /**
     * Logging configuration for the application.
     */
    pub logging: LoggingConfig,
    /**
     * Server configuration for the application.
     */
    pub server: Server,
    /**
     * Database configuration for the application.
     */
    pub database: Database,
    /**
     * Reference data and external links.
     */
    pub data: DataConfig,
}

#[allow(clippy::struct_excessive_bools)]
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /**
     * Whether to log the target of the log message.
     */
    pub target: bool,
    /**
     * Whether to log thread IDs .
     */
    pub thread_ids: bool,
    /**
     * Whether to log thread names.
     */
    pub thread_names: bool,
    /**
     * Whether to log line numbers.
     */
    pub line_number: bool,
    /**
     * Whether to log the log level.
     */
    pub level: bool,
    /**
     * Whether to use ANSI colors in logs.
     */
    pub ansi: bool,
    /**
     * Whether to log the source file.
     */
    pub file: bool,
    /**
     * Additional directives for logging configuration, e.g. `sqlx=warn`.
     */
    pub directives: Vec<String>,
}

impl LoggingConfig {
    #[allow(dead_code)]
    pub fn default() -> Self {
        LoggingConfig { target: true, thread_ids: true, thread_names: true, line_number: true, level: true, ansi: true, file: true, directives: vec![] }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Database {
    /**
     * Type of the database.
     */
    pub db_type: DatabaseType,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DatabaseType {
    /**
     * `SQLite` database file holding one price table per unit type. Timeouts are in milliseconds.
     */
    #[serde(rename_all = "camelCase")]
    Sqlite { connection_string: String, max_connections: u32, min_connections: u32, acquire_timeout: u64, idle_timeout: u64, max_lifetime: u64 },
}

/**
 * Represents the server configuration for the application.
 */
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Server {
    /**
     * Number of worker threads for the server.
     */
    pub workers: usize,
    /**
     * Address the listeners bind to.
     */
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /**
     * HTTP port for the server.
     */
    pub http_port: Option<u16>,
    /**
     * HTTPS configuration for the server.
     */
    pub https_config: Option<HttpsConfig>,
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

/**
 * Represents the HTTPS configuration for the server.
 */
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpsConfig {
    /**
     * Port for the HTTPS server.
     */
    pub port: u16,
    /**
     * Path to the certificate file.
     */
    pub certificate_file: String,
    /**
     * Path to the private key file.
     */
    pub private_key_file: String,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataConfig {
    /**
     * CSV file with `zip`, `lat` and `lng` columns.
     */
    pub coordinates_file: String,
    /**
     * Hosted dashboard for browsing prices by room type and region.
     */
    pub dashboard_url: String,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_config_serialization() {
        let config = Config {
            logging: LoggingConfig::default(),
            database: Database {
                db_type: DatabaseType::Sqlite { connection_string: "sqlite://zip_c.db".to_string(), max_connections: 5, min_connections: 1, acquire_timeout: 30, idle_timeout: 300, max_lifetime: 3600 },
            },
            server: Server { workers: 4, bind_address: "0.0.0.0".to_string(), http_port: Some(8080), https_config: None },
            data: DataConfig { coordinates_file: "./data/uszips.csv".to_string(), dashboard_url: "https://example.org/dashboard".to_string() },
        };
        let serialized = toml::to_string(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(config.logging.target, deserialized.logging.target);
        assert_eq!(config.logging.thread_ids, deserialized.logging.thread_ids);
        assert_eq!(config.logging.line_number, deserialized.logging.line_number);
        assert_eq!(config.logging.level, deserialized.logging.level);
        assert_eq!(config.logging.ansi, deserialized.logging.ansi);
        assert_eq!(config.logging.file, deserialized.logging.file);
        assert_eq!(config.logging.directives, deserialized.logging.directives);
        assert_eq!(config.server.workers, deserialized.server.workers);
        assert_eq!(config.server.bind_address, deserialized.server.bind_address);
        assert_eq!(config.server.http_port, deserialized.server.http_port);
        assert!(deserialized.server.https_config.is_none());
        assert_eq!(config.data.coordinates_file, deserialized.data.coordinates_file);
        assert_eq!(config.data.dashboard_url, deserialized.data.dashboard_url);
        let DatabaseType::Sqlite { connection_string, max_connections, .. } = deserialized.database.db_type;
        assert_eq!(connection_string, "sqlite://zip_c.db");
        assert_eq!(max_connections, 5);
    }

    #[test]
    fn test_sample_config_parses() {
        let config: Config = toml::from_str(include_str!("../../config/config.toml")).unwrap();
        assert_eq!(config.server.bind_address, "127.0.0.1");
        assert_eq!(config.server.http_port, Some(8080));
        assert_eq!(config.data.coordinates_file, "./data/uszips.csv");
    }
}
