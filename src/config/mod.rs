// Configuration module entry point
// Loads the config file, applies defaults, and holds shared runtime state

mod state;
mod types;

use std::net::SocketAddr;

// Re-export public types
pub use state::AppState;
pub use types::{
    Config, HealthConfig, HttpConfig, LoggingConfig, PerformanceConfig, ServerConfig,
    StorageConfig,
};

impl Config {
    /// Load configuration from the default "config.toml" location
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from the specified file path (without extension).
    /// Missing file is fine: defaults plus `SHAREBOX_*` environment
    /// overrides still apply.
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(config::Environment::with_prefix("SHAREBOX"))
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("storage.media_root", "media")?
            .set_default("storage.media_url", "/media")?
            .set_default("storage.archive_name", "favorites.zip")?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.show_headers", false)?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .set_default("http.server_name", "sharebox/0.1")?
            .set_default("http.enable_cors", false)?
            .set_default("http.max_body_size", 104_857_600)? // 100MB, media files
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_a_config_file() {
        let cfg = Config::load_from("does-not-exist").unwrap();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.storage.media_root, "media");
        assert_eq!(cfg.storage.media_url, "/media");
        assert_eq!(cfg.storage.archive_name, "favorites.zip");
        assert_eq!(cfg.logging.access_log_format, "combined");
        assert!(cfg.health.enabled);
    }

    #[test]
    fn socket_addr_combines_host_and_port() {
        let cfg = Config::load_from("does-not-exist").unwrap();
        let addr = cfg.get_socket_addr().unwrap();
        assert_eq!(addr.port(), 8080);
    }
}
