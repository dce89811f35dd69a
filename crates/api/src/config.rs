use std::path::PathBuf;
use std::time::Duration;

use zkpret_core::tools::ExecutorConfig;

/// Extra headroom the HTTP timeout gets over the tool timeout, so the
/// synchronous path reports its own `Timeout` instead of a bare 408.
const REQUEST_TIMEOUT_HEADROOM_SECS: u64 = 60;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} must be {expected}, got '{value}'")]
    Invalid {
        key: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3001`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: tool timeout + 60s).
    pub request_timeout_secs: u64,
    /// How long shutdown waits for running jobs (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Whether asynchronous job submission is accepted (default: `true`).
    pub async_jobs_enabled: bool,
    /// Toolchain location and invocation settings.
    pub executor: ExecutorConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default                     |
    /// |----------------------------|-----------------------------|
    /// | `HOST`                     | `0.0.0.0`                   |
    /// | `PORT`                     | `3001`                      |
    /// | `CORS_ORIGINS`             | `http://localhost:3000`     |
    /// | `REQUEST_TIMEOUT_SECS`     | tool timeout + 60           |
    /// | `SHUTDOWN_TIMEOUT_SECS`    | `30`                        |
    /// | `ENABLE_ASYNC_JOBS`        | `true`                      |
    /// | `ZK_PRET_STDIO_PATH`       | `./zk-pret`                 |
    /// | `ZK_PRET_STDIO_BUILD_PATH` | `./build/tests/with-sign`   |
    /// | `ZK_PRET_SERVER_TIMEOUT`   | `1800000` (milliseconds)    |
    /// | `ZK_PRET_NODE_BIN`         | `node`                      |
    /// | `ZK_PRET_AUTO_BUILD`       | `false`                     |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reading from `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let host = var("HOST", "0.0.0.0");
        let port: u16 = parse("PORT", &var("PORT", "3001"), "a valid u16")?;

        let cors_origins: Vec<String> = var("CORS_ORIGINS", "http://localhost:3000")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let tool_timeout_ms: u64 = parse(
            "ZK_PRET_SERVER_TIMEOUT",
            &var("ZK_PRET_SERVER_TIMEOUT", "1800000"),
            "a number of milliseconds",
        )?;
        let tool_timeout = Duration::from_millis(tool_timeout_ms);

        let request_timeout_secs: u64 = match lookup("REQUEST_TIMEOUT_SECS") {
            Some(value) => parse("REQUEST_TIMEOUT_SECS", &value, "a valid u64")?,
            None => tool_timeout.as_secs() + REQUEST_TIMEOUT_HEADROOM_SECS,
        };

        let shutdown_timeout_secs: u64 = parse(
            "SHUTDOWN_TIMEOUT_SECS",
            &var("SHUTDOWN_TIMEOUT_SECS", "30"),
            "a valid u64",
        )?;

        // Anything but an explicit "false" keeps async jobs on.
        let async_jobs_enabled = !var("ENABLE_ASYNC_JOBS", "true")
            .trim()
            .eq_ignore_ascii_case("false");

        let defaults = ExecutorConfig::default();
        let executor = ExecutorConfig {
            root_path: lookup("ZK_PRET_STDIO_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.root_path),
            build_path: lookup("ZK_PRET_STDIO_BUILD_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.build_path),
            timeout: tool_timeout,
            node_bin: lookup("ZK_PRET_NODE_BIN").unwrap_or(defaults.node_bin),
            auto_build: var("ZK_PRET_AUTO_BUILD", "false")
                .trim()
                .eq_ignore_ascii_case("true"),
            build_command: defaults.build_command,
        };

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            async_jobs_enabled,
            executor,
        })
    }
}

fn parse<T: std::str::FromStr>(
    key: &'static str,
    value: &str,
    expected: &'static str,
) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        expected,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = load(&[]).expect("defaults load");
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3001);
        assert_eq!(config.cors_origins, vec!["http://localhost:3000"]);
        assert!(config.async_jobs_enabled);
        assert_eq!(config.executor.timeout, Duration::from_secs(1800));
        assert_eq!(config.request_timeout_secs, 1860);
        assert_eq!(config.executor.root_path, PathBuf::from("./zk-pret"));
        assert!(!config.executor.auto_build);
    }

    #[test]
    fn async_jobs_only_disabled_by_explicit_false() {
        assert!(!load(&[("ENABLE_ASYNC_JOBS", "false")]).expect("load").async_jobs_enabled);
        assert!(!load(&[("ENABLE_ASYNC_JOBS", "FALSE")]).expect("load").async_jobs_enabled);
        assert!(load(&[("ENABLE_ASYNC_JOBS", "no")]).expect("load").async_jobs_enabled);
    }

    #[test]
    fn overrides() {
        let config = load(&[
            ("PORT", "8080"),
            ("CORS_ORIGINS", "http://a.test, http://b.test,"),
            ("ZK_PRET_SERVER_TIMEOUT", "5000"),
            ("REQUEST_TIMEOUT_SECS", "10"),
            ("ZK_PRET_STDIO_PATH", "/opt/zk-pret"),
            ("ZK_PRET_AUTO_BUILD", "true"),
        ])
        .expect("load");
        assert_eq!(config.port, 8080);
        assert_eq!(config.cors_origins, vec!["http://a.test", "http://b.test"]);
        assert_eq!(config.executor.timeout, Duration::from_secs(5));
        assert_eq!(config.request_timeout_secs, 10);
        assert_eq!(config.executor.root_path, PathBuf::from("/opt/zk-pret"));
        assert!(config.executor.auto_build);
    }

    #[test]
    fn invalid_numbers_are_reported() {
        assert_matches!(
            load(&[("PORT", "eighty")]),
            Err(ConfigError::Invalid { key: "PORT", .. })
        );
        assert_matches!(
            load(&[("ZK_PRET_SERVER_TIMEOUT", "-1")]),
            Err(ConfigError::Invalid { key: "ZK_PRET_SERVER_TIMEOUT", .. })
        );
    }
}
