//! # Command Line
//!
//! Flags and environment variables for the `certwatch` binary.
//!
//! ```bash
//! certwatch --redisurl redis://localhost:6379 \
//!     --certdir /etc/haproxy/certs \
//!     --cmd 'systemctl reload haproxy' \
//!     example.com www.example.com
//! ```

use crate::config::duration::{parse_duration, DurationParseError};
use crate::config::settings::{SettingsError, WatchSettings};
use crate::constants::{
    DEFAULT_ACME_DIR_NAME, DEFAULT_CERT_DIR, DEFAULT_KEY_PREFIX, DEFAULT_SLEEP,
    DEFAULT_VALUE_PREFIX,
};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use thiserror::Error;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Mirror certificates from caddy-storage-redis to local files
#[derive(Debug, Parser)]
#[command(name = "certwatch", version, about, long_about = None)]
pub struct Cli {
    /// URL for the Redis instance (redis://, rediss:// or unix://)
    #[arg(long = "redisurl", env = "CERTWATCH_REDIS_URL", default_value = "")]
    pub redis_url: String,

    /// Prefix for keys
    #[arg(long = "keyprefix", env = "CERTWATCH_KEY_PREFIX", default_value = DEFAULT_KEY_PREFIX)]
    pub key_prefix: String,

    /// Prefix for values
    #[arg(long = "valueprefix", env = "CERTWATCH_VALUE_PREFIX", default_value = DEFAULT_VALUE_PREFIX)]
    pub value_prefix: String,

    /// Subdirectory for ACME
    #[arg(long = "acmedir", env = "CERTWATCH_ACME_DIR", default_value = DEFAULT_ACME_DIR_NAME)]
    pub acme_dir: String,

    /// Directory for storing certificates locally
    #[arg(long = "certdir", env = "CERTWATCH_CERT_DIR", default_value = DEFAULT_CERT_DIR)]
    pub cert_dir: PathBuf,

    /// Command to execute if certificates have been changed
    #[arg(long = "cmd", env = "CERTWATCH_CMD")]
    pub cmd: Option<String>,

    /// Verbose debug output
    #[arg(long, env = "CERTWATCH_DEBUG")]
    pub debug: bool,

    /// Sleep duration after error (e.g. 10s, 500ms, 1m30s)
    #[arg(long = "sleep", env = "CERTWATCH_SLEEP", default_value = DEFAULT_SLEEP)]
    pub sleep: String,

    /// Database index for keyspace notifications (defaults to the URL's database)
    #[arg(long = "db", env = "CERTWATCH_DB")]
    pub db: Option<i64>,

    /// Log output format
    #[arg(long = "log-format", env = "CERTWATCH_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Serve /metrics, /healthz and /readyz on this port
    #[arg(long = "metrics-port", env = "CERTWATCH_METRICS_PORT")]
    pub metrics_port: Option<u16>,

    /// Certificate names to watch
    #[arg(value_name = "CERT")]
    pub certs: Vec<String>,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("invalid --sleep value: {0}")]
    Sleep(#[from] DurationParseError),
}

impl Cli {
    /// Build validated settings
    ///
    /// `default_db` is used when `--db` is not given; the caller derives it
    /// from the store URL.
    pub fn to_settings(&self, default_db: i64) -> Result<WatchSettings, CliError> {
        let mut settings = WatchSettings::new(self.redis_url.clone(), self.certs.clone());
        settings.key_prefix.clone_from(&self.key_prefix);
        settings.value_prefix.clone_from(&self.value_prefix);
        settings.acme_dir_name.clone_from(&self.acme_dir);
        settings.cert_dir.clone_from(&self.cert_dir);
        settings.reload_cmd = self.cmd.clone().filter(|c| !c.trim().is_empty());
        settings.debug = self.debug;
        settings.sleep = parse_duration(&self.sleep)?;
        settings.db = self.db.unwrap_or(default_db);
        settings.validate()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("certwatch").chain(args.iter().copied()))
            .expect("arguments should parse")
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&["--redisurl", "redis://localhost", "example.com"]);
        let settings = cli.to_settings(0).unwrap();
        assert_eq!(settings.key_prefix, "caddy");
        assert_eq!(settings.value_prefix, "caddy-storage-redis");
        assert_eq!(
            settings.acme_dir_name,
            "acme-v02.api.letsencrypt.org-directory"
        );
        assert_eq!(settings.cert_dir, PathBuf::from("/var/lib/certwatch"));
        assert_eq!(settings.sleep, Duration::from_secs(10));
        assert_eq!(settings.certs, vec!["example.com".to_string()]);
        assert_eq!(settings.reload_cmd, None);
        assert_eq!(settings.db, 0);
        assert!(!settings.debug);
        assert_eq!(cli.log_format, LogFormat::Text);
    }

    #[test]
    fn test_all_flags() {
        let cli = parse(&[
            "--redisurl",
            "redis://localhost/2",
            "--keyprefix",
            "edge",
            "--valueprefix",
            "",
            "--acmedir",
            "staging",
            "--certdir",
            "/srv/certs",
            "--cmd",
            "nginx -s reload",
            "--debug",
            "--sleep",
            "1m",
            "--db",
            "5",
            "--log-format",
            "json",
            "--metrics-port",
            "9100",
            "a.example",
            "b.example",
        ]);
        let settings = cli.to_settings(2).unwrap();
        assert_eq!(settings.key_prefix, "edge");
        assert_eq!(settings.value_prefix, "");
        assert_eq!(settings.acme_dir_name, "staging");
        assert_eq!(settings.cert_dir, PathBuf::from("/srv/certs"));
        assert_eq!(settings.reload_cmd.as_deref(), Some("nginx -s reload"));
        assert!(settings.debug);
        assert_eq!(settings.sleep, Duration::from_secs(60));
        assert_eq!(settings.db, 5);
        assert_eq!(settings.certs.len(), 2);
        assert_eq!(cli.log_format, LogFormat::Json);
        assert_eq!(cli.metrics_port, Some(9100));
    }

    #[test]
    fn test_db_falls_back_to_url_database() {
        let cli = parse(&["--redisurl", "redis://localhost/4", "example.com"]);
        assert_eq!(cli.to_settings(4).unwrap().db, 4);
    }

    #[test]
    fn test_missing_url_and_certs_rejected() {
        let cli = parse(&["example.com"]);
        assert!(matches!(
            cli.to_settings(0),
            Err(CliError::Settings(SettingsError::MissingStoreUrl))
        ));

        let cli = parse(&["--redisurl", "redis://localhost"]);
        assert!(matches!(
            cli.to_settings(0),
            Err(CliError::Settings(SettingsError::NoCertificates))
        ));
    }

    #[test]
    fn test_bad_sleep_rejected() {
        let cli = parse(&["--redisurl", "redis://localhost", "--sleep", "soon", "x"]);
        assert!(matches!(cli.to_settings(0), Err(CliError::Sleep(_))));
    }

    #[test]
    fn test_blank_cmd_is_none() {
        let cli = parse(&["--redisurl", "redis://localhost", "--cmd", "  ", "x"]);
        assert_eq!(cli.to_settings(0).unwrap().reload_cmd, None);
    }
}
