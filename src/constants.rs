//! # Constants
//!
//! Shared constants used throughout certwatch.
//!
//! Defaults match the key and value layout written by `caddy-storage-redis`
//! and can be overridden on the command line or via environment variables.

/// Default prefix for store keys
pub const DEFAULT_KEY_PREFIX: &str = "caddy";

/// Default prefix prepended to every stored value
pub const DEFAULT_VALUE_PREFIX: &str = "caddy-storage-redis";

/// Default ACME directory name certificates are grouped under
pub const DEFAULT_ACME_DIR_NAME: &str = "acme-v02.api.letsencrypt.org-directory";

/// Default local directory for mirrored certificates
pub const DEFAULT_CERT_DIR: &str = "/var/lib/certwatch";

/// Default sleep after a failed listen cycle
pub const DEFAULT_SLEEP: &str = "10s";

/// Mode for the local certificate directory
pub const CERT_DIR_MODE: u32 = 0o700;

/// Mode for mirrored certificate files
pub const CERT_FILE_MODE: u32 = 0o600;

/// Path segment between the key prefix and the ACME directory name
pub const CERTIFICATES_SEGMENT: &str = "certificates";

/// Shell used to run the reload command
pub const RELOAD_SHELL: &str = "sh";
