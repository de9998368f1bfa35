//! # Watch Settings
//!
//! Typed settings handed to the reconciliation engine, plus the store key and
//! local path layout derived from them.

use crate::constants::{
    CERTIFICATES_SEGMENT, DEFAULT_ACME_DIR_NAME, DEFAULT_CERT_DIR, DEFAULT_KEY_PREFIX,
    DEFAULT_VALUE_PREFIX,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// One of the two mirrored parts of a certificate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    /// Private key (`.key`)
    Key,
    /// Full certificate chain (`.crt`)
    Crt,
}

impl Component {
    /// Components in reconciliation order
    pub const ALL: [Component; 2] = [Component::Key, Component::Crt];

    #[must_use]
    pub fn suffix(self) -> &'static str {
        match self {
            Component::Key => ".key",
            Component::Crt => ".crt",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("store URL is required")]
    MissingStoreUrl,
    #[error("at least one certificate name must be watched")]
    NoCertificates,
    #[error("certificate name '{0}' is invalid: names must be non-empty and must not contain '/'")]
    InvalidCertificateName(String),
}

/// Runtime settings for the watcher
#[derive(Debug, Clone)]
pub struct WatchSettings {
    /// Redis connection URL
    pub store_url: String,
    /// Prefix for store keys
    pub key_prefix: String,
    /// Prefix stripped from stored values before decoding
    pub value_prefix: String,
    /// ACME directory name certificates are grouped under
    pub acme_dir_name: String,
    /// Local directory mirror files are written to
    pub cert_dir: PathBuf,
    /// Watched certificate names, reconciled in this order
    pub certs: Vec<String>,
    /// Reload command run through the shell when material changes
    pub reload_cmd: Option<String>,
    /// Verbose logging
    pub debug: bool,
    /// Fixed delay before restarting after a failed listen cycle
    pub sleep: Duration,
    /// Logical database index used in keyspace notification channels
    pub db: i64,
}

impl WatchSettings {
    /// Settings with defaults for everything except the store URL and watch list
    #[must_use]
    pub fn new(store_url: impl Into<String>, certs: Vec<String>) -> Self {
        Self {
            store_url: store_url.into(),
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            value_prefix: DEFAULT_VALUE_PREFIX.to_string(),
            acme_dir_name: DEFAULT_ACME_DIR_NAME.to_string(),
            cert_dir: PathBuf::from(DEFAULT_CERT_DIR),
            certs,
            reload_cmd: None,
            debug: false,
            sleep: Duration::from_secs(10),
            db: 0,
        }
    }

    /// Check required settings
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.store_url.trim().is_empty() {
            return Err(SettingsError::MissingStoreUrl);
        }
        if self.certs.is_empty() {
            return Err(SettingsError::NoCertificates);
        }
        if let Some(bad) = self
            .certs
            .iter()
            .find(|name| name.is_empty() || name.contains('/'))
        {
            return Err(SettingsError::InvalidCertificateName(bad.clone()));
        }
        Ok(())
    }

    /// Namespace all watched certificates live under, with a trailing `/`
    ///
    /// `<keyPrefix>/certificates/<acmeDirName>/`
    #[must_use]
    pub fn certificates_namespace(&self) -> String {
        format!(
            "{}/{}/{}/",
            self.key_prefix, CERTIFICATES_SEGMENT, self.acme_dir_name
        )
    }

    /// Store key of one component of a certificate
    ///
    /// `<keyPrefix>/certificates/<acmeDirName>/<name>/<name><suffix>`
    #[must_use]
    pub fn store_key(&self, name: &str, component: Component) -> String {
        format!(
            "{}{name}/{name}{}",
            self.certificates_namespace(),
            component.suffix()
        )
    }

    /// Channel prefix of keyspace notifications for the certificates namespace
    ///
    /// `__keyspace@<db>__:<keyPrefix>/certificates/<acmeDirName>/`
    #[must_use]
    pub fn keyspace_channel_prefix(&self) -> String {
        format!("__keyspace@{}__:{}", self.db, self.certificates_namespace())
    }

    /// Pattern subscribed to for change notifications
    #[must_use]
    pub fn keyspace_pattern(&self) -> String {
        format!("{}*", self.keyspace_channel_prefix())
    }

    /// Local mirror path of one component of a certificate
    #[must_use]
    pub fn mirror_path(&self, name: &str, component: Component) -> PathBuf {
        self.mirror_path_with_ext(name, component.suffix())
    }

    /// Local mirror path for a certificate name and a raw extension
    ///
    /// Deletion events derive the extension from the event's own key, which
    /// may not be one of the known components.
    #[must_use]
    pub fn mirror_path_with_ext(&self, name: &str, ext: &str) -> PathBuf {
        self.cert_dir.join(format!("{name}{ext}"))
    }

    #[must_use]
    pub fn cert_dir(&self) -> &Path {
        &self.cert_dir
    }
}
