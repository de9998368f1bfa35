//! # Reconciler
//!
//! Brings local mirror files in line with the store, one certificate at a time.
//!
//! For each component (`.key`, then `.crt`) of a watched certificate the
//! reconciler fetches the stored value, decodes it and rewrites the mirror
//! file only when its size or mtime differ from the stored payload and
//! `Modified` time. A component missing from the store is skipped.

use crate::config::{Component, WatchSettings};
use crate::controller::codec::{decode_stored_value, DecodeError};
use crate::controller::mirror::{self, MirrorError};
use crate::observability::metrics;
use crate::provider::{CertStore, StoreError};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, info_span, Instrument};

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("failed to read {key} from store: {source}")]
    Store {
        key: String,
        #[source]
        source: StoreError,
    },
    #[error("failed to decode {key}: {source}")]
    Decode {
        key: String,
        #[source]
        source: DecodeError,
    },
    #[error(transparent)]
    Mirror(#[from] MirrorError),
}

/// A full pass stopped at the first failing certificate
#[derive(Debug, Error)]
#[error("reconciliation of {cert} failed: {source}")]
pub struct PassError {
    pub cert: String,
    /// Whether certificates reconciled before the failure changed files
    pub changed: bool,
    #[source]
    pub source: ReconcileError,
}

#[derive(Clone)]
pub struct Reconciler {
    settings: Arc<WatchSettings>,
    store: Arc<dyn CertStore>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("cert_dir", &self.settings.cert_dir)
            .field("certs", &self.settings.certs)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    pub fn new(settings: Arc<WatchSettings>, store: Arc<dyn CertStore>) -> Self {
        Self { settings, store }
    }

    #[must_use]
    pub fn settings(&self) -> &WatchSettings {
        &self.settings
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn CertStore> {
        &self.store
    }

    /// Reconcile both components of one certificate
    ///
    /// Returns whether any mirror file was written.
    pub async fn reconcile(&self, name: &str) -> Result<bool, ReconcileError> {
        let mut changed = false;
        self.reconcile_into(name, &mut changed).await?;
        Ok(changed)
    }

    /// Like [`Reconciler::reconcile`], recording writes in `changed`
    ///
    /// A `.key` written before the `.crt` fails is still recorded.
    pub async fn reconcile_into(&self, name: &str, changed: &mut bool) -> Result<(), ReconcileError> {
        let span = info_span!("certwatch.reconcile", cert = %name);
        async {
            metrics::increment_reconciliations();
            for component in Component::ALL {
                match self.reconcile_component(name, component).await {
                    Ok(wrote) => *changed |= wrote,
                    Err(e) => {
                        metrics::increment_reconciliation_errors();
                        return Err(e);
                    }
                }
            }
            Ok(())
        }
        .instrument(span)
        .await
    }

    async fn reconcile_component(
        &self,
        name: &str,
        component: Component,
    ) -> Result<bool, ReconcileError> {
        let key = self.settings.store_key(name, component);

        let raw = self
            .store
            .get(&key)
            .await
            .map_err(|source| ReconcileError::Store {
                key: key.clone(),
                source,
            })?;
        let Some(raw) = raw else {
            debug!(key = %key, "Not in store, skipping");
            return Ok(false);
        };

        let stored = decode_stored_value(&raw, &self.settings.value_prefix)
            .map_err(|source| ReconcileError::Decode {
                key: key.clone(),
                source,
            })?;

        let path = self.settings.mirror_path(name, component);
        if mirror::is_in_sync(&path, &stored)? {
            debug!(path = %path.display(), modified = %stored.modified, "Mirror up to date");
            return Ok(false);
        }

        mirror::write_atomic(&path, &stored)?;
        metrics::increment_files_written();
        info!(
            path = %path.display(),
            modified = %stored.modified,
            bytes = stored.value.len(),
            "Updated certificate file"
        );
        Ok(true)
    }

    /// Reconcile every watched certificate in order, stopping at the first error
    pub async fn reconcile_all(&self) -> Result<bool, PassError> {
        let start = Instant::now();
        let mut changed = false;
        for name in &self.settings.certs {
            if let Err(source) = self.reconcile_into(name, &mut changed).await {
                return Err(PassError {
                    cert: name.clone(),
                    changed,
                    source,
                });
            }
        }
        metrics::observe_pass_duration(start.elapsed().as_secs_f64());
        debug!(changed, "Full reconciliation pass complete");
        Ok(changed)
    }

    /// Delete the mirror file `<certdir>/<name><ext>`
    ///
    /// Returns whether a file was removed.
    pub fn delete_mirror(&self, name: &str, ext: &str) -> Result<bool, MirrorError> {
        let path = self.settings.mirror_path_with_ext(name, ext);
        let removed = mirror::remove(&path)?;
        if removed {
            metrics::increment_files_deleted();
            info!(path = %path.display(), "Removed certificate file");
        } else {
            debug!(path = %path.display(), "Certificate file already absent");
        }
        Ok(removed)
    }
}
