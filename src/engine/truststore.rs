use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::{
    logger,
    values::{KeyRef, PartialTrustStore},
};

use super::{
    certificate::CertificateTable,
    listener::{Listener, ListenerKind, ResolvedListeners},
    report::Report,
};

pub const TRUSTSTORE_MOUNT_DIR: &str = "/etc/truststores";
pub const TRUSTSTORE_VOLUME: &str = "truststores";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    ConfigMap,
    Secret,
}

impl SourceKind {
    pub fn dir(&self) -> &'static str {
        match self {
            SourceKind::ConfigMap => "configmaps",
            SourceKind::Secret => "secrets",
        }
    }
}

/// Where a listener gets the CAs it trusts from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrustStoreSource {
    /// The `ca.crt` that ships next to the listener's own certificate.
    DerivedFromCa { cert: String },
    ConfigMapKeyRef(KeyRef),
    SecretKeyRef(KeyRef),
}

impl TrustStoreSource {
    /// Turns a raw declaration into a source. Over-specified or empty
    /// declarations are pushed to `report` and yield `None`.
    pub fn from_partial(
        partial: &PartialTrustStore,
        path: &str,
        report: &mut Report,
    ) -> Option<Self> {
        let source = match (&partial.config_map_key_ref, &partial.secret_key_ref) {
            (Some(_), Some(_)) => {
                report.push(path, "Must have at most 1 properties");
                return None;
            }
            (Some(r), None) => (SourceKind::ConfigMap, r, "configMapKeyRef"),
            (None, Some(r)) => (SourceKind::Secret, r, "secretKeyRef"),
            (None, None) => return None,
        };

        let (kind, key_ref, field) = source;
        let mut valid = true;

        for (name, value) in [("name", &key_ref.name), ("key", &key_ref.key)] {
            if value.is_empty() {
                report.push(format!("{path}.{field}.{name}"), "Must not be empty");
                valid = false;
            }
        }

        if !valid {
            return None;
        }

        Some(match kind {
            SourceKind::ConfigMap => TrustStoreSource::ConfigMapKeyRef(key_ref.clone()),
            SourceKind::Secret => TrustStoreSource::SecretKeyRef(key_ref.clone()),
        })
    }

    /// The mount an explicit source needs. Derived CAs live in the
    /// certificate volume and need none.
    pub fn mount(&self) -> Option<TrustStoreMount> {
        match self {
            TrustStoreSource::DerivedFromCa { .. } => None,
            TrustStoreSource::ConfigMapKeyRef(r) => Some(TrustStoreMount::new(SourceKind::ConfigMap, r)),
            TrustStoreSource::SecretKeyRef(r) => Some(TrustStoreMount::new(SourceKind::Secret, r)),
        }
    }
}

/// One file projected into the shared trust store volume. Identity is the
/// `(kind, name, key)` triple, so equal references collapse onto one mount.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustStoreMount {
    pub source_kind: SourceKind,
    pub source_name: String,
    pub key: String,
}

impl TrustStoreMount {
    fn new(source_kind: SourceKind, key_ref: &KeyRef) -> Self {
        Self {
            source_kind,
            source_name: key_ref.name.clone(),
            key: key_ref.key.clone(),
        }
    }

    pub fn mount_name(&self) -> String {
        format!("{}-{}", self.source_name, self.key)
    }

    /// Path relative to the trust store volume root.
    pub fn relative_path(&self) -> String {
        format!("{}/{}", self.source_kind.dir(), self.mount_name())
    }

    pub fn path(&self) -> String {
        format!("{TRUSTSTORE_MOUNT_DIR}/{}", self.relative_path())
    }
}

/// Truststore file per enabled TLS listener, plus the mounts backing them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrustStores {
    paths: BTreeMap<(ListenerKind, String), String>,
    mounts: BTreeSet<TrustStoreMount>,
}

impl TrustStores {
    /// Distinct mounts that would land on the same file are pushed to
    /// `report`; the later listener gets no path.
    pub fn resolve(
        listeners: &ResolvedListeners,
        certs: &CertificateTable,
        report: &mut Report,
    ) -> Self {
        let mut stores = Self::default();
        let mut claimed: BTreeMap<String, TrustStoreMount> = BTreeMap::new();

        for listener in listeners.listeners().filter(|l| l.enabled) {
            let Some(source) = effective_source(listener, certs) else {
                continue;
            };

            let path = match (&source, source.mount()) {
                (_, Some(mount)) => {
                    let path = mount.path();

                    if let Some(owner) = claimed.get(&path).filter(|owner| **owner != mount) {
                        report.push(
                            format!("{}.tls.trustStore", listener.values_path()),
                            format!(
                                "Truststore path {path} is already used by {} {:?} key {:?}",
                                owner.source_kind.dir(),
                                owner.source_name,
                                owner.key
                            ),
                        );
                        continue;
                    }

                    claimed.insert(path.clone(), mount.clone());
                    stores.mounts.insert(mount);
                    path
                }
                (TrustStoreSource::DerivedFromCa { cert }, None) => match certs.get(cert) {
                    Some(entry) => entry.ca_file(),
                    None => continue,
                },
                (_, None) => continue,
            };

            logger!(
                debug,
                "truststore {}/{} -> {}",
                listener.kind,
                listener.network,
                path
            );

            stores
                .paths
                .insert((listener.kind, listener.network.clone()), path);
        }

        stores
    }

    pub fn path(&self, kind: ListenerKind, network: &str) -> Option<&str> {
        self.paths
            .get(&(kind, network.to_string()))
            .map(String::as_str)
    }

    pub fn mounts(&self) -> impl Iterator<Item = &TrustStoreMount> {
        self.mounts.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.mounts.is_empty()
    }

    /// `kind -> network -> path`, the shape handed to the renderer.
    pub fn table(&self) -> BTreeMap<String, BTreeMap<String, String>> {
        let mut table: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();

        for ((kind, network), path) in &self.paths {
            table
                .entry(kind.to_string())
                .or_default()
                .insert(network.clone(), path.clone());
        }

        table
    }
}

/// An explicit trust store wins. Otherwise a listener trusts the CA of its
/// own certificate when that certificate carries one.
fn effective_source(listener: &Listener, certs: &CertificateTable) -> Option<TrustStoreSource> {
    let tls = listener.tls.as_ref()?;

    if let Some(source) = &tls.trust_store {
        return Some(source.clone());
    }

    certs
        .get(&tls.cert)
        .filter(|c| c.ca_enabled)
        .map(|c| TrustStoreSource::DerivedFromCa {
            cert: c.name.clone(),
        })
}
