use std::collections::BTreeMap;

use serde::Serialize;

use crate::values::{IssuerRef, PartialCertificate, PartialTls};

pub const CERTIFICATE_MOUNT_DIR: &str = "/etc/tls/certs";

pub const DEFAULT_CERT: &str = "default";
pub const EXTERNAL_CERT: &str = "external";

const DEFAULT_CERT_DURATION: &str = "43800h";

/// A named entry of `tls.certs` after merging with the chart defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateEntry {
    pub name: String,
    pub enabled: bool,
    pub ca_enabled: bool,
    /// Existing secret holding `tls.crt`, `tls.key` (and `ca.crt`). No
    /// certificate is issued when it is set.
    pub secret_ref: Option<String>,
    pub issuer_ref: Option<IssuerRef>,
    pub duration: String,
}

impl CertificateEntry {
    fn builtin(name: &str) -> Self {
        Self {
            name: name.to_string(),
            enabled: true,
            ca_enabled: true,
            secret_ref: None,
            issuer_ref: None,
            duration: DEFAULT_CERT_DURATION.to_string(),
        }
    }

    fn declared(name: &str) -> Self {
        Self {
            ca_enabled: false,
            ..Self::builtin(name)
        }
    }

    fn merge(self, partial: &PartialCertificate) -> Self {
        Self {
            enabled: partial.enabled.unwrap_or(self.enabled),
            ca_enabled: partial.ca_enabled.unwrap_or(self.ca_enabled),
            secret_ref: partial
                .secret_ref
                .as_ref()
                .map(|s| s.name.clone())
                .or(self.secret_ref),
            issuer_ref: partial.issuer_ref.clone().or(self.issuer_ref),
            duration: partial.duration.clone().unwrap_or(self.duration),
            name: self.name,
        }
    }

    pub fn mount_dir(&self) -> String {
        format!("{CERTIFICATE_MOUNT_DIR}/{}", self.name)
    }

    pub fn cert_file(&self) -> String {
        format!("{}/tls.crt", self.mount_dir())
    }

    pub fn key_file(&self) -> String {
        format!("{}/tls.key", self.mount_dir())
    }

    pub fn ca_file(&self) -> String {
        format!("{}/ca.crt", self.mount_dir())
    }

    pub fn volume_name(&self) -> String {
        format!("redpanda-{}-cert", self.name)
    }

    pub fn secret_name(&self, release: &str) -> String {
        self.secret_ref
            .clone()
            .unwrap_or_else(|| format!("{release}-{}-cert", self.name))
    }

    /// Whether the certificate is expected to be issued on the cluster
    /// rather than supplied by the user.
    pub fn is_issued(&self) -> bool {
        self.enabled && self.secret_ref.is_none()
    }
}

/// `tls.certs` with the built-in `default` and `external` entries merged in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateTable {
    entries: BTreeMap<String, CertificateEntry>,
}

impl Default for CertificateTable {
    fn default() -> Self {
        Self::resolve(None)
    }
}

impl CertificateTable {
    pub fn resolve(tls: Option<&PartialTls>) -> Self {
        let mut entries: BTreeMap<String, CertificateEntry> = [DEFAULT_CERT, EXTERNAL_CERT]
            .into_iter()
            .map(|name| (name.to_string(), CertificateEntry::builtin(name)))
            .collect();

        for (name, partial) in tls.and_then(|t| t.certs.as_ref()).into_iter().flatten() {
            match partial {
                Some(partial) => {
                    let base = entries
                        .remove(name)
                        .unwrap_or_else(|| CertificateEntry::declared(name));

                    entries.insert(name.clone(), base.merge(partial));
                }
                None => {
                    entries.remove(name);
                }
            }
        }

        Self { entries }
    }

    pub fn get(&self, name: &str) -> Option<&CertificateEntry> {
        self.entries.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CertificateEntry> {
        self.entries.values()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CertificateUsage {
    Server,
    Client,
}

/// A certificate the manifest renderer has to request from cert-manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateRequest {
    pub name: String,
    pub secret_name: String,
    pub usage: CertificateUsage,
    pub issuer_ref: IssuerRef,
    pub duration: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub common_name: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dns_names: Vec<String>,
}

impl CertificateRequest {
    /// Serving certificate covering the headless and client facing services.
    pub fn server(entry: &CertificateEntry, release: &str, namespace: &str) -> Self {
        let services = [
            format!("{release}-cluster.{release}.{namespace}.svc.cluster.local"),
            format!("{release}.{namespace}.svc.cluster.local"),
            format!("{release}.{namespace}.svc"),
            format!("{release}.{namespace}"),
        ];

        let dns_names = services
            .iter()
            .flat_map(|service| [service.clone(), format!("*.{service}")])
            .collect();

        Self {
            name: entry.secret_name(release),
            secret_name: entry.secret_name(release),
            usage: CertificateUsage::Server,
            issuer_ref: issuer_for(entry, release),
            duration: entry.duration.clone(),
            common_name: None,
            dns_names,
        }
    }

    pub fn client(entry: &CertificateEntry, release: &str) -> Self {
        let name = format!("{release}-{}-client", entry.name);

        Self {
            secret_name: name.clone(),
            usage: CertificateUsage::Client,
            issuer_ref: issuer_for(entry, release),
            duration: entry.duration.clone(),
            common_name: Some(name.clone()),
            dns_names: Vec::new(),
            name,
        }
    }
}

fn issuer_for(entry: &CertificateEntry, release: &str) -> IssuerRef {
    entry.issuer_ref.clone().unwrap_or_else(|| IssuerRef {
        name: format!("{release}-{}-root-issuer", entry.name),
        kind: "Issuer".to_string(),
    })
}
