use std::collections::BTreeMap;

use strum::{EnumIter, IntoEnumIterator};

use crate::{
    logger,
    values::{PartialExternalListener, PartialListener, PartialListenerTls, PartialListeners},
};

use super::{
    certificate::{CertificateTable, DEFAULT_CERT, EXTERNAL_CERT},
    report::Report,
    truststore::TrustStoreSource,
};

/// Network name of the single internal listener of every kind.
pub const INTERNAL: &str = "internal";

/// Name of the external listener every kind except rpc ships with.
pub const DEFAULT_EXTERNAL: &str = "default";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIter, strum::Display,
)]
#[strum(serialize_all = "snake_case")]
pub enum ListenerKind {
    Admin,
    Kafka,
    Http,
    SchemaRegistry,
    Rpc,
}

impl ListenerKind {
    /// Key of this kind under `listeners` in the values document.
    pub fn values_key(&self) -> &'static str {
        match self {
            ListenerKind::Admin => "admin",
            ListenerKind::Kafka => "kafka",
            ListenerKind::Http => "http",
            ListenerKind::SchemaRegistry => "schemaRegistry",
            ListenerKind::Rpc => "rpc",
        }
    }

    pub fn supports_external(&self) -> bool {
        !matches!(self, ListenerKind::Rpc)
    }

    pub fn internal_port(&self) -> u16 {
        match self {
            ListenerKind::Admin => 9644,
            ListenerKind::Kafka => 9093,
            ListenerKind::Http => 8082,
            ListenerKind::SchemaRegistry => 8081,
            ListenerKind::Rpc => 33145,
        }
    }

    /// Container port and advertised port of the built-in `default` external listener.
    pub fn default_external_ports(&self) -> Option<(u16, u16)> {
        match self {
            ListenerKind::Admin => Some((9645, 31644)),
            ListenerKind::Kafka => Some((9094, 31092)),
            ListenerKind::Http => Some((8083, 30082)),
            ListenerKind::SchemaRegistry => Some((8084, 30081)),
            ListenerKind::Rpc => None,
        }
    }

    fn path(&self) -> String {
        format!("listeners.{}", self.values_key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerTls {
    pub cert: String,
    pub require_client_auth: bool,
    /// Explicit trust store only. The CA derived fallback is decided later,
    /// once the whole certificate table is known.
    pub trust_store: Option<TrustStoreSource>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listener {
    pub kind: ListenerKind,
    pub network: String,
    pub enabled: bool,
    pub port: u16,
    pub advertised_ports: Vec<u16>,
    pub authentication_method: Option<String>,
    /// `None` when TLS is off or the certificate it points at is disabled.
    pub tls: Option<ListenerTls>,
}

impl Listener {
    pub fn is_internal(&self) -> bool {
        self.network == INTERNAL
    }

    pub fn tls_enabled(&self) -> bool {
        self.enabled && self.tls.is_some()
    }

    /// Dotted location of this listener in the values document.
    pub fn values_path(&self) -> String {
        if self.is_internal() {
            self.kind.path()
        } else {
            format!("{}.external.{}", self.kind.path(), self.network)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerSet {
    pub internal: Listener,
    pub external: BTreeMap<String, Listener>,
}

impl ListenerSet {
    /// The internal listener first, then the external ones by name.
    pub fn iter(&self) -> impl Iterator<Item = &Listener> {
        std::iter::once(&self.internal).chain(self.external.values())
    }

    pub fn enabled(&self) -> impl Iterator<Item = &Listener> {
        self.iter().filter(|l| l.enabled)
    }

    pub fn get(&self, network: &str) -> Option<&Listener> {
        if network == INTERNAL {
            Some(&self.internal)
        } else {
            self.external.get(network)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedListeners {
    kinds: BTreeMap<ListenerKind, ListenerSet>,
}

impl ResolvedListeners {
    pub fn resolve(
        partial: Option<&PartialListeners>,
        global_tls: Option<bool>,
        certs: &CertificateTable,
        report: &mut Report,
    ) -> Self {
        let kinds = ListenerKind::iter()
            .map(|kind| {
                let partial = partial.and_then(|p| p.get(kind));
                let set = resolve_kind(kind, partial, global_tls, certs, report);

                (kind, set)
            })
            .collect();

        Self { kinds }
    }

    pub fn get(&self, kind: ListenerKind) -> Option<&ListenerSet> {
        self.kinds.get(&kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ListenerKind, &ListenerSet)> {
        self.kinds.iter().map(|(kind, set)| (*kind, set))
    }

    pub fn listeners(&self) -> impl Iterator<Item = &Listener> {
        self.kinds.values().flat_map(ListenerSet::iter)
    }

    pub fn find(&self, kind: ListenerKind, network: &str) -> Option<&Listener> {
        self.get(kind).and_then(|set| set.get(network))
    }
}

/// Whether the internal listener of `kind` ends up serving TLS. Used to work
/// out which gated features the values request before anything is validated.
pub fn internal_tls_requested(
    kind: ListenerKind,
    partial: Option<&PartialListeners>,
    global_tls: Option<bool>,
    certs: &CertificateTable,
) -> bool {
    let partial = partial.and_then(|p| p.get(kind));

    if !partial.and_then(|p| p.enabled).unwrap_or(true) {
        return false;
    }

    let tls = partial.and_then(PartialListener::tls);
    let enabled = internal_tls_enabled(tls, global_tls);
    let cert = tls.and_then(|t| t.cert.as_deref()).unwrap_or(DEFAULT_CERT);

    enabled && certs.get(cert).is_some_and(|c| c.enabled)
}

fn internal_tls_enabled(tls: Option<&PartialListenerTls>, global_tls: Option<bool>) -> bool {
    tls.and_then(|t| t.enabled).or(global_tls).unwrap_or(true)
}

fn resolve_kind(
    kind: ListenerKind,
    partial: Option<&PartialListener>,
    global_tls: Option<bool>,
    certs: &CertificateTable,
    report: &mut Report,
) -> ListenerSet {
    let path = kind.path();
    let kind_enabled = partial.and_then(|p| p.enabled).unwrap_or(true);
    let kind_tls = partial.and_then(PartialListener::tls);
    let kind_tls_enabled = internal_tls_enabled(kind_tls, global_tls);
    let authentication_method = partial.and_then(|p| p.authentication_method.clone());

    let internal = Listener {
        kind,
        network: INTERNAL.to_string(),
        enabled: kind_enabled,
        port: partial.and_then(|p| p.port).unwrap_or(kind.internal_port()),
        advertised_ports: Vec::new(),
        authentication_method: authentication_method.clone(),
        tls: resolve_tls(
            &path,
            kind_tls_enabled,
            DEFAULT_CERT,
            kind_tls,
            certs,
            report,
        ),
    };

    let mut external = BTreeMap::new();

    if let Some((port, advertised)) = kind.default_external_ports() {
        external.insert(
            DEFAULT_EXTERNAL.to_string(),
            (Some(port), vec![advertised], None),
        );
    }

    let declared = partial.and_then(|p| p.external.as_ref());

    if !kind.supports_external() && declared.is_some_and(|d| d.values().any(Option::is_some)) {
        report.push(
            format!("{path}.external"),
            format!("{kind} listeners do not support external access"),
        );
    }

    for (name, entry) in declared.into_iter().flatten() {
        if !kind.supports_external() {
            break;
        }

        match entry {
            Some(entry) => {
                let builtin = external.remove(name);
                let (port, advertised_ports) = match builtin {
                    Some((port, advertised, _)) => (port, advertised),
                    None => (None, Vec::new()),
                };

                external.insert(name.clone(), (port, advertised_ports, Some(entry)));
            }
            None => {
                logger!(debug, "{path}.external.{name} removed");
                external.remove(name);
            }
        }
    }

    let external = external
        .into_iter()
        .filter_map(|(name, (port, advertised_ports, entry))| {
            let path = format!("{path}.external.{name}");

            if name == INTERNAL {
                report.push(&path, "Name is reserved for the internal listener");
                return None;
            }

            let entry: Option<&PartialExternalListener> = entry;
            let port = entry.and_then(|e| e.port).or(port);

            let Some(port) = port else {
                report.push(format!("{path}.port"), "Required");
                return None;
            };

            let tls = entry.and_then(|e| e.tls.as_ref());
            let tls_enabled = tls.and_then(|t| t.enabled).unwrap_or(kind_tls_enabled);

            let listener = Listener {
                kind,
                network: name.clone(),
                enabled: kind_enabled && entry.and_then(|e| e.enabled).unwrap_or(true),
                port,
                advertised_ports: entry
                    .and_then(|e| e.advertised_ports.clone())
                    .unwrap_or(advertised_ports),
                authentication_method: entry
                    .and_then(|e| e.authentication_method.clone())
                    .or_else(|| authentication_method.clone()),
                tls: resolve_tls(&path, tls_enabled, EXTERNAL_CERT, tls, certs, report),
            };

            Some((name, listener))
        })
        .collect();

    ListenerSet { internal, external }
}

fn resolve_tls(
    path: &str,
    enabled: bool,
    default_cert: &str,
    partial: Option<&PartialListenerTls>,
    certs: &CertificateTable,
    report: &mut Report,
) -> Option<ListenerTls> {
    // Malformed trust stores are rejected even on listeners without TLS.
    let trust_store = partial
        .and_then(|t| t.trust_store.as_ref())
        .and_then(|ts| TrustStoreSource::from_partial(ts, &format!("{path}.tls.trustStore"), report));

    if !enabled {
        return None;
    }

    let cert = partial
        .and_then(|t| t.cert.clone())
        .unwrap_or_else(|| default_cert.to_string());

    let Some(entry) = certs.get(&cert) else {
        report.push(
            format!("{path}.tls.cert"),
            format!("Certificate {cert:?} referenced, but not found in the tls.certs map"),
        );
        return None;
    };

    if !entry.enabled {
        logger!(debug, "{path} uses disabled certificate {cert}, serving without TLS");
        return None;
    }

    Some(ListenerTls {
        cert,
        require_client_auth: partial.and_then(|t| t.require_client_auth).unwrap_or(false),
        trust_store,
    })
}
