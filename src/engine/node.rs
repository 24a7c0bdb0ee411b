use serde::Serialize;

use super::{
    certificate::CertificateTable,
    listener::{Listener, ListenerKind, ListenerSet, ResolvedListeners, INTERNAL},
    truststore::TrustStores,
};

const BIND_ADDRESS: &str = "0.0.0.0";

/// The broker's `redpanda.yaml`, restricted to the listener sections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeConfig {
    pub redpanda: RedpandaNode,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pandaproxy: Option<PandaproxyNode>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_registry: Option<SchemaRegistryNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RedpandaNode {
    pub admin: Vec<ApiListener>,
    pub admin_api_tls: Vec<TlsEntry>,
    pub kafka_api: Vec<ApiListener>,
    pub kafka_api_tls: Vec<TlsEntry>,
    pub rpc_server: SocketAddress,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rpc_server_tls: Option<TlsFiles>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PandaproxyNode {
    pub pandaproxy_api: Vec<ApiListener>,
    pub pandaproxy_api_tls: Vec<TlsEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaRegistryNode {
    pub schema_registry_api: Vec<ApiListener>,
    pub schema_registry_api_tls: Vec<TlsEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SocketAddress {
    pub address: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiListener {
    pub name: String,
    pub address: String,
    pub port: u16,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub authentication_method: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TlsEntry {
    pub name: String,

    #[serde(flatten)]
    pub files: TlsFiles,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TlsFiles {
    pub enabled: bool,
    pub cert_file: String,
    pub key_file: String,
    pub require_client_auth: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub truststore_file: Option<String>,
}

impl NodeConfig {
    pub fn build(
        listeners: &ResolvedListeners,
        certs: &CertificateTable,
        trust_stores: &TrustStores,
    ) -> Self {
        let builder = Builder {
            listeners,
            certs,
            trust_stores,
        };

        let rpc = listeners.find(ListenerKind::Rpc, INTERNAL);

        let redpanda = RedpandaNode {
            admin: builder.apis(ListenerKind::Admin),
            admin_api_tls: builder.tls_entries(ListenerKind::Admin),
            kafka_api: builder.apis(ListenerKind::Kafka),
            kafka_api_tls: builder.tls_entries(ListenerKind::Kafka),
            rpc_server: SocketAddress {
                address: BIND_ADDRESS.to_string(),
                port: rpc.map_or(ListenerKind::Rpc.internal_port(), |l| l.port),
            },
            rpc_server_tls: rpc.and_then(|l| builder.tls_files(l)),
        };

        let pandaproxy = builder
            .is_enabled(ListenerKind::Http)
            .then(|| PandaproxyNode {
                pandaproxy_api: builder.apis(ListenerKind::Http),
                pandaproxy_api_tls: builder.tls_entries(ListenerKind::Http),
            });

        let schema_registry = builder
            .is_enabled(ListenerKind::SchemaRegistry)
            .then(|| SchemaRegistryNode {
                schema_registry_api: builder.apis(ListenerKind::SchemaRegistry),
                schema_registry_api_tls: builder.tls_entries(ListenerKind::SchemaRegistry),
            });

        Self {
            redpanda,
            pandaproxy,
            schema_registry,
        }
    }
}

struct Builder<'a> {
    listeners: &'a ResolvedListeners,
    certs: &'a CertificateTable,
    trust_stores: &'a TrustStores,
}

impl Builder<'_> {
    fn enabled(&self, kind: ListenerKind) -> Vec<&Listener> {
        self.listeners
            .get(kind)
            .map(|set| set.enabled().collect())
            .unwrap_or_default()
    }

    fn is_enabled(&self, kind: ListenerKind) -> bool {
        self.listeners
            .get(kind)
            .is_some_and(|set: &ListenerSet| set.internal.enabled)
    }

    fn apis(&self, kind: ListenerKind) -> Vec<ApiListener> {
        self.enabled(kind)
            .into_iter()
            .map(|l| ApiListener {
                name: l.network.clone(),
                address: BIND_ADDRESS.to_string(),
                port: l.port,
                authentication_method: l.authentication_method.clone(),
            })
            .collect()
    }

    fn tls_entries(&self, kind: ListenerKind) -> Vec<TlsEntry> {
        self.enabled(kind)
            .into_iter()
            .filter_map(|l| {
                self.tls_files(l).map(|files| TlsEntry {
                    name: l.network.clone(),
                    files,
                })
            })
            .collect()
    }

    fn tls_files(&self, listener: &Listener) -> Option<TlsFiles> {
        if !listener.enabled {
            return None;
        }

        let tls = listener.tls.as_ref()?;
        let cert = self.certs.get(&tls.cert)?;

        Some(TlsFiles {
            enabled: true,
            cert_file: cert.cert_file(),
            key_file: cert.key_file(),
            require_client_auth: tls.require_client_auth,
            truststore_file: self
                .trust_stores
                .path(listener.kind, &listener.network)
                .map(str::to_string),
        })
    }
}
