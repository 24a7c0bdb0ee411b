use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::engine::ListenerKind;

use super::KeyRef;

#[derive(Default, Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialListeners {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin: Option<PartialListener>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub kafka: Option<PartialListener>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub http: Option<PartialListener>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_registry: Option<PartialListener>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rpc: Option<PartialListener>,
}

impl PartialListeners {
    pub fn get(&self, kind: ListenerKind) -> Option<&PartialListener> {
        match kind {
            ListenerKind::Admin => self.admin.as_ref(),
            ListenerKind::Kafka => self.kafka.as_ref(),
            ListenerKind::Http => self.http.as_ref(),
            ListenerKind::SchemaRegistry => self.schema_registry.as_ref(),
            ListenerKind::Rpc => self.rpc.as_ref(),
        }
    }
}

/// Kind level settings. They describe the internal listener and act as the
/// fallback layer for that kind's external listeners.
#[derive(Default, Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialListener {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub authentication_method: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls: Option<PartialListenerTls>,

    /// A `null` entry removes the built-in external listener of the same name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external: Option<BTreeMap<String, Option<PartialExternalListener>>>,
}

impl PartialListener {
    pub fn tls(&self) -> Option<&PartialListenerTls> {
        self.tls.as_ref()
    }
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialExternalListener {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub advertised_ports: Option<Vec<u16>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub authentication_method: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls: Option<PartialListenerTls>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialListenerTls {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cert: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub require_client_auth: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub trust_store: Option<PartialTrustStore>,
}

/// Raw trust store declaration. At most one reference may be populated; that
/// rule is enforced when the declaration is turned into a
/// [`TrustStoreSource`](crate::engine::TrustStoreSource).
#[derive(Default, Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialTrustStore {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_map_key_ref: Option<KeyRef>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_key_ref: Option<KeyRef>,
}
