mod image;
mod listeners;
mod loader;
mod set_value;
mod tls;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use image::PartialImage;
pub use listeners::*;
pub use loader::ValuesLoader;
pub use set_value::{nest_set_values, SetValue, SetValueParseError};
pub use tls::*;

/// Arbitrary typed property values, as found under `config.cluster` and `config.tunable`.
pub type PropertyMap = BTreeMap<String, serde_json::Value>;

/// The user supplied values document. Every field is optional; unset fields
/// take the chart defaults during resolution. Keys the resolver does not
/// consume (`affinity`, `console`, ...) are accepted and ignored.
#[derive(Default, Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialValues {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<PartialImage>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub statefulset: Option<PartialStatefulset>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls: Option<PartialTls>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub listeners: Option<PartialListeners>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<PartialConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub enterprise: Option<PartialEnterprise>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rack_awareness: Option<PartialRackAwareness>,
}

impl PartialValues {
    pub fn replicas(&self) -> Option<u32> {
        self.statefulset.as_ref().and_then(|s| s.replicas)
    }

    pub fn tunable(&self) -> Option<&PropertyMap> {
        self.config.as_ref().and_then(|c| c.tunable.as_ref())
    }

    pub fn cluster(&self) -> Option<&PropertyMap> {
        self.config.as_ref().and_then(|c| c.cluster.as_ref())
    }
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PartialStatefulset {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replicas: Option<u32>,
}

#[derive(Default, Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PartialConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster: Option<PropertyMap>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tunable: Option<PropertyMap>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialEnterprise {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_secret_ref: Option<KeyRef>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialRackAwareness {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_annotation: Option<String>,
}
