use std::collections::BTreeMap;

use anyhow::Result;
use clap::ValueEnum;
use k8s_openapi::api::core::v1::{Volume, VolumeMount};
use serde::Serialize;

use crate::{
    engine::{CertificateRequest, ImageRef, LicenseSource, NodeConfig, ResolvedConfiguration},
    values::PropertyMap,
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

/// The documents handed to the manifest renderer, in a fixed key order.
#[derive(Debug, Serialize)]
pub struct Rendered<'a> {
    pub image: &'a ImageRef,

    #[serde(rename = "redpanda.yaml")]
    pub node: &'a NodeConfig,

    #[serde(rename = "bootstrap.yaml")]
    pub cluster: &'a PropertyMap,

    /// `kind -> network -> truststore_file`
    pub truststores: BTreeMap<String, BTreeMap<String, String>>,

    pub volumes: &'a [Volume],

    #[serde(rename = "volumeMounts")]
    pub volume_mounts: &'a [VolumeMount],

    pub certificates: &'a [CertificateRequest],

    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<&'a LicenseSource>,

    #[serde(rename = "rackAwareness", skip_serializing_if = "Option::is_none")]
    pub rack_awareness: Option<&'a str>,
}

impl<'a> From<&'a ResolvedConfiguration> for Rendered<'a> {
    fn from(config: &'a ResolvedConfiguration) -> Self {
        Self {
            image: &config.image,
            node: &config.node,
            cluster: &config.cluster,
            truststores: config.trust_stores.table(),
            volumes: &config.volumes,
            volume_mounts: &config.volume_mounts,
            certificates: &config.certificate_requests,
            license: config.license.as_ref(),
            rack_awareness: config.rack_awareness.as_deref(),
        }
    }
}

pub fn render(config: &ResolvedConfiguration, format: OutputFormat) -> Result<String> {
    let rendered = Rendered::from(config);

    let text = match format {
        OutputFormat::Yaml => serde_yaml::to_string(&rendered)?,
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(&rendered)?;
            json.push('\n');
            json
        }
    };

    Ok(text)
}
