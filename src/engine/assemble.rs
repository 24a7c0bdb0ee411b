use std::collections::{BTreeMap, BTreeSet};

use k8s_openapi::api::core::v1::{
    ConfigMapProjection, KeyToPath, ProjectedVolumeSource, SecretProjection, SecretVolumeSource,
    Volume, VolumeMount, VolumeProjection,
};
use serde::Serialize;
use serde_json::Value;

use crate::{
    logger,
    values::{KeyRef, PartialValues, PropertyMap},
};

use super::{
    certificate::{CertificateRequest, CertificateTable},
    gate::{Approval, Feature},
    listener::ResolvedListeners,
    node::NodeConfig,
    truststore::{SourceKind, TrustStoreMount, TrustStores, TRUSTSTORE_MOUNT_DIR, TRUSTSTORE_VOLUME},
    version::Version,
};

const DEFAULT_TOPIC_REPLICATIONS: &str = "default_topic_replications";
const ENABLE_RACK_AWARENESS: &str = "enable_rack_awareness";

/// Only clusters of at least this size get a replicated topic default.
const REPLICATED_CLUSTER_SIZE: u32 = 3;

const CERT_FILE_MODE: i32 = 0o440;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageRef {
    pub repository: String,
    pub tag: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LicenseSource {
    Inline(String),
    SecretKeyRef(KeyRef),
}

/// Everything the manifest renderer needs. Built once per resolution and
/// never modified afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfiguration {
    pub image: ImageRef,
    pub version: Version,
    /// Features the version gates approved.
    pub features: Vec<Feature>,
    pub replicas: u32,
    pub listeners: ResolvedListeners,
    pub certificates: CertificateTable,
    pub trust_stores: TrustStores,
    pub node: NodeConfig,
    /// Cluster properties for `bootstrap.yaml`, tunables included.
    pub cluster: PropertyMap,
    pub volumes: Vec<Volume>,
    pub volume_mounts: Vec<VolumeMount>,
    pub certificate_requests: Vec<CertificateRequest>,
    pub license: Option<LicenseSource>,
    /// Node annotation holding the rack id, when rack awareness is on.
    pub rack_awareness: Option<String>,
}

/// Resolved parts handed to [`assemble`].
#[derive(Debug)]
pub struct Parts<'a> {
    pub values: &'a PartialValues,
    pub release_name: &'a str,
    pub namespace: &'a str,
    pub image: ImageRef,
    pub replicas: u32,
    pub listeners: ResolvedListeners,
    pub certificates: CertificateTable,
    pub trust_stores: TrustStores,
}

/// `default_topic_replications` injected when the values leave it unset.
pub fn derived_topic_replications(replicas: u32) -> Option<u32> {
    (replicas >= REPLICATED_CLUSTER_SIZE).then_some(REPLICATED_CLUSTER_SIZE)
}

pub fn assemble(parts: Parts<'_>, approval: Approval) -> ResolvedConfiguration {
    let Parts {
        values,
        release_name,
        namespace,
        image,
        replicas,
        listeners,
        certificates,
        trust_stores,
    } = parts;

    let rack_awareness = values
        .rack_awareness
        .as_ref()
        .filter(|r| r.enabled.unwrap_or(false))
        .and_then(|r| r.node_annotation.clone());

    let cluster = cluster_config(values, replicas, rack_awareness.is_some());
    let node = NodeConfig::build(&listeners, &certificates, &trust_stores);

    let in_use = certificates_in_use(&listeners);

    let (mut volumes, mut volume_mounts): (Vec<_>, Vec<_>) = in_use
        .iter()
        .filter_map(|name| certificates.get(name))
        .map(|cert| {
            let volume = Volume {
                name: cert.volume_name(),
                secret: Some(SecretVolumeSource {
                    secret_name: Some(cert.secret_name(release_name)),
                    default_mode: Some(CERT_FILE_MODE),
                    ..SecretVolumeSource::default()
                }),
                ..Volume::default()
            };

            let mount = VolumeMount {
                name: cert.volume_name(),
                mount_path: cert.mount_dir(),
                ..VolumeMount::default()
            };

            (volume, mount)
        })
        .unzip();

    if let Some(volume) = truststore_volume(&trust_stores) {
        volume_mounts.push(VolumeMount {
            name: volume.name.clone(),
            mount_path: TRUSTSTORE_MOUNT_DIR.to_string(),
            read_only: Some(true),
            ..VolumeMount::default()
        });
        volumes.push(volume);
    }

    let certificate_requests = certificate_requests(
        &listeners,
        &certificates,
        &in_use,
        release_name,
        namespace,
    );

    logger!(
        info,
        "assembled {} volumes and {} certificate requests for {}",
        volumes.len(),
        certificate_requests.len(),
        approval.version
    );

    for feature in &approval.features {
        logger!(debug, "approved {} for {}", feature, approval.version);
    }

    ResolvedConfiguration {
        image,
        version: approval.version,
        features: approval.features,
        replicas,
        listeners,
        certificates,
        trust_stores,
        node,
        cluster,
        volumes,
        volume_mounts,
        certificate_requests,
        license: license(values),
        rack_awareness,
    }
}

fn cluster_config(values: &PartialValues, replicas: u32, rack_awareness: bool) -> PropertyMap {
    let mut cluster: PropertyMap = values.cluster().cloned().unwrap_or_default();

    if let Some(tunable) = values.tunable() {
        cluster.extend(tunable.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    if !cluster.contains_key(DEFAULT_TOPIC_REPLICATIONS) {
        if let Some(derived) = derived_topic_replications(replicas) {
            cluster.insert(DEFAULT_TOPIC_REPLICATIONS.to_string(), Value::from(derived));
        }
    }

    if rack_awareness {
        cluster.insert(ENABLE_RACK_AWARENESS.to_string(), Value::Bool(true));
    }

    cluster
}

fn license(values: &PartialValues) -> Option<LicenseSource> {
    let enterprise = values.enterprise.as_ref()?;

    match (&enterprise.license, &enterprise.license_secret_ref) {
        (Some(license), _) if !license.is_empty() => Some(LicenseSource::Inline(license.clone())),
        (_, Some(key_ref)) => Some(LicenseSource::SecretKeyRef(key_ref.clone())),
        _ => None,
    }
}

/// Certificates referenced by an enabled listener that serves TLS.
fn certificates_in_use(listeners: &ResolvedListeners) -> BTreeSet<String> {
    listeners
        .listeners()
        .filter(|l| l.enabled)
        .filter_map(|l| l.tls.as_ref())
        .map(|tls| tls.cert.clone())
        .collect()
}

fn certificate_requests(
    listeners: &ResolvedListeners,
    certificates: &CertificateTable,
    in_use: &BTreeSet<String>,
    release_name: &str,
    namespace: &str,
) -> Vec<CertificateRequest> {
    let client_auth: BTreeSet<&str> = listeners
        .listeners()
        .filter(|l| l.enabled)
        .filter_map(|l| l.tls.as_ref())
        .filter(|tls| tls.require_client_auth)
        .map(|tls| tls.cert.as_str())
        .collect();

    let issued = in_use
        .iter()
        .filter_map(|name| certificates.get(name))
        .filter(|cert| cert.is_issued());

    let mut requests = Vec::new();

    for cert in issued {
        requests.push(CertificateRequest::server(cert, release_name, namespace));

        if client_auth.contains(cert.name.as_str()) {
            requests.push(CertificateRequest::client(cert, release_name));
        }
    }

    requests
}

/// A single projected volume carrying every trust store file. Sources are
/// grouped per ConfigMap or Secret so each object is projected once.
fn truststore_volume(trust_stores: &TrustStores) -> Option<Volume> {
    if trust_stores.is_empty() {
        return None;
    }

    let mut grouped: BTreeMap<(SourceKind, &str), Vec<&TrustStoreMount>> = BTreeMap::new();

    for mount in trust_stores.mounts() {
        grouped
            .entry((mount.source_kind, mount.source_name.as_str()))
            .or_default()
            .push(mount);
    }

    let sources = grouped
        .into_iter()
        .map(|((kind, name), mounts)| {
            let items = Some(
                mounts
                    .into_iter()
                    .map(|m| KeyToPath {
                        key: m.key.clone(),
                        path: m.relative_path(),
                        ..KeyToPath::default()
                    })
                    .collect(),
            );

            match kind {
                SourceKind::ConfigMap => VolumeProjection {
                    config_map: Some(ConfigMapProjection {
                        name: name.to_string(),
                        items,
                        ..ConfigMapProjection::default()
                    }),
                    ..VolumeProjection::default()
                },
                SourceKind::Secret => VolumeProjection {
                    secret: Some(SecretProjection {
                        name: name.to_string(),
                        items,
                        ..SecretProjection::default()
                    }),
                    ..VolumeProjection::default()
                },
            }
        })
        .collect();

    Some(Volume {
        name: TRUSTSTORE_VOLUME.to_string(),
        projected: Some(ProjectedVolumeSource {
            sources: Some(sources),
            ..ProjectedVolumeSource::default()
        }),
        ..Volume::default()
    })
}
