mod assemble;
mod certificate;
mod gate;
mod listener;
mod node;
mod report;
mod truststore;
mod version;

use crate::{error::ResolveError, logger, values::PartialValues};

pub use assemble::{derived_topic_replications, ImageRef, LicenseSource, ResolvedConfiguration};
pub use certificate::{
    CertificateEntry, CertificateRequest, CertificateTable, CertificateUsage,
    CERTIFICATE_MOUNT_DIR, DEFAULT_CERT, EXTERNAL_CERT,
};
pub use gate::{Approval, Feature, GateTable, GateTarget, VersionGate, VersionRange};
pub use listener::{
    Listener, ListenerKind, ListenerSet, ListenerTls, ResolvedListeners, DEFAULT_EXTERNAL,
    INTERNAL,
};
pub use node::{ApiListener, NodeConfig, TlsEntry, TlsFiles};
pub use report::Report;
pub use truststore::{
    SourceKind, TrustStoreMount, TrustStoreSource, TrustStores, TRUSTSTORE_MOUNT_DIR,
};
pub use version::{Release, Version, VersionParseError};

pub const DEFAULT_IMAGE_REPOSITORY: &str = "docker.redpanda.com/redpandadata/redpanda";
pub const DEFAULT_APP_VERSION: &str = "v24.1.1";

const DEFAULT_REPLICAS: u32 = 3;

/// Release level inputs that do not come from the values document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderContext {
    pub release_name: String,
    pub namespace: String,
    /// Image tag used when `image.tag` is unset.
    pub app_version: String,
    pub image_repository: String,
}

impl Default for RenderContext {
    fn default() -> Self {
        Self {
            release_name: "redpanda".to_string(),
            namespace: "default".to_string(),
            app_version: DEFAULT_APP_VERSION.to_string(),
            image_repository: DEFAULT_IMAGE_REPOSITORY.to_string(),
        }
    }
}

/// Compiles partial values into a complete configuration, or the first
/// version gate / the full set of structural problems that prevents it.
///
/// Gates are evaluated before the listeners are validated, so a version
/// problem is reported even when the values are also malformed.
pub fn resolve(
    values: &PartialValues,
    context: &RenderContext,
    gates: &GateTable,
) -> Result<ResolvedConfiguration, ResolveError> {
    let image = ImageRef {
        repository: values
            .image
            .as_ref()
            .and_then(|i| i.repository.clone())
            .unwrap_or_else(|| context.image_repository.clone()),
        tag: values
            .image
            .as_ref()
            .and_then(|i| i.tag.clone())
            .unwrap_or_else(|| context.app_version.clone()),
    };

    let version: Version = image.tag.parse().map_err(|e: VersionParseError| {
        ResolveError::from(crate::error::Violation::new("image.tag", e.to_string()))
    })?;

    logger!(info, "resolve {}:{}", image.repository, version);

    let global_tls = values.tls.as_ref().and_then(|t| t.enabled);
    let certificates = CertificateTable::resolve(values.tls.as_ref());

    let approval = gates.evaluate(&version, &requested_features(values, global_tls, &certificates))?;

    let mut report = Report::new();

    let listeners =
        ResolvedListeners::resolve(values.listeners.as_ref(), global_tls, &certificates, &mut report);

    let trust_stores = TrustStores::resolve(&listeners, &certificates, &mut report);

    check_rack_awareness(values, &mut report);
    check_enterprise(values, &mut report);

    report.finish()?;

    Ok(assemble::assemble(
        assemble::Parts {
            values,
            release_name: &context.release_name,
            namespace: &context.namespace,
            image,
            replicas: values.replicas().unwrap_or(DEFAULT_REPLICAS),
            listeners,
            certificates,
            trust_stores,
        },
        approval,
    ))
}

/// Features the values ask for, in gate table terms.
pub fn requested_features(
    values: &PartialValues,
    global_tls: Option<bool>,
    certificates: &CertificateTable,
) -> Vec<Feature> {
    let mut features = vec![Feature::Baseline];

    if listener::internal_tls_requested(
        ListenerKind::Rpc,
        values.listeners.as_ref(),
        global_tls,
        certificates,
    ) {
        features.push(Feature::RpcTls);
    }

    features.extend(
        values
            .tunable()
            .into_iter()
            .flat_map(|t| t.keys())
            .map(|key| Feature::Tunable(key.clone())),
    );

    features
}

fn check_rack_awareness(values: &PartialValues, report: &mut Report) {
    let Some(rack) = &values.rack_awareness else {
        return;
    };

    let annotation = rack.node_annotation.as_deref().unwrap_or_default();

    if rack.enabled.unwrap_or(false) && annotation.is_empty() {
        report.push("rackAwareness.nodeAnnotation", "Required when rack awareness is enabled");
    }
}

fn check_enterprise(values: &PartialValues, report: &mut Report) {
    let Some(enterprise) = &values.enterprise else {
        return;
    };

    let license = enterprise.license.as_deref().is_some_and(|l| !l.is_empty());

    if license && enterprise.license_secret_ref.is_some() {
        report.push("enterprise", "Set either license or licenseSecretRef, not both");
    }
}
