use once_cell::sync::Lazy;

use crate::{error::ResolveError, logger};

use super::version::{Release, Version};

/// Something the values ask for that only some Redpanda versions can deliver.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Feature {
    /// Deploying at all. Requested by every configuration.
    Baseline,
    RpcTls,
    Tunable(String),
}

impl std::fmt::Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Feature::Baseline => write!(f, "baseline"),
            Feature::RpcTls => write!(f, "rpc-tls"),
            Feature::Tunable(key) => write!(f, "tunable:{key}"),
        }
    }
}

/// Half open `[min, max)` range of releases. `max: None` is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionRange {
    pub min: Release,
    pub max: Option<Release>,
}

impl VersionRange {
    pub const fn at_least(min: Release) -> Self {
        Self { min, max: None }
    }

    pub const fn between(min: Release, max: Release) -> Self {
        Self {
            min,
            max: Some(max),
        }
    }

    pub fn contains(&self, release: Release) -> bool {
        self.min <= release && self.max.map_or(true, |max| release < max)
    }
}

/// Which requested features a gate guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateTarget {
    Baseline,
    RpcTls,
    Tunable(&'static str),
}

impl GateTarget {
    fn matches(&self, feature: &Feature) -> bool {
        match (self, feature) {
            (GateTarget::Baseline, Feature::Baseline) => true,
            (GateTarget::RpcTls, Feature::RpcTls) => true,
            (GateTarget::Tunable(key), Feature::Tunable(requested)) => *key == requested.as_str(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionGate {
    pub target: GateTarget,
    /// The gate passes when the target release falls in any of these ranges.
    pub satisfied_by: Vec<VersionRange>,
    pub message: &'static str,
}

impl VersionGate {
    pub fn new(target: GateTarget, satisfied_by: Vec<VersionRange>, message: &'static str) -> Self {
        Self {
            target,
            satisfied_by,
            message,
        }
    }

    pub fn is_satisfied_by(&self, release: Release) -> bool {
        self.satisfied_by.iter().any(|range| range.contains(release))
    }
}

/// Proof that every requested feature passed the gate table for `version`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Approval {
    pub version: Version,
    pub features: Vec<Feature>,
}

const RPC_TLS_MESSAGE: &str =
    "does not support TLS on the RPC port. Please upgrade. See technical service bulletin 2023-01.";

const GATED_TUNABLES: [&str; 3] = [
    "log_segment_size_min",
    "log_segment_size_max",
    "kafka_batch_max_bytes",
];

static BUILTIN: Lazy<GateTable> = Lazy::new(|| {
    let mut gates = vec![
        VersionGate::new(
            GateTarget::Baseline,
            vec![VersionRange::at_least((22, 2, 0))],
            "is no longer supported",
        ),
        // 22.3.14 carries the backported fix, the rest of the 22.x line does not.
        VersionGate::new(
            GateTarget::RpcTls,
            vec![
                VersionRange::between((22, 3, 14), (22, 4, 0)),
                VersionRange::at_least((23, 1, 2)),
            ],
            RPC_TLS_MESSAGE,
        ),
    ];

    gates.extend(GATED_TUNABLES.iter().map(|key| {
        VersionGate::new(
            GateTarget::Tunable(*key),
            vec![VersionRange::at_least((22, 3, 0))],
            "does not support this tunable property. Please upgrade to v22.3.0 or later.",
        )
    }));

    GateTable::new(gates)
});

/// Ordered list of version gates. The first failing gate wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateTable {
    gates: Vec<VersionGate>,
}

impl GateTable {
    pub fn new(gates: Vec<VersionGate>) -> Self {
        Self { gates }
    }

    /// The chart's gate table, built once and shared read-only.
    pub fn builtin() -> &'static GateTable {
        &BUILTIN
    }

    pub fn evaluate(
        &self,
        version: &Version,
        requested: &[Feature],
    ) -> Result<Approval, ResolveError> {
        let release = version.release();

        for gate in &self.gates {
            let Some(feature) = requested.iter().find(|f| gate.target.matches(f)) else {
                continue;
            };

            if gate.is_satisfied_by(release) {
                continue;
            }

            logger!(info, "version gate {} rejected {}", feature, version);

            let message = match feature {
                Feature::Tunable(key) => {
                    format!("Redpanda version {version} {} (config.tunable.{key})", gate.message)
                }
                _ => format!("Redpanda version {version} {}", gate.message),
            };

            return Err(ResolveError::VersionGate {
                feature: feature.clone(),
                message,
            });
        }

        Ok(Approval {
            version: version.clone(),
            features: requested.to_vec(),
        })
    }
}
