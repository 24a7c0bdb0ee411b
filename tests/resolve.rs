use std::collections::BTreeMap;

use indoc::indoc;
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::{json, Value};

use pandachart::{
    engine::{resolve, GateTable, RenderContext, ResolvedConfiguration},
    error::ResolveError,
    output::{render, OutputFormat},
    values::{PartialValues, ValuesLoader},
};

const RPC_TLS_MESSAGE: &str =
    "does not support TLS on the RPC port. Please upgrade. See technical service bulletin 2023-01.";

fn load(yaml: &str) -> PartialValues {
    ValuesLoader::new().document(yaml).load().unwrap()
}

fn resolve_values(values: &PartialValues) -> Result<ResolvedConfiguration, ResolveError> {
    resolve(values, &RenderContext::default(), GateTable::builtin())
}

fn resolve_yaml(yaml: &str) -> Result<ResolvedConfiguration, ResolveError> {
    resolve_values(&load(yaml))
}

/// `kind -> network -> truststore_file`, read back from the rendered `redpanda.yaml`.
fn truststores(config: &ResolvedConfiguration) -> BTreeMap<String, BTreeMap<String, String>> {
    let node = serde_json::to_value(&config.node).unwrap();

    let sections = [
        ("kafka", &node["redpanda"]["kafka_api_tls"]),
        ("admin", &node["redpanda"]["admin_api_tls"]),
        ("http", &node["pandaproxy"]["pandaproxy_api_tls"]),
        ("schema_registry", &node["schema_registry"]["schema_registry_api_tls"]),
    ];

    sections
        .into_iter()
        .map(|(kind, entries)| {
            let entries = entries
                .as_array()
                .into_iter()
                .flatten()
                .map(|entry| {
                    (
                        entry["name"].as_str().unwrap_or_default().to_string(),
                        entry["truststore_file"].as_str().unwrap_or_default().to_string(),
                    )
                })
                .collect();

            (kind.to_string(), entries)
        })
        .collect()
}

fn table(rows: &[(&str, &[(&str, &str)])]) -> BTreeMap<String, BTreeMap<String, String>> {
    rows.iter()
        .map(|(kind, entries)| {
            (
                kind.to_string(),
                entries
                    .iter()
                    .map(|(network, path)| (network.to_string(), path.to_string()))
                    .collect(),
            )
        })
        .collect()
}

mod versions {
    use super::*;
    use pretty_assertions::assert_eq;

    fn permutations() -> Vec<&'static str> {
        vec![
            indoc! {"
                config:
                  tunable:
                    log_segment_size_min: 100
                    log_segment_size_max: 99999
                    kafka_batch_max_bytes: 7777
            "},
            indoc! {"
                enterprise:
                  license: ATOTALLYVALIDLICENSE
            "},
            indoc! {"
                rackAwareness:
                  enabled: true
                  nodeAnnotation: topology-label
            "},
        ]
    }

    #[rstest]
    #[case(None, "v22.1.0", Some("no longer supported"))]
    #[case(None, "v22.2.0", Some(RPC_TLS_MESSAGE))]
    #[case(None, "v22.3.0", Some(RPC_TLS_MESSAGE))]
    #[case(None, "v22.3.14", None)]
    #[case(None, "v22.4.0", Some(RPC_TLS_MESSAGE))]
    #[case(None, "v23.1.1", Some(RPC_TLS_MESSAGE))]
    #[case(None, "v23.1.2", None)]
    #[case(None, "v23.1.3", None)]
    #[case(None, "v23.2.1", None)]
    #[case(None, "v23.3.0", None)]
    #[case(None, "v24.1.0", None)]
    #[case(Some("somecustomrepo"), "v24.1.0", None)]
    #[case(Some("somecustomrepo"), "v23.2.8", None)]
    fn gates_apply_to_every_permutation(
        #[case] repository: Option<&str>,
        #[case] tag: &str,
        #[case] expected_error: Option<&str>,
    ) {
        for permutation in permutations() {
            let mut loader = ValuesLoader::new()
                .document(permutation)
                .set(format!("image.tag={tag}").parse().unwrap());

            if let Some(repository) = repository {
                loader = loader.set(format!("image.repository={repository}").parse().unwrap());
            }

            let result = resolve_values(&loader.load().unwrap());

            match expected_error {
                Some(message) => {
                    let err = result.unwrap_err();
                    assert!(
                        err.to_string().contains(message),
                        "{tag}: expected {message:?} in {err}"
                    );
                }
                None => {
                    let config = result.unwrap();
                    assert_eq!(config.version.to_string(), tag);
                    assert_eq!(
                        config.image.repository,
                        repository.unwrap_or("docker.redpanda.com/redpandadata/redpanda")
                    );
                }
            }
        }
    }

    #[test]
    fn unsupported_version_fails_regardless_of_other_fields() {
        for values in [
            "image: {tag: v22.1.0}",
            "image: {tag: v22.1.0}\ntls: {enabled: false}",
            "image: {tag: v22.1.0}\nlisteners: {kafka: {tls: {trustStore: {configMapKeyRef: {name: a, key: b}, secretKeyRef: {name: a, key: b}}}}}",
        ] {
            let err = resolve_yaml(values).unwrap_err();

            assert_eq!(err.to_string(), "Redpanda version v22.1.0 is no longer supported");
        }
    }

    #[rstest]
    #[case("v22.2.0")]
    #[case("v23.1.1")]
    fn rpc_gate_only_fires_when_rpc_serves_tls(#[case] tag: &str) {
        let values = load(&format!("image: {{tag: {tag}}}\nlisteners: {{rpc: {{tls: {{enabled: false}}}}}}"));

        assert!(resolve_values(&values).is_ok());
    }

    #[test]
    fn gated_tunables_need_v22_3() {
        let err = resolve_yaml(indoc! {"
            image:
              tag: v22.2.0
            tls:
              enabled: false
            config:
              tunable:
                log_segment_size_max: 99999
        "})
        .unwrap_err();

        assert!(err
            .to_string()
            .ends_with("(config.tunable.log_segment_size_max)"));
    }
}

mod trust_stores {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn ca_enabled() {
        let config = resolve_yaml(indoc! {"
            affinity: {}
            tls:
              certs:
                default:
                  caEnabled: true
                external:
                  caEnabled: true
        "})
        .unwrap();

        let both: &[(&str, &str)] = &[
            ("default", "/etc/tls/certs/external/ca.crt"),
            ("internal", "/etc/tls/certs/default/ca.crt"),
        ];

        assert_eq!(
            truststores(&config),
            table(&[
                ("admin", both),
                ("http", both),
                ("kafka", both),
                ("schema_registry", both),
            ])
        );
    }

    #[test]
    fn internal_truststore() {
        let config = resolve_yaml(indoc! {"
            affinity: {}
            listeners:
              admin:
                external:
                  my-admin:
                    port: 1234
                    tls:
                      cert: default
                      trustStore:
                        configMapKeyRef:
                          key: my-admin.crt
                          name: admin-cm
                tls:
                  trustStore:
                    configMapKeyRef:
                      key: other.crt
                      name: admin-cm
              http:
                external:
                  my-http:
                    port: 1234
                    tls:
                      cert: default
                      trustStore:
                        configMapKeyRef:
                          key: my-http.crt
                          name: http-cm
                tls:
                  trustStore:
                    configMapKeyRef:
                      key: ca.crt
                      name: http-cm
              kafka:
                external:
                  my-kafka:
                    port: 1234
                    tls:
                      cert: default
                      trustStore:
                        secretKeyRef:
                          key: my-kafka.crt
                          name: kafka-secret
                tls:
                  trustStore:
                    configMapKeyRef:
                      key: ca.crt
                      name: my-ca-bundle
              rpc: {}
              schemaRegistry:
                external:
                  my-sr:
                    port: 1234
                    tls:
                      cert: default
                      trustStore:
                        secretKeyRef:
                          key: my-sr.crt
                          name: sr-secret
                tls:
                  trustStore:
                    secretKeyRef:
                      key: ca.crt
                      name: sr-secret
            tls:
              certs:
                default:
                  caEnabled: true
                external:
                  caEnabled: true
        "})
        .unwrap();

        assert_eq!(
            truststores(&config),
            table(&[
                (
                    "admin",
                    &[
                        ("default", "/etc/tls/certs/external/ca.crt"),
                        ("internal", "/etc/truststores/configmaps/admin-cm-other.crt"),
                        ("my-admin", "/etc/truststores/configmaps/admin-cm-my-admin.crt"),
                    ]
                ),
                (
                    "http",
                    &[
                        ("default", "/etc/tls/certs/external/ca.crt"),
                        ("internal", "/etc/truststores/configmaps/http-cm-ca.crt"),
                        ("my-http", "/etc/truststores/configmaps/http-cm-my-http.crt"),
                    ]
                ),
                (
                    "kafka",
                    &[
                        ("default", "/etc/tls/certs/external/ca.crt"),
                        ("internal", "/etc/truststores/configmaps/my-ca-bundle-ca.crt"),
                        ("my-kafka", "/etc/truststores/secrets/kafka-secret-my-kafka.crt"),
                    ]
                ),
                (
                    "schema_registry",
                    &[
                        ("default", "/etc/tls/certs/external/ca.crt"),
                        ("internal", "/etc/truststores/secrets/sr-secret-ca.crt"),
                        ("my-sr", "/etc/truststores/secrets/sr-secret-my-sr.crt"),
                    ]
                ),
            ])
        );

        let truststore_volume = config
            .volumes
            .iter()
            .find(|v| v.name == "truststores")
            .and_then(|v| v.projected.clone())
            .and_then(|p| p.sources)
            .unwrap();

        // admin-cm, http-cm, my-ca-bundle, kafka-secret, sr-secret
        assert_eq!(truststore_volume.len(), 5);
        assert!(config
            .volume_mounts
            .iter()
            .any(|m| m.name == "truststores" && m.read_only == Some(true)));
    }

    #[test]
    fn shared_references_are_mounted_once() {
        let config = resolve_yaml(indoc! {"
            listeners:
              kafka:
                tls:
                  trustStore:
                    secretKeyRef: {name: shared, key: ca.crt}
                external:
                  default:
                    tls:
                      trustStore:
                        secretKeyRef: {name: shared, key: ca.crt}
              admin:
                tls:
                  trustStore:
                    secretKeyRef: {name: shared, key: ca.crt}
        "})
        .unwrap();

        assert_eq!(config.trust_stores.mounts().count(), 1);

        let path = "/etc/truststores/secrets/shared-ca.crt";
        let tables = truststores(&config);
        assert_eq!(tables["kafka"]["internal"], path);
        assert_eq!(tables["kafka"]["default"], path);
        assert_eq!(tables["admin"]["internal"], path);
    }

    #[test]
    fn both_references_are_rejected() {
        let err = resolve_yaml(indoc! {"
            listeners:
              kafka:
                tls:
                  trustStore:
                    configMapKeyRef:
                      key: ca.crt
                      name: my-ca-bundle
                    secretKeyRef:
                      key: ca.crt
                      name: my-secret
        "})
        .unwrap_err();

        assert_eq!(
            err.to_string(),
            "listeners.kafka.tls.trustStore: Must have at most 1 properties"
        );
    }
}

mod certificates {
    use super::*;
    use pretty_assertions::assert_eq;

    #[rstest]
    #[case::overriding_defaults(indoc! {"
        affinity: {}
        tls:
          certs:
            default:
              secretRef:
                name: some-secret
            external:
              secretRef:
                name: some-other-secret
    "})]
    #[case::fully_specified(indoc! {"
        affinity: {}
        listeners:
          http:
            external:
              default:
                tls:
                  cert: for-external
                  requireClientAuth: false
            tls:
              cert: for-internal
          kafka:
            external:
              default:
                tls:
                  cert: for-external
                  requireClientAuth: false
            tls:
              cert: for-internal
          rpc:
            tls:
              cert: for-internal
          schemaRegistry:
            external:
              default:
                tls:
                  cert: for-external
                  requireClientAuth: false
            tls:
              cert: for-internal
        tls:
          certs:
            default:
              enabled: false
            external:
              enabled: false
            for-external:
              secretRef:
                name: some-other-secret
            for-internal:
              secretRef:
                name: some-secret
    "})]
    fn user_supplied_secrets_need_no_certificates(#[case] yaml: &str) {
        let config = resolve_yaml(yaml).unwrap();

        assert!(config.certificate_requests.is_empty());

        let secrets: Vec<String> = config
            .volumes
            .iter()
            .filter_map(|v| v.secret.as_ref())
            .filter_map(|s| s.secret_name.clone())
            .collect();

        assert!(!secrets.is_empty());
        assert!(secrets
            .iter()
            .all(|s| s == "some-secret" || s == "some-other-secret"));
    }

    #[test]
    fn disabled_certificate_keeps_the_listener_plain() {
        let config = resolve_yaml(indoc! {"
            tls:
              certs:
                default:
                  enabled: false
                external:
                  enabled: false
        "})
        .unwrap();

        assert!(config.certificate_requests.is_empty());
        assert!(config.volumes.is_empty());
        assert!(config.node.redpanda.kafka_api_tls.is_empty());
        assert_eq!(config.node.redpanda.rpc_server_tls, None);
    }
}

mod cluster {
    use super::*;
    use pretty_assertions::assert_eq;

    #[rstest]
    #[case("statefulset: {replicas: 1}", None)]
    #[case("statefulset: {replicas: 10}", Some(json!(3)))]
    #[case("statefulset: {replicas: 1}\nconfig: {cluster: {default_topic_replications: 25}}", Some(json!(25)))]
    #[case("statefulset: {replicas: 10}\nconfig: {cluster: {default_topic_replications: 25}}", Some(json!(25)))]
    fn default_topic_replications(#[case] yaml: &str, #[case] expected: Option<Value>) {
        let config = resolve_yaml(yaml).unwrap();

        assert_eq!(
            config.cluster.get("default_topic_replications").cloned(),
            expected
        );
    }
}

#[test]
fn rendering_is_deterministic() {
    let yaml = indoc! {"
        listeners:
          kafka:
            tls:
              requireClientAuth: true
              trustStore:
                configMapKeyRef: {name: bundle, key: ca.crt}
        config:
          cluster:
            b: 2
            a: 1
    "};

    for format in [OutputFormat::Yaml, OutputFormat::Json] {
        let first = render(&resolve_yaml(yaml).unwrap(), format).unwrap();
        let second = render(&resolve_yaml(yaml).unwrap(), format).unwrap();

        assert_eq!(first, second);
    }
}
