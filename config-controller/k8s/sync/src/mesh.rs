use crate::{
    entry::{config_status, singleton, ConfigEntry, Conflict},
    ingress_gateway::TLS_VERSIONS,
    shared::ToRemote,
};
use consul_config_controller_core::{
    check,
    field::{FieldError, Path},
    remote::{self, RemoteEntry, MESH_NAME},
    Capabilities, ErrorList, DEFAULT_TENANCY,
};
use consul_config_controller_k8s_api::mesh::{
    MeshDirectionalHttpConfig, MeshDirectionalTlsConfig, MeshHttpConfig, MeshTlsConfig,
    PeeringMeshConfig, RequestNormalizationMeshConfig, TransparentProxyMeshConfig,
};
use consul_config_controller_k8s_api::Mesh;
use kube::core::admission::Operation;

const PATH_WITH_ESCAPED_SLASHES_ACTIONS: &[&str] = &[
    "IMPLEMENTATION_SPECIFIC_DEFAULT",
    "KEEP_UNCHANGED",
    "REJECT_REQUEST",
    "UNESCAPE_AND_REDIRECT",
    "UNESCAPE_AND_FORWARD",
    "",
];

const HEADERS_WITH_UNDERSCORES_ACTIONS: &[&str] = &["ALLOW", "REJECT_REQUEST", "DROP_HEADER", ""];

impl ConfigEntry for Mesh {
    const REMOTE_KIND: &'static str = "mesh";
    const GLOBAL: bool = true;

    config_status!();

    fn validate(&self, caps: &Capabilities) -> ErrorList {
        let spec = &self.spec;
        let path = Path::spec();
        let mut errs = ErrorList::default();

        if let Some(tls) = &spec.tls {
            let path = path.child("tls");
            for (dir, config) in [("incoming", &tls.incoming), ("outgoing", &tls.outgoing)] {
                if let Some(config) = config {
                    errs.extend(tls_versions(&path.child(dir), config));
                }
            }
        }

        let peers_through_gateways = spec
            .peering
            .as_ref()
            .is_some_and(|p| p.peer_through_mesh_gateways);
        if caps.partitions && peers_through_gateways && caps.partition != DEFAULT_TENANCY {
            errs.push(FieldError::forbidden(
                path.child("peering").child("peerThroughMeshGateways"),
                r#""peerThroughMeshGateways" is only valid in the "default" partition"#,
            ));
        }

        let normalization = spec
            .http
            .as_ref()
            .and_then(|h| h.incoming.as_ref())
            .and_then(|i| i.request_normalization.as_ref());
        if let Some(rn) = normalization {
            let path = path
                .child("http")
                .child("incoming")
                .child("requestNormalization");
            errs.extend(check::one_of(
                path.child("pathWithEscapedSlashesAction"),
                &rn.path_with_escaped_slashes_action,
                PATH_WITH_ESCAPED_SLASHES_ACTIONS,
            ));
            errs.extend(check::one_of(
                path.child("headersWithUnderscoresAction"),
                &rn.headers_with_underscores_action,
                HEADERS_WITH_UNDERSCORES_ACTIONS,
            ));
        }
        errs
    }

    fn to_remote(&self, datacenter: &str) -> RemoteEntry {
        let spec = &self.spec;
        remote::Mesh {
            transparent_proxy: spec.transparent_proxy.to_remote(),
            allow_enabling_permissive_mutual_tls: spec.allow_enabling_permissive_mutual_tls,
            tls: spec.tls.to_remote(),
            http: spec.http.to_remote(),
            peering: spec.peering.to_remote(),
            validate_clusters: spec.validate_clusters,
            meta: remote::meta(datacenter),
            ..remote::Mesh::default()
        }
        .into()
    }

    fn check_siblings(
        &self,
        op: Operation,
        _old: Option<&Self>,
        siblings: &[Self],
        _caps: &Capabilities,
    ) -> Result<(), Conflict> {
        if op != Operation::Create {
            return Ok(());
        }
        singleton(siblings, MESH_NAME)
    }

    fn remote_name(&self) -> String {
        MESH_NAME.to_string()
    }
}

fn tls_versions(path: &Path, config: &MeshDirectionalTlsConfig) -> ErrorList {
    let mut errs = ErrorList::default();
    errs.extend(check::one_of(
        path.child("tlsMaxVersion"),
        &config.tls_max_version,
        TLS_VERSIONS,
    ));
    errs.extend(check::one_of(
        path.child("tlsMinVersion"),
        &config.tls_min_version,
        TLS_VERSIONS,
    ));
    errs
}

impl ToRemote for TransparentProxyMeshConfig {
    type Remote = remote::TransparentProxyMeshConfig;

    fn to_remote(&self) -> Self::Remote {
        remote::TransparentProxyMeshConfig {
            mesh_destinations_only: self.mesh_destinations_only,
        }
    }
}

impl ToRemote for MeshTlsConfig {
    type Remote = remote::MeshTlsConfig;

    fn to_remote(&self) -> Self::Remote {
        remote::MeshTlsConfig {
            incoming: self.incoming.to_remote(),
            outgoing: self.outgoing.to_remote(),
        }
    }
}

impl ToRemote for MeshDirectionalTlsConfig {
    type Remote = remote::TlsVersions;

    fn to_remote(&self) -> Self::Remote {
        remote::TlsVersions {
            tls_min_version: self.tls_min_version.clone(),
            tls_max_version: self.tls_max_version.clone(),
            cipher_suites: self.cipher_suites.clone(),
        }
    }
}

impl ToRemote for MeshHttpConfig {
    type Remote = remote::MeshHttpConfig;

    fn to_remote(&self) -> Self::Remote {
        remote::MeshHttpConfig {
            sanitize_x_forwarded_client_cert: self.sanitize_x_forwarded_client_cert,
            incoming: self.incoming.to_remote(),
        }
    }
}

impl ToRemote for MeshDirectionalHttpConfig {
    type Remote = remote::MeshDirectionalHttpConfig;

    fn to_remote(&self) -> Self::Remote {
        remote::MeshDirectionalHttpConfig {
            request_normalization: self.request_normalization.to_remote(),
        }
    }
}

impl ToRemote for RequestNormalizationMeshConfig {
    type Remote = remote::RequestNormalizationMeshConfig;

    fn to_remote(&self) -> Self::Remote {
        remote::RequestNormalizationMeshConfig {
            insecure_disable_path_normalization: self.insecure_disable_path_normalization,
            merge_slashes: self.merge_slashes,
            path_with_escaped_slashes_action: self.path_with_escaped_slashes_action.clone(),
            headers_with_underscores_action: self.headers_with_underscores_action.clone(),
        }
    }
}

impl ToRemote for PeeringMeshConfig {
    type Remote = remote::PeeringMeshConfig;

    fn to_remote(&self) -> Self::Remote {
        remote::PeeringMeshConfig {
            peer_through_mesh_gateways: self.peer_through_mesh_gateways,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{messages, meta, partitions};
    use consul_config_controller_k8s_api::mesh::MeshSpec;
    use pretty_assertions::assert_eq;

    fn resource(spec: MeshSpec) -> Mesh {
        Mesh {
            metadata: meta("consul", "mesh"),
            spec,
            status: None,
        }
    }

    #[test]
    fn tls_versions_are_checked() {
        let m = resource(MeshSpec {
            tls: Some(MeshTlsConfig {
                incoming: Some(MeshDirectionalTlsConfig {
                    tls_min_version: "TLSv1_2".to_string(),
                    tls_max_version: "TLSv2".to_string(),
                    cipher_suites: vec![],
                }),
                outgoing: Some(MeshDirectionalTlsConfig {
                    tls_min_version: "foo".to_string(),
                    ..MeshDirectionalTlsConfig::default()
                }),
            }),
            ..MeshSpec::default()
        });
        let errs = m.validate(&Capabilities::default());
        let fields = errs.iter().map(|e| e.field.as_str()).collect::<Vec<_>>();
        assert_eq!(
            fields,
            vec!["spec.tls.incoming.tlsMaxVersion", "spec.tls.outgoing.tlsMinVersion"]
        );
    }

    #[test]
    fn peering_through_gateways_only_in_default_partition() {
        let m = resource(MeshSpec {
            peering: Some(PeeringMeshConfig {
                peer_through_mesh_gateways: true,
            }),
            ..MeshSpec::default()
        });
        assert_eq!(messages(m.validate(&partitions("default"))), Vec::<String>::new());
        assert_eq!(messages(m.validate(&Capabilities::default())), Vec::<String>::new());
        assert_eq!(
            messages(m.validate(&partitions("ap1"))),
            vec![r#"spec.peering.peerThroughMeshGateways: Forbidden: "peerThroughMeshGateways" is only valid in the "default" partition"#]
        );
    }

    #[test]
    fn request_normalization_actions() {
        let m = resource(MeshSpec {
            http: Some(MeshHttpConfig {
                sanitize_x_forwarded_client_cert: false,
                incoming: Some(MeshDirectionalHttpConfig {
                    request_normalization: Some(RequestNormalizationMeshConfig {
                        path_with_escaped_slashes_action: "KEEP_UNCHANGED".to_string(),
                        headers_with_underscores_action: "KEEP".to_string(),
                        ..RequestNormalizationMeshConfig::default()
                    }),
                }),
            }),
            ..MeshSpec::default()
        });
        assert_eq!(
            messages(m.validate(&Capabilities::default())),
            vec![r#"spec.http.incoming.requestNormalization.headersWithUnderscoresAction: Invalid value: "KEEP": must be one of "ALLOW", "REJECT_REQUEST", "DROP_HEADER", """#]
        );
    }

    #[test]
    fn singleton_named_mesh() {
        let m = resource(MeshSpec::default());
        assert_eq!(m.remote_name(), "mesh");
        assert_eq!(m.to_remote("dc1").name(), "mesh");

        let err = m
            .check_siblings(
                Operation::Create,
                None,
                &[resource(MeshSpec::default())],
                &Capabilities::default(),
            )
            .expect_err("second mesh must be rejected");
        assert_eq!(
            err.to_string(),
            "mesh resource already defined - only one mesh entry is supported"
        );
    }

    #[test]
    fn matches_echoed_entry() {
        let m = resource(MeshSpec {
            transparent_proxy: TransparentProxyMeshConfig {
                mesh_destinations_only: true,
            },
            ..MeshSpec::default()
        });
        let mut echoed = m.to_remote("dc1");
        if let RemoteEntry::Mesh(e) = &mut echoed {
            e.namespace = "default".to_string();
            e.partition = "default".to_string();
            e.modify_index = 42;
        }
        assert!(m.matches(&echoed));

        if let RemoteEntry::Mesh(e) = &mut echoed {
            e.transparent_proxy.mesh_destinations_only = false;
        }
        assert!(!m.matches(&echoed));
    }
}
