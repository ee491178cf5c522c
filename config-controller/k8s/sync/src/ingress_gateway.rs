use crate::{
    entry::{config_status, ConfigEntry},
    shared::ToRemote,
};
use consul_config_controller_core::{
    check,
    compare::{Comparison, SERVER_FIELDS},
    field::{quote, FieldError, Path, Value},
    remote::{self, RemoteEntry},
    Capabilities, ErrorList, WILDCARD,
};
use consul_config_controller_k8s_api::{
    ingress_gateway::{
        GatewayServiceTlsConfig, GatewayTlsConfig, GatewayTlsSdsConfig, IngressListener,
        IngressService, IngressServiceConfig,
    },
    IngressGateway, ResourceExt,
};

pub(crate) const TLS_VERSIONS: &[&str] =
    &["TLS_AUTO", "TLSv1_0", "TLSv1_1", "TLSv1_2", "TLSv1_3", ""];

const LISTENER_PROTOCOLS: &[&str] = &["tcp", "http", "http2", "grpc"];

impl ConfigEntry for IngressGateway {
    const REMOTE_KIND: &'static str = "ingress-gateway";

    const COMPARISON: Comparison = Comparison {
        ignore: SERVER_FIELDS,
        default_is_empty: &[
            "Listeners[].Services[].Namespace",
            "Listeners[].Services[].Partition",
        ],
        zero_is_absent: &[],
        unordered: &[],
    };

    config_status!();

    fn validate(&self, caps: &Capabilities) -> ErrorList {
        let spec = &self.spec;
        let path = Path::spec();
        let mut errs = tls(&path.child("tls"), &spec.tls);
        for (i, listener) in spec.listeners.iter().enumerate() {
            errs.extend(validate_listener(
                &path.child("listeners").index(i),
                listener,
                caps,
            ));
        }
        if let Some(defaults) = &spec.defaults {
            errs.extend(limits(&path.child("defaults"), defaults));
        }
        errs
    }

    fn default_tenancy(&mut self, caps: &Capabilities) {
        if !caps.namespaces {
            return;
        }
        let ns = caps.remote_namespace(&self.namespace().unwrap_or_default());
        for svc in self
            .spec
            .listeners
            .iter_mut()
            .flat_map(|l| l.services.iter_mut())
        {
            if svc.namespace.is_empty() {
                svc.namespace = ns.clone();
            }
        }
    }

    fn to_remote(&self, datacenter: &str) -> RemoteEntry {
        let spec = &self.spec;
        remote::IngressGateway {
            name: self.name_any(),
            tls: spec.tls.to_remote(),
            listeners: spec.listeners.to_remote(),
            defaults: spec.defaults.to_remote(),
            meta: remote::meta(datacenter),
            ..remote::IngressGateway::default()
        }
        .into()
    }
}

pub(crate) fn tls(path: &Path, tls: &GatewayTlsConfig) -> ErrorList {
    let mut errs = ErrorList::default();
    errs.extend(check::one_of(
        path.child("tlsMaxVersion"),
        &tls.tls_max_version,
        TLS_VERSIONS,
    ));
    errs.extend(check::one_of(
        path.child("tlsMinVersion"),
        &tls.tls_min_version,
        TLS_VERSIONS,
    ));
    errs
}

fn validate_listener(path: &Path, listener: &IngressListener, caps: &Capabilities) -> ErrorList {
    let mut errs = ErrorList::default();
    let protocol = listener.protocol.as_str();
    errs.extend(check::one_of(
        path.child("protocol"),
        protocol,
        LISTENER_PROTOCOLS,
    ));
    if protocol == "tcp" && listener.services.len() > 1 {
        errs.push(FieldError::invalid(
            path.child("services"),
            Value::repr(&listener.services),
            format!(
                r#"if protocol is "tcp", only a single service is allowed, found {}"#,
                listener.services.len()
            ),
        ));
    }
    if let Some(t) = &listener.tls {
        errs.extend(tls(&path.child("tls"), t));
    }

    for (i, svc) in listener.services.iter().enumerate() {
        let svc_path = path.child("services").index(i);
        if svc.name == WILDCARD && protocol != "http" {
            errs.push(FieldError::invalid(
                svc_path.child("name"),
                &svc.name,
                format!(
                    r#"if name is {}, protocol must be "http" but was {}"#,
                    quote(WILDCARD),
                    quote(protocol)
                ),
            ));
        }
        if svc.name == WILDCARD && !svc.hosts.is_empty() {
            errs.push(FieldError::invalid(
                svc_path.child("hosts"),
                Value::repr(&svc.hosts),
                format!("hosts must be empty if name is {}", quote(WILDCARD)),
            ));
        }
        errs.extend(check::gated(
            svc_path.child("partition"),
            &svc.partition,
            caps.partitions,
            "Consul Enterprise admin-partitions must be enabled to set service.partition",
        ));
        errs.extend(check::gated(
            svc_path.child("namespace"),
            &svc.namespace,
            caps.namespaces,
            "Consul Enterprise namespaces must be enabled to set service.namespace",
        ));
        if !svc.hosts.is_empty() && protocol == "tcp" {
            errs.push(FieldError::invalid(
                svc_path.child("hosts"),
                Value::repr(&svc.hosts),
                r#"hosts must be empty if protocol is "tcp""#,
            ));
        }
        // Limits are reported against the listener.
        errs.extend(limits(path, &svc.config));
    }
    errs
}

fn limits(path: &Path, config: &IngressServiceConfig) -> ErrorList {
    [
        (config.max_connections, "maxconnections", "MaxConnections must be > 0"),
        (
            config.max_concurrent_requests,
            "maxconcurrentrequests",
            "MaxConcurrentRequests must be > 0",
        ),
        (
            config.max_pending_requests,
            "maxpendingrequests",
            "MaxPendingRequests must be > 0",
        ),
    ]
    .into_iter()
    .filter(|(limit, _, _)| *limit == Some(0))
    .map(|(_, field, detail)| FieldError::invalid(path.child(field), 0u32, detail))
    .collect()
}

impl ToRemote for GatewayTlsConfig {
    type Remote = remote::GatewayTlsConfig;

    fn to_remote(&self) -> Self::Remote {
        remote::GatewayTlsConfig {
            enabled: self.enabled,
            sds: self.sds.to_remote(),
            tls_min_version: self.tls_min_version.clone(),
            tls_max_version: self.tls_max_version.clone(),
            cipher_suites: self.cipher_suites.clone(),
        }
    }
}

impl ToRemote for GatewayTlsSdsConfig {
    type Remote = remote::GatewayTlsSdsConfig;

    fn to_remote(&self) -> Self::Remote {
        remote::GatewayTlsSdsConfig {
            cluster_name: self.cluster_name.clone(),
            cert_resource: self.cert_resource.clone(),
        }
    }
}

impl ToRemote for GatewayServiceTlsConfig {
    type Remote = remote::GatewayServiceTlsConfig;

    fn to_remote(&self) -> Self::Remote {
        remote::GatewayServiceTlsConfig {
            sds: self.sds.to_remote(),
        }
    }
}

impl ToRemote for IngressListener {
    type Remote = remote::IngressListener;

    fn to_remote(&self) -> Self::Remote {
        remote::IngressListener {
            port: self.port,
            protocol: self.protocol.clone(),
            tls: self.tls.to_remote(),
            services: self.services.to_remote(),
        }
    }
}

impl ToRemote for IngressService {
    type Remote = remote::IngressService;

    fn to_remote(&self) -> Self::Remote {
        remote::IngressService {
            name: self.name.clone(),
            hosts: self.hosts.clone(),
            namespace: self.namespace.clone(),
            partition: self.partition.clone(),
            tls: self.tls.to_remote(),
            request_headers: self.request_headers.to_remote(),
            response_headers: self.response_headers.to_remote(),
            config: self.config.to_remote(),
        }
    }
}

impl ToRemote for IngressServiceConfig {
    type Remote = remote::IngressServiceConfig;

    fn to_remote(&self) -> Self::Remote {
        remote::IngressServiceConfig {
            max_connections: self.max_connections,
            max_pending_requests: self.max_pending_requests,
            max_concurrent_requests: self.max_concurrent_requests,
            passive_health_check: self.passive_health_check.to_remote(),
        }
    }
}
