use crate::{
    entry::{config_status, ConfigEntry},
    shared::{self, ToRemote},
};
use consul_config_controller_core::{
    check,
    compare::{Comparison, SERVER_FIELDS},
    field::{FieldError, Path, Value},
    remote::{self, RemoteEntry},
    Capabilities, ErrorList,
};
use consul_config_controller_k8s_api::{
    service_defaults::{
        InstanceLevelRateLimits, RateLimits, ServiceDefaultsDestination, Upstream, UpstreamLimits,
        Upstreams,
    },
    ResourceExt, ServiceDefaults,
};
use std::net::IpAddr;

const PROTOCOLS: &[&str] = &["tcp", "http", "http2", "grpc"];

const MAX_DOMAIN_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

impl ConfigEntry for ServiceDefaults {
    const REMOTE_KIND: &'static str = "service-defaults";

    const COMPARISON: Comparison = Comparison {
        ignore: SERVER_FIELDS,
        default_is_empty: &[
            "UpstreamConfig.Overrides[].Namespace",
            "UpstreamConfig.Overrides[].Partition",
        ],
        zero_is_absent: &["TransparentProxy"],
        unordered: &[],
    };

    config_status!();

    fn validate(&self, caps: &Capabilities) -> ErrorList {
        let spec = &self.spec;
        let path = Path::spec();
        let mut errs = ErrorList::default();

        if !spec.protocol.is_empty() {
            errs.extend(check::one_of(
                path.child("protocol"),
                &spec.protocol,
                PROTOCOLS,
            ));
        }
        errs.extend(shared::mesh_gateway(
            &path.child("meshGateway"),
            &spec.mesh_gateway,
        ));
        errs.extend(shared::transparent_proxy(
            &path.child("transparentProxy"),
            spec.transparent_proxy.as_ref(),
        ));
        errs.extend(shared::mutual_tls_mode(
            path.child("mutualTLSMode"),
            &spec.mutual_tls_mode,
        ));
        errs.extend(shared::proxy_mode(path.child("mode"), spec.mode.as_ref()));
        if let Some(dest) = &spec.destination {
            errs.extend(destination(&path.child("destination"), dest));
        }

        if spec.max_inbound_connections < 0 {
            errs.push(FieldError::invalid(
                path.child("maxinboundconnections"),
                spec.max_inbound_connections,
                "MaxInboundConnections must be > 0",
            ));
        }
        if spec.local_connect_timeout_ms < 0 {
            errs.push(FieldError::invalid(
                path.child("localConnectTimeoutMs"),
                spec.local_connect_timeout_ms,
                "LocalConnectTimeoutMs must be > 0",
            ));
        }
        if spec.local_request_timeout_ms < 0 {
            errs.push(FieldError::invalid(
                path.child("localRequestTimeoutMs"),
                spec.local_request_timeout_ms,
                "LocalRequestTimeoutMs must be > 0",
            ));
        }
        if !matches!(
            spec.balance_inbound_connections.as_str(),
            "" | "exact_balance"
        ) {
            errs.push(FieldError::invalid(
                path.child("balanceInboundConnections"),
                &spec.balance_inbound_connections,
                "BalanceInboundConnections must be an empty string or exact_balance",
            ));
        }

        if let Some(upstreams) = &spec.upstream_config {
            errs.extend(upstream_config(
                &path.child("upstreamConfig"),
                upstreams,
                caps.partitions,
            ));
        }
        errs.extend(shared::expose(&path.child("expose"), &spec.expose));
        if let Some(RateLimits { instance_level }) = &spec.rate_limits {
            errs.extend(instance_level_rate_limits(
                &path.child("rateLimits").child("instanceLevel"),
                instance_level,
            ));
        }
        errs.extend(shared::envoy_extensions(
            &path.child("envoyExtensions"),
            &spec.envoy_extensions,
        ));
        errs
    }

    fn to_remote(&self, datacenter: &str) -> RemoteEntry {
        let spec = &self.spec;
        remote::ServiceDefaults {
            name: self.name_any(),
            protocol: spec.protocol.clone(),
            mesh_gateway: spec.mesh_gateway.to_remote(),
            expose: spec.expose.to_remote(),
            external_sni: spec.external_sni.clone(),
            transparent_proxy: spec.transparent_proxy.to_remote(),
            mutual_tls_mode: spec.mutual_tls_mode.clone(),
            upstream_config: spec.upstream_config.to_remote(),
            destination: spec.destination.to_remote(),
            max_inbound_connections: spec.max_inbound_connections,
            local_connect_timeout_ms: spec.local_connect_timeout_ms,
            local_request_timeout_ms: spec.local_request_timeout_ms,
            balance_inbound_connections: spec.balance_inbound_connections.clone(),
            rate_limits: spec.rate_limits.to_remote(),
            envoy_extensions: spec.envoy_extensions.to_remote(),
            meta: remote::meta(datacenter),
            ..remote::ServiceDefaults::default()
        }
        .into()
    }
}

fn destination(path: &Path, dest: &ServiceDefaultsDestination) -> ErrorList {
    let mut errs = ErrorList::default();
    if dest.addresses.is_empty() {
        errs.push(FieldError::required(
            path.child("addresses"),
            "at least one address must be define per destination",
        ));
    }

    let mut seen = ahash::AHashSet::new();
    for (i, address) in dest.addresses.iter().enumerate() {
        let path = path.child("addresses").index(i);
        if !seen.insert(address.as_str()) {
            errs.push(FieldError::duplicate(path, address));
            continue;
        }
        if !valid_endpoint_address(address) {
            errs.push(FieldError::invalid(
                path,
                address,
                format!("address {address} is not a valid IP or hostname"),
            ));
        }
    }

    if !(1..=65535).contains(&dest.port) {
        errs.push(FieldError::invalid(
            path.child("port"),
            dest.port,
            "invalid port number",
        ));
    }
    errs
}

/// Accepts IP addresses and wildcard-free domain names.
fn valid_endpoint_address(address: &str) -> bool {
    if address.is_empty() {
        return false;
    }
    if address.parse::<IpAddr>().is_ok() {
        return true;
    }
    !address.contains('*') && is_domain_name(address)
}

fn is_domain_name(name: &str) -> bool {
    if name == "." {
        return true;
    }
    let name = name.strip_suffix('.').unwrap_or(name);
    name.len() <= MAX_DOMAIN_LEN
        && name
            .split('.')
            .all(|label| !label.is_empty() && label.len() <= MAX_LABEL_LEN)
}

fn upstream_config(path: &Path, upstreams: &Upstreams, partitions: bool) -> ErrorList {
    let mut errs = ErrorList::default();
    if let Some(defaults) = &upstreams.defaults {
        let path = path.child("defaults");
        for (field, value) in [
            ("name", &defaults.name),
            ("namespace", &defaults.namespace),
            ("partition", &defaults.partition),
            ("peer", &defaults.peer),
        ] {
            if !value.is_empty() {
                errs.push(FieldError::invalid(
                    path.child(field),
                    value,
                    format!(r#"upstream.{field} for a default upstream must be """#),
                ));
            }
        }
        errs.extend(upstream(&path, defaults, partitions));
    }

    for (i, o) in upstreams.overrides.iter().enumerate() {
        let path = path.child("overrides").index(i);
        if o.name.is_empty() {
            errs.push(FieldError::invalid(
                path.child("name"),
                &o.name,
                r#"upstream.name for an override upstream cannot be """#,
            ));
        }
        if !o.namespace.is_empty() && !o.peer.is_empty() {
            errs.push(FieldError::invalid(
                path.clone(),
                Value::repr(o),
                "both namespace and peer cannot be specified.",
            ));
        }
        if !o.partition.is_empty() && !o.peer.is_empty() {
            errs.push(FieldError::invalid(
                path.clone(),
                Value::repr(o),
                "both partition and peer cannot be specified.",
            ));
        }
        errs.extend(upstream(&path, o, partitions));
    }
    errs
}

/// Checks shared by default and override upstreams.
fn upstream(path: &Path, upstream: &Upstream, partitions: bool) -> ErrorList {
    let mut errs = ErrorList::default();
    errs.extend(check::gated(
        path.child("partition"),
        &upstream.partition,
        partitions,
        "Consul Enterprise Admin Partitions must be enabled to set upstream.partition",
    ));
    errs.extend(shared::mesh_gateway(
        &path.child("meshGateway"),
        &upstream.mesh_gateway,
    ));
    errs
}

fn instance_level_rate_limits(path: &Path, limits: &InstanceLevelRateLimits) -> ErrorList {
    let mut errs = ErrorList::default();
    let mut rate_limit_set = limits.requests_per_second > 0;

    if limits.requests_per_second < 0 {
        errs.push(FieldError::invalid(
            path.child("requestsPerSecond"),
            limits.requests_per_second,
            "RequestsPerSecond must be positive",
        ));
    }
    if limits.requests_per_second == 0 && limits.requests_max_burst > 0 {
        errs.push(FieldError::invalid(
            path.child("requestsPerSecond"),
            limits.requests_per_second,
            "RequestsPerSecond must be greater than 0 if RequestsMaxBurst is set",
        ));
    }
    if limits.requests_max_burst < 0 {
        errs.push(FieldError::invalid(
            path.child("requestsMaxBurst"),
            limits.requests_max_burst,
            "RequestsMaxBurst must be positive",
        ));
    }

    for (i, route) in limits.routes.iter().enumerate() {
        let path = path.child("routes").index(i);
        let paths = [
            !route.path_exact.is_empty(),
            !route.path_prefix.is_empty(),
            !route.path_regex.is_empty(),
        ];
        if !check::Arity::ExactlyOne.admits(check::count_set(&paths)) {
            errs.push(FieldError::required(
                path.clone(),
                "Route must define exactly one of PathExact, PathPrefix, or PathRegex",
            ));
        }

        rate_limit_set |= route.requests_per_second > 0;
        if route.requests_per_second <= 0 {
            errs.push(FieldError::invalid(
                path.child("requestsPerSecond"),
                route.requests_per_second,
                "RequestsPerSecond must be greater than 0",
            ));
        }
        if route.requests_max_burst < 0 {
            errs.push(FieldError::invalid(
                path.child("requestsMaxBurst"),
                route.requests_max_burst,
                "RequestsMaxBurst must be positive",
            ));
        }
    }

    if !rate_limit_set {
        errs.push(FieldError::invalid(
            path.child("requestsPerSecond"),
            limits.requests_per_second,
            "At least one of top-level or route-level RequestsPerSecond must be set",
        ));
    }
    errs
}

impl ToRemote for Upstreams {
    type Remote = remote::UpstreamConfiguration;

    fn to_remote(&self) -> Self::Remote {
        remote::UpstreamConfiguration {
            defaults: self.defaults.to_remote(),
            overrides: self.overrides.to_remote(),
        }
    }
}

impl ToRemote for Upstream {
    type Remote = remote::UpstreamConfig;

    fn to_remote(&self) -> Self::Remote {
        remote::UpstreamConfig {
            name: self.name.clone(),
            namespace: self.namespace.clone(),
            partition: self.partition.clone(),
            peer: self.peer.clone(),
            envoy_listener_json: self.envoy_listener_json.clone(),
            envoy_cluster_json: self.envoy_cluster_json.clone(),
            protocol: self.protocol.clone(),
            connect_timeout_ms: self.connect_timeout_ms,
            limits: self.limits.to_remote(),
            passive_health_check: self.passive_health_check.to_remote(),
            mesh_gateway: self.mesh_gateway.to_remote(),
        }
    }
}

impl ToRemote for UpstreamLimits {
    type Remote = remote::UpstreamLimits;

    fn to_remote(&self) -> Self::Remote {
        remote::UpstreamLimits {
            max_connections: self.max_connections,
            max_pending_requests: self.max_pending_requests,
            max_concurrent_requests: self.max_concurrent_requests,
        }
    }
}

impl ToRemote for ServiceDefaultsDestination {
    type Remote = remote::DestinationConfig;

    fn to_remote(&self) -> Self::Remote {
        remote::DestinationConfig {
            addresses: self.addresses.clone(),
            port: self.port,
        }
    }
}

impl ToRemote for RateLimits {
    type Remote = remote::RateLimits;

    fn to_remote(&self) -> Self::Remote {
        let limits = &self.instance_level;
        remote::RateLimits {
            instance_level: remote::InstanceLevelRateLimits {
                requests_per_second: limits.requests_per_second,
                requests_max_burst: limits.requests_max_burst,
                routes: limits
                    .routes
                    .iter()
                    .map(|r| remote::InstanceLevelRouteRateLimits {
                        path_exact: r.path_exact.clone(),
                        path_prefix: r.path_prefix.clone(),
                        path_regex: r.path_regex.clone(),
                        requests_per_second: r.requests_per_second,
                        requests_max_burst: r.requests_max_burst,
                    })
                    .collect(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{messages, meta, partitions};
    use consul_config_controller_k8s_api::{
        service_defaults::{InstanceLevelRouteRateLimits, ServiceDefaultsSpec},
        shared::{MeshGateway, PassiveHealthCheck, TransparentProxy},
        GoDuration,
    };
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn resource(spec: ServiceDefaultsSpec) -> ServiceDefaults {
        ServiceDefaults {
            metadata: meta("default", "my-service"),
            spec,
            status: None,
        }
    }

    fn errors(spec: ServiceDefaultsSpec, caps: &Capabilities) -> Vec<String> {
        messages(resource(spec).validate(caps))
    }

    #[test]
    fn valid() {
        let spec = ServiceDefaultsSpec {
            protocol: "http".to_string(),
            mesh_gateway: MeshGateway {
                mode: "local".to_string(),
            },
            mutual_tls_mode: "permissive".to_string(),
            destination: Some(ServiceDefaultsDestination {
                addresses: vec!["api.google.com".to_string(), "10.0.0.1".to_string()],
                port: 443,
            }),
            upstream_config: Some(Upstreams {
                defaults: Some(Upstream {
                    connect_timeout_ms: 5000,
                    ..Upstream::default()
                }),
                overrides: vec![Upstream {
                    name: "foo".to_string(),
                    partition: "ap1".to_string(),
                    ..Upstream::default()
                }],
            }),
            ..ServiceDefaultsSpec::default()
        };
        assert_eq!(errors(spec, &partitions("ap1")), Vec::<String>::new());
    }

    #[test]
    fn protocol_and_mode() {
        let spec = ServiceDefaultsSpec {
            protocol: "foo".to_string(),
            mode: Some("transparent".to_string()),
            transparent_proxy: Some(TransparentProxy {
                outbound_listener_port: 1000,
                dialed_directly: false,
            }),
            ..ServiceDefaultsSpec::default()
        };
        assert_eq!(
            errors(spec, &Capabilities::default()),
            vec![
                r#"spec.protocol: Invalid value: "foo": must be one of "tcp", "http", "http2", "grpc""#,
                "spec.transparentProxy.outboundListenerPort: Invalid value: 1000: use the annotation `consul.hashicorp.com/transparent-proxy-outbound-listener-port` to configure the Outbound Listener Port",
                r#"spec.mode: Invalid value: "transparent": use the annotation `consul.hashicorp.com/transparent-proxy` to configure the Transparent Proxy Mode"#,
            ]
        );
    }

    #[test]
    fn destination_addresses() {
        let spec = ServiceDefaultsSpec {
            destination: Some(ServiceDefaultsDestination {
                addresses: vec![
                    "*.google.com".to_string(),
                    "api.google.com".to_string(),
                    "api.google.com".to_string(),
                ],
                port: 0,
            }),
            ..ServiceDefaultsSpec::default()
        };
        assert_eq!(
            errors(spec, &Capabilities::default()),
            vec![
                r#"spec.destination.addresses[0]: Invalid value: "*.google.com": address *.google.com is not a valid IP or hostname"#,
                r#"spec.destination.addresses[2]: Duplicate value: "api.google.com""#,
                "spec.destination.port: Invalid value: 0: invalid port number",
            ]
        );

        let spec = ServiceDefaultsSpec {
            destination: Some(ServiceDefaultsDestination {
                addresses: vec![],
                port: 65536,
            }),
            ..ServiceDefaultsSpec::default()
        };
        assert_eq!(
            errors(spec, &Capabilities::default()),
            vec![
                "spec.destination.addresses: Required value: at least one address must be define per destination",
                "spec.destination.port: Invalid value: 65536: invalid port number",
            ]
        );
    }

    #[rstest]
    #[case("10.0.0.1", true)]
    #[case("::1", true)]
    #[case("api.google.com", true)]
    #[case("api.google.com.", true)]
    #[case("localhost", true)]
    #[case("", false)]
    #[case("*.google.com", false)]
    #[case("api..google.com", false)]
    fn endpoint_addresses(#[case] address: &str, #[case] valid: bool) {
        assert_eq!(valid_endpoint_address(address), valid, "{address}");
    }

    #[test]
    fn negative_limits() {
        let spec = ServiceDefaultsSpec {
            max_inbound_connections: -1,
            local_connect_timeout_ms: -1,
            local_request_timeout_ms: -1,
            balance_inbound_connections: "not_exact_balance".to_string(),
            ..ServiceDefaultsSpec::default()
        };
        assert_eq!(
            errors(spec, &Capabilities::default()),
            vec![
                "spec.maxinboundconnections: Invalid value: -1: MaxInboundConnections must be > 0",
                "spec.localConnectTimeoutMs: Invalid value: -1: LocalConnectTimeoutMs must be > 0",
                "spec.localRequestTimeoutMs: Invalid value: -1: LocalRequestTimeoutMs must be > 0",
                r#"spec.balanceInboundConnections: Invalid value: "not_exact_balance": BalanceInboundConnections must be an empty string or exact_balance"#,
            ]
        );
    }

    #[test]
    fn upstream_defaults_and_overrides() {
        let spec = ServiceDefaultsSpec {
            upstream_config: Some(Upstreams {
                defaults: Some(Upstream {
                    name: "foo".to_string(),
                    peer: "p1".to_string(),
                    ..Upstream::default()
                }),
                overrides: vec![
                    Upstream::default(),
                    Upstream {
                        name: "bar".to_string(),
                        partition: "ap1".to_string(),
                        peer: "p1".to_string(),
                        ..Upstream::default()
                    },
                ],
            }),
            ..ServiceDefaultsSpec::default()
        };
        assert_eq!(
            errors(spec, &Capabilities::default()),
            vec![
                r#"spec.upstreamConfig.defaults.name: Invalid value: "foo": upstream.name for a default upstream must be """#,
                r#"spec.upstreamConfig.defaults.peer: Invalid value: "p1": upstream.peer for a default upstream must be """#,
                r#"spec.upstreamConfig.overrides[0].name: Invalid value: "": upstream.name for an override upstream cannot be """#,
                r#"spec.upstreamConfig.overrides[1]: Invalid value: "{\"name\":\"bar\",\"partition\":\"ap1\",\"peer\":\"p1\",\"meshGateway\":{}}": both partition and peer cannot be specified."#,
                r#"spec.upstreamConfig.overrides[1].partition: Invalid value: "ap1": Consul Enterprise Admin Partitions must be enabled to set upstream.partition"#,
            ]
        );
    }

    #[test]
    fn rate_limits() {
        let spec = ServiceDefaultsSpec {
            rate_limits: Some(RateLimits {
                instance_level: InstanceLevelRateLimits {
                    requests_per_second: 0,
                    requests_max_burst: 10,
                    routes: vec![InstanceLevelRouteRateLimits {
                        path_exact: "/foo".to_string(),
                        path_prefix: "/bar".to_string(),
                        requests_per_second: 0,
                        requests_max_burst: -1,
                        ..InstanceLevelRouteRateLimits::default()
                    }],
                },
            }),
            ..ServiceDefaultsSpec::default()
        };
        assert_eq!(
            errors(spec, &Capabilities::default()),
            vec![
                "spec.rateLimits.instanceLevel.requestsPerSecond: Invalid value: 0: RequestsPerSecond must be greater than 0 if RequestsMaxBurst is set",
                "spec.rateLimits.instanceLevel.routes[0]: Required value: Route must define exactly one of PathExact, PathPrefix, or PathRegex",
                "spec.rateLimits.instanceLevel.routes[0].requestsPerSecond: Invalid value: 0: RequestsPerSecond must be greater than 0",
                "spec.rateLimits.instanceLevel.routes[0].requestsMaxBurst: Invalid value: -1: RequestsMaxBurst must be positive",
                "spec.rateLimits.instanceLevel.requestsPerSecond: Invalid value: 0: At least one of top-level or route-level RequestsPerSecond must be set",
            ]
        );
    }

    #[test]
    fn route_level_rate_limit_suffices() {
        let spec = ServiceDefaultsSpec {
            rate_limits: Some(RateLimits {
                instance_level: InstanceLevelRateLimits {
                    routes: vec![InstanceLevelRouteRateLimits {
                        path_prefix: "/admin".to_string(),
                        requests_per_second: 10,
                        ..InstanceLevelRouteRateLimits::default()
                    }],
                    ..InstanceLevelRateLimits::default()
                },
            }),
            ..ServiceDefaultsSpec::default()
        };
        assert_eq!(
            errors(spec, &Capabilities::default()),
            Vec::<String>::new()
        );
    }

    #[test]
    fn projects() {
        let sd = resource(ServiceDefaultsSpec {
            protocol: "http".to_string(),
            mode: Some("transparent".to_string()),
            destination: Some(ServiceDefaultsDestination {
                addresses: vec!["10.0.0.1".to_string()],
                port: 443,
            }),
            upstream_config: Some(Upstreams {
                defaults: Some(Upstream {
                    passive_health_check: Some(PassiveHealthCheck {
                        interval: GoDuration::from_secs(2),
                        max_failures: 5,
                        ..PassiveHealthCheck::default()
                    }),
                    ..Upstream::default()
                }),
                overrides: vec![],
            }),
            ..ServiceDefaultsSpec::default()
        });

        let RemoteEntry::ServiceDefaults(entry) = sd.to_remote("dc1") else {
            panic!("unexpected kind");
        };
        assert_eq!(entry.name, "my-service");
        assert_eq!(entry.protocol, "http");
        assert_eq!(entry.mode, "");
        assert_eq!(entry.meta, remote::meta("dc1"));
        assert_eq!(
            entry.destination,
            Some(remote::DestinationConfig {
                addresses: vec!["10.0.0.1".to_string()],
                port: 443,
            })
        );
        let phc = entry
            .upstream_config
            .and_then(|u| u.defaults)
            .and_then(|d| d.passive_health_check)
            .expect("passive health check must be projected");
        assert_eq!(phc.base_ejection_time, Some(GoDuration::from_secs(30)));
    }

    #[test]
    fn matches_with_store_defaults() {
        let sd = resource(ServiceDefaultsSpec {
            protocol: "http".to_string(),
            upstream_config: Some(Upstreams {
                defaults: None,
                overrides: vec![Upstream {
                    name: "foo".to_string(),
                    ..Upstream::default()
                }],
            }),
            ..ServiceDefaultsSpec::default()
        });

        let mut remote = sd.to_remote("dc1");
        if let RemoteEntry::ServiceDefaults(entry) = &mut remote {
            entry.namespace = "default".to_string();
            entry.partition = "default".to_string();
            entry.create_index = 1;
            entry.modify_index = 2;
            entry.transparent_proxy = Some(remote::TransparentProxyConfig::default());
            let overrides = &mut entry
                .upstream_config
                .as_mut()
                .expect("upstream config")
                .overrides;
            overrides[0].namespace = "default".to_string();
            overrides[0].partition = "default".to_string();
        }
        assert!(sd.matches(&remote));

        if let RemoteEntry::ServiceDefaults(entry) = &mut remote {
            entry.protocol = "tcp".to_string();
        }
        assert!(!sd.matches(&remote));
    }

    #[test]
    fn does_not_match_other_kinds() {
        let sd = resource(ServiceDefaultsSpec::default());
        let other = RemoteEntry::from(remote::ServiceResolver {
            name: "my-service".to_string(),
            ..remote::ServiceResolver::default()
        });
        assert!(!sd.matches(&other));
    }
}
