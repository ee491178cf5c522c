use crate::{
    is_zero,
    shared::{EnvoyExtension, Expose, MeshGateway, PassiveHealthCheck, TransparentProxy},
    status::ConfigStatus,
};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Configures defaults for every instance of the service with the same name.
#[derive(Clone, Debug, Default, PartialEq, CustomResource, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "consul.hashicorp.com",
    version = "v1alpha1",
    kind = "ServiceDefaults",
    derive = "PartialEq",
    plural = "servicedefaults",
    status = "ConfigStatus",
    shortname = "service-defaults",
    namespaced
)]
#[serde(default, rename_all = "camelCase")]
pub struct ServiceDefaultsSpec {
    /// One of `tcp`, `http`, `http2` or `grpc`.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub protocol: String,
    /// Must not be set; transparent proxy is enabled with an annotation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transparent_proxy: Option<TransparentProxy>,
    #[serde(rename = "mutualTLSMode", skip_serializing_if = "String::is_empty")]
    pub mutual_tls_mode: String,
    pub mesh_gateway: MeshGateway,
    pub expose: Expose,
    #[serde(rename = "externalSNI", skip_serializing_if = "String::is_empty")]
    pub external_sni: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_config: Option<Upstreams>,
    /// Makes this service a terminating gateway destination.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<ServiceDefaultsDestination>,
    #[serde(skip_serializing_if = "is_zero")]
    pub max_inbound_connections: i32,
    #[serde(skip_serializing_if = "is_zero")]
    pub local_connect_timeout_ms: i32,
    #[serde(skip_serializing_if = "is_zero")]
    pub local_request_timeout_ms: i32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub balance_inbound_connections: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limits: Option<RateLimits>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub envoy_extensions: Vec<EnvoyExtension>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct Upstreams {
    /// Applies to every upstream; must not name one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<Upstream>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub overrides: Vec<Upstream>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct Upstream {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub partition: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub peer: String,
    #[serde(rename = "envoyListenerJSON", skip_serializing_if = "String::is_empty")]
    pub envoy_listener_json: String,
    #[serde(rename = "envoyClusterJSON", skip_serializing_if = "String::is_empty")]
    pub envoy_cluster_json: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub protocol: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub connect_timeout_ms: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limits: Option<UpstreamLimits>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passive_health_check: Option<PassiveHealthCheck>,
    pub mesh_gateway: MeshGateway,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct UpstreamLimits {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_pending_requests: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_concurrent_requests: Option<i32>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct ServiceDefaultsDestination {
    /// IP addresses or hostnames.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<String>,
    #[serde(skip_serializing_if = "is_zero")]
    pub port: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct RateLimits {
    pub instance_level: InstanceLevelRateLimits,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct InstanceLevelRateLimits {
    #[serde(skip_serializing_if = "is_zero")]
    pub requests_per_second: i32,
    #[serde(skip_serializing_if = "is_zero")]
    pub requests_max_burst: i32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub routes: Vec<InstanceLevelRouteRateLimits>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct InstanceLevelRouteRateLimits {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub path_exact: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub path_prefix: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub path_regex: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub requests_per_second: i32,
    #[serde(skip_serializing_if = "is_zero")]
    pub requests_max_burst: i32,
}
