use super::{
    EnvoyExtension, ExposeConfig, MeshGatewayConfig, Meta, PassiveHealthCheck,
    TransparentProxyConfig,
};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ServiceDefaults {
    pub name: String,
    pub namespace: String,
    pub partition: String,
    pub protocol: String,
    pub mode: String,
    pub transparent_proxy: Option<TransparentProxyConfig>,
    #[serde(rename = "MutualTLSMode")]
    pub mutual_tls_mode: String,
    pub mesh_gateway: MeshGatewayConfig,
    pub expose: ExposeConfig,
    #[serde(rename = "ExternalSNI")]
    pub external_sni: String,
    pub upstream_config: Option<UpstreamConfiguration>,
    pub destination: Option<DestinationConfig>,
    pub max_inbound_connections: i32,
    pub local_connect_timeout_ms: i32,
    pub local_request_timeout_ms: i32,
    pub balance_inbound_connections: String,
    pub rate_limits: Option<RateLimits>,
    pub envoy_extensions: Vec<EnvoyExtension>,
    pub meta: Meta,
    pub create_index: u64,
    pub modify_index: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct UpstreamConfiguration {
    pub overrides: Vec<UpstreamConfig>,
    pub defaults: Option<UpstreamConfig>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct UpstreamConfig {
    pub name: String,
    pub namespace: String,
    pub partition: String,
    pub peer: String,
    #[serde(rename = "EnvoyListenerJSON")]
    pub envoy_listener_json: String,
    #[serde(rename = "EnvoyClusterJSON")]
    pub envoy_cluster_json: String,
    pub protocol: String,
    pub connect_timeout_ms: i32,
    pub limits: Option<UpstreamLimits>,
    pub passive_health_check: Option<PassiveHealthCheck>,
    pub mesh_gateway: MeshGatewayConfig,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct UpstreamLimits {
    pub max_connections: Option<i32>,
    pub max_pending_requests: Option<i32>,
    pub max_concurrent_requests: Option<i32>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DestinationConfig {
    pub addresses: Vec<String>,
    pub port: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RateLimits {
    pub instance_level: InstanceLevelRateLimits,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct InstanceLevelRateLimits {
    pub requests_per_second: i32,
    pub requests_max_burst: i32,
    pub routes: Vec<InstanceLevelRouteRateLimits>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct InstanceLevelRouteRateLimits {
    pub path_exact: String,
    pub path_prefix: String,
    pub path_regex: String,
    pub requests_per_second: i32,
    pub requests_max_burst: i32,
}
