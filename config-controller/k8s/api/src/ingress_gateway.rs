use crate::{
    shared::{HttpHeaderModifiers, PassiveHealthCheck},
    status::ConfigStatus,
};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Configures the listeners of an ingress gateway and the services each one
/// exposes.
#[derive(Clone, Debug, Default, PartialEq, CustomResource, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "consul.hashicorp.com",
    version = "v1alpha1",
    kind = "IngressGateway",
    derive = "PartialEq",
    status = "ConfigStatus",
    shortname = "ingress-gateway",
    namespaced
)]
#[serde(default, rename_all = "camelCase")]
pub struct IngressGatewaySpec {
    pub tls: GatewayTlsConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub listeners: Vec<IngressListener>,
    /// Limits applied to every service unless a service overrides them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<IngressServiceConfig>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct IngressServiceConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_pending_requests: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_concurrent_requests: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passive_health_check: Option<PassiveHealthCheck>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct GatewayTlsConfig {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sds: Option<GatewayTlsSdsConfig>,
    #[serde(rename = "tlsMinVersion", skip_serializing_if = "String::is_empty")]
    pub tls_min_version: String,
    #[serde(rename = "tlsMaxVersion", skip_serializing_if = "String::is_empty")]
    pub tls_max_version: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cipher_suites: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct GatewayServiceTlsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sds: Option<GatewayTlsSdsConfig>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct GatewayTlsSdsConfig {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub cluster_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub cert_resource: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct IngressListener {
    #[serde(skip_serializing_if = "crate::is_zero")]
    pub port: i32,
    /// One of `tcp`, `http`, `http2` or `grpc`.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub protocol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls: Option<GatewayTlsConfig>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<IngressService>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct IngressService {
    /// A service name, or `*` for every service with a compatible protocol.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hosts: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub partition: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls: Option<GatewayServiceTlsConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_headers: Option<HttpHeaderModifiers>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_headers: Option<HttpHeaderModifiers>,
    #[serde(flatten)]
    pub config: IngressServiceConfig,
}
