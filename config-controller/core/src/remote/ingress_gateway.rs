use super::{HttpHeaderModifiers, Meta, PassiveHealthCheck};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct IngressGateway {
    pub name: String,
    pub namespace: String,
    pub partition: String,
    #[serde(rename = "TLS")]
    pub tls: GatewayTlsConfig,
    pub listeners: Vec<IngressListener>,
    pub defaults: Option<IngressServiceConfig>,
    pub meta: Meta,
    pub create_index: u64,
    pub modify_index: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct GatewayTlsConfig {
    pub enabled: bool,
    #[serde(rename = "SDS")]
    pub sds: Option<GatewayTlsSdsConfig>,
    #[serde(rename = "TLSMinVersion")]
    pub tls_min_version: String,
    #[serde(rename = "TLSMaxVersion")]
    pub tls_max_version: String,
    pub cipher_suites: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct GatewayTlsSdsConfig {
    pub cluster_name: String,
    pub cert_resource: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct GatewayServiceTlsConfig {
    #[serde(rename = "SDS")]
    pub sds: Option<GatewayTlsSdsConfig>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct IngressListener {
    pub port: i32,
    pub protocol: String,
    #[serde(rename = "TLS")]
    pub tls: Option<GatewayTlsConfig>,
    pub services: Vec<IngressService>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct IngressService {
    pub name: String,
    pub hosts: Vec<String>,
    pub namespace: String,
    pub partition: String,
    #[serde(rename = "TLS")]
    pub tls: Option<GatewayServiceTlsConfig>,
    pub request_headers: Option<HttpHeaderModifiers>,
    pub response_headers: Option<HttpHeaderModifiers>,
    #[serde(flatten)]
    pub config: IngressServiceConfig,
}

/// Connection limits applied to an ingress upstream.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct IngressServiceConfig {
    pub max_connections: Option<u32>,
    pub max_pending_requests: Option<u32>,
    pub max_concurrent_requests: Option<u32>,
    pub passive_health_check: Option<PassiveHealthCheck>,
}
