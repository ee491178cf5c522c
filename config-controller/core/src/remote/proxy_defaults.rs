use super::{
    EnvoyExtension, ExposeConfig, FailoverPolicy, MeshGatewayConfig, Meta, PrioritizeByLocality,
    TransparentProxyConfig,
};
use serde::{Deserialize, Serialize};

/// The name of the single proxy-defaults entry.
pub const PROXY_DEFAULTS_NAME: &str = "global";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ProxyDefaults {
    pub name: String,
    pub namespace: String,
    pub partition: String,
    pub mode: String,
    pub transparent_proxy: Option<TransparentProxyConfig>,
    #[serde(rename = "MutualTLSMode")]
    pub mutual_tls_mode: String,
    pub config: serde_json::Map<String, serde_json::Value>,
    pub mesh_gateway: MeshGatewayConfig,
    pub expose: ExposeConfig,
    pub access_logs: Option<AccessLogsConfig>,
    pub envoy_extensions: Vec<EnvoyExtension>,
    pub failover_policy: Option<FailoverPolicy>,
    pub prioritize_by_locality: Option<PrioritizeByLocality>,
    pub meta: Meta,
    pub create_index: u64,
    pub modify_index: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct AccessLogsConfig {
    pub enabled: bool,
    pub disable_listener_logs: bool,
    pub r#type: String,
    pub path: String,
    #[serde(rename = "JSONFormat")]
    pub json_format: String,
    pub text_format: String,
}
