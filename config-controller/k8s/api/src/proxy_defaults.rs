use crate::{
    shared::{
        EnvoyExtension, Expose, FailoverPolicy, MeshGateway, PrioritizeByLocality,
        TransparentProxy,
    },
    status::ConfigStatus,
};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Configures defaults for every proxy in the mesh. Only one may exist and it
/// must be named `global`.
#[derive(Clone, Debug, Default, PartialEq, CustomResource, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "consul.hashicorp.com",
    version = "v1alpha1",
    kind = "ProxyDefaults",
    derive = "PartialEq",
    plural = "proxydefaults",
    status = "ConfigStatus",
    shortname = "proxy-defaults",
    namespaced
)]
#[serde(default, rename_all = "camelCase")]
pub struct ProxyDefaultsSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transparent_proxy: Option<TransparentProxy>,
    #[serde(rename = "mutualTLSMode", skip_serializing_if = "String::is_empty")]
    pub mutual_tls_mode: String,
    /// Arbitrary proxy configuration; must be a JSON object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Value>,
    pub mesh_gateway: MeshGateway,
    pub expose: Expose,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_logs: Option<AccessLogs>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub envoy_extensions: Vec<EnvoyExtension>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failover_policy: Option<FailoverPolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prioritize_by_locality: Option<PrioritizeByLocality>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct AccessLogs {
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub enabled: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub disable_listener_logs: bool,
    /// One of `file`, `stdout` or `stderr`.
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub type_: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub json_format: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub text_format: String,
}
