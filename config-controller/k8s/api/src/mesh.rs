use crate::status::ConfigStatus;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Mesh-wide settings. Only one may exist and it must be named `mesh`.
#[derive(Clone, Debug, Default, PartialEq, CustomResource, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "consul.hashicorp.com",
    version = "v1alpha1",
    kind = "Mesh",
    derive = "PartialEq",
    status = "ConfigStatus",
    namespaced
)]
#[serde(default, rename_all = "camelCase")]
pub struct MeshSpec {
    pub transparent_proxy: TransparentProxyMeshConfig,
    #[serde(
        rename = "allowEnablingPermissiveMutualTLS",
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub allow_enabling_permissive_mutual_tls: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls: Option<MeshTlsConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http: Option<MeshHttpConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peering: Option<PeeringMeshConfig>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub validate_clusters: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct TransparentProxyMeshConfig {
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub mesh_destinations_only: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct MeshTlsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incoming: Option<MeshDirectionalTlsConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outgoing: Option<MeshDirectionalTlsConfig>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct MeshDirectionalTlsConfig {
    #[serde(rename = "tlsMinVersion", skip_serializing_if = "String::is_empty")]
    pub tls_min_version: String,
    #[serde(rename = "tlsMaxVersion", skip_serializing_if = "String::is_empty")]
    pub tls_max_version: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cipher_suites: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct MeshHttpConfig {
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub sanitize_x_forwarded_client_cert: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incoming: Option<MeshDirectionalHttpConfig>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct MeshDirectionalHttpConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_normalization: Option<RequestNormalizationMeshConfig>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct PeeringMeshConfig {
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub peer_through_mesh_gateways: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct RequestNormalizationMeshConfig {
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub insecure_disable_path_normalization: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub merge_slashes: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub path_with_escaped_slashes_action: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub headers_with_underscores_action: String,
}
