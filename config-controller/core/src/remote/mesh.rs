use super::{Meta, TlsVersions};
use serde::{Deserialize, Serialize};

/// Mesh-wide settings. There is at most one mesh entry per partition and it
/// carries neither a kind-specific name nor a namespace.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Mesh {
    pub partition: String,
    pub namespace: String,
    pub transparent_proxy: TransparentProxyMeshConfig,
    #[serde(rename = "AllowEnablingPermissiveMutualTLS")]
    pub allow_enabling_permissive_mutual_tls: bool,
    #[serde(rename = "TLS")]
    pub tls: Option<MeshTlsConfig>,
    #[serde(rename = "HTTP")]
    pub http: Option<MeshHttpConfig>,
    pub peering: Option<PeeringMeshConfig>,
    pub validate_clusters: bool,
    pub meta: Meta,
    pub create_index: u64,
    pub modify_index: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TransparentProxyMeshConfig {
    pub mesh_destinations_only: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MeshTlsConfig {
    pub incoming: Option<TlsVersions>,
    pub outgoing: Option<TlsVersions>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MeshHttpConfig {
    pub sanitize_x_forwarded_client_cert: bool,
    pub incoming: Option<MeshDirectionalHttpConfig>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MeshDirectionalHttpConfig {
    pub request_normalization: Option<RequestNormalizationMeshConfig>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RequestNormalizationMeshConfig {
    pub insecure_disable_path_normalization: bool,
    pub merge_slashes: bool,
    pub path_with_escaped_slashes_action: String,
    pub headers_with_underscores_action: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PeeringMeshConfig {
    pub peer_through_mesh_gateways: bool,
}
