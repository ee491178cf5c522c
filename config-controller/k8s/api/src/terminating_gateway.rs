use crate::status::ConfigStatus;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Links services outside the mesh to a terminating gateway.
#[derive(Clone, Debug, Default, PartialEq, CustomResource, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "consul.hashicorp.com",
    version = "v1alpha1",
    kind = "TerminatingGateway",
    derive = "PartialEq",
    status = "ConfigStatus",
    shortname = "terminating-gateway",
    namespaced
)]
#[serde(default, rename_all = "camelCase")]
pub struct TerminatingGatewaySpec {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<LinkedService>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct LinkedService {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub ca_file: String,
    /// Set together with `keyFile`.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub cert_file: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub key_file: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub sni: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub disable_auto_host_rewrite: bool,
}
