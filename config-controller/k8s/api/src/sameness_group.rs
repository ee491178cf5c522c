use crate::status::ConfigStatus;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A set of partitions and peers whose services are considered the same.
#[derive(Clone, Debug, Default, PartialEq, CustomResource, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "consul.hashicorp.com",
    version = "v1alpha1",
    kind = "SamenessGroup",
    derive = "PartialEq",
    status = "ConfigStatus",
    shortname = "sameness-group",
    namespaced
)]
#[serde(default, rename_all = "camelCase")]
pub struct SamenessGroupSpec {
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub default_for_failover: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub include_local: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<SamenessGroupMember>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct SamenessGroupMember {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub partition: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub peer: String,
}
