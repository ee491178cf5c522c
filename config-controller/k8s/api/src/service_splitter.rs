use crate::{is_zero, shared::HttpHeaderModifiers, status::ConfigStatus};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Splits traffic for a service across weighted destinations.
#[derive(Clone, Debug, Default, PartialEq, CustomResource, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "consul.hashicorp.com",
    version = "v1alpha1",
    kind = "ServiceSplitter",
    derive = "PartialEq",
    status = "ConfigStatus",
    shortname = "service-splitter",
    namespaced
)]
#[serde(default, rename_all = "camelCase")]
pub struct ServiceSplitterSpec {
    /// Weights must add up to 100.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub splits: Vec<ServiceSplit>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct ServiceSplit {
    #[serde(skip_serializing_if = "is_zero")]
    pub weight: f32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub service: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub service_subset: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub partition: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_headers: Option<HttpHeaderModifiers>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_headers: Option<HttpHeaderModifiers>,
}
