use crate::{is_zero, status::ConfigStatus};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Rate limits for requests to the control plane's servers.
#[derive(Clone, Debug, Default, PartialEq, CustomResource, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "consul.hashicorp.com",
    version = "v1alpha1",
    kind = "ControlPlaneRequestLimit",
    derive = "PartialEq",
    status = "ConfigStatus",
    shortname = "control-plane-request-limit",
    namespaced
)]
#[serde(default, rename_all = "camelCase")]
pub struct ControlPlaneRequestLimitSpec {
    /// One of `permissive`, `enforcing` or `disabled`.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub mode: String,
    #[serde(flatten)]
    pub rates: ReadWriteRatesConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acl: Option<ReadWriteRatesConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog: Option<ReadWriteRatesConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_entry: Option<ReadWriteRatesConfig>,
    #[serde(rename = "connectCA", skip_serializing_if = "Option::is_none")]
    pub connect_ca: Option<ReadWriteRatesConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinate: Option<ReadWriteRatesConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discovery_chain: Option<ReadWriteRatesConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health: Option<ReadWriteRatesConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intention: Option<ReadWriteRatesConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kv: Option<ReadWriteRatesConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenancy: Option<ReadWriteRatesConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prepared_query: Option<ReadWriteRatesConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<ReadWriteRatesConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub txn: Option<ReadWriteRatesConfig>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct ReadWriteRatesConfig {
    #[serde(skip_serializing_if = "is_zero")]
    pub read_rate: f64,
    #[serde(skip_serializing_if = "is_zero")]
    pub write_rate: f64,
}
