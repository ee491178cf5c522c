//! Peering resources. Neither syncs to a config entry; both reference the
//! secret holding a peering token.

use crate::{Condition, Time};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The only secret backend supported for peering tokens.
pub const SECRET_BACKEND_KUBERNETES: &str = "kubernetes";

/// Generates a peering token and stores it in a secret.
#[derive(Clone, Debug, Default, PartialEq, CustomResource, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "consul.hashicorp.com",
    version = "v1alpha1",
    kind = "PeeringAcceptor",
    derive = "PartialEq",
    status = "PeeringStatus",
    shortname = "peering-acceptor",
    namespaced
)]
#[serde(default, rename_all = "camelCase")]
pub struct PeeringAcceptorSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peer: Option<Peer>,
}

/// Establishes a peering with the token read from a secret.
#[derive(Clone, Debug, Default, PartialEq, CustomResource, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "consul.hashicorp.com",
    version = "v1alpha1",
    kind = "PeeringDialer",
    derive = "PartialEq",
    status = "PeeringStatus",
    shortname = "peering-dialer",
    namespaced
)]
#[serde(default, rename_all = "camelCase")]
pub struct PeeringDialerSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peer: Option<Peer>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct Peer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<Secret>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct Secret {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// The key within the secret's data holding the token.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub key: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub backend: String,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PeeringStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_peering_version: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<Secret>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_synced_time: Option<Time>,
}

impl PeeringAcceptor {
    pub fn secret(&self) -> Option<&Secret> {
        self.spec.peer.as_ref()?.secret.as_ref()
    }
}

impl PeeringDialer {
    pub fn secret(&self) -> Option<&Secret> {
        self.spec.peer.as_ref()?.secret.as_ref()
    }
}
