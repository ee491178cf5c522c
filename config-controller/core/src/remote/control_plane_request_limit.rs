use super::Meta;
use serde::{Deserialize, Serialize};

/// Rate limits applied by servers to incoming RPCs, overall and per
/// subsystem.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ControlPlaneRequestLimit {
    pub name: String,
    pub namespace: String,
    pub partition: String,
    pub mode: String,
    pub read_rate: f64,
    pub write_rate: f64,
    #[serde(rename = "ACL")]
    pub acl: Option<ReadWriteRates>,
    pub catalog: Option<ReadWriteRates>,
    pub config_entry: Option<ReadWriteRates>,
    #[serde(rename = "ConnectCA")]
    pub connect_ca: Option<ReadWriteRates>,
    pub coordinate: Option<ReadWriteRates>,
    pub discovery_chain: Option<ReadWriteRates>,
    pub health: Option<ReadWriteRates>,
    pub intention: Option<ReadWriteRates>,
    #[serde(rename = "KV")]
    pub kv: Option<ReadWriteRates>,
    pub tenancy: Option<ReadWriteRates>,
    pub prepared_query: Option<ReadWriteRates>,
    pub session: Option<ReadWriteRates>,
    pub txn: Option<ReadWriteRates>,
    pub meta: Meta,
    pub create_index: u64,
    pub modify_index: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ReadWriteRates {
    pub read_rate: f64,
    pub write_rate: f64,
}
