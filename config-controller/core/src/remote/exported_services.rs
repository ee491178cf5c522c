use super::Meta;
use serde::{Deserialize, Serialize};

/// The services a partition makes available to other partitions, peers and
/// sameness groups. Exported-services entries are partition-scoped and carry
/// no namespace.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ExportedServices {
    pub name: String,
    pub partition: String,
    pub services: Vec<ExportedService>,
    pub meta: Meta,
    pub create_index: u64,
    pub modify_index: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ExportedService {
    pub name: String,
    pub namespace: String,
    pub consumers: Vec<ServiceConsumer>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ServiceConsumer {
    pub partition: String,
    pub peer: String,
    pub sameness_group: String,
}
