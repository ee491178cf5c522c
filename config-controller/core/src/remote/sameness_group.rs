use super::Meta;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SamenessGroup {
    pub name: String,
    pub partition: String,
    pub default_for_failover: bool,
    pub include_local: bool,
    pub members: Vec<SamenessGroupMember>,
    pub meta: Meta,
    pub create_index: u64,
    pub modify_index: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SamenessGroupMember {
    pub partition: String,
    pub peer: String,
}
