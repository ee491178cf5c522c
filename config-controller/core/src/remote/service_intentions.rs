use super::Meta;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Collects every intention for one destination service.
///
/// The entry is named after its destination rather than the resource that
/// declares it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ServiceIntentions {
    pub name: String,
    pub namespace: String,
    pub partition: String,
    pub sources: Vec<SourceIntention>,
    pub meta: Meta,
    pub create_index: u64,
    pub modify_index: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SourceIntention {
    pub name: String,
    pub namespace: String,
    pub partition: String,
    pub peer: String,
    pub action: String,
    pub permissions: Vec<IntentionPermission>,
    pub description: String,

    // Derived by the store.
    pub precedence: i32,
    pub r#type: String,
    #[serde(rename = "LegacyID")]
    pub legacy_id: String,
    pub legacy_meta: BTreeMap<String, String>,
    pub legacy_create_time: Option<String>,
    pub legacy_update_time: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct IntentionPermission {
    pub action: String,
    #[serde(rename = "HTTP")]
    pub http: Option<IntentionHttpPermission>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct IntentionHttpPermission {
    pub path_exact: String,
    pub path_prefix: String,
    pub path_regex: String,
    pub header: Vec<IntentionHttpHeaderPermission>,
    pub methods: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct IntentionHttpHeaderPermission {
    pub name: String,
    pub present: bool,
    pub exact: String,
    pub prefix: String,
    pub suffix: String,
    pub regex: String,
    pub invert: bool,
}
