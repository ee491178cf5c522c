use super::{HttpHeaderModifiers, Meta};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ServiceSplitter {
    pub name: String,
    pub namespace: String,
    pub partition: String,
    pub splits: Vec<ServiceSplit>,
    pub meta: Meta,
    pub create_index: u64,
    pub modify_index: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ServiceSplit {
    pub weight: f32,
    pub service: String,
    pub service_subset: String,
    pub namespace: String,
    pub partition: String,
    pub request_headers: Option<HttpHeaderModifiers>,
    pub response_headers: Option<HttpHeaderModifiers>,
}
