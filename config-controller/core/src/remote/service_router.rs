use super::{HttpHeaderModifiers, Meta};
use crate::GoDuration;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ServiceRouter {
    pub name: String,
    pub namespace: String,
    pub partition: String,
    pub routes: Vec<ServiceRoute>,
    pub meta: Meta,
    pub create_index: u64,
    pub modify_index: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ServiceRoute {
    pub r#match: Option<ServiceRouteMatch>,
    pub destination: Option<ServiceRouteDestination>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ServiceRouteMatch {
    #[serde(rename = "HTTP")]
    pub http: Option<ServiceRouteHttpMatch>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ServiceRouteHttpMatch {
    pub case_insensitive: bool,
    pub path_exact: String,
    pub path_prefix: String,
    pub path_regex: String,
    pub header: Vec<HttpHeaderMatch>,
    pub query_param: Vec<HttpQueryMatch>,
    pub methods: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct HttpHeaderMatch {
    pub name: String,
    pub present: bool,
    pub exact: String,
    pub prefix: String,
    pub suffix: String,
    pub regex: String,
    pub invert: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct HttpQueryMatch {
    pub name: String,
    pub present: bool,
    pub exact: String,
    pub regex: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ServiceRouteDestination {
    pub service: String,
    pub service_subset: String,
    pub namespace: String,
    pub partition: String,
    pub prefix_rewrite: String,
    pub idle_timeout: GoDuration,
    pub request_timeout: GoDuration,
    pub num_retries: u32,
    pub retry_on_connect_failure: bool,
    pub retry_on: Vec<String>,
    pub retry_on_status_codes: Vec<u32>,
    pub request_headers: Option<HttpHeaderModifiers>,
    pub response_headers: Option<HttpHeaderModifiers>,
}
