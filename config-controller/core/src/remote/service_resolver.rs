use super::{Meta, PrioritizeByLocality};
use crate::GoDuration;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ServiceResolver {
    pub name: String,
    pub namespace: String,
    pub partition: String,
    pub default_subset: String,
    pub subsets: BTreeMap<String, ResolverSubset>,
    pub redirect: Option<ResolverRedirect>,
    pub failover: BTreeMap<String, ResolverFailover>,
    pub connect_timeout: GoDuration,
    pub request_timeout: GoDuration,
    pub load_balancer: Option<LoadBalancer>,
    pub prioritize_by_locality: Option<PrioritizeByLocality>,
    pub meta: Meta,
    pub create_index: u64,
    pub modify_index: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ResolverSubset {
    pub filter: String,
    pub only_passing: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ResolverRedirect {
    pub service: String,
    pub service_subset: String,
    pub namespace: String,
    pub partition: String,
    pub datacenter: String,
    pub peer: String,
    pub sameness_group: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ResolverFailover {
    pub service: String,
    pub service_subset: String,
    pub namespace: String,
    pub datacenters: Vec<String>,
    pub targets: Vec<ResolverFailoverTarget>,
    pub policy: Option<ResolverFailoverPolicy>,
    pub sameness_group: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ResolverFailoverTarget {
    pub service: String,
    pub service_subset: String,
    pub partition: String,
    pub namespace: String,
    pub datacenter: String,
    pub peer: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ResolverFailoverPolicy {
    pub mode: String,
    pub regions: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct LoadBalancer {
    pub policy: String,
    pub ring_hash_config: Option<RingHashConfig>,
    pub least_request_config: Option<LeastRequestConfig>,
    pub hash_policies: Vec<HashPolicy>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RingHashConfig {
    pub minimum_ring_size: u64,
    pub maximum_ring_size: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct LeastRequestConfig {
    pub choice_count: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct HashPolicy {
    pub field: String,
    pub field_value: String,
    pub cookie_config: Option<CookieConfig>,
    #[serde(rename = "SourceIP")]
    pub source_ip: bool,
    pub terminal: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CookieConfig {
    pub session: bool,
    #[serde(rename = "TTL")]
    pub ttl: GoDuration,
    pub path: String,
}
