use super::Meta;
use crate::GoDuration;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct JwtProvider {
    pub name: String,
    pub namespace: String,
    pub partition: String,
    #[serde(rename = "JSONWebKeySet")]
    pub json_web_key_set: Option<JsonWebKeySet>,
    pub issuer: String,
    pub audiences: Vec<String>,
    pub locations: Vec<JwtLocation>,
    pub forwarding: Option<JwtForwardingConfig>,
    pub clock_skew_seconds: i32,
    pub cache_config: Option<JwtCacheConfig>,
    pub meta: Meta,
    pub create_index: u64,
    pub modify_index: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct JsonWebKeySet {
    pub local: Option<LocalJwks>,
    pub remote: Option<RemoteJwks>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct LocalJwks {
    #[serde(rename = "JWKS")]
    pub jwks: String,
    pub filename: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RemoteJwks {
    #[serde(rename = "URI")]
    pub uri: String,
    pub request_timeout_ms: i32,
    pub cache_duration: GoDuration,
    pub fetch_asynchronously: bool,
    #[serde(rename = "UseSNI")]
    pub use_sni: bool,
    pub retry_policy: Option<JwksRetryPolicy>,
    #[serde(rename = "JWKSCluster")]
    pub jwks_cluster: Option<JwksCluster>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct JwksRetryPolicy {
    pub num_retries: i32,
    pub retry_policy_back_off: Option<RetryPolicyBackOff>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RetryPolicyBackOff {
    pub base_interval: GoDuration,
    pub max_interval: GoDuration,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct JwksCluster {
    pub discovery_type: String,
    #[serde(rename = "TLSCertificates")]
    pub tls_certificates: Option<JwksTlsCertificate>,
    pub connect_timeout: GoDuration,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct JwksTlsCertificate {
    pub ca_certificate_provider_instance: Option<JwksTlsCertProviderInstance>,
    #[serde(rename = "TrustedCA")]
    pub trusted_ca: Option<JwksTlsCertTrustedCa>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct JwksTlsCertProviderInstance {
    pub instance_name: String,
    pub certificate_name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct JwksTlsCertTrustedCa {
    pub filename: String,
    pub environment_variable: String,
    pub inline_string: String,
    /// Base64-encoded, as the bytes are carried in JSON.
    pub inline_bytes: String,
}

/// Where a token is read from. Exactly one member is set.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct JwtLocation {
    pub header: Option<JwtLocationHeader>,
    pub query_param: Option<JwtLocationName>,
    pub cookie: Option<JwtLocationName>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct JwtLocationHeader {
    pub name: String,
    pub value_prefix: String,
    pub forward: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct JwtLocationName {
    pub name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct JwtForwardingConfig {
    pub header_name: String,
    pub pad_forward_payload_header: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct JwtCacheConfig {
    pub size: i32,
}
