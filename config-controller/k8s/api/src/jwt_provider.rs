use crate::{is_zero, status::ConfigStatus, GoDuration};
use k8s_openapi::ByteString;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Describes how to fetch and verify JSON web tokens from an issuer.
#[derive(Clone, Debug, Default, PartialEq, CustomResource, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "consul.hashicorp.com",
    version = "v1alpha1",
    kind = "JWTProvider",
    derive = "PartialEq",
    root = "JwtProvider",
    status = "ConfigStatus",
    shortname = "jwt-provider",
    namespaced
)]
#[serde(default, rename_all = "camelCase")]
pub struct JwtProviderSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_web_key_set: Option<JsonWebKeySet>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub issuer: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub audiences: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<JwtLocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forwarding: Option<JwtForwardingConfig>,
    #[serde(skip_serializing_if = "is_zero")]
    pub clock_skew_seconds: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_config: Option<JwtCacheConfig>,
}

/// Where a token is read from. Exactly one field is set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct JwtLocation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<JwtLocationHeader>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_param: Option<JwtLocationQueryParam>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cookie: Option<JwtLocationCookie>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct JwtLocationHeader {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub value_prefix: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub forward: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct JwtLocationQueryParam {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct JwtLocationCookie {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct JwtForwardingConfig {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub header_name: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub pad_forward_payload_header: bool,
}

/// The key set used to verify tokens. Exactly one of `local` or `remote` is
/// set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct JsonWebKeySet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local: Option<LocalJwks>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote: Option<RemoteJwks>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct LocalJwks {
    /// Base64-encoded key set.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub jwks: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub filename: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct RemoteJwks {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub uri: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub request_timeout_ms: i32,
    pub cache_duration: GoDuration,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub fetch_asynchronously: bool,
    #[serde(rename = "UseSNI", skip_serializing_if = "std::ops::Not::not")]
    pub use_sni: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_policy: Option<JwksRetryPolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwks_cluster: Option<JwksCluster>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct JwksCluster {
    /// One of `STATIC`, `STRICT_DNS`, `LOGICAL_DNS`, `EDS` or
    /// `ORIGINAL_DST`.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub discovery_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls_certificates: Option<JwksTlsCertificate>,
    pub connect_timeout: GoDuration,
}

/// Exactly one of the fields is set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct JwksTlsCertificate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ca_certificate_provider_instance: Option<JwksTlsCertProviderInstance>,
    #[serde(rename = "trustedCA", skip_serializing_if = "Option::is_none")]
    pub trusted_ca: Option<JwksTlsCertTrustedCa>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct JwksTlsCertProviderInstance {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub instance_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub certificate_name: String,
}

/// Exactly one of the fields is set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct JwksTlsCertTrustedCa {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub filename: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub environment_variable: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub inline_string: String,
    #[serde(skip_serializing_if = "bytes_empty")]
    #[schemars(with = "String")]
    pub inline_bytes: ByteString,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct JwksRetryPolicy {
    #[serde(skip_serializing_if = "is_zero")]
    pub num_retries: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_policy_back_off: Option<RetryPolicyBackOff>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct RetryPolicyBackOff {
    pub base_interval: GoDuration,
    pub max_interval: GoDuration,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct JwtCacheConfig {
    #[serde(skip_serializing_if = "is_zero")]
    pub size: i32,
}

fn bytes_empty(bytes: &ByteString) -> bool {
    bytes.0.is_empty()
}
