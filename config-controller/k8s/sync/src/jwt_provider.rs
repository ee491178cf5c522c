use crate::{
    entry::{config_status, ConfigEntry},
    shared::ToRemote,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use consul_config_controller_core::{
    check::{self, Arity},
    field::{FieldError, Path, Value},
    remote::{self, RemoteEntry},
    Capabilities, ErrorList,
};
use consul_config_controller_k8s_api::{
    jwt_provider::{
        JsonWebKeySet, JwksCluster, JwksRetryPolicy, JwksTlsCertProviderInstance,
        JwksTlsCertTrustedCa, JwksTlsCertificate, JwtCacheConfig, JwtForwardingConfig,
        JwtLocation, JwtLocationHeader, LocalJwks, RemoteJwks, RetryPolicyBackOff,
    },
    JwtProvider, ResourceExt,
};

const DISCOVERY_TYPES: &[&str] = &["STATIC", "STRICT_DNS", "LOGICAL_DNS", "EDS", "ORIGINAL_DST"];

impl ConfigEntry for JwtProvider {
    const REMOTE_KIND: &'static str = "jwt-provider";
    const GLOBAL: bool = true;

    config_status!();

    fn validate(&self, _caps: &Capabilities) -> ErrorList {
        let spec = &self.spec;
        let path = Path::spec();
        let mut errs = json_web_key_set(
            &path.child("jsonWebKeySet"),
            spec.json_web_key_set.as_ref(),
        );
        for (i, loc) in spec.locations.iter().enumerate() {
            errs.extend(location(&path.child("locations").index(i), loc));
        }
        if let Some(fwd) = &spec.forwarding {
            if fwd.header_name.is_empty() {
                errs.push(FieldError::invalid(
                    path.child("forwarding").child("HeaderName"),
                    "",
                    "JWT forwarding header name is required",
                ));
            }
        }
        errs
    }

    fn to_remote(&self, datacenter: &str) -> RemoteEntry {
        let spec = &self.spec;
        remote::JwtProvider {
            name: self.name_any(),
            json_web_key_set: spec.json_web_key_set.to_remote(),
            issuer: spec.issuer.clone(),
            audiences: spec.audiences.clone(),
            locations: spec.locations.to_remote(),
            forwarding: spec.forwarding.to_remote(),
            clock_skew_seconds: spec.clock_skew_seconds,
            cache_config: spec.cache_config.to_remote(),
            meta: remote::meta(datacenter),
            ..remote::JwtProvider::default()
        }
        .into()
    }
}

/// A missing or ambiguous key set makes the nested checks meaningless.
fn json_web_key_set(path: &Path, jwks: Option<&JsonWebKeySet>) -> ErrorList {
    let mut errs = ErrorList::default();
    let Some(jwks) = jwks else {
        errs.push(FieldError::invalid(
            path.clone(),
            Value::Null,
            "jsonWebKeySet is required",
        ));
        return errs;
    };
    if let Some(err) = check::union(
        path.clone(),
        Value::repr(jwks),
        &[jwks.local.is_some(), jwks.remote.is_some()],
        Arity::ExactlyOne,
        "exactly one of 'local' or 'remote' is required",
    ) {
        errs.push(err);
        return errs;
    }
    if let Some(local) = &jwks.local {
        errs.extend(local_jwks(&path.child("local"), local));
    }
    if let Some(remote) = &jwks.remote {
        errs.extend(remote_jwks(&path.child("remote"), remote));
    }
    errs
}

fn local_jwks(path: &Path, local: &LocalJwks) -> Option<FieldError> {
    if let Some(err) = check::union(
        path.clone(),
        Value::repr(local),
        &[!local.jwks.is_empty(), !local.filename.is_empty()],
        Arity::ExactlyOne,
        "Exactly one of 'jwks' or 'filename' is required",
    ) {
        return Some(err);
    }
    if local.jwks.is_empty() || STANDARD.decode(&local.jwks).is_ok() {
        return None;
    }
    Some(FieldError::invalid(
        path.child("jwks"),
        &local.jwks,
        "JWKS must be a valid base64-encoded string",
    ))
}

fn remote_jwks(path: &Path, remote: &RemoteJwks) -> ErrorList {
    let mut errs = ErrorList::default();
    if remote.uri.is_empty() {
        errs.push(FieldError::invalid(
            path.child("uri"),
            "",
            "remote JWKS URI is required",
        ));
    } else if !is_request_uri(&remote.uri) {
        errs.push(FieldError::invalid(
            path.child("uri"),
            &remote.uri,
            "remote JWKS URI is invalid",
        ));
    }

    let backoff = remote
        .retry_policy
        .as_ref()
        .and_then(|p| p.retry_policy_back_off.as_ref());
    if let Some(backoff) = backoff {
        errs.extend(retry_back_off(
            &path.child("retryPolicy").child("retryPolicyBackOff"),
            backoff,
        ));
    }

    if let Some(cluster) = &remote.jwks_cluster {
        let path = path.child("jwksCluster");
        if !DISCOVERY_TYPES.contains(&cluster.discovery_type.as_str()) {
            errs.push(FieldError::invalid(
                path.child("discoveryType"),
                &cluster.discovery_type,
                "unsupported jwks cluster discovery type.",
            ));
        }
        if let Some(certs) = &cluster.tls_certificates {
            errs.extend(tls_certificates(&path.child("tlsCertificates"), certs));
        }
    }
    errs
}

/// Accepts absolute URIs and absolute paths, as a request line would.
fn is_request_uri(uri: &str) -> bool {
    match uri.parse::<http::Uri>() {
        Ok(parsed) => parsed.scheme().is_some() || uri.starts_with('/'),
        Err(_) => false,
    }
}

fn retry_back_off(path: &Path, backoff: &RetryPolicyBackOff) -> Option<FieldError> {
    let (base, max) = (backoff.base_interval, backoff.max_interval);
    if max.is_zero() || base <= max {
        return None;
    }
    Some(FieldError::invalid(
        path.clone(),
        Value::repr(backoff),
        "maxInterval should be greater or equal to baseInterval",
    ))
}

fn tls_certificates(path: &Path, certs: &JwksTlsCertificate) -> ErrorList {
    let mut errs = ErrorList::default();
    errs.extend(check::union(
        path.clone(),
        Value::repr(certs),
        &[
            certs.trusted_ca.is_some(),
            certs.ca_certificate_provider_instance.is_some(),
        ],
        Arity::ExactlyOne,
        "exactly one of 'trustedCa' or 'caCertificateProviderInstance' is required",
    ));
    if let Some(ca) = &certs.trusted_ca {
        errs.extend(check::union(
            path.child("trustedCa"),
            Value::repr(ca),
            &[
                !ca.filename.is_empty(),
                !ca.environment_variable.is_empty(),
                !ca.inline_string.is_empty(),
                !ca.inline_bytes.0.is_empty(),
            ],
            Arity::ExactlyOne,
            "exactly one of 'filename', 'environmentVariable', 'inlineString' or 'inlineBytes' is required",
        ));
    }
    errs
}

fn location(path: &Path, loc: &JwtLocation) -> ErrorList {
    let mut errs = ErrorList::default();
    if let Some(err) = check::union(
        path.clone(),
        Value::repr(loc),
        &[
            loc.header.is_some(),
            loc.query_param.is_some(),
            loc.cookie.is_some(),
        ],
        Arity::ExactlyOne,
        "exactly one of 'header', 'queryParam', or 'cookie' is required",
    ) {
        errs.push(err);
        return errs;
    }

    let names = [
        (
            "header",
            loc.header.as_ref().map(|h| &h.name),
            "JWT location header name is required",
        ),
        (
            "queryParam",
            loc.query_param.as_ref().map(|q| &q.name),
            "JWT location query parameter name is required",
        ),
        (
            "cookie",
            loc.cookie.as_ref().map(|c| &c.name),
            "JWT location cookie name is required",
        ),
    ];
    for (field, name, detail) in names {
        if name.is_some_and(|n| n.is_empty()) {
            errs.push(FieldError::invalid(
                path.child(field).child("name"),
                "",
                detail,
            ));
        }
    }
    errs
}

impl ToRemote for JsonWebKeySet {
    type Remote = remote::JsonWebKeySet;

    fn to_remote(&self) -> Self::Remote {
        remote::JsonWebKeySet {
            local: self.local.as_ref().map(|l| remote::LocalJwks {
                jwks: l.jwks.clone(),
                filename: l.filename.clone(),
            }),
            remote: self.remote.to_remote(),
        }
    }
}

impl ToRemote for RemoteJwks {
    type Remote = remote::RemoteJwks;

    fn to_remote(&self) -> Self::Remote {
        remote::RemoteJwks {
            uri: self.uri.clone(),
            request_timeout_ms: self.request_timeout_ms,
            cache_duration: self.cache_duration,
            fetch_asynchronously: self.fetch_asynchronously,
            use_sni: self.use_sni,
            retry_policy: self.retry_policy.to_remote(),
            jwks_cluster: self.jwks_cluster.to_remote(),
        }
    }
}

impl ToRemote for JwksRetryPolicy {
    type Remote = remote::JwksRetryPolicy;

    fn to_remote(&self) -> Self::Remote {
        remote::JwksRetryPolicy {
            num_retries: self.num_retries,
            retry_policy_back_off: self.retry_policy_back_off.as_ref().map(|b| {
                remote::RetryPolicyBackOff {
                    base_interval: b.base_interval,
                    max_interval: b.max_interval,
                }
            }),
        }
    }
}

impl ToRemote for JwksCluster {
    type Remote = remote::JwksCluster;

    fn to_remote(&self) -> Self::Remote {
        remote::JwksCluster {
            discovery_type: self.discovery_type.clone(),
            tls_certificates: self.tls_certificates.to_remote(),
            connect_timeout: self.connect_timeout,
        }
    }
}

impl ToRemote for JwksTlsCertificate {
    type Remote = remote::JwksTlsCertificate;

    fn to_remote(&self) -> Self::Remote {
        remote::JwksTlsCertificate {
            ca_certificate_provider_instance: self.ca_certificate_provider_instance.to_remote(),
            trusted_ca: self.trusted_ca.to_remote(),
        }
    }
}

impl ToRemote for JwksTlsCertProviderInstance {
    type Remote = remote::JwksTlsCertProviderInstance;

    fn to_remote(&self) -> Self::Remote {
        remote::JwksTlsCertProviderInstance {
            instance_name: self.instance_name.clone(),
            certificate_name: self.certificate_name.clone(),
        }
    }
}

impl ToRemote for JwksTlsCertTrustedCa {
    type Remote = remote::JwksTlsCertTrustedCa;

    fn to_remote(&self) -> Self::Remote {
        let inline_bytes = if self.inline_bytes.0.is_empty() {
            String::new()
        } else {
            STANDARD.encode(&self.inline_bytes.0)
        };
        remote::JwksTlsCertTrustedCa {
            filename: self.filename.clone(),
            environment_variable: self.environment_variable.clone(),
            inline_string: self.inline_string.clone(),
            inline_bytes,
        }
    }
}

impl ToRemote for JwtLocation {
    type Remote = remote::JwtLocation;

    fn to_remote(&self) -> Self::Remote {
        remote::JwtLocation {
            header: self.header.to_remote(),
            query_param: self.query_param.as_ref().map(|q| remote::JwtLocationName {
                name: q.name.clone(),
            }),
            cookie: self.cookie.as_ref().map(|c| remote::JwtLocationName {
                name: c.name.clone(),
            }),
        }
    }
}

impl ToRemote for JwtLocationHeader {
    type Remote = remote::JwtLocationHeader;

    fn to_remote(&self) -> Self::Remote {
        remote::JwtLocationHeader {
            name: self.name.clone(),
            value_prefix: self.value_prefix.clone(),
            forward: self.forward,
        }
    }
}

impl ToRemote for JwtForwardingConfig {
    type Remote = remote::JwtForwardingConfig;

    fn to_remote(&self) -> Self::Remote {
        remote::JwtForwardingConfig {
            header_name: self.header_name.clone(),
            pad_forward_payload_header: self.pad_forward_payload_header,
        }
    }
}

impl ToRemote for JwtCacheConfig {
    type Remote = remote::JwtCacheConfig;

    fn to_remote(&self) -> Self::Remote {
        remote::JwtCacheConfig { size: self.size }
    }
}
