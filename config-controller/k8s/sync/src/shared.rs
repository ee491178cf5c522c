//! Checks and projections for fields that several kinds share.

use consul_config_controller_core::{
    check,
    field::{FieldError, Path, Value},
    remote, ErrorList, GoDuration,
};
use consul_config_controller_k8s_api::shared::{
    EnvoyExtension, Expose, FailoverPolicy, HttpHeaderModifiers, MeshGateway, PassiveHealthCheck,
    PrioritizeByLocality, TransparentProxy,
};

const MESH_GATEWAY_MODES: &[&str] = &["remote", "local", "none", ""];
const EXPOSE_PROTOCOLS: &[&str] = &["http", "http2"];
const FAILOVER_POLICY_MODES: &[&str] = &["", "sequential", "order-by-locality"];
const PRIORITIZE_BY_LOCALITY_MODES: &[&str] = &["", "none", "failover"];

/// Ejection time applied when a passive health check leaves it unset.
const DEFAULT_BASE_EJECTION_TIME: u64 = 30;

/// Converts a resource field into its remote representation.
pub(crate) trait ToRemote {
    type Remote;

    fn to_remote(&self) -> Self::Remote;
}

impl<T: ToRemote> ToRemote for Option<T> {
    type Remote = Option<T::Remote>;

    fn to_remote(&self) -> Self::Remote {
        self.as_ref().map(ToRemote::to_remote)
    }
}

impl<T: ToRemote> ToRemote for Vec<T> {
    type Remote = Vec<T::Remote>;

    fn to_remote(&self) -> Self::Remote {
        self.iter().map(ToRemote::to_remote).collect()
    }
}

// === MeshGateway ===

pub(crate) fn mesh_gateway(path: &Path, mg: &MeshGateway) -> Option<FieldError> {
    check::one_of(path.child("mode"), &mg.mode, MESH_GATEWAY_MODES)
}

impl ToRemote for MeshGateway {
    type Remote = remote::MeshGatewayConfig;

    /// Unknown modes fall back to the default mode.
    fn to_remote(&self) -> Self::Remote {
        let mode = match self.mode.as_str() {
            mode @ ("local" | "remote" | "none") => mode.to_string(),
            _ => String::new(),
        };
        remote::MeshGatewayConfig { mode }
    }
}

// === Expose ===

pub(crate) fn expose(path: &Path, expose: &Expose) -> ErrorList {
    let mut errs = ErrorList::default();
    for (i, p) in expose.paths.iter().enumerate() {
        let path = path.child("paths").index(i);
        errs.extend(check::path_prefix(path.child("path"), &p.path));
        if !p.protocol.is_empty() {
            errs.extend(check::one_of(
                path.child("protocol"),
                &p.protocol,
                EXPOSE_PROTOCOLS,
            ));
        }
    }
    errs
}

impl ToRemote for Expose {
    type Remote = remote::ExposeConfig;

    fn to_remote(&self) -> Self::Remote {
        remote::ExposeConfig {
            checks: self.checks,
            paths: self
                .paths
                .iter()
                .map(|p| remote::ExposePath {
                    listener_port: p.listener_port,
                    path: p.path.clone(),
                    local_path_port: p.local_path_port,
                    protocol: p.protocol.clone(),
                })
                .collect(),
        }
    }
}

// === TransparentProxy ===

/// The outbound listener port is configured per pod with an annotation.
pub(crate) fn transparent_proxy(path: &Path, tp: Option<&TransparentProxy>) -> Option<FieldError> {
    let tp = tp?;
    if tp.outbound_listener_port == 0 {
        return None;
    }
    Some(FieldError::invalid(
        path.child("outboundListenerPort"),
        tp.outbound_listener_port,
        "use the annotation `consul.hashicorp.com/transparent-proxy-outbound-listener-port` to configure the Outbound Listener Port",
    ))
}

/// The proxy mode is configured per pod with an annotation.
pub(crate) fn proxy_mode(path: Path, mode: Option<&String>) -> Option<FieldError> {
    let mode = mode?;
    Some(FieldError::invalid(
        path,
        mode,
        "use the annotation `consul.hashicorp.com/transparent-proxy` to configure the Transparent Proxy Mode",
    ))
}

impl ToRemote for TransparentProxy {
    type Remote = remote::TransparentProxyConfig;

    fn to_remote(&self) -> Self::Remote {
        remote::TransparentProxyConfig {
            outbound_listener_port: self.outbound_listener_port,
            dialed_directly: self.dialed_directly,
        }
    }
}

// === MutualTLSMode ===

pub(crate) fn mutual_tls_mode(path: Path, mode: &str) -> Option<FieldError> {
    if matches!(mode, "" | "strict" | "permissive") {
        return None;
    }
    Some(FieldError::invalid(
        path,
        mode,
        r#"Must be one of "", "strict", or "permissive"."#,
    ))
}

// === EnvoyExtension ===

pub(crate) fn envoy_extensions(path: &Path, extensions: &[EnvoyExtension]) -> ErrorList {
    extensions
        .iter()
        .enumerate()
        .filter_map(|(i, ext)| {
            let path = path.child("envoyExtension").index(i).child("arguments");
            let Some(args) = &ext.arguments else {
                return Some(FieldError::required(path, "arguments must be defined"));
            };
            let err = serde_json::from_value::<serde_json::Map<String, serde_json::Value>>(
                args.clone(),
            )
            .err()?;
            Some(FieldError::invalid(
                path,
                Value::Str(args.to_string()),
                format!("must be valid map value: {err}"),
            ))
        })
        .collect()
}

impl ToRemote for EnvoyExtension {
    type Remote = remote::EnvoyExtension;

    /// Arguments that are not an object are dropped; validation rejects them.
    fn to_remote(&self) -> Self::Remote {
        remote::EnvoyExtension {
            name: self.name.clone(),
            required: self.required,
            arguments: self
                .arguments
                .as_ref()
                .and_then(serde_json::Value::as_object)
                .cloned()
                .unwrap_or_default(),
        }
    }
}

// === FailoverPolicy ===

pub(crate) fn failover_policy(path: &Path, policy: Option<&FailoverPolicy>) -> Option<FieldError> {
    check::one_of(path.child("mode"), &policy?.mode, FAILOVER_POLICY_MODES)
}

impl ToRemote for FailoverPolicy {
    type Remote = remote::FailoverPolicy;

    fn to_remote(&self) -> Self::Remote {
        remote::FailoverPolicy {
            mode: self.mode.clone(),
            regions: self.regions.clone(),
        }
    }
}

// === PrioritizeByLocality ===

pub(crate) fn prioritize_by_locality(
    path: &Path,
    p: Option<&PrioritizeByLocality>,
) -> Option<FieldError> {
    check::one_of(path.child("mode"), &p?.mode, PRIORITIZE_BY_LOCALITY_MODES)
}

impl ToRemote for PrioritizeByLocality {
    type Remote = remote::PrioritizeByLocality;

    fn to_remote(&self) -> Self::Remote {
        remote::PrioritizeByLocality {
            mode: self.mode.clone(),
        }
    }
}

// === HttpHeaderModifiers ===

impl ToRemote for HttpHeaderModifiers {
    type Remote = remote::HttpHeaderModifiers;

    fn to_remote(&self) -> Self::Remote {
        remote::HttpHeaderModifiers {
            add: self.add.clone(),
            set: self.set.clone(),
            remove: self.remove.clone(),
        }
    }
}

// === PassiveHealthCheck ===

impl ToRemote for PassiveHealthCheck {
    type Remote = remote::PassiveHealthCheck;

    fn to_remote(&self) -> Self::Remote {
        remote::PassiveHealthCheck {
            interval: self.interval,
            max_failures: self.max_failures,
            enforcing_consecutive_5xx: self.enforcing_consecutive_5xx,
            max_ejection_percent: self.max_ejection_percent,
            base_ejection_time: Some(
                self.base_ejection_time
                    .unwrap_or_else(|| GoDuration::from_secs(DEFAULT_BASE_EJECTION_TIME)),
            ),
        }
    }
}
