use crate::{
    entry::{config_status, singleton, ConfigEntry, Conflict},
    shared::{self, ToRemote},
};
use consul_config_controller_core::{
    compare::{Comparison, SERVER_FIELDS},
    field::{FieldError, Path, Value},
    remote::{self, RemoteEntry, PROXY_DEFAULTS_NAME},
    Capabilities, ErrorList,
};
use consul_config_controller_k8s_api::{proxy_defaults::AccessLogs, ProxyDefaults, ResourceExt};
use kube::core::admission::Operation;

impl ConfigEntry for ProxyDefaults {
    const REMOTE_KIND: &'static str = "proxy-defaults";
    const GLOBAL: bool = true;

    const COMPARISON: Comparison = Comparison {
        ignore: SERVER_FIELDS,
        default_is_empty: &[],
        zero_is_absent: &["TransparentProxy"],
        unordered: &[],
    };

    config_status!();

    fn validate(&self, _caps: &Capabilities) -> ErrorList {
        let spec = &self.spec;
        let path = Path::spec();
        let mut errs = ErrorList::default();

        errs.extend(shared::mesh_gateway(
            &path.child("meshGateway"),
            &spec.mesh_gateway,
        ));
        errs.extend(shared::transparent_proxy(
            &path.child("transparentProxy"),
            spec.transparent_proxy.as_ref(),
        ));
        errs.extend(shared::mutual_tls_mode(
            path.child("mutualTLSMode"),
            &spec.mutual_tls_mode,
        ));
        errs.extend(shared::proxy_mode(path.child("mode"), spec.mode.as_ref()));
        if let Some(config) = &spec.config {
            if let Err(error) = config_map(config) {
                errs.push(FieldError::invalid(
                    path.child("config"),
                    Value::Str(config.to_string()),
                    format!("must be valid map value: {error}"),
                ));
            }
        }
        if let Some(logs) = &spec.access_logs {
            errs.extend(access_logs(&path.child("accessLogs"), logs));
        }
        errs.extend(shared::expose(&path.child("expose"), &spec.expose));
        errs.extend(shared::envoy_extensions(
            &path.child("envoyExtensions"),
            &spec.envoy_extensions,
        ));
        errs.extend(shared::failover_policy(
            &path.child("failoverPolicy"),
            spec.failover_policy.as_ref(),
        ));
        errs.extend(shared::prioritize_by_locality(
            &path.child("prioritizeByLocality"),
            spec.prioritize_by_locality.as_ref(),
        ));
        errs
    }

    fn to_remote(&self, datacenter: &str) -> RemoteEntry {
        let spec = &self.spec;
        remote::ProxyDefaults {
            name: self.name_any(),
            mesh_gateway: spec.mesh_gateway.to_remote(),
            expose: spec.expose.to_remote(),
            config: spec
                .config
                .as_ref()
                .and_then(|c| config_map(c).ok())
                .unwrap_or_default(),
            transparent_proxy: spec.transparent_proxy.to_remote(),
            mutual_tls_mode: spec.mutual_tls_mode.clone(),
            access_logs: spec.access_logs.to_remote(),
            envoy_extensions: spec.envoy_extensions.to_remote(),
            failover_policy: spec.failover_policy.to_remote(),
            prioritize_by_locality: spec.prioritize_by_locality.to_remote(),
            meta: remote::meta(datacenter),
            ..remote::ProxyDefaults::default()
        }
        .into()
    }

    /// A single entry named `global` may exist.
    fn check_siblings(
        &self,
        op: Operation,
        _old: Option<&Self>,
        siblings: &[Self],
        _caps: &Capabilities,
    ) -> Result<(), Conflict> {
        if op != Operation::Create {
            return Ok(());
        }
        if self.name_any() != PROXY_DEFAULTS_NAME {
            return Err(Conflict::new(format!(
                r#"proxydefaults resource name must be "{PROXY_DEFAULTS_NAME}""#
            )));
        }
        singleton(siblings, PROXY_DEFAULTS_NAME)
    }
}

fn config_map(
    config: &serde_json::Value,
) -> serde_json::Result<serde_json::Map<String, serde_json::Value>> {
    serde_json::from_value(config.clone())
}

/// Reports only the first problem found.
fn access_logs(path: &Path, logs: &AccessLogs) -> Option<FieldError> {
    match logs.type_.as_str() {
        "" | "stdout" | "stderr" => {}
        "file" if logs.path.is_empty() => {
            return Some(FieldError::invalid(
                path.child("path"),
                &logs.path,
                "path must be specified when using file type access logs",
            ));
        }
        "file" => {}
        _ => {
            return Some(FieldError::invalid(
                path.child("type"),
                &logs.type_,
                r#"invalid access log type (must be one of "stdout", "stderr", "file""#,
            ));
        }
    }

    if !logs.json_format.is_empty() && !logs.text_format.is_empty() {
        return Some(FieldError::invalid(
            path.child("textFormat"),
            &logs.text_format,
            "cannot specify both access log jsonFormat and textFormat",
        ));
    }
    if logs.type_ != "file" && !logs.path.is_empty() {
        return Some(FieldError::invalid(
            path.child("path"),
            &logs.path,
            "path is only valid for file type access logs",
        ));
    }
    if !logs.json_format.is_empty()
        && serde_json::from_str::<serde_json::Value>(&logs.json_format).is_err()
    {
        return Some(FieldError::invalid(
            path.child("jsonFormat"),
            &logs.json_format,
            "invalid access log json",
        ));
    }
    None
}

impl ToRemote for AccessLogs {
    type Remote = remote::AccessLogsConfig;

    fn to_remote(&self) -> Self::Remote {
        remote::AccessLogsConfig {
            enabled: self.enabled,
            disable_listener_logs: self.disable_listener_logs,
            r#type: self.type_.clone(),
            path: self.path.clone(),
            json_format: self.json_format.clone(),
            text_format: self.text_format.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{messages, meta};
    use consul_config_controller_k8s_api::proxy_defaults::ProxyDefaultsSpec;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    fn resource(name: &str, spec: ProxyDefaultsSpec) -> ProxyDefaults {
        ProxyDefaults {
            metadata: meta("default", name),
            spec,
            status: None,
        }
    }

    fn logs(type_: &str, path: &str, json_format: &str, text_format: &str) -> AccessLogs {
        AccessLogs {
            enabled: true,
            disable_listener_logs: false,
            type_: type_.to_string(),
            path: path.to_string(),
            json_format: json_format.to_string(),
            text_format: text_format.to_string(),
        }
    }

    #[rstest]
    #[case(logs("", "", "", ""), None)]
    #[case(logs("stdout", "", "", "%START_TIME%"), None)]
    #[case(logs("file", "/var/log/envoy.log", r#"{"a":"%START_TIME%"}"#, ""), None)]
    #[case(
        logs("file", "", "", ""),
        Some(r#"spec.accessLogs.path: Invalid value: "": path must be specified when using file type access logs"#)
    )]
    #[case(
        logs("syslog", "", "", ""),
        Some(r#"spec.accessLogs.type: Invalid value: "syslog": invalid access log type (must be one of "stdout", "stderr", "file""#)
    )]
    #[case(
        logs("stderr", "", "{}", "%START_TIME%"),
        Some(r#"spec.accessLogs.textFormat: Invalid value: "%START_TIME%": cannot specify both access log jsonFormat and textFormat"#)
    )]
    #[case(
        logs("stdout", "/var/log", "", ""),
        Some(r#"spec.accessLogs.path: Invalid value: "/var/log": path is only valid for file type access logs"#)
    )]
    #[case(
        logs("stdout", "", "{", ""),
        Some(r#"spec.accessLogs.jsonFormat: Invalid value: "{": invalid access log json"#)
    )]
    fn access_log_rules(#[case] logs: AccessLogs, #[case] expected: Option<&str>) {
        let err = access_logs(&Path::spec().child("accessLogs"), &logs);
        assert_eq!(err.map(|e| e.to_string()).as_deref(), expected);
    }

    #[test]
    fn config_must_be_an_object() {
        let pd = resource(
            "global",
            ProxyDefaultsSpec {
                config: Some(json!("envoy")),
                ..ProxyDefaultsSpec::default()
            },
        );
        let errs = messages(pd.validate(&Capabilities::default()));
        assert_eq!(errs.len(), 1);
        assert!(
            errs[0].starts_with(r#"spec.config: Invalid value: "\"envoy\"": must be valid map value: "#),
            "{}",
            errs[0]
        );
    }

    #[test]
    fn projects_config() {
        let pd = resource(
            "global",
            ProxyDefaultsSpec {
                config: Some(json!({ "envoy_tracing_json": "{}" })),
                access_logs: Some(logs("stdout", "", "", "")),
                ..ProxyDefaultsSpec::default()
            },
        );
        let RemoteEntry::ProxyDefaults(entry) = pd.to_remote("dc1") else {
            panic!("unexpected kind");
        };
        assert_eq!(entry.name, "global");
        assert_eq!(entry.config["envoy_tracing_json"], json!("{}"));
        assert_eq!(
            entry.access_logs.map(|l| l.r#type),
            Some("stdout".to_string())
        );

        let mut echoed = pd.to_remote("dc2");
        if let RemoteEntry::ProxyDefaults(e) = &mut echoed {
            e.namespace = "default".to_string();
            e.transparent_proxy = Some(remote::TransparentProxyConfig::default());
        }
        assert!(pd.matches(&echoed));
    }

    #[test]
    fn must_be_named_global() {
        let pd = resource("other", ProxyDefaultsSpec::default());
        let err = pd
            .check_siblings(Operation::Create, None, &[], &Capabilities::default())
            .expect_err("name must be rejected");
        assert_eq!(err.to_string(), r#"proxydefaults resource name must be "global""#);
    }

    #[test]
    fn only_one_may_exist() {
        let pd = resource("global", ProxyDefaultsSpec::default());
        let mut existing = resource("global", ProxyDefaultsSpec::default());
        existing.metadata.namespace = Some("other".to_string());
        let err = pd
            .check_siblings(
                Operation::Create,
                None,
                &[existing],
                &Capabilities::default(),
            )
            .expect_err("second entry must be rejected");
        assert_eq!(
            err.to_string(),
            "proxydefaults resource already defined - only one global entry is supported"
        );

        assert!(pd
            .check_siblings(Operation::Update, None, &[], &Capabilities::default())
            .is_ok());
    }
}
