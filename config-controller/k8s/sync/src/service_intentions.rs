use crate::{
    entry::{config_status, ConfigEntry, Conflict},
    shared::ToRemote,
};
use consul_config_controller_core::{
    check::{self, Arity},
    compare::{Comparison, Unordered, SERVER_FIELDS},
    field::{FieldError, Path, Value},
    remote::{self, RemoteEntry},
    Capabilities, ErrorList,
};
use consul_config_controller_k8s_api::{
    service_intentions::{
        IntentionHttpHeaderPermission, IntentionHttpPermission, IntentionPermission,
        SourceIntention,
    },
    ResourceExt, ServiceIntentions,
};
use kube::core::admission::Operation;

const ACTIONS: &[&str] = &["allow", "deny"];

const METHODS: &[&str] = &[
    "GET", "HEAD", "POST", "PUT", "PATCH", "DELETE", "CONNECT", "OPTIONS", "TRACE",
];

impl ConfigEntry for ServiceIntentions {
    const REMOTE_KIND: &'static str = "service-intentions";

    const COMPARISON: Comparison = Comparison {
        ignore: SERVER_FIELDS,
        default_is_empty: &[],
        zero_is_absent: &[],
        unordered: &[Unordered {
            path: "Sources",
            strip: &[
                "LegacyID",
                "LegacyMeta",
                "LegacyCreateTime",
                "LegacyUpdateTime",
                "Precedence",
                "Type",
            ],
        }],
    };

    config_status!();

    fn validate(&self, caps: &Capabilities) -> ErrorList {
        let spec = &self.spec;
        let path = Path::spec();
        let mut errs = ErrorList::default();

        if spec.sources.is_empty() {
            errs.push(FieldError::required(
                path.child("sources"),
                "at least one source must be specified",
            ));
        }
        for (i, source) in spec.sources.iter().enumerate() {
            let path = path.child("sources").index(i);
            if !source.permissions.is_empty() && !source.action.is_empty() {
                errs.push(FieldError::invalid(
                    path,
                    Value::repr(source),
                    "action and permissions are mutually exclusive and only one of them can be specified",
                ));
            } else if source.permissions.is_empty() {
                errs.extend(action(&path, &source.action));
            } else {
                errs.extend(permissions(&path, &source.permissions));
            }
        }

        if !caps.namespaces {
            errs.extend(check::gated(
                path.child("destination").child("namespace"),
                &spec.destination.namespace,
                false,
                "Consul Enterprise namespaces must be enabled to set destination.namespace",
            ));
            for (i, source) in spec.sources.iter().enumerate() {
                errs.extend(check::gated(
                    path.child("sources").index(i).child("namespace"),
                    &source.namespace,
                    false,
                    "Consul Enterprise namespaces must be enabled to set source.namespace",
                ));
            }
        }

        for (i, source) in spec.sources.iter().enumerate() {
            let path = path.child("sources").index(i);
            errs.extend(check::gated(
                path.child("partition"),
                &source.partition,
                caps.partitions,
                "Consul Enterprise Admin Partitions must be enabled to set source.partition",
            ));
            if !source.peer.is_empty() && !source.partition.is_empty() {
                errs.push(FieldError::invalid(
                    path,
                    Value::repr(source),
                    "Both source.peer and source.partition cannot be set.",
                ));
            }
        }
        errs
    }

    fn default_tenancy(&mut self, caps: &Capabilities) {
        if caps.namespaces && self.spec.destination.namespace.is_empty() {
            self.spec.destination.namespace =
                caps.remote_namespace(&self.namespace().unwrap_or_default());
        }
    }

    fn to_remote(&self, datacenter: &str) -> RemoteEntry {
        remote::ServiceIntentions {
            name: self.spec.destination.name.clone(),
            namespace: self.spec.destination.namespace.clone(),
            sources: self.spec.sources.to_remote(),
            meta: remote::meta(datacenter),
            ..remote::ServiceIntentions::default()
        }
        .into()
    }

    /// Intentions are identified by their destination rather than by name.
    fn check_siblings(
        &self,
        op: Operation,
        old: Option<&Self>,
        siblings: &[Self],
        caps: &Capabilities,
    ) -> Result<(), Conflict> {
        let dst = &self.spec.destination;
        match op {
            Operation::Create if caps.names_scoped_by_namespace() => {
                let taken = siblings.iter().any(|s| {
                    s.spec.destination.name == dst.name
                        && s.spec.destination.namespace == dst.namespace
                });
                if taken {
                    return Err(Conflict::new(format!(
                        "an existing ServiceIntentions resource has `spec.destination.name: {}` and `spec.destination.namespace: {}`",
                        dst.name, dst.namespace,
                    )));
                }
            }
            Operation::Create => {
                if siblings.iter().any(|s| s.spec.destination.name == dst.name) {
                    return Err(Conflict::new(format!(
                        "an existing ServiceIntentions resource has `spec.destination.name: {}`",
                        dst.name,
                    )));
                }
            }
            Operation::Update => {
                if let Some(old) = old {
                    if old.spec.destination != *dst {
                        return Err(Conflict::new(
                            "spec.destination.name and spec.destination.namespace are immutable fields for ServiceIntentions",
                        ));
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn remote_name(&self) -> String {
        self.spec.destination.name.clone()
    }

    fn mirroring_namespace(&self) -> String {
        self.spec.destination.namespace.clone()
    }
}

fn action(path: &Path, action: &str) -> Option<FieldError> {
    check::one_of(path.child("action"), action, ACTIONS)
}

fn permissions(path: &Path, permissions: &[IntentionPermission]) -> ErrorList {
    let mut errs = ErrorList::default();
    for (i, permission) in permissions.iter().enumerate() {
        let path = path.child("permissions").index(i);
        errs.extend(action(&path, &permission.action));
        if let Some(http) = &permission.http {
            errs.extend(http_permission(&path, http));
        }
    }
    errs
}

fn http_permission(path: &Path, http: &IntentionHttpPermission) -> ErrorList {
    let mut errs = ErrorList::default();
    if !http.path_prefix.is_empty() {
        errs.extend(check::path_prefix(
            path.child("pathPrefix"),
            &http.path_prefix,
        ));
    }
    if !http.path_exact.is_empty() {
        errs.extend(check::path_prefix(
            path.child("pathExact"),
            &http.path_exact,
        ));
    }
    errs.extend(check::union(
        path.clone(),
        Value::repr(http),
        &[
            !http.path_regex.is_empty(),
            !http.path_prefix.is_empty(),
            !http.path_exact.is_empty(),
        ],
        Arity::AtMostOne,
        "at most only one of pathExact, pathPrefix, or pathRegex may be configured.",
    ));

    for (i, method) in http.methods.iter().enumerate() {
        errs.extend(check::one_of(
            path.child("methods").index(i),
            method,
            METHODS,
        ));
    }
    for i in check::duplicates(&http.methods) {
        errs.push(FieldError::invalid(
            path.child("methods").index(i),
            &http.methods[i],
            "method listed more than once.",
        ));
    }

    for (i, header) in http.header.iter().enumerate() {
        errs.extend(header_permission(&path.child("header").index(i), header));
    }
    errs
}

fn header_permission(path: &Path, header: &IntentionHttpHeaderPermission) -> Option<FieldError> {
    check::union(
        path.clone(),
        Value::repr(header),
        &[
            header.present,
            !header.exact.is_empty(),
            !header.regex.is_empty(),
            !header.prefix.is_empty(),
            !header.suffix.is_empty(),
        ],
        Arity::AtMostOne,
        "at most only one of exact, prefix, suffix, regex, or present may be configured.",
    )
}

impl ToRemote for SourceIntention {
    type Remote = remote::SourceIntention;

    fn to_remote(&self) -> Self::Remote {
        remote::SourceIntention {
            name: self.name.clone(),
            namespace: self.namespace.clone(),
            partition: self.partition.clone(),
            peer: self.peer.clone(),
            action: self.action.clone(),
            permissions: self.permissions.to_remote(),
            description: self.description.clone(),
            ..remote::SourceIntention::default()
        }
    }
}

impl ToRemote for IntentionPermission {
    type Remote = remote::IntentionPermission;

    fn to_remote(&self) -> Self::Remote {
        remote::IntentionPermission {
            action: self.action.clone(),
            http: self.http.to_remote(),
        }
    }
}

impl ToRemote for IntentionHttpPermission {
    type Remote = remote::IntentionHttpPermission;

    fn to_remote(&self) -> Self::Remote {
        remote::IntentionHttpPermission {
            path_exact: self.path_exact.clone(),
            path_prefix: self.path_prefix.clone(),
            path_regex: self.path_regex.clone(),
            header: self.header.to_remote(),
            methods: self.methods.clone(),
        }
    }
}

impl ToRemote for IntentionHttpHeaderPermission {
    type Remote = remote::IntentionHttpHeaderPermission;

    fn to_remote(&self) -> Self::Remote {
        remote::IntentionHttpHeaderPermission {
            name: self.name.clone(),
            present: self.present,
            exact: self.exact.clone(),
            prefix: self.prefix.clone(),
            suffix: self.suffix.clone(),
            regex: self.regex.clone(),
            invert: self.invert,
        }
    }
}
