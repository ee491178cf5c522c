use crate::{
    entry::{config_status, ConfigEntry},
    shared::{self, ToRemote},
};
use consul_config_controller_core::{
    check,
    compare::{Comparison, SERVER_FIELDS},
    field::{FieldError, Path, Value},
    filter,
    remote::{self, RemoteEntry},
    Capabilities, ErrorList, DEFAULT_TENANCY,
};
use consul_config_controller_k8s_api::{
    service_resolver::{
        CookieConfig, HashPolicy, LeastRequestConfig, LoadBalancer, RingHashConfig,
        ServiceResolverFailover, ServiceResolverFailoverTarget, ServiceResolverRedirect,
        ServiceResolverSubset,
    },
    ResourceExt, ServiceResolver,
};
use regex::Regex;
use std::{collections::BTreeMap, sync::LazyLock};

static SUBSET_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([a-z0-9-]*[a-z0-9])?$").expect("subset name regex must compile")
});

const HASH_POLICY_FIELDS: &[&str] = &["header", "cookie", "query_parameter"];

impl ConfigEntry for ServiceResolver {
    const REMOTE_KIND: &'static str = "service-resolver";

    const COMPARISON: Comparison = Comparison {
        ignore: SERVER_FIELDS,
        default_is_empty: &[
            "Redirect.Namespace",
            "Redirect.Partition",
            "Failover.*.Targets[].Namespace",
            "Failover.*.Targets[].Partition",
        ],
        zero_is_absent: &[],
        unordered: &[],
    };

    config_status!();

    fn validate(&self, caps: &Capabilities) -> ErrorList {
        let spec = &self.spec;
        let path = Path::spec();
        let mut errs = ErrorList::default();

        for (subset, failover) in &spec.failover {
            errs.extend(validate_failover(
                &path.child("failover").key(subset),
                failover,
                caps,
            ));
        }
        if !spec.failover.is_empty() && spec.redirect.is_some() {
            errs.push(FieldError::invalid(
                path.clone(),
                Value::repr(self),
                "service resolver redirect and failover cannot both be set",
            ));
        }

        if let Some(redirect) = &spec.redirect {
            errs.extend(validate_redirect(&path.child("redirect"), redirect, caps));
        }
        errs.extend(shared::prioritize_by_locality(
            &path.child("prioritizeByLocality"),
            spec.prioritize_by_locality.as_ref(),
        ));
        errs.extend(subsets(&path.child("subsets"), &spec.subsets));
        if let Some(lb) = &spec.load_balancer {
            for (i, policy) in lb.hash_policies.iter().enumerate() {
                errs.extend(hash_policy(
                    &path.child("loadBalancer").child("hashPolicies").index(i),
                    policy,
                ));
            }
        }

        if !caps.namespaces {
            if let Some(redirect) = &spec.redirect {
                errs.extend(check::gated(
                    path.child("redirect").child("namespace"),
                    &redirect.namespace,
                    false,
                    "Consul Enterprise namespaces must be enabled to set redirect.namespace",
                ));
            }
            for (subset, failover) in &spec.failover {
                errs.extend(check::gated(
                    path.child("failover").key(subset).child("namespace"),
                    &failover.namespace,
                    false,
                    "Consul Enterprise namespaces must be enabled to set failover.namespace",
                ));
            }
        }
        if let Some(redirect) = &spec.redirect {
            errs.extend(check::gated(
                path.child("redirect").child("partition"),
                &redirect.partition,
                caps.partitions,
                "Consul Enterprise partitions must be enabled to set redirect.partition",
            ));
        }
        errs
    }

    fn to_remote(&self, datacenter: &str) -> RemoteEntry {
        let spec = &self.spec;
        remote::ServiceResolver {
            name: self.name_any(),
            default_subset: spec.default_subset.clone(),
            subsets: spec
                .subsets
                .iter()
                .map(|(name, subset)| (name.clone(), subset.to_remote()))
                .collect(),
            redirect: spec.redirect.to_remote(),
            failover: spec
                .failover
                .iter()
                .map(|(name, failover)| (name.clone(), failover.to_remote()))
                .collect(),
            connect_timeout: spec.connect_timeout,
            request_timeout: spec.request_timeout,
            load_balancer: spec.load_balancer.to_remote(),
            prioritize_by_locality: spec.prioritize_by_locality.to_remote(),
            meta: remote::meta(datacenter),
            ..remote::ServiceResolver::default()
        }
        .into()
    }
}

fn subsets(path: &Path, subsets: &BTreeMap<String, ServiceResolverSubset>) -> ErrorList {
    let mut errs = ErrorList::default();
    for (name, subset) in subsets {
        let path = path.key(name);
        if name.is_empty() {
            errs.push(FieldError::invalid(
                path.clone(),
                name,
                "subset defined with empty name",
            ));
        }
        if !SUBSET_NAME.is_match(name) {
            errs.push(FieldError::invalid(
                path.clone(),
                name,
                "subset name must begin or end with lower case alphanumeric characters, and contain lower case alphanumeric characters or '-' in between",
            ));
        }
        if !subset.filter.is_empty() && filter::parse(&subset.filter).is_err() {
            errs.push(FieldError::invalid(
                path.child("filter"),
                &subset.filter,
                "filter for subset is not a valid expression",
            ));
        }
    }
    errs
}

fn validate_redirect(
    path: &Path,
    redirect: &ServiceResolverRedirect,
    caps: &Capabilities,
) -> ErrorList {
    let mut errs = ErrorList::default();
    if *redirect == ServiceResolverRedirect::default() {
        errs.push(FieldError::invalid(
            path.clone(),
            "{}",
            "service resolver redirect cannot be empty",
        ));
    }

    if !matches!(caps.partition.as_str(), "" | DEFAULT_TENANCY) && !redirect.datacenter.is_empty()
    {
        errs.push(FieldError::invalid(
            path.child("datacenter"),
            &redirect.datacenter,
            "cross-datacenter redirect is only supported in the default partition",
        ));
    }
    if caps.partition != redirect.partition && !redirect.datacenter.is_empty() {
        errs.push(FieldError::invalid(
            path.child("partition"),
            &redirect.partition,
            "cross-datacenter and cross-partition redirect is not supported",
        ));
    }

    let invalid = |detail: &str| FieldError::invalid(path.clone(), Value::repr(redirect), detail);
    let r = redirect;
    if set(&r.sameness_group) && set(&r.service_subset) {
        errs.push(invalid("samenessGroup cannot be set with serviceSubset"));
    } else if set(&r.sameness_group) && set(&r.partition) {
        errs.push(invalid("partition cannot be set with samenessGroup"));
    } else if set(&r.sameness_group) && set(&r.datacenter) {
        errs.push(invalid("samenessGroup cannot be set with datacenter"));
    } else if set(&r.peer) && set(&r.service_subset) {
        errs.push(invalid("peer cannot be set with serviceSubset"));
    } else if set(&r.peer) && set(&r.partition) {
        errs.push(invalid("partition cannot be set with peer"));
    } else if set(&r.peer) && set(&r.datacenter) {
        errs.push(invalid("peer cannot be set with datacenter"));
    } else if !set(&r.service) {
        for (value, detail) in [
            (&r.service_subset, "serviceSubset defined without service"),
            (&r.namespace, "namespace defined without service"),
            (&r.partition, "partition defined without service"),
            (&r.peer, "peer defined without service"),
        ] {
            if set(value) {
                errs.push(invalid(detail));
            }
        }
    }
    errs
}

fn validate_failover(
    path: &Path,
    failover: &ServiceResolverFailover,
    caps: &Capabilities,
) -> ErrorList {
    let mut errs = ErrorList::default();
    let f = failover;
    if *f == ServiceResolverFailover::default() {
        errs.push(FieldError::invalid(
            path.clone(),
            "{}",
            "service, serviceSubset, namespace, datacenters, policy, and targets cannot all be empty at once",
        ));
    }

    if caps.partition != DEFAULT_TENANCY && !f.datacenters.is_empty() {
        errs.push(FieldError::invalid(
            path.child("datacenters"),
            Value::repr(&f.datacenters),
            "cross-datacenter failover is only supported in the default partition",
        ));
    }

    errs.extend(shared::failover_policy(
        &path.child("policy"),
        f.policy.as_ref(),
    ));

    let invalid = |detail: &str| FieldError::invalid(path.clone(), Value::repr(f), detail);
    if !f.sameness_group.is_empty() {
        if !f.datacenters.is_empty() {
            errs.push(invalid("samenessGroup cannot be set with datacenters"));
        } else if !f.service_subset.is_empty() {
            errs.push(invalid("samenessGroup cannot be set with serviceSubset"));
        } else if !f.targets.is_empty() {
            errs.push(invalid("samenessGroup cannot be set with targets"));
        }
    }
    if !f.targets.is_empty() {
        if !f.datacenters.is_empty() {
            errs.push(invalid("targets cannot be set with datacenters"));
        }
        if !f.service_subset.is_empty() {
            errs.push(invalid("targets cannot be set with serviceSubset"));
        }
        if !f.service.is_empty() {
            errs.push(invalid("targets cannot be set with service"));
        }
    }

    for (i, target) in f.targets.iter().enumerate() {
        let detail = if set(&target.peer) && set(&target.service_subset) {
            "target.peer cannot be set with target.serviceSubset"
        } else if set(&target.peer) && set(&target.partition) {
            "target.partition cannot be set with target.peer"
        } else if set(&target.peer) && set(&target.datacenter) {
            "target.peer cannot be set with target.datacenter"
        } else if set(&target.partition) && set(&target.datacenter) {
            "target.partition cannot be set with target.datacenter"
        } else {
            continue;
        };
        errs.push(FieldError::invalid(
            path.child("targets").index(i),
            Value::repr(target),
            detail,
        ));
    }

    for (i, dc) in f.datacenters.iter().enumerate() {
        if dc.is_empty() {
            errs.push(FieldError::invalid(
                path.child("datacenters").index(i),
                "",
                "found empty datacenter",
            ));
        }
    }
    errs
}

fn set(s: &str) -> bool {
    !s.is_empty()
}

fn hash_policy(path: &Path, policy: &HashPolicy) -> ErrorList {
    let mut errs = ErrorList::default();
    if !policy.field.is_empty() {
        errs.extend(check::one_of(
            path.child("field"),
            &policy.field,
            HASH_POLICY_FIELDS,
        ));
        if policy.source_ip {
            errs.push(FieldError::invalid(
                path.clone(),
                Value::repr(policy),
                "cannot set both field and sourceIP",
            ));
        } else if policy.field_value.is_empty() {
            errs.push(FieldError::invalid(
                path.child("fieldValue"),
                &policy.field_value,
                "fieldValue cannot be empty if field is set",
            ));
        }
    }

    if let Some(cookie) = &policy.cookie_config {
        if cookie.session && !cookie.ttl.is_zero() && !cookie.ttl.is_negative() {
            errs.push(FieldError::invalid(
                path.child("cookieConfig"),
                Value::repr(cookie),
                "cannot set both session and ttl",
            ));
        }
    }
    errs
}

impl ToRemote for ServiceResolverSubset {
    type Remote = remote::ResolverSubset;

    fn to_remote(&self) -> Self::Remote {
        remote::ResolverSubset {
            filter: self.filter.clone(),
            only_passing: self.only_passing,
        }
    }
}

impl ToRemote for ServiceResolverRedirect {
    type Remote = remote::ResolverRedirect;

    fn to_remote(&self) -> Self::Remote {
        remote::ResolverRedirect {
            service: self.service.clone(),
            service_subset: self.service_subset.clone(),
            namespace: self.namespace.clone(),
            partition: self.partition.clone(),
            datacenter: self.datacenter.clone(),
            peer: self.peer.clone(),
            sameness_group: self.sameness_group.clone(),
        }
    }
}

impl ToRemote for ServiceResolverFailover {
    type Remote = remote::ResolverFailover;

    fn to_remote(&self) -> Self::Remote {
        remote::ResolverFailover {
            service: self.service.clone(),
            service_subset: self.service_subset.clone(),
            namespace: self.namespace.clone(),
            datacenters: self.datacenters.clone(),
            targets: self.targets.to_remote(),
            policy: self.policy.as_ref().map(|p| remote::ResolverFailoverPolicy {
                mode: p.mode.clone(),
                regions: p.regions.clone(),
            }),
            sameness_group: self.sameness_group.clone(),
        }
    }
}

impl ToRemote for ServiceResolverFailoverTarget {
    type Remote = remote::ResolverFailoverTarget;

    fn to_remote(&self) -> Self::Remote {
        remote::ResolverFailoverTarget {
            service: self.service.clone(),
            service_subset: self.service_subset.clone(),
            partition: self.partition.clone(),
            namespace: self.namespace.clone(),
            datacenter: self.datacenter.clone(),
            peer: self.peer.clone(),
        }
    }
}

impl ToRemote for LoadBalancer {
    type Remote = remote::LoadBalancer;

    fn to_remote(&self) -> Self::Remote {
        remote::LoadBalancer {
            policy: self.policy.clone(),
            ring_hash_config: self.ring_hash_config.to_remote(),
            least_request_config: self.least_request_config.to_remote(),
            hash_policies: self.hash_policies.to_remote(),
        }
    }
}

impl ToRemote for RingHashConfig {
    type Remote = remote::RingHashConfig;

    fn to_remote(&self) -> Self::Remote {
        remote::RingHashConfig {
            minimum_ring_size: self.minimum_ring_size,
            maximum_ring_size: self.maximum_ring_size,
        }
    }
}

impl ToRemote for LeastRequestConfig {
    type Remote = remote::LeastRequestConfig;

    fn to_remote(&self) -> Self::Remote {
        remote::LeastRequestConfig {
            choice_count: self.choice_count,
        }
    }
}

impl ToRemote for HashPolicy {
    type Remote = remote::HashPolicy;

    fn to_remote(&self) -> Self::Remote {
        remote::HashPolicy {
            field: self.field.clone(),
            field_value: self.field_value.clone(),
            cookie_config: self.cookie_config.to_remote(),
            source_ip: self.source_ip,
            terminal: self.terminal,
        }
    }
}

impl ToRemote for CookieConfig {
    type Remote = remote::CookieConfig;

    fn to_remote(&self) -> Self::Remote {
        remote::CookieConfig {
            session: self.session,
            ttl: self.ttl,
            path: self.path.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{messages, meta, partitions};
    use consul_config_controller_k8s_api::{service_resolver::ServiceResolverSpec, GoDuration};
    use maplit::btreemap;
    use pretty_assertions::assert_eq;

    fn resource(spec: ServiceResolverSpec) -> ServiceResolver {
        ServiceResolver {
            metadata: meta("default", "foo"),
            spec,
            status: None,
        }
    }

    fn default_partition() -> Capabilities {
        Capabilities {
            partition: "default".to_string(),
            ..Capabilities::default()
        }
    }

    #[test]
    fn valid() {
        let sr = resource(ServiceResolverSpec {
            default_subset: "v1".to_string(),
            subsets: btreemap! {
                "v1".to_string() => ServiceResolverSubset {
                    filter: "Service.Meta.version == v1".to_string(),
                    only_passing: true,
                },
            },
            failover: btreemap! {
                "*".to_string() => ServiceResolverFailover {
                    targets: vec![ServiceResolverFailoverTarget {
                        peer: "cluster-02".to_string(),
                        ..ServiceResolverFailoverTarget::default()
                    }],
                    ..ServiceResolverFailover::default()
                },
            },
            connect_timeout: GoDuration::from_secs(15),
            ..ServiceResolverSpec::default()
        });
        assert_eq!(messages(sr.validate(&default_partition())), Vec::<String>::new());
    }

    #[test]
    fn subset_names_and_filters() {
        let sr = resource(ServiceResolverSpec {
            subsets: btreemap! {
                "".to_string() => ServiceResolverSubset::default(),
                "V1".to_string() => ServiceResolverSubset {
                    filter: "random string".to_string(),
                    only_passing: false,
                },
            },
            ..ServiceResolverSpec::default()
        });
        assert_eq!(
            messages(sr.validate(&default_partition())),
            vec![
                r#"spec.subsets[]: Invalid value: "": subset defined with empty name"#,
                r#"spec.subsets[]: Invalid value: "": subset name must begin or end with lower case alphanumeric characters, and contain lower case alphanumeric characters or '-' in between"#,
                r#"spec.subsets[V1]: Invalid value: "V1": subset name must begin or end with lower case alphanumeric characters, and contain lower case alphanumeric characters or '-' in between"#,
                r#"spec.subsets[V1].filter: Invalid value: "random string": filter for subset is not a valid expression"#,
            ]
        );
    }

    #[test]
    fn redirect_and_failover_are_exclusive() {
        let sr = resource(ServiceResolverSpec {
            redirect: Some(ServiceResolverRedirect {
                service: "bar".to_string(),
                ..ServiceResolverRedirect::default()
            }),
            failover: btreemap! {
                "v1".to_string() => ServiceResolverFailover {
                    service: "baz".to_string(),
                    ..ServiceResolverFailover::default()
                },
            },
            ..ServiceResolverSpec::default()
        });
        let errs = sr.validate(&default_partition());
        assert_eq!(errs.len(), 1);
        let err = errs.iter().next().expect("one error");
        assert_eq!(err.field.as_str(), "spec");
        assert_eq!(
            err.detail,
            "service resolver redirect and failover cannot both be set"
        );
    }

    #[test]
    fn redirect_rules() {
        let path = Path::spec().child("redirect");
        let check = |redirect: ServiceResolverRedirect, caps: &Capabilities| {
            validate_redirect(&path, &redirect, caps)
                .into_iter()
                .map(|e| e.detail)
                .collect::<Vec<_>>()
        };

        assert_eq!(
            check(ServiceResolverRedirect::default(), &Capabilities::default()),
            vec!["service resolver redirect cannot be empty"]
        );
        assert_eq!(
            check(
                ServiceResolverRedirect {
                    datacenter: "dc2".to_string(),
                    partition: "p2".to_string(),
                    service: "foo".to_string(),
                    ..ServiceResolverRedirect::default()
                },
                &partitions("p2"),
            ),
            vec!["cross-datacenter redirect is only supported in the default partition"]
        );
        assert_eq!(
            check(
                ServiceResolverRedirect {
                    datacenter: "dc2".to_string(),
                    service: "foo".to_string(),
                    sameness_group: "sg2".to_string(),
                    ..ServiceResolverRedirect::default()
                },
                &partitions("default"),
            ),
            vec![
                "cross-datacenter and cross-partition redirect is not supported",
                "samenessGroup cannot be set with datacenter",
            ]
        );
        assert_eq!(
            check(
                ServiceResolverRedirect {
                    service_subset: "v1".to_string(),
                    namespace: "ns1".to_string(),
                    ..ServiceResolverRedirect::default()
                },
                &Capabilities::default(),
            ),
            vec![
                "serviceSubset defined without service",
                "namespace defined without service",
            ]
        );
    }

    #[test]
    fn failover_rules() {
        let path = Path::spec().child("failover").key("*");
        let check = |failover: ServiceResolverFailover, caps: &Capabilities| {
            validate_failover(&path, &failover, caps)
                .into_iter()
                .map(|e| e.detail)
                .collect::<Vec<_>>()
        };

        assert_eq!(
            check(ServiceResolverFailover::default(), &default_partition()),
            vec!["service, serviceSubset, namespace, datacenters, policy, and targets cannot all be empty at once"]
        );
        assert_eq!(
            check(
                ServiceResolverFailover {
                    datacenters: vec!["dc2".to_string(), "".to_string()],
                    targets: vec![ServiceResolverFailoverTarget {
                        peer: "p1".to_string(),
                        partition: "ap1".to_string(),
                        ..ServiceResolverFailoverTarget::default()
                    }],
                    ..ServiceResolverFailover::default()
                },
                &partitions("ap1"),
            ),
            vec![
                "cross-datacenter failover is only supported in the default partition",
                "targets cannot be set with datacenters",
                "target.partition cannot be set with target.peer",
                "found empty datacenter",
            ]
        );
        assert_eq!(
            check(
                ServiceResolverFailover {
                    sameness_group: "sg".to_string(),
                    service_subset: "v1".to_string(),
                    ..ServiceResolverFailover::default()
                },
                &default_partition(),
            ),
            vec!["samenessGroup cannot be set with serviceSubset"]
        );
    }

    #[test]
    fn enterprise_gates() {
        let sr = resource(ServiceResolverSpec {
            redirect: Some(ServiceResolverRedirect {
                service: "bar".to_string(),
                namespace: "ns".to_string(),
                partition: "ap".to_string(),
                ..ServiceResolverRedirect::default()
            }),
            ..ServiceResolverSpec::default()
        });
        assert_eq!(
            messages(sr.validate(&Capabilities::default())),
            vec![
                r#"spec.redirect.namespace: Invalid value: "ns": Consul Enterprise namespaces must be enabled to set redirect.namespace"#,
                r#"spec.redirect.partition: Invalid value: "ap": Consul Enterprise partitions must be enabled to set redirect.partition"#,
            ]
        );
    }

    #[test]
    fn hash_policies() {
        let path = Path::spec().child("loadBalancer").child("hashPolicies").index(0);
        let errs = hash_policy(
            &path,
            &HashPolicy {
                field: "invalid".to_string(),
                source_ip: true,
                cookie_config: Some(CookieConfig {
                    session: true,
                    ttl: GoDuration::from_secs(100),
                    path: String::new(),
                }),
                ..HashPolicy::default()
            },
        );
        assert_eq!(
            messages(errs),
            vec![
                r#"spec.loadBalancer.hashPolicies[0].field: Invalid value: "invalid": must be one of "header", "cookie", "query_parameter""#,
                r#"spec.loadBalancer.hashPolicies[0]: Invalid value: "{\"field\":\"invalid\",\"cookieConfig\":{\"session\":true,\"ttl\":\"1m40s\"},\"sourceIP\":true}": cannot set both field and sourceIP"#,
                r#"spec.loadBalancer.hashPolicies[0].cookieConfig: Invalid value: "{\"session\":true,\"ttl\":\"1m40s\"}": cannot set both session and ttl"#,
            ]
        );

        let errs = hash_policy(
            &path,
            &HashPolicy {
                field: "header".to_string(),
                ..HashPolicy::default()
            },
        );
        assert_eq!(
            messages(errs),
            vec![r#"spec.loadBalancer.hashPolicies[0].fieldValue: Invalid value: "": fieldValue cannot be empty if field is set"#]
        );
    }

    #[test]
    fn matches_with_default_tenancy_echoed() {
        let sr = resource(ServiceResolverSpec {
            redirect: Some(ServiceResolverRedirect {
                service: "bar".to_string(),
                ..ServiceResolverRedirect::default()
            }),
            failover: btreemap! {
                "*".to_string() => ServiceResolverFailover {
                    targets: vec![ServiceResolverFailoverTarget {
                        service: "baz".to_string(),
                        ..ServiceResolverFailoverTarget::default()
                    }],
                    ..ServiceResolverFailover::default()
                },
            },
            ..ServiceResolverSpec::default()
        });

        let mut echoed = sr.to_remote("dc1");
        if let RemoteEntry::ServiceResolver(e) = &mut echoed {
            e.namespace = "default".to_string();
            e.modify_index = 10;
            if let Some(r) = e.redirect.as_mut() {
                r.namespace = "default".to_string();
                r.partition = "default".to_string();
            }
            for failover in e.failover.values_mut() {
                for t in &mut failover.targets {
                    t.namespace = "default".to_string();
                    t.partition = "default".to_string();
                }
            }
        }
        assert!(sr.matches(&echoed));

        if let RemoteEntry::ServiceResolver(e) = &mut echoed {
            if let Some(r) = e.redirect.as_mut() {
                r.namespace = "other".to_string();
            }
        }
        assert!(!sr.matches(&echoed));
    }
}
