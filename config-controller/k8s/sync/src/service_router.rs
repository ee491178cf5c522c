use crate::{
    entry::{config_status, ConfigEntry},
    shared::ToRemote,
};
use consul_config_controller_core::{
    check::{self, Arity},
    compare::{Comparison, SERVER_FIELDS},
    field::{FieldError, Path, Value},
    remote::{self, RemoteEntry},
    Capabilities, ErrorList,
};
use consul_config_controller_k8s_api::{
    service_router::{
        ServiceRoute, ServiceRouteDestination, ServiceRouteHttpMatch, ServiceRouteHttpMatchHeader,
        ServiceRouteHttpMatchQueryParam, ServiceRouteMatch,
    },
    ResourceExt, ServiceRouter,
};

impl ConfigEntry for ServiceRouter {
    const REMOTE_KIND: &'static str = "service-router";

    const COMPARISON: Comparison = Comparison {
        ignore: SERVER_FIELDS,
        default_is_empty: &[
            "Routes[].Destination.Namespace",
            "Routes[].Destination.Partition",
        ],
        zero_is_absent: &[],
        unordered: &[],
    };

    config_status!();

    fn validate(&self, caps: &Capabilities) -> ErrorList {
        let path = Path::spec().child("routes");
        let mut errs = ErrorList::default();
        for (i, route) in self.spec.routes.iter().enumerate() {
            errs.extend(validate_route(&path.index(i), route));
        }

        for (i, route) in self.spec.routes.iter().enumerate() {
            if let Some(dst) = &route.destination {
                errs.extend(check::gated(
                    path.index(i).child("destination").child("namespace"),
                    &dst.namespace,
                    caps.namespaces,
                    "Consul Enterprise namespaces must be enabled to set destination.namespace",
                ));
            }
        }
        for (i, route) in self.spec.routes.iter().enumerate() {
            if let Some(dst) = &route.destination {
                errs.extend(check::gated(
                    path.index(i).child("destination").child("partition"),
                    &dst.partition,
                    caps.partitions,
                    "Consul Enterprise partitions must be enabled to set destination.partition",
                ));
            }
        }
        errs
    }

    fn default_tenancy(&mut self, caps: &Capabilities) {
        if !caps.namespaces {
            return;
        }
        let ns = caps.remote_namespace(&self.namespace().unwrap_or_default());
        for dst in self
            .spec
            .routes
            .iter_mut()
            .filter_map(|r| r.destination.as_mut())
        {
            if dst.namespace.is_empty() {
                dst.namespace = ns.clone();
            }
        }
    }

    fn to_remote(&self, datacenter: &str) -> RemoteEntry {
        remote::ServiceRouter {
            name: self.name_any(),
            routes: self.spec.routes.to_remote(),
            meta: remote::meta(datacenter),
            ..remote::ServiceRouter::default()
        }
        .into()
    }
}

fn validate_route(path: &Path, route: &ServiceRoute) -> ErrorList {
    let mut errs = ErrorList::default();
    let rewrites = route
        .destination
        .as_ref()
        .is_some_and(|d| !d.prefix_rewrite.is_empty());
    if rewrites {
        let matches_path = route
            .match_
            .as_ref()
            .and_then(|m| m.http.as_ref())
            .is_some_and(|h| !h.path_prefix.is_empty() || !h.path_exact.is_empty());
        if !matches_path {
            errs.push(FieldError::invalid(
                path.clone(),
                Value::repr(route),
                "destination.prefixRewrite requires that either match.http.pathPrefix or match.http.pathExact be configured on this route",
            ));
        }
    }

    if let Some(http) = route.match_.as_ref().and_then(|m| m.http.as_ref()) {
        errs.extend(http_match(&path.child("match").child("http"), http));
    }
    errs
}

fn http_match(path: &Path, http: &ServiceRouteHttpMatch) -> ErrorList {
    let mut errs = ErrorList::default();
    errs.extend(check::union(
        path.clone(),
        Value::repr(http),
        &[
            !http.path_exact.is_empty(),
            !http.path_prefix.is_empty(),
            !http.path_regex.is_empty(),
        ],
        Arity::AtMostOne,
        "at most only one of pathExact, pathPrefix, or pathRegex may be configured",
    ));
    errs.extend(check::path_prefix(
        path.child("pathExact"),
        &http.path_exact,
    ));
    errs.extend(check::path_prefix(
        path.child("pathPrefix"),
        &http.path_prefix,
    ));

    for (i, h) in http.header.iter().enumerate() {
        errs.extend(check::union(
            path.child("header").index(i),
            Value::repr(h),
            &[
                !h.exact.is_empty(),
                !h.prefix.is_empty(),
                !h.suffix.is_empty(),
                !h.regex.is_empty(),
                h.present,
            ],
            Arity::AtMostOne,
            "at most only one of exact, prefix, suffix, regex, or present may be configured",
        ));
    }
    for (i, q) in http.query_param.iter().enumerate() {
        errs.extend(check::union(
            path.child("queryParam").index(i),
            Value::repr(q),
            &[!q.exact.is_empty(), !q.regex.is_empty(), q.present],
            Arity::AtMostOne,
            "at most only one of exact, regex, or present may be configured",
        ));
    }
    errs
}

impl ToRemote for ServiceRoute {
    type Remote = remote::ServiceRoute;

    fn to_remote(&self) -> Self::Remote {
        remote::ServiceRoute {
            r#match: self.match_.to_remote(),
            destination: self.destination.to_remote(),
        }
    }
}

impl ToRemote for ServiceRouteMatch {
    type Remote = remote::ServiceRouteMatch;

    fn to_remote(&self) -> Self::Remote {
        remote::ServiceRouteMatch {
            http: self.http.to_remote(),
        }
    }
}

impl ToRemote for ServiceRouteHttpMatch {
    type Remote = remote::ServiceRouteHttpMatch;

    fn to_remote(&self) -> Self::Remote {
        remote::ServiceRouteHttpMatch {
            case_insensitive: self.case_insensitive,
            path_exact: self.path_exact.clone(),
            path_prefix: self.path_prefix.clone(),
            path_regex: self.path_regex.clone(),
            header: self.header.to_remote(),
            query_param: self.query_param.to_remote(),
            methods: self.methods.clone(),
        }
    }
}

impl ToRemote for ServiceRouteHttpMatchHeader {
    type Remote = remote::HttpHeaderMatch;

    fn to_remote(&self) -> Self::Remote {
        remote::HttpHeaderMatch {
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

impl ToRemote for ServiceRouteHttpMatchQueryParam {
    type Remote = remote::HttpQueryMatch;

    fn to_remote(&self) -> Self::Remote {
        remote::HttpQueryMatch {
            name: self.name.clone(),
            present: self.present,
            exact: self.exact.clone(),
            regex: self.regex.clone(),
        }
    }
}

impl ToRemote for ServiceRouteDestination {
    type Remote = remote::ServiceRouteDestination;

    fn to_remote(&self) -> Self::Remote {
        remote::ServiceRouteDestination {
            service: self.service.clone(),
            service_subset: self.service_subset.clone(),
            namespace: self.namespace.clone(),
            partition: self.partition.clone(),
            prefix_rewrite: self.prefix_rewrite.clone(),
            idle_timeout: self.idle_timeout,
            request_timeout: self.request_timeout,
            num_retries: self.num_retries,
            retry_on_connect_failure: self.retry_on_connect_failure,
            retry_on: self.retry_on.clone(),
            retry_on_status_codes: self.retry_on_status_codes.clone(),
            request_headers: self.request_headers.to_remote(),
            response_headers: self.response_headers.to_remote(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{messages, meta, mirrored, namespaces};
    use consul_config_controller_k8s_api::service_router::ServiceRouterSpec;
    use pretty_assertions::assert_eq;

    fn resource(routes: Vec<ServiceRoute>) -> ServiceRouter {
        ServiceRouter {
            metadata: meta("web", "foo"),
            spec: ServiceRouterSpec { routes },
            status: None,
        }
    }

    fn to(service: &str) -> Option<ServiceRouteDestination> {
        Some(ServiceRouteDestination {
            service: service.to_string(),
            ..ServiceRouteDestination::default()
        })
    }

    fn http(m: ServiceRouteHttpMatch) -> Option<ServiceRouteMatch> {
        Some(ServiceRouteMatch { http: Some(m) })
    }

    fn details(errs: ErrorList) -> Vec<(String, String)> {
        errs.into_iter()
            .map(|e| (e.field.as_str().to_string(), e.detail))
            .collect()
    }

    #[test]
    fn valid_routes() {
        let sr = resource(vec![ServiceRoute {
            match_: http(ServiceRouteHttpMatch {
                path_prefix: "/admin".to_string(),
                header: vec![ServiceRouteHttpMatchHeader {
                    name: "x-debug".to_string(),
                    exact: "1".to_string(),
                    ..ServiceRouteHttpMatchHeader::default()
                }],
                ..ServiceRouteHttpMatch::default()
            }),
            destination: Some(ServiceRouteDestination {
                service: "admin".to_string(),
                prefix_rewrite: "/".to_string(),
                ..ServiceRouteDestination::default()
            }),
        }]);
        assert_eq!(messages(sr.validate(&namespaces())), Vec::<String>::new());
    }

    #[test]
    fn prefix_rewrite_requires_path_match() {
        let sr = resource(vec![ServiceRoute {
            match_: http(ServiceRouteHttpMatch {
                path_regex: "/.*".to_string(),
                ..ServiceRouteHttpMatch::default()
            }),
            destination: Some(ServiceRouteDestination {
                prefix_rewrite: "/v2".to_string(),
                ..ServiceRouteDestination::default()
            }),
        }]);
        assert_eq!(
            details(sr.validate(&namespaces())),
            vec![(
                "spec.routes[0]".to_string(),
                "destination.prefixRewrite requires that either match.http.pathPrefix or match.http.pathExact be configured on this route".to_string(),
            )]
        );
    }

    #[test]
    fn match_rules() {
        let sr = resource(vec![ServiceRoute {
            match_: http(ServiceRouteHttpMatch {
                path_exact: "exact".to_string(),
                path_prefix: "prefix".to_string(),
                header: vec![ServiceRouteHttpMatchHeader {
                    name: "h".to_string(),
                    present: true,
                    suffix: "s".to_string(),
                    ..ServiceRouteHttpMatchHeader::default()
                }],
                query_param: vec![ServiceRouteHttpMatchQueryParam {
                    name: "q".to_string(),
                    exact: "e".to_string(),
                    regex: "r".to_string(),
                    ..ServiceRouteHttpMatchQueryParam::default()
                }],
                ..ServiceRouteHttpMatch::default()
            }),
            destination: to("foo"),
        }]);
        assert_eq!(
            details(sr.validate(&namespaces())),
            vec![
                (
                    "spec.routes[0].match.http".to_string(),
                    "at most only one of pathExact, pathPrefix, or pathRegex may be configured".to_string(),
                ),
                (
                    "spec.routes[0].match.http.pathExact".to_string(),
                    "must begin with a '/'".to_string(),
                ),
                (
                    "spec.routes[0].match.http.pathPrefix".to_string(),
                    "must begin with a '/'".to_string(),
                ),
                (
                    "spec.routes[0].match.http.header[0]".to_string(),
                    "at most only one of exact, prefix, suffix, regex, or present may be configured".to_string(),
                ),
                (
                    "spec.routes[0].match.http.queryParam[0]".to_string(),
                    "at most only one of exact, regex, or present may be configured".to_string(),
                ),
            ]
        );
    }

    #[test]
    fn enterprise_fields_are_gated() {
        let sr = resource(vec![ServiceRoute {
            match_: None,
            destination: Some(ServiceRouteDestination {
                service: "foo".to_string(),
                namespace: "other".to_string(),
                partition: "ap1".to_string(),
                ..ServiceRouteDestination::default()
            }),
        }]);
        assert_eq!(
            messages(sr.validate(&Capabilities::default())),
            vec![
                r#"spec.routes[0].destination.namespace: Invalid value: "other": Consul Enterprise namespaces must be enabled to set destination.namespace"#,
                r#"spec.routes[0].destination.partition: Invalid value: "ap1": Consul Enterprise partitions must be enabled to set destination.partition"#,
            ]
        );
    }

    #[test]
    fn defaults_destination_namespaces() {
        let mut sr = resource(vec![
            ServiceRoute {
                match_: None,
                destination: to("foo"),
            },
            ServiceRoute {
                match_: None,
                destination: Some(ServiceRouteDestination {
                    namespace: "explicit".to_string(),
                    ..ServiceRouteDestination::default()
                }),
            },
            ServiceRoute::default(),
        ]);

        let unchanged = sr.clone();
        sr.default_tenancy(&Capabilities::default());
        assert_eq!(sr, unchanged);

        sr.default_tenancy(&mirrored("k8s-"));
        let namespaces = sr
            .spec
            .routes
            .iter()
            .map(|r| r.destination.as_ref().map(|d| d.namespace.as_str()))
            .collect::<Vec<_>>();
        assert_eq!(namespaces, vec![Some("k8s-web"), Some("explicit"), None]);

        let once = sr.clone();
        sr.default_tenancy(&mirrored("k8s-"));
        assert_eq!(sr, once);
    }

    #[test]
    fn matches_when_store_fills_defaults() {
        let sr = resource(vec![ServiceRoute {
            match_: None,
            destination: to("foo"),
        }]);
        let mut echoed = sr.to_remote("dc1");
        if let RemoteEntry::ServiceRouter(e) = &mut echoed {
            e.namespace = "web".to_string();
            e.create_index = 1;
            for dst in e.routes.iter_mut().filter_map(|r| r.destination.as_mut()) {
                dst.namespace = "default".to_string();
                dst.partition = "default".to_string();
            }
        }
        assert!(sr.matches(&echoed));

        if let RemoteEntry::ServiceRouter(e) = &mut echoed {
            e.routes.clear();
        }
        assert!(!sr.matches(&echoed));
    }
}
