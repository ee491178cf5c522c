use crate::{
    entry::{config_status, ConfigEntry},
    shared::ToRemote,
};
use consul_config_controller_core::{
    check,
    compare::{Comparison, SERVER_FIELDS},
    field::{Path, Value},
    remote::{self, RemoteEntry},
    Capabilities, ErrorList,
};
use consul_config_controller_k8s_api::{
    service_splitter::ServiceSplit, ResourceExt, ServiceSplitter,
};

impl ConfigEntry for ServiceSplitter {
    const REMOTE_KIND: &'static str = "service-splitter";

    const COMPARISON: Comparison = Comparison {
        ignore: SERVER_FIELDS,
        default_is_empty: &["Splits[].Namespace", "Splits[].Partition"],
        zero_is_absent: &[],
        unordered: &[],
    };

    config_status!();

    fn validate(&self, caps: &Capabilities) -> ErrorList {
        let splits = &self.spec.splits;
        let path = Path::spec().child("splits");
        let mut errs = ErrorList::default();

        for (i, split) in splits.iter().enumerate() {
            errs.extend(check::weight(path.index(i).child("weight"), split.weight));
        }
        errs.extend(check::weight_sum(
            path.clone(),
            Value::repr(splits),
            splits.iter().map(|s| s.weight),
        ));

        for (i, split) in splits.iter().enumerate() {
            errs.extend(check::gated(
                path.index(i).child("namespace"),
                &split.namespace,
                caps.namespaces,
                "Consul Enterprise namespaces must be enabled to set split.namespace",
            ));
        }
        for (i, split) in splits.iter().enumerate() {
            errs.extend(check::gated(
                path.index(i).child("partition"),
                &split.partition,
                caps.partitions,
                "Consul Enterprise partitions must be enabled to set split.partition",
            ));
        }
        errs
    }

    fn to_remote(&self, datacenter: &str) -> RemoteEntry {
        remote::ServiceSplitter {
            name: self.name_any(),
            splits: self.spec.splits.to_remote(),
            meta: remote::meta(datacenter),
            ..remote::ServiceSplitter::default()
        }
        .into()
    }
}

impl ToRemote for ServiceSplit {
    type Remote = remote::ServiceSplit;

    fn to_remote(&self) -> Self::Remote {
        remote::ServiceSplit {
            weight: self.weight,
            service: self.service.clone(),
            service_subset: self.service_subset.clone(),
            namespace: self.namespace.clone(),
            partition: self.partition.clone(),
            request_headers: self.request_headers.to_remote(),
            response_headers: self.response_headers.to_remote(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{messages, meta, partitions};
    use consul_config_controller_k8s_api::service_splitter::ServiceSplitterSpec;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn split(weight: f32, subset: &str) -> ServiceSplit {
        ServiceSplit {
            weight,
            service_subset: subset.to_string(),
            ..ServiceSplit::default()
        }
    }

    fn resource(splits: Vec<ServiceSplit>) -> ServiceSplitter {
        ServiceSplitter {
            metadata: meta("default", "web"),
            spec: ServiceSplitterSpec { splits },
            status: None,
        }
    }

    #[rstest]
    #[case(vec![split(100.0, "v1")])]
    #[case(vec![split(50.0, "v1"), split(50.0, "v2")])]
    #[case(vec![split(99.99, "v1"), split(0.01, "v2")])]
    #[case(vec![split(0.0, "v1"), split(100.0, "v2")])]
    fn accepts_weights(#[case] splits: Vec<ServiceSplit>) {
        assert_eq!(
            messages(resource(splits).validate(&Capabilities::default())),
            Vec::<String>::new()
        );
    }

    #[test]
    fn rejects_out_of_range_weights() {
        let s = resource(vec![split(0.001, "v1"), split(101.0, "v2")]);
        let errs = messages(s.validate(&Capabilities::default()));
        assert_eq!(
            errs[..2].to_vec(),
            vec![
                "spec.splits[0].weight: Invalid value: 0.001: weight must be a percentage between 0.01 and 100",
                "spec.splits[1].weight: Invalid value: 101: weight must be a percentage between 0.01 and 100",
            ]
        );
        assert!(errs[2].ends_with(
            "the sum of weights across all splits must add up to 100 percent, but adds up to 101.000999"
        ), "{}", errs[2]);
    }

    #[test]
    fn rejects_incomplete_sum() {
        let s = resource(vec![split(50.0, "v1"), split(49.0, "v2")]);
        assert_eq!(
            messages(s.validate(&Capabilities::default())),
            vec![
                r#"spec.splits: Invalid value: "[{\"weight\":50.0,\"serviceSubset\":\"v1\"},{\"weight\":49.0,\"serviceSubset\":\"v2\"}]": the sum of weights across all splits must add up to 100 percent, but adds up to 99.000000"#,
            ]
        );
    }

    #[test]
    fn rejects_empty_splits() {
        let errs = resource(vec![]).validate(&Capabilities::default());
        assert_eq!(errs.len(), 1);
    }

    #[test]
    fn enterprise_fields_are_gated() {
        let s = resource(vec![ServiceSplit {
            weight: 100.0,
            namespace: "ns".to_string(),
            partition: "ap".to_string(),
            ..ServiceSplit::default()
        }]);
        assert_eq!(
            messages(s.validate(&Capabilities::default())),
            vec![
                r#"spec.splits[0].namespace: Invalid value: "ns": Consul Enterprise namespaces must be enabled to set split.namespace"#,
                r#"spec.splits[0].partition: Invalid value: "ap": Consul Enterprise partitions must be enabled to set split.partition"#,
            ]
        );
        assert_eq!(messages(s.validate(&partitions("ap"))), Vec::<String>::new());
    }

    #[test]
    fn defaulting_is_a_no_op() {
        let mut s = resource(vec![split(100.0, "v1")]);
        let before = s.clone();
        s.default_tenancy(&partitions("ap"));
        assert_eq!(s, before);
    }

    #[test]
    fn matches_normalized_tenancy() {
        let s = resource(vec![split(50.0, "v1"), split(50.0, "v2")]);
        let mut echoed = s.to_remote("dc1");
        if let RemoteEntry::ServiceSplitter(e) = &mut echoed {
            for split in &mut e.splits {
                split.namespace = "default".to_string();
                split.partition = "default".to_string();
            }
        }
        assert!(s.matches(&echoed));

        if let RemoteEntry::ServiceSplitter(e) = &mut echoed {
            e.splits.reverse();
        }
        assert!(!s.matches(&echoed));
    }
}
