use crate::{
    entry::{config_status, singleton, ConfigEntry, Conflict},
    shared::ToRemote,
};
use consul_config_controller_core::{
    check::{self, Arity},
    compare::{Comparison, SERVER_FIELDS},
    field::{FieldError, Path, Value},
    remote::{self, RemoteEntry},
    Capabilities, ErrorList, DEFAULT_TENANCY, WILDCARD,
};
use consul_config_controller_k8s_api::{
    exported_services::{ExportedService, ServiceConsumer},
    ExportedServices, ResourceExt,
};
use kube::core::admission::Operation;

impl ConfigEntry for ExportedServices {
    const REMOTE_KIND: &'static str = "exported-services";
    const GLOBAL: bool = true;

    const COMPARISON: Comparison = Comparison {
        ignore: SERVER_FIELDS,
        default_is_empty: &["Services[].Consumers[].Partition"],
        zero_is_absent: &[],
        unordered: &[],
    };

    config_status!();

    fn validate(&self, caps: &Capabilities) -> ErrorList {
        let mut errs = ErrorList::default();
        let name = self.name_any();
        let kind = Self::kube_kind();
        if caps.partitions && name != caps.partition {
            errs.push(FieldError::invalid(
                Path::new("name"),
                &name,
                format!(
                    r#"{kind} resource name must be the same name as the partition, "{}""#,
                    caps.partition
                ),
            ));
        } else if !caps.partitions && name != DEFAULT_TENANCY {
            errs.push(FieldError::invalid(
                Path::new("name"),
                &name,
                format!(r#"{kind} resource name must be "{DEFAULT_TENANCY}""#),
            ));
        }

        let path = Path::spec().child("services");
        if self.spec.services.is_empty() {
            errs.push(FieldError::invalid(
                path.clone(),
                Value::repr(&self.spec.services),
                "at least one service must be exported",
            ));
        }
        for (i, service) in self.spec.services.iter().enumerate() {
            errs.extend(exported_service(&path.index(i), service, caps));
        }
        errs
    }

    fn to_remote(&self, datacenter: &str) -> RemoteEntry {
        remote::ExportedServices {
            name: self.name_any(),
            services: self.spec.services.to_remote(),
            meta: remote::meta(datacenter),
            ..remote::ExportedServices::default()
        }
        .into()
    }

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
        singleton(siblings, &Self::kube_kind())
    }
}

fn exported_service(path: &Path, service: &ExportedService, caps: &Capabilities) -> ErrorList {
    let mut errs = ErrorList::default();
    if service.consumers.is_empty() {
        errs.push(FieldError::invalid(
            path.clone(),
            Value::repr(&service.consumers),
            "service must have at least 1 consumer.",
        ));
    }
    if !caps.namespaces && !service.namespace.is_empty() {
        errs.push(FieldError::invalid(
            path.clone(),
            &service.namespace,
            "Consul Namespaces must be enabled to specify service namespace.",
        ));
    }
    for (i, consumer) in service.consumers.iter().enumerate() {
        errs.extend(service_consumer(
            &path.child("consumers").index(i),
            consumer,
            caps,
        ));
    }
    errs
}

/// Reports only the first problem found.
fn service_consumer(path: &Path, consumer: &ServiceConsumer, caps: &Capabilities) -> Option<FieldError> {
    let members = [
        !consumer.partition.is_empty(),
        !consumer.peer.is_empty(),
        !consumer.sameness_group.is_empty(),
    ];
    if !Arity::AtMostOne.admits(check::count_set(&members)) {
        return Some(FieldError::invalid(
            path.clone(),
            Value::repr(consumer),
            "service consumer must define at most one of Peer, Partition, or SamenessGroup",
        ));
    }
    if !Arity::ExactlyOne.admits(check::count_set(&members)) {
        return Some(FieldError::invalid(
            path.clone(),
            Value::repr(consumer),
            "service consumer must define at least one of Peer, Partition, or SamenessGroup",
        ));
    }
    if let Some(err) = check::gated(
        path.child("partition"),
        &consumer.partition,
        caps.partitions,
        "Consul Admin Partitions need to be enabled to specify partition.",
    ) {
        return Some(err);
    }
    [
        (&consumer.partition, "partition", "exporting to all partitions (wildcard) is not supported"),
        (&consumer.peer, "peer", "exporting to all peers (wildcard) is not supported"),
        (
            &consumer.sameness_group,
            "samenessgroup",
            "exporting to all sameness groups (wildcard) is not supported",
        ),
    ]
    .into_iter()
    .find(|(value, _, _)| *value == WILDCARD)
    .map(|(_, field, detail)| FieldError::invalid(path.child(field), "", detail))
}

impl ToRemote for ExportedService {
    type Remote = remote::ExportedService;

    fn to_remote(&self) -> Self::Remote {
        remote::ExportedService {
            name: self.name.clone(),
            namespace: self.namespace.clone(),
            consumers: self.consumers.to_remote(),
        }
    }
}

impl ToRemote for ServiceConsumer {
    type Remote = remote::ServiceConsumer;

    fn to_remote(&self) -> Self::Remote {
        remote::ServiceConsumer {
            partition: self.partition.clone(),
            peer: self.peer.clone(),
            sameness_group: self.sameness_group.clone(),
        }
    }
}
