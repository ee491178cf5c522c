use consul_config_controller_core::{Capabilities, ErrorList};
use consul_config_controller_k8s_api::ObjectMeta;

pub(crate) fn meta(ns: &str, name: &str) -> ObjectMeta {
    ObjectMeta {
        namespace: Some(ns.to_string()),
        name: Some(name.to_string()),
        ..ObjectMeta::default()
    }
}

pub(crate) fn messages(errs: ErrorList) -> Vec<String> {
    errs.into_iter().map(|e| e.to_string()).collect()
}

pub(crate) fn namespaces() -> Capabilities {
    Capabilities {
        namespaces: true,
        destination_namespace: "default".to_string(),
        ..Capabilities::default()
    }
}

pub(crate) fn mirrored(prefix: &str) -> Capabilities {
    Capabilities {
        namespaces: true,
        mirroring: true,
        mirroring_prefix: prefix.to_string(),
        ..Capabilities::default()
    }
}

pub(crate) fn partitions(partition: &str) -> Capabilities {
    Capabilities {
        namespaces: true,
        destination_namespace: "default".to_string(),
        partitions: true,
        partition: partition.to_string(),
        ..Capabilities::default()
    }
}
