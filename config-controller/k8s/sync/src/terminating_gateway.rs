use crate::{
    entry::{config_status, ConfigEntry},
    shared::ToRemote,
};
use consul_config_controller_core::{
    check,
    field::{FieldError, Path, Value},
    remote::{self, RemoteEntry},
    Capabilities, ErrorList,
};
use consul_config_controller_k8s_api::{
    terminating_gateway::LinkedService, ResourceExt, TerminatingGateway,
};

impl ConfigEntry for TerminatingGateway {
    const REMOTE_KIND: &'static str = "terminating-gateway";

    config_status!();

    fn validate(&self, caps: &Capabilities) -> ErrorList {
        let path = Path::spec().child("services");
        let mut errs = ErrorList::default();
        for (i, svc) in self.spec.services.iter().enumerate() {
            if svc.cert_file.is_empty() != svc.key_file.is_empty() {
                errs.push(FieldError::invalid(
                    path.index(i),
                    Value::repr(svc),
                    "if certFile or keyFile is set, the other must also be set",
                ));
            }
        }
        for (i, svc) in self.spec.services.iter().enumerate() {
            errs.extend(check::gated(
                path.index(i).child("namespace"),
                &svc.namespace,
                caps.namespaces,
                "Consul Enterprise namespaces must be enabled to set service.namespace",
            ));
        }
        errs
    }

    fn default_tenancy(&mut self, caps: &Capabilities) {
        if !caps.namespaces {
            return;
        }
        let ns = caps.remote_namespace(&self.namespace().unwrap_or_default());
        for svc in &mut self.spec.services {
            if svc.namespace.is_empty() {
                svc.namespace = ns.clone();
            }
        }
    }

    fn to_remote(&self, datacenter: &str) -> RemoteEntry {
        remote::TerminatingGateway {
            name: self.name_any(),
            services: self.spec.services.to_remote(),
            meta: remote::meta(datacenter),
            ..remote::TerminatingGateway::default()
        }
        .into()
    }
}

impl ToRemote for LinkedService {
    type Remote = remote::LinkedService;

    fn to_remote(&self) -> Self::Remote {
        remote::LinkedService {
            namespace: self.namespace.clone(),
            name: self.name.clone(),
            ca_file: self.ca_file.clone(),
            cert_file: self.cert_file.clone(),
            key_file: self.key_file.clone(),
            sni: self.sni.clone(),
            disable_auto_host_rewrite: self.disable_auto_host_rewrite,
        }
    }
}
