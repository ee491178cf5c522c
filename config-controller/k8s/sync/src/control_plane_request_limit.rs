use crate::{
    entry::{config_status, ConfigEntry},
    shared::ToRemote,
};
use consul_config_controller_core::{
    field::{FieldError, Path},
    remote::{self, RemoteEntry},
    Capabilities, ErrorList,
};
use consul_config_controller_k8s_api::{
    control_plane_request_limit::ReadWriteRatesConfig, ControlPlaneRequestLimit, ResourceExt,
};

const MODES: &[&str] = &["permissive", "enforcing", "disabled"];

impl ConfigEntry for ControlPlaneRequestLimit {
    const REMOTE_KIND: &'static str = "control-plane-request-limit";
    const GLOBAL: bool = true;

    config_status!();

    fn validate(&self, _caps: &Capabilities) -> ErrorList {
        let spec = &self.spec;
        let path = Path::spec();
        let mut errs = ErrorList::default();

        if !MODES.contains(&spec.mode.as_str()) {
            errs.push(FieldError::invalid(
                path.child("mode"),
                &spec.mode,
                "mode must be one of: permissive, enforcing, disabled",
            ));
        }
        errs.extend(rates(&path, &spec.rates));

        let subsystems = [
            ("acl", &spec.acl),
            ("catalog", &spec.catalog),
            ("configEntry", &spec.config_entry),
            ("connectCA", &spec.connect_ca),
            ("coordinate", &spec.coordinate),
            ("discoveryChain", &spec.discovery_chain),
            ("health", &spec.health),
            ("intention", &spec.intention),
            ("kv", &spec.kv),
            ("tenancy", &spec.tenancy),
            ("preparedQuery", &spec.prepared_query),
            ("session", &spec.session),
            ("txn", &spec.txn),
        ];
        for (name, config) in subsystems {
            if let Some(config) = config {
                errs.extend(rates(&path.child(name), config));
            }
        }
        errs
    }

    fn to_remote(&self, datacenter: &str) -> RemoteEntry {
        let spec = &self.spec;
        remote::ControlPlaneRequestLimit {
            name: self.name_any(),
            mode: spec.mode.clone(),
            read_rate: spec.rates.read_rate,
            write_rate: spec.rates.write_rate,
            acl: spec.acl.to_remote(),
            catalog: spec.catalog.to_remote(),
            config_entry: spec.config_entry.to_remote(),
            connect_ca: spec.connect_ca.to_remote(),
            coordinate: spec.coordinate.to_remote(),
            discovery_chain: spec.discovery_chain.to_remote(),
            health: spec.health.to_remote(),
            intention: spec.intention.to_remote(),
            kv: spec.kv.to_remote(),
            tenancy: spec.tenancy.to_remote(),
            prepared_query: spec.prepared_query.to_remote(),
            session: spec.session.to_remote(),
            txn: spec.txn.to_remote(),
            meta: remote::meta(datacenter),
            ..remote::ControlPlaneRequestLimit::default()
        }
        .into()
    }
}

/// Reads may be unlimited but writes must be allowed at some rate.
fn rates(path: &Path, config: &ReadWriteRatesConfig) -> ErrorList {
    let mut errs = ErrorList::default();
    if config.read_rate < 0.0 {
        errs.push(FieldError::invalid(
            path.child("readRate"),
            config.read_rate,
            "readRate must be >= 0",
        ));
    }
    if config.write_rate <= 0.0 {
        errs.push(FieldError::invalid(
            path.child("writeRate"),
            config.write_rate,
            "writeRate must be > 0",
        ));
    }
    errs
}

impl ToRemote for ReadWriteRatesConfig {
    type Remote = remote::ReadWriteRates;

    fn to_remote(&self) -> Self::Remote {
        remote::ReadWriteRates {
            read_rate: self.read_rate,
            write_rate: self.write_rate,
        }
    }
}
