//! The remote store's representation of each config entry kind.
//!
//! Field names follow the store's JSON encoding. Collections default to empty
//! rather than being optional so that an omitted collection and an empty one
//! encode identically.

mod control_plane_request_limit;
mod exported_services;
mod ingress_gateway;
mod jwt_provider;
mod mesh;
mod proxy_defaults;
mod sameness_group;
mod service_defaults;
mod service_intentions;
mod service_resolver;
mod service_router;
mod service_splitter;
mod shared;
mod terminating_gateway;

pub use self::{
    control_plane_request_limit::*, exported_services::*, ingress_gateway::*, jwt_provider::*,
    mesh::*, proxy_defaults::*, sameness_group::*, service_defaults::*, service_intentions::*,
    service_resolver::*, service_router::*, service_splitter::*, shared::*,
    terminating_gateway::*,
};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Marks entries written by this controller.
pub const SOURCE_KEY: &str = "external-source";
pub const SOURCE_VALUE: &str = "kubernetes";

/// Records the datacenter whose controller owns an entry.
pub const DATACENTER_KEY: &str = "consul.hashicorp.com/source-datacenter";

pub type Meta = BTreeMap<String, String>;

/// The provenance metadata stamped onto every projected entry.
pub fn meta(datacenter: &str) -> Meta {
    let mut meta = Meta::new();
    meta.insert(SOURCE_KEY.to_string(), SOURCE_VALUE.to_string());
    meta.insert(DATACENTER_KEY.to_string(), datacenter.to_string());
    meta
}

/// A config entry as stored remotely, tagged by its remote kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "Kind")]
pub enum RemoteEntry {
    #[serde(rename = "service-defaults")]
    ServiceDefaults(ServiceDefaults),
    #[serde(rename = "proxy-defaults")]
    ProxyDefaults(ProxyDefaults),
    #[serde(rename = "service-resolver")]
    ServiceResolver(ServiceResolver),
    #[serde(rename = "service-router")]
    ServiceRouter(ServiceRouter),
    #[serde(rename = "service-splitter")]
    ServiceSplitter(ServiceSplitter),
    #[serde(rename = "service-intentions")]
    ServiceIntentions(ServiceIntentions),
    #[serde(rename = "ingress-gateway")]
    IngressGateway(IngressGateway),
    #[serde(rename = "terminating-gateway")]
    TerminatingGateway(TerminatingGateway),
    #[serde(rename = "exported-services")]
    ExportedServices(ExportedServices),
    #[serde(rename = "mesh")]
    Mesh(Mesh),
    #[serde(rename = "sameness-group")]
    SamenessGroup(SamenessGroup),
    #[serde(rename = "jwt-provider")]
    JwtProvider(JwtProvider),
    #[serde(rename = "control-plane-request-limit")]
    ControlPlaneRequestLimit(ControlPlaneRequestLimit),
}

/// The name every mesh entry is stored under.
pub const MESH_NAME: &str = "mesh";

macro_rules! remote_entries {
    ($($variant:ident => $kind:literal),+ $(,)?) => {
        impl RemoteEntry {
            /// The remote kind, e.g. `service-defaults`.
            pub fn kind(&self) -> &'static str {
                match self {
                    $(Self::$variant(_) => $kind,)+
                }
            }

            pub fn meta(&self) -> &Meta {
                match self {
                    $(Self::$variant(e) => &e.meta,)+
                }
            }

            pub fn meta_mut(&mut self) -> &mut Meta {
                match self {
                    $(Self::$variant(e) => &mut e.meta,)+
                }
            }

            pub fn modify_index(&self) -> u64 {
                match self {
                    $(Self::$variant(e) => e.modify_index,)+
                }
            }
        }

        $(
            impl From<$variant> for RemoteEntry {
                fn from(entry: $variant) -> Self {
                    Self::$variant(entry)
                }
            }
        )+
    };
}

remote_entries! {
    ServiceDefaults => "service-defaults",
    ProxyDefaults => "proxy-defaults",
    ServiceResolver => "service-resolver",
    ServiceRouter => "service-router",
    ServiceSplitter => "service-splitter",
    ServiceIntentions => "service-intentions",
    IngressGateway => "ingress-gateway",
    TerminatingGateway => "terminating-gateway",
    ExportedServices => "exported-services",
    Mesh => "mesh",
    SamenessGroup => "sameness-group",
    JwtProvider => "jwt-provider",
    ControlPlaneRequestLimit => "control-plane-request-limit",
}

impl RemoteEntry {
    pub fn name(&self) -> &str {
        match self {
            Self::ServiceDefaults(e) => &e.name,
            Self::ProxyDefaults(e) => &e.name,
            Self::ServiceResolver(e) => &e.name,
            Self::ServiceRouter(e) => &e.name,
            Self::ServiceSplitter(e) => &e.name,
            Self::ServiceIntentions(e) => &e.name,
            Self::IngressGateway(e) => &e.name,
            Self::TerminatingGateway(e) => &e.name,
            Self::ExportedServices(e) => &e.name,
            Self::Mesh(_) => MESH_NAME,
            Self::SamenessGroup(e) => &e.name,
            Self::JwtProvider(e) => &e.name,
            Self::ControlPlaneRequestLimit(e) => &e.name,
        }
    }

    /// The namespace the entry names, for kinds that carry one.
    pub fn namespace(&self) -> Option<&str> {
        match self {
            Self::ServiceDefaults(e) => Some(&e.namespace),
            Self::ProxyDefaults(e) => Some(&e.namespace),
            Self::ServiceResolver(e) => Some(&e.namespace),
            Self::ServiceRouter(e) => Some(&e.namespace),
            Self::ServiceSplitter(e) => Some(&e.namespace),
            Self::ServiceIntentions(e) => Some(&e.namespace),
            Self::IngressGateway(e) => Some(&e.namespace),
            Self::TerminatingGateway(e) => Some(&e.namespace),
            Self::Mesh(e) => Some(&e.namespace),
            Self::JwtProvider(e) => Some(&e.namespace),
            Self::ControlPlaneRequestLimit(e) => Some(&e.namespace),
            Self::ExportedServices(_) | Self::SamenessGroup(_) => None,
        }
    }

    /// The datacenter recorded in the entry's provenance metadata, if any.
    pub fn source_datacenter(&self) -> Option<&str> {
        self.meta()
            .get(DATACENTER_KEY)
            .map(String::as_str)
            .filter(|dc| !dc.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maplit::btreemap;

    #[test]
    fn meta_has_exactly_the_provenance_keys() {
        assert_eq!(
            meta("dc1"),
            btreemap! {
                "external-source".to_string() => "kubernetes".to_string(),
                "consul.hashicorp.com/source-datacenter".to_string() => "dc1".to_string(),
            }
        );
    }

    #[test]
    fn encodes_kind_tag() {
        let entry = RemoteEntry::from(ServiceSplitter {
            name: "web".to_string(),
            splits: vec![ServiceSplit {
                weight: 100.0,
                ..ServiceSplit::default()
            }],
            ..ServiceSplitter::default()
        });
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["Kind"], "service-splitter");
        assert_eq!(json["Name"], "web");
        assert_eq!(json["Splits"][0]["Weight"], 100.0);

        let decoded = serde_json::from_value::<RemoteEntry>(json).unwrap();
        assert_eq!(decoded, entry);
        assert_eq!(decoded.kind(), "service-splitter");
    }

    #[test]
    fn source_datacenter() {
        let mut entry = RemoteEntry::from(Mesh::default());
        assert_eq!(entry.name(), "mesh");
        assert_eq!(entry.source_datacenter(), None);

        *entry.meta_mut() = meta("dc2");
        assert_eq!(entry.source_datacenter(), Some("dc2"));

        *entry.meta_mut() = meta("");
        assert_eq!(entry.source_datacenter(), None);
    }
}
