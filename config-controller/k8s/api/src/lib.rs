#![deny(rust_2018_idioms)]
#![forbid(unsafe_code)]

//! Custom resources for every config entry kind served under
//! `consul.hashicorp.com/v1alpha1`.
//!
//! Optional fields are skipped when empty so that a resource serializes the
//! same way it was written.

pub mod control_plane_request_limit;
pub mod exported_services;
pub mod ingress_gateway;
pub mod jwt_provider;
pub mod mesh;
pub mod peering;
pub mod proxy_defaults;
pub mod sameness_group;
pub mod service_defaults;
pub mod service_intentions;
pub mod service_resolver;
pub mod service_router;
pub mod service_splitter;
pub mod shared;
pub mod status;
pub mod terminating_gateway;

pub use self::{
    control_plane_request_limit::ControlPlaneRequestLimit,
    exported_services::ExportedServices,
    ingress_gateway::IngressGateway,
    jwt_provider::JwtProvider,
    mesh::Mesh,
    peering::{PeeringAcceptor, PeeringDialer},
    proxy_defaults::ProxyDefaults,
    sameness_group::SamenessGroup,
    service_defaults::ServiceDefaults,
    service_intentions::ServiceIntentions,
    service_resolver::ServiceResolver,
    service_router::ServiceRouter,
    service_splitter::ServiceSplitter,
    status::{ConditionStatus, ConfigStatus},
    terminating_gateway::TerminatingGateway,
};
pub use consul_config_controller_core::GoDuration;
pub use k8s_openapi::apimachinery::pkg::apis::meta::v1::{Condition, ObjectMeta, Time};
pub use kube::ResourceExt;

/// Annotation that lets the controller adopt an entry created outside of it.
pub const MIGRATE_ENTRY_KEY: &str = "consul.hashicorp.com/migrate-entry";
pub const MIGRATE_ENTRY_TRUE: &str = "true";

pub(crate) fn is_zero<T: Default + PartialEq>(v: &T) -> bool {
    *v == T::default()
}
