#![deny(rust_2018_idioms)]
#![forbid(unsafe_code)]

//! Validation, defaulting, projection and admission for config resources.
//!
//! Each kind implements [`ConfigEntry`]; [`admission`] runs those operations
//! for incoming writes and [`reconcile`] decides how a resource is brought in
//! line with its remote entry.

pub mod admission;
mod control_plane_request_limit;
pub mod entry;
mod exported_services;
mod ingress_gateway;
mod jwt_provider;
mod mesh;
pub mod peering;
mod proxy_defaults;
pub mod reconcile;
pub mod registry;
mod sameness_group;
mod service_defaults;
mod service_intentions;
mod service_resolver;
mod service_router;
mod service_splitter;
mod shared;
mod terminating_gateway;

#[cfg(test)]
mod test_util;

pub use self::{
    admission::{Admissible, Admit, Rejection, Request},
    entry::{ConfigEntry, Conflict},
    peering::PeeringResource,
    registry::Registry,
};
