#![deny(rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod capabilities;
pub mod check;
pub mod compare;
pub mod duration;
pub mod field;
pub mod filter;
pub mod patch;
pub mod remote;

pub use self::{
    capabilities::Capabilities,
    compare::Comparison,
    duration::GoDuration,
    field::{ErrorList, FieldError, Invalid, Path, Value},
    remote::RemoteEntry,
};

/// The API group shared by every config resource.
pub const GROUP: &str = "consul.hashicorp.com";

/// The Consul name of the default namespace and the default partition.
pub const DEFAULT_TENANCY: &str = "default";

/// Matches every namespace or partition.
pub const WILDCARD: &str = "*";
