#![deny(rust_2018_idioms)]
#![forbid(unsafe_code)]

pub use consul_config_controller_core as core;
pub use consul_config_controller_k8s_api as k8s;
pub use consul_config_controller_k8s_sync as sync;

mod admission;
mod args;

pub use self::{
    admission::{Admission, Siblings},
    args::Args,
};
