use consul_config_controller_core::{
    field::quote, Capabilities, Comparison, ErrorList, Invalid, RemoteEntry, DEFAULT_TENANCY,
    WILDCARD,
};
use consul_config_controller_k8s_api::{ConfigStatus, ResourceExt};
use kube::{core::admission::Operation, core::NamespaceResourceScope, Resource};
use serde::{de::DeserializeOwned, Serialize};

/// A resource that is kept in sync with a config entry in the remote store.
///
/// Implementations describe how a kind is validated, which tenancy fields it
/// defaults, how it projects onto its remote entry and how that entry is
/// compared with what the store returns.
pub trait ConfigEntry:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    /// The remote kind, e.g. `service-defaults`.
    const REMOTE_KIND: &'static str;

    /// Entries that exist once per partition and always live in the default
    /// namespace.
    const GLOBAL: bool = false;

    const COMPARISON: Comparison = Comparison::SERVER_ASSIGNED;

    fn validate(&self, caps: &Capabilities) -> ErrorList;

    /// Fills in empty namespace fields. Must be idempotent.
    fn default_tenancy(&mut self, _caps: &Capabilities) {}

    /// Projects the resource onto its remote entry, stamping provenance
    /// metadata for `datacenter`.
    fn to_remote(&self, datacenter: &str) -> RemoteEntry;

    fn status(&self) -> Option<&ConfigStatus>;

    fn status_mut(&mut self) -> &mut ConfigStatus;

    /// Enforces rules that depend on other resources of the same kind.
    ///
    /// `siblings` lists every persisted resource of the kind across all
    /// namespaces. It is only populated for creates.
    fn check_siblings(
        &self,
        op: Operation,
        _old: Option<&Self>,
        siblings: &[Self],
        caps: &Capabilities,
    ) -> Result<(), Conflict> {
        if op == Operation::Create {
            unique_name(self, siblings, caps)?;
        }
        Ok(())
    }

    /// The name the remote entry is stored under.
    fn remote_name(&self) -> String {
        self.name_any()
    }

    /// The local namespace a mirrored remote namespace derives from.
    fn mirroring_namespace(&self) -> String {
        if Self::GLOBAL {
            return DEFAULT_TENANCY.to_string();
        }
        self.namespace().unwrap_or_default()
    }

    /// The lower-case kind used in messages, e.g. `servicedefaults`.
    fn kube_kind() -> String {
        Self::kind(&()).to_ascii_lowercase()
    }

    /// Validates the resource, naming it in the resulting error.
    fn check(&self, caps: &Capabilities) -> Result<(), Invalid> {
        self.validate(caps)
            .into_result(&Self::kube_kind(), &self.name_any())
    }

    /// Whether `remote` already holds what this resource projects to.
    fn matches(&self, remote: &RemoteEntry) -> bool {
        let expected = self.to_remote("");
        expected.kind() == remote.kind() && Self::COMPARISON.equivalent(&expected, remote)
    }

    /// The remote namespace the entry is read from and written to.
    fn remote_namespace(&self, caps: &Capabilities) -> String {
        if !caps.namespaces {
            return String::new();
        }
        let projected = self.to_remote("");
        if let Some(ns) = projected.namespace().filter(|ns| !ns.is_empty()) {
            return ns.to_string();
        }
        let local = self.mirroring_namespace();
        if Self::GLOBAL || local == WILDCARD {
            return DEFAULT_TENANCY.to_string();
        }
        caps.remote_namespace(&local)
    }
}

/// A resource conflicts with other resources of its kind.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct Conflict(String);

// === impl Conflict ===

impl Conflict {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Names must be unique across namespaces unless every namespace maps onto its
/// own remote namespace.
pub fn unique_name<T: ConfigEntry>(
    resource: &T,
    siblings: &[T],
    caps: &Capabilities,
) -> Result<(), Conflict> {
    if caps.names_scoped_by_namespace() {
        return Ok(());
    }
    let name = resource.name_any();
    if siblings.iter().any(|s| s.name_any() == name) {
        let kind = T::kube_kind();
        return Err(Conflict(format!(
            "{kind} resource with name {} is already defined – all {kind} resources must have unique names across namespaces",
            quote(&name),
        )));
    }
    Ok(())
}

/// Only one resource of a global kind may exist.
pub(crate) fn singleton<T: ConfigEntry>(siblings: &[T], entry: &str) -> Result<(), Conflict> {
    if siblings.is_empty() {
        return Ok(());
    }
    let kind = T::kube_kind();
    Err(Conflict(format!(
        "{kind} resource already defined - only one {entry} entry is supported"
    )))
}

/// Implements the status accessors for kinds whose status is a
/// [`ConfigStatus`].
macro_rules! config_status {
    () => {
        fn status(&self) -> Option<&consul_config_controller_k8s_api::ConfigStatus> {
            self.status.as_ref()
        }

        fn status_mut(&mut self) -> &mut consul_config_controller_k8s_api::ConfigStatus {
            self.status.get_or_insert_with(Default::default)
        }
    };
}

pub(crate) use config_status;
