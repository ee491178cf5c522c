//! Decides what a reconciliation pass does with a resource, given what the
//! remote store currently holds.
//!
//! Reading and writing the store is left to the caller; the decision and the
//! status it records are pure.

use crate::entry::ConfigEntry;
use consul_config_controller_core::RemoteEntry;
use consul_config_controller_k8s_api::{
    ConditionStatus, ObjectMeta, ResourceExt, Time, MIGRATE_ENTRY_KEY, MIGRATE_ENTRY_TRUE,
};
use std::fmt;

/// Held by every resource until its remote entry has been cleaned up.
pub const FINALIZER: &str = "finalizers.consul.hashicorp.com";

pub const CONSUL_AGENT_ERROR: &str = "ConsulAgentError";
pub const EXTERNALLY_MANAGED_CONFIG_ERROR: &str = "ExternallyManagedConfigError";
pub const MIGRATION_FAILED_ERROR: &str = "MigrationFailedError";

/// The synced condition a reconciliation pass records.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Synced {
    pub status: ConditionStatus,
    pub reason: String,
    pub message: String,
}

/// What a reconciliation pass must do.
#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    /// Create the entry, which does not exist remotely.
    Create(RemoteEntry),

    /// Overwrite the remote entry.
    Update(RemoteEntry),

    /// Record a condition without touching the remote store.
    Record(Synced),

    /// The resource is in sync and its condition says so.
    Nothing,
}

// === impl Synced ===

impl Synced {
    pub fn successful() -> Self {
        Self {
            status: ConditionStatus::True,
            reason: String::new(),
            message: String::new(),
        }
    }

    /// Recorded before the first sync is attempted.
    pub fn unknown() -> Self {
        Self {
            status: ConditionStatus::Unknown,
            reason: String::new(),
            message: String::new(),
        }
    }

    pub fn failed(reason: &str, message: impl fmt::Display) -> Self {
        Self {
            status: ConditionStatus::False,
            reason: reason.to_string(),
            message: message.to_string(),
        }
    }

    pub fn unknown_with_error(reason: &str, message: impl fmt::Display) -> Self {
        Self {
            status: ConditionStatus::Unknown,
            reason: reason.to_string(),
            message: message.to_string(),
        }
    }

    /// Replaces the resource's synced condition.
    ///
    /// The last synced time only moves when the condition carries no error.
    pub fn record<T: ConfigEntry>(self, resource: &mut T, now: Time) {
        let stamp = self.reason.is_empty();
        let status = resource.status_mut();
        status.set_synced(self.status, self.reason, self.message, now.clone());
        if stamp {
            status.last_synced_time = Some(now);
        }
    }
}

// === impl Action ===

impl Action {
    /// The condition to record when the write this action calls for failed.
    pub fn write_failed(&self, error: impl fmt::Display) -> Option<Synced> {
        match self {
            Self::Create(_) => Some(Synced::failed(
                CONSUL_AGENT_ERROR,
                format_args!("writing config entry to consul: {error}"),
            )),
            Self::Update(_) => Some(Synced::unknown_with_error(
                CONSUL_AGENT_ERROR,
                format_args!("updating config entry in consul: {error}"),
            )),
            Self::Record(_) | Self::Nothing => None,
        }
    }
}

/// Compares a resource with the remote entry read for it.
///
/// `remote` is `None` when the store has no such entry. `datacenter` is the
/// datacenter this controller writes on behalf of.
pub fn decide<T: ConfigEntry>(resource: &T, remote: Option<&RemoteEntry>, datacenter: &str) -> Action {
    let desired = resource.to_remote(datacenter);
    let Some(remote) = remote else {
        return Action::Create(desired);
    };

    let source = remote.source_datacenter().unwrap_or_default();
    let managed_here = source == datacenter;
    let matches = resource.matches(remote);
    let migrating = resource
        .annotations()
        .get(MIGRATE_ENTRY_KEY)
        .is_some_and(|v| v == MIGRATE_ENTRY_TRUE);

    if !matches && !managed_here && !migrating {
        let message = if source.is_empty() {
            "config entry already exists in Consul".to_string()
        } else {
            format!("config entry managed in different datacenter: {source:?}")
        };
        return Action::Record(Synced::failed(EXTERNALLY_MANAGED_CONFIG_ERROR, message));
    }
    if !matches && migrating {
        return Action::Record(Synced::failed(
            MIGRATION_FAILED_ERROR,
            migration_mismatch(remote, &desired),
        ));
    }
    if !matches || (migrating && !managed_here) {
        return Action::Update(desired);
    }

    let synced = resource
        .status()
        .map(|s| s.synced_status())
        .unwrap_or(ConditionStatus::Unknown);
    if synced != ConditionStatus::True {
        return Action::Record(Synced::successful());
    }
    Action::Nothing
}

fn migration_mismatch(remote: &RemoteEntry, desired: &RemoteEntry) -> String {
    let encode = |entry: &RemoteEntry| serde_json::to_string(entry);
    match (encode(remote), encode(desired)) {
        (Ok(consul), Ok(kube)) => format!(
            "migration failed: Kubernetes resource does not match existing Consul config entry: consul={consul}, kube={kube}"
        ),
        (Err(error), _) => format!("migration failed: unable to marshal Consul resource: {error}"),
        (_, Err(error)) => {
            format!("migration failed: unable to marshal Kubernetes resource: {error}")
        }
    }
}

/// Only entries this datacenter wrote are removed when their resource is
/// deleted.
pub fn should_delete(remote: &RemoteEntry, datacenter: &str) -> bool {
    remote.source_datacenter().unwrap_or_default() == datacenter
}

pub fn has_finalizer(meta: &ObjectMeta) -> bool {
    meta.finalizers.iter().flatten().any(|f| f == FINALIZER)
}

/// Returns whether the finalizer was added.
pub fn add_finalizer(meta: &mut ObjectMeta) -> bool {
    if has_finalizer(meta) {
        return false;
    }
    meta.finalizers
        .get_or_insert_with(Vec::new)
        .push(FINALIZER.to_string());
    true
}

/// Returns whether the finalizer was removed.
pub fn remove_finalizer(meta: &mut ObjectMeta) -> bool {
    let Some(finalizers) = meta.finalizers.as_mut() else {
        return false;
    };
    let before = finalizers.len();
    finalizers.retain(|f| f != FINALIZER);
    finalizers.len() != before
}
