use crate::DEFAULT_TENANCY;

/// The multi-tenancy features enabled for the cluster this controller serves.
///
/// Built once at startup and shared read-only by every validation, defaulting
/// and admission call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Consul Enterprise namespaces are enabled.
    pub namespaces: bool,

    /// The Consul namespace resources are written to when mirroring is off.
    pub destination_namespace: String,

    /// Each Kubernetes namespace maps onto a Consul namespace of the same name.
    pub mirroring: bool,

    /// Prepended to mirrored namespace names.
    pub mirroring_prefix: String,

    /// Consul Enterprise admin partitions are enabled.
    pub partitions: bool,

    /// The admin partition this cluster belongs to.
    pub partition: String,
}

// === impl Capabilities ===

impl Capabilities {
    /// Resolves the Consul namespace a resource from `local_ns` is written to.
    ///
    /// Returns an empty string when namespaces are disabled, since Consul
    /// rejects namespace fields in that mode.
    pub fn remote_namespace(&self, local_ns: &str) -> String {
        if !self.namespaces {
            return String::new();
        }
        if self.mirroring {
            return format!("{}{}", self.mirroring_prefix, local_ns);
        }
        self.destination_namespace.clone()
    }

    /// The cluster's partition, falling back to the default partition.
    pub fn partition(&self) -> &str {
        if self.partition.is_empty() {
            return DEFAULT_TENANCY;
        }
        &self.partition
    }

    /// Resource names need only be unique per namespace when each Kubernetes
    /// namespace maps onto its own Consul namespace.
    pub fn names_scoped_by_namespace(&self) -> bool {
        self.namespaces && self.mirroring
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_namespace_disabled() {
        let caps = Capabilities {
            namespaces: false,
            destination_namespace: "dest".to_string(),
            mirroring: true,
            mirroring_prefix: "k8s-".to_string(),
            ..Capabilities::default()
        };
        assert_eq!(caps.remote_namespace("foo"), "");
    }

    #[test]
    fn remote_namespace_mirrored() {
        let caps = Capabilities {
            namespaces: true,
            destination_namespace: "dest".to_string(),
            mirroring: true,
            mirroring_prefix: "k8s-".to_string(),
            ..Capabilities::default()
        };
        assert_eq!(caps.remote_namespace("foo"), "k8s-foo");
    }

    #[test]
    fn remote_namespace_destination() {
        let caps = Capabilities {
            namespaces: true,
            destination_namespace: "dest".to_string(),
            mirroring: false,
            mirroring_prefix: "k8s-".to_string(),
            ..Capabilities::default()
        };
        assert_eq!(caps.remote_namespace("foo"), "dest");
    }

    #[test]
    fn partition_falls_back_to_default() {
        assert_eq!(Capabilities::default().partition(), "default");
        let caps = Capabilities {
            partition: "ap1".to_string(),
            ..Capabilities::default()
        };
        assert_eq!(caps.partition(), "ap1");
    }
}
