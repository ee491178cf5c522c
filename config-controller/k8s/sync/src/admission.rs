//! Admits writes to config resources.
//!
//! Every request runs the same pipeline: the object is decoded, tenancy
//! defaults are applied and recorded as a patch, the defaulted object is
//! checked against its persisted siblings and finally validated. Nothing here
//! performs I/O; siblings are listed by the caller and passed in.

use crate::{
    entry::{ConfigEntry, Conflict},
    peering::PeeringResource,
};
use consul_config_controller_core::{patch, Capabilities, FieldError, Invalid};
use consul_config_controller_k8s_api::{
    ControlPlaneRequestLimit, ExportedServices, IngressGateway, JwtProvider, Mesh,
    PeeringAcceptor, PeeringDialer, ProxyDefaults, SamenessGroup, ServiceDefaults,
    ServiceIntentions, ServiceResolver, ServiceRouter, ServiceSplitter, TerminatingGateway,
};
use kube::{
    core::{admission::Operation, ApiResource, NamespaceResourceScope},
    Resource, ResourceExt,
};
use serde::{de::DeserializeOwned, Serialize};
use std::marker::PhantomData;
use tracing::debug;

/// The checks a resource kind runs when a write to it is admitted.
pub trait Admissible:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    /// Fills in the fields the persisted object should carry.
    fn fill_defaults(&mut self, _caps: &Capabilities) {}

    fn conflicts(
        &self,
        op: Operation,
        old: Option<&Self>,
        siblings: &[Self],
        caps: &Capabilities,
    ) -> Result<(), Conflict>;

    fn verify(&self, caps: &Capabilities) -> Result<(), Invalid>;
}

/// Why a write was refused.
#[derive(Debug, thiserror::Error)]
pub enum Rejection {
    /// The object could not be decoded as its kind.
    #[error("failed to decode {kind}: {source}")]
    Decode {
        kind: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Conflict(#[from] Conflict),

    #[error(transparent)]
    Invalid(#[from] Invalid),

    #[error("failed to encode defaulting patch: {0}")]
    Encode(#[source] serde_json::Error),
}

/// A write to be admitted, with objects in their JSON form.
#[derive(Clone, Debug)]
pub struct Request<'a> {
    pub operation: Operation,
    pub object: &'a serde_json::Value,
    /// The persisted object, for updates.
    pub old_object: Option<&'a serde_json::Value>,
}

/// Admits writes to a single kind without naming its type.
pub trait Admit: Send + Sync {
    /// Identifies the kind and how it is listed.
    fn api_resource(&self) -> ApiResource;

    /// Runs the admission pipeline, returning the defaulting patch.
    ///
    /// `siblings` lists the persisted resources of the kind. Those that fail
    /// to decode are ignored.
    fn admit(
        &self,
        req: &Request<'_>,
        siblings: &[serde_json::Value],
        caps: &Capabilities,
    ) -> Result<json_patch::Patch, Rejection>;
}

/// Admits writes to resources of type `T`.
pub struct Kind<T>(PhantomData<fn() -> T>);

// === impl Rejection ===

impl Rejection {
    /// Individual causes, one per field violation.
    pub fn causes(&self) -> Vec<&FieldError> {
        match self {
            Self::Invalid(invalid) => invalid.causes(),
            _ => Vec::new(),
        }
    }

    /// Whether the request itself was at fault, as opposed to the controller.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Encode(_))
    }
}

// === impl Kind ===

impl<T> Kind<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for Kind<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Admissible> Admit for Kind<T> {
    fn api_resource(&self) -> ApiResource {
        ApiResource::erase::<T>(&())
    }

    fn admit(
        &self,
        req: &Request<'_>,
        siblings: &[serde_json::Value],
        caps: &Capabilities,
    ) -> Result<json_patch::Patch, Rejection> {
        let siblings = siblings
            .iter()
            .filter_map(|obj| match serde_json::from_value::<T>(obj.clone()) {
                Ok(sibling) => Some(sibling),
                Err(error) => {
                    debug!(%error, kind = %T::kind(&()), "Ignoring undecodable sibling");
                    None
                }
            })
            .collect::<Vec<_>>();
        admit(req, &siblings, caps)
    }
}

/// Decodes, defaults, checks and validates a single write.
pub fn admit<T: Admissible>(
    req: &Request<'_>,
    siblings: &[T],
    caps: &Capabilities,
) -> Result<json_patch::Patch, Rejection> {
    let resource = decode::<T>(req.object)?;
    let old = match (&req.operation, req.old_object) {
        (Operation::Update, Some(old)) => Some(decode::<T>(old)?),
        _ => None,
    };

    let mut defaulted = resource.clone();
    defaulted.fill_defaults(caps);
    let patch = patch::diff(&resource, &defaulted).map_err(Rejection::Encode)?;

    defaulted.conflicts(req.operation.clone(), old.as_ref(), siblings, caps)?;
    defaulted.verify(caps)?;

    debug!(
        kind = %T::kind(&()),
        ns = %defaulted.namespace().unwrap_or_default(),
        name = %defaulted.name_any(),
        patches = patch.0.len(),
        "Admitted",
    );
    Ok(patch)
}

fn decode<T: Admissible>(obj: &serde_json::Value) -> Result<T, Rejection> {
    serde_json::from_value(obj.clone()).map_err(|source| Rejection::Decode {
        kind: T::kind(&()).into_owned(),
        source,
    })
}

macro_rules! admit_config_entries {
    ($($kind:ty),+ $(,)?) => {
        $(
            impl Admissible for $kind {
                fn fill_defaults(&mut self, caps: &Capabilities) {
                    ConfigEntry::default_tenancy(self, caps)
                }

                fn conflicts(
                    &self,
                    op: Operation,
                    old: Option<&Self>,
                    siblings: &[Self],
                    caps: &Capabilities,
                ) -> Result<(), Conflict> {
                    ConfigEntry::check_siblings(self, op, old, siblings, caps)
                }

                fn verify(&self, caps: &Capabilities) -> Result<(), Invalid> {
                    ConfigEntry::check(self, caps)
                }
            }
        )+
    };
}

admit_config_entries!(
    ServiceDefaults,
    ProxyDefaults,
    ServiceResolver,
    ServiceRouter,
    ServiceSplitter,
    ServiceIntentions,
    IngressGateway,
    TerminatingGateway,
    ExportedServices,
    Mesh,
    SamenessGroup,
    JwtProvider,
    ControlPlaneRequestLimit,
);

macro_rules! admit_peering {
    ($($kind:ty),+ $(,)?) => {
        $(
            impl Admissible for $kind {
                fn conflicts(
                    &self,
                    op: Operation,
                    _old: Option<&Self>,
                    siblings: &[Self],
                    caps: &Capabilities,
                ) -> Result<(), Conflict> {
                    PeeringResource::check_siblings(self, op, siblings, caps)
                }

                fn verify(&self, _caps: &Capabilities) -> Result<(), Invalid> {
                    PeeringResource::check(self)
                }
            }
        )+
    };
}

admit_peering!(PeeringAcceptor, PeeringDialer);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{messages, mirrored, namespaces};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn intentions(ns: &str, name: &str, dst: serde_json::Value) -> serde_json::Value {
        json!({
            "apiVersion": "consul.hashicorp.com/v1alpha1",
            "kind": "ServiceIntentions",
            "metadata": { "name": name, "namespace": ns },
            "spec": {
                "destination": dst,
                "sources": [{ "name": "web", "action": "allow" }],
            },
        })
    }

    fn create(object: &serde_json::Value) -> Request<'_> {
        Request {
            operation: Operation::Create,
            object,
            old_object: None,
        }
    }

    #[test]
    fn defaults_are_returned_as_a_patch() {
        let obj = intentions("bar", "foo", json!({ "name": "foo" }));
        let patch = Kind::<ServiceIntentions>::new()
            .admit(&create(&obj), &[], &mirrored(""))
            .expect("intentions must be admitted");
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            json!([{ "op": "add", "path": "/spec/destination/namespace", "value": "bar" }]),
        );

        let already = intentions("bar", "foo", json!({ "name": "foo", "namespace": "bar" }));
        let patch = Kind::<ServiceIntentions>::new()
            .admit(&create(&already), &[], &mirrored(""))
            .expect("intentions must be admitted");
        assert!(patch.0.is_empty());
    }

    #[test]
    fn undecodable_objects_are_rejected() {
        let obj = json!({
            "apiVersion": "consul.hashicorp.com/v1alpha1",
            "kind": "ServiceIntentions",
            "metadata": { "name": "foo", "namespace": "bar" },
            "spec": { "sources": "web" },
        });
        let err = Kind::<ServiceIntentions>::new()
            .admit(&create(&obj), &[], &Capabilities::default())
            .expect_err("object must not decode");
        assert!(matches!(err, Rejection::Decode { .. }), "{err}");
        assert!(err.is_client_error());
        assert!(err.causes().is_empty());
    }

    #[test]
    fn destinations_are_unique() {
        let existing = [intentions("bar", "foo", json!({ "name": "foo", "namespace": "bar" }))];
        let kind = Kind::<ServiceIntentions>::new();

        // Without mirroring every destination name is global.
        let obj = intentions("baz", "other", json!({ "name": "foo", "namespace": "bar" }));
        let err = kind
            .admit(&create(&obj), &existing, &namespaces())
            .expect_err("destination is taken");
        assert_eq!(
            err.to_string(),
            "an existing ServiceIntentions resource has `spec.destination.name: foo`"
        );

        // With mirroring the pair must be unique.
        let err = kind
            .admit(&create(&obj), &existing, &mirrored(""))
            .expect_err("destination is taken");
        assert_eq!(
            err.to_string(),
            "an existing ServiceIntentions resource has `spec.destination.name: foo` and `spec.destination.namespace: bar`"
        );

        let obj = intentions("baz", "other", json!({ "name": "foo", "namespace": "baz" }));
        assert!(kind.admit(&create(&obj), &existing, &mirrored("")).is_ok());
    }

    #[test]
    fn destinations_are_immutable() {
        let old = intentions("bar", "foo", json!({ "name": "foo", "namespace": "bar" }));
        let new = intentions("bar", "foo", json!({ "name": "other", "namespace": "bar" }));
        let req = Request {
            operation: Operation::Update,
            object: &new,
            old_object: Some(&old),
        };
        let err = Kind::<ServiceIntentions>::new()
            .admit(&req, &[], &mirrored(""))
            .expect_err("destination must not change");
        assert!(matches!(err, Rejection::Conflict(_)));
        assert_eq!(
            err.to_string(),
            "spec.destination.name and spec.destination.namespace are immutable fields for ServiceIntentions"
        );
    }

    #[test]
    fn invalid_resources_list_their_causes() {
        let obj = json!({
            "apiVersion": "consul.hashicorp.com/v1alpha1",
            "kind": "ServiceSplitter",
            "metadata": { "name": "web", "namespace": "default" },
            "spec": { "splits": [{ "weight": 90 }, { "weight": 5 }] },
        });
        let err = Kind::<ServiceSplitter>::new()
            .admit(&create(&obj), &[], &Capabilities::default())
            .expect_err("weights must add up");
        assert!(matches!(err, Rejection::Invalid(_)));
        let causes = err.causes();
        assert_eq!(causes.len(), 1);
        assert_eq!(causes[0].field.as_str(), "spec.splits");
        assert!(
            causes[0]
                .detail
                .ends_with("the sum of weights across all splits must add up to 100 percent, but adds up to 95.000000"),
            "{}",
            causes[0]
        );
    }

    fn validate_twice<T: ConfigEntry>(obj: serde_json::Value, caps: &Capabilities) {
        let resource = serde_json::from_value::<T>(obj).expect("resource must decode");
        let first = messages(resource.validate(caps));
        let second = messages(resource.validate(caps));
        assert!(!first.is_empty(), "{} must be invalid", T::kind(&()));
        assert_eq!(first, second);
    }

    #[test]
    fn validation_is_deterministic() {
        let object = |kind: &str, spec: serde_json::Value| {
            json!({
                "apiVersion": "consul.hashicorp.com/v1alpha1",
                "kind": kind,
                "metadata": { "name": "web", "namespace": "default" },
                "spec": spec,
            })
        };
        let caps = Capabilities::default();

        validate_twice::<ServiceSplitter>(
            object("ServiceSplitter", json!({ "splits": [{ "weight": 101 }, { "weight": 0.001, "namespace": "ns" }] })),
            &caps,
        );
        validate_twice::<ServiceDefaults>(object("ServiceDefaults", json!({ "protocol": "smtp" })), &caps);
        validate_twice::<ServiceIntentions>(
            object(
                "ServiceIntentions",
                json!({
                    "destination": { "name": "web", "namespace": "ns" },
                    "sources": [{ "name": "api", "action": "fail" }, { "name": "db", "action": "fail" }],
                }),
            ),
            &caps,
        );
        validate_twice::<ControlPlaneRequestLimit>(
            object("ControlPlaneRequestLimit", json!({ "mode": "strict", "readRate": -1.0 })),
            &mirrored(""),
        );
    }

    #[test]
    fn names_are_unique_across_namespaces() {
        let defaults = |ns: &str| {
            json!({
                "apiVersion": "consul.hashicorp.com/v1alpha1",
                "kind": "ServiceDefaults",
                "metadata": { "name": "web", "namespace": ns },
                "spec": { "protocol": "http" },
            })
        };
        let existing = [defaults("default")];
        let obj = defaults("other");
        let kind = Kind::<ServiceDefaults>::new();

        let err = kind
            .admit(&create(&obj), &existing, &Capabilities::default())
            .expect_err("name is taken");
        assert_eq!(
            err.to_string(),
            r#"servicedefaults resource with name "web" is already defined – all servicedefaults resources must have unique names across namespaces"#
        );
        assert!(kind.admit(&create(&obj), &existing, &mirrored("")).is_ok());
    }

    #[test]
    fn peering_secrets() {
        let acceptor = |name: &str| {
            json!({
                "apiVersion": "consul.hashicorp.com/v1alpha1",
                "kind": "PeeringAcceptor",
                "metadata": { "name": name, "namespace": "default" },
                "spec": {
                    "peer": {
                        "secret": { "name": "token", "key": "data", "backend": "kubernetes" },
                    },
                },
            })
        };
        let kind = Kind::<PeeringAcceptor>::new();
        let obj = acceptor("dc2");
        assert!(kind.admit(&create(&obj), &[], &Capabilities::default()).is_ok());

        let err = kind
            .admit(&create(&obj), &[acceptor("dc3")], &Capabilities::default())
            .expect_err("secret is taken");
        assert!(matches!(err, Rejection::Conflict(_)));
        assert_eq!(kind.api_resource().plural, "peeringacceptors");
    }
}
