//! Peering resources reference the secret holding a peering token. They are
//! admitted like config entries but never project onto one.

use crate::entry::Conflict;
use consul_config_controller_core::{
    field::{FieldError, Path, Value},
    Capabilities, ErrorList, Invalid,
};
use consul_config_controller_k8s_api::{
    peering::{Peer, Secret, SECRET_BACKEND_KUBERNETES},
    PeeringAcceptor, PeeringDialer, ResourceExt,
};
use kube::{core::admission::Operation, core::NamespaceResourceScope, Resource};
use serde::{de::DeserializeOwned, Serialize};

/// A resource that names the secret a peering token is exchanged through.
pub trait PeeringResource:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    fn peer(&self) -> Option<&Peer>;

    fn secret(&self) -> Option<&Secret> {
        self.peer()?.secret.as_ref()
    }

    fn validate(&self) -> ErrorList {
        validate(self.peer())
    }

    fn check(&self) -> Result<(), Invalid> {
        let kind = Self::kind(&()).to_ascii_lowercase();
        self.validate().into_result(&kind, &self.name_any())
    }

    /// Two resources of a kind in one namespace may not share a secret.
    fn check_siblings(
        &self,
        op: Operation,
        siblings: &[Self],
        _caps: &Capabilities,
    ) -> Result<(), Conflict> {
        if op != Operation::Create {
            return Ok(());
        }
        let Some(secret) = self.secret() else {
            return Ok(());
        };
        let ns = self.namespace().unwrap_or_default();
        let taken = siblings.iter().any(|s| {
            s.namespace().unwrap_or_default() == ns
                && s.secret().is_some_and(|other| other.name == secret.name)
        });
        if !taken {
            return Ok(());
        }
        Err(Conflict::new(format!(
            "an existing {} resource has the same secret name `name: {}, namespace: {ns}`",
            Self::kind(&()),
            secret.name,
        )))
    }
}

impl PeeringResource for PeeringAcceptor {
    fn peer(&self) -> Option<&Peer> {
        self.spec.peer.as_ref()
    }
}

impl PeeringResource for PeeringDialer {
    fn peer(&self) -> Option<&Peer> {
        self.spec.peer.as_ref()
    }
}

fn validate(peer: Option<&Peer>) -> ErrorList {
    let path = Path::spec().child("peer");
    let mut errs = ErrorList::default();
    let Some(peer) = peer else {
        errs.push(FieldError::invalid(path, Value::Null, "peer must be specified"));
        return errs;
    };
    let path = path.child("secret");
    let Some(secret) = &peer.secret else {
        errs.push(FieldError::invalid(path, Value::Null, "secret must be specified"));
        return errs;
    };

    if secret.backend != SECRET_BACKEND_KUBERNETES {
        errs.push(FieldError::invalid(
            path.child("backend"),
            &secret.backend,
            format!(r#"backend must be "{SECRET_BACKEND_KUBERNETES}""#),
        ));
    }
    if secret.name.is_empty() {
        errs.push(FieldError::required(path.child("name"), "name must be specified"));
    }
    if secret.key.is_empty() {
        errs.push(FieldError::required(path.child("key"), "key must be specified"));
    }
    errs
}
