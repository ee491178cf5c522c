use crate::admission::{Admit, Kind};
use consul_config_controller_k8s_api::{
    ControlPlaneRequestLimit, ExportedServices, IngressGateway, JwtProvider, Mesh,
    PeeringAcceptor, PeeringDialer, ProxyDefaults, SamenessGroup, ServiceDefaults,
    ServiceIntentions, ServiceResolver, ServiceRouter, ServiceSplitter, TerminatingGateway,
};
use kube::core::ApiResource;

/// Every kind the controller admits, looked up by group and kind.
pub struct Registry {
    kinds: Vec<(ApiResource, Box<dyn Admit>)>,
}

// === impl Registry ===

impl Registry {
    pub fn new() -> Self {
        let mut registry = Self { kinds: Vec::new() };
        registry.register::<ServiceDefaults>();
        registry.register::<ProxyDefaults>();
        registry.register::<ServiceResolver>();
        registry.register::<ServiceRouter>();
        registry.register::<ServiceSplitter>();
        registry.register::<ServiceIntentions>();
        registry.register::<IngressGateway>();
        registry.register::<TerminatingGateway>();
        registry.register::<ExportedServices>();
        registry.register::<Mesh>();
        registry.register::<SamenessGroup>();
        registry.register::<JwtProvider>();
        registry.register::<ControlPlaneRequestLimit>();
        registry.register::<PeeringAcceptor>();
        registry.register::<PeeringDialer>();
        registry
    }

    fn register<T>(&mut self)
    where
        Kind<T>: Admit + 'static,
    {
        let kind = Kind::<T>::new();
        self.kinds.push((kind.api_resource(), Box::new(kind)));
    }

    /// Finds the kind an admission request names. Matching ignores case.
    pub fn lookup(&self, group: &str, kind: &str) -> Option<(&ApiResource, &dyn Admit)> {
        self.kinds
            .iter()
            .find(|(ar, _)| ar.group.eq_ignore_ascii_case(group) && ar.kind.eq_ignore_ascii_case(kind))
            .map(|(ar, admit)| (ar, admit.as_ref()))
    }

    pub fn api_resources(&self) -> impl Iterator<Item = &ApiResource> {
        self.kinds.iter().map(|(ar, _)| ar)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use consul_config_controller_core::GROUP;

    #[test]
    fn every_kind_is_registered_once() {
        let registry = Registry::new();
        let mut kinds = registry
            .api_resources()
            .map(|ar| ar.kind.clone())
            .collect::<Vec<_>>();
        assert_eq!(kinds.len(), 15);
        kinds.sort();
        kinds.dedup();
        assert_eq!(kinds.len(), 15);
        assert!(registry.api_resources().all(|ar| ar.group == GROUP));
    }

    #[test]
    fn lookup_ignores_case() {
        let registry = Registry::new();
        let (ar, _) = registry
            .lookup("consul.hashicorp.com", "servicedefaults")
            .expect("service defaults must be registered");
        assert_eq!(ar.kind, "ServiceDefaults");
        assert_eq!(ar.plural, "servicedefaults");

        let (ar, _) = registry
            .lookup(GROUP, "JWTProvider")
            .expect("jwt providers must be registered");
        assert_eq!(ar.plural, "jwtproviders");

        assert!(registry.lookup("gateway.networking.k8s.io", "HTTPRoute").is_none());
        assert!(registry.lookup(GROUP, "Unknown").is_none());
    }
}
