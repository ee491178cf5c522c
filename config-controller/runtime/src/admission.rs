use crate::{
    core::Capabilities,
    sync::{Admit, Registry, Rejection, Request as Write},
};
use anyhow::Result;
use futures::future;
use http_body_util::BodyExt;
use hyper::{http, Request, Response};
use kube::{
    api::{Api, ListParams},
    core::{
        admission::Operation,
        response::{StatusCause, StatusDetails},
        ApiResource, DynamicObject,
    },
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, trace, warn};

/// Serves the admission webhook for every registered config kind.
#[derive(Clone)]
pub struct Admission {
    registry: Arc<Registry>,
    caps: Arc<Capabilities>,
    siblings: Arc<dyn Siblings>,
}

/// Lists the persisted resources of a kind, across all namespaces.
#[async_trait::async_trait]
pub trait Siblings: Send + Sync {
    async fn list(&self, resource: &ApiResource) -> Result<Vec<serde_json::Value>>;
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read request body: {0}")]
    Request(#[from] hyper::Error),

    #[error("failed to encode json response: {0}")]
    Json(#[from] serde_json::Error),
}

type Review = kube::core::admission::AdmissionReview<DynamicObject>;
type AdmissionRequest = kube::core::admission::AdmissionRequest<DynamicObject>;
type AdmissionResponse = kube::core::admission::AdmissionResponse;
type AdmissionReview = kube::core::admission::AdmissionReview<DynamicObject>;

type Body = http_body_util::Full<bytes::Bytes>;

// === impl Admission ===

impl tower::Service<Request<hyper::body::Incoming>> for Admission {
    type Response = Response<Body>;
    type Error = Error;
    type Future = future::BoxFuture<'static, Result<Response<Body>, Error>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::result::Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<hyper::body::Incoming>) -> Self::Future {
        trace!(?req);
        if req.method() != http::Method::POST || req.uri().path() != "/" {
            return Box::pin(future::ok(
                Response::builder()
                    .status(http::StatusCode::NOT_FOUND)
                    .body(Body::default())
                    .expect("not found response must be valid"),
            ));
        }

        let admission = self.clone();
        Box::pin(async move {
            use bytes::Buf;
            let bytes = req.into_body().collect().await?.to_bytes();
            let review: Review = match serde_json::from_reader(bytes.reader()) {
                Ok(review) => review,
                Err(error) => {
                    warn!(%error, "Failed to parse request body");
                    return json_response(AdmissionResponse::invalid(error).into_review());
                }
            };
            trace!(?review);

            let rsp = match review.try_into() {
                Ok(req) => {
                    debug!(?req);
                    admission.admit(req).await
                }
                Err(error) => {
                    warn!(%error, "Invalid admission request");
                    AdmissionResponse::invalid(error)
                }
            };
            debug!(?rsp);
            json_response(rsp.into_review())
        })
    }
}

impl Admission {
    pub fn new(
        registry: Arc<Registry>,
        caps: Arc<Capabilities>,
        siblings: Arc<dyn Siblings>,
    ) -> Self {
        Self {
            registry,
            caps,
            siblings,
        }
    }

    async fn admit(self, req: AdmissionRequest) -> AdmissionResponse {
        let Some((resource, kind)) = self.registry.lookup(&req.kind.group, &req.kind.kind) else {
            warn!(group = %req.kind.group, kind = %req.kind.kind, "Unsupported resource type");
            return AdmissionResponse::invalid(format_args!(
                "unsupported resource type: {}.{}.{}",
                req.kind.group, req.kind.version, req.kind.kind
            ));
        };

        let operation = req.operation.clone();
        if !matches!(operation, Operation::Create | Operation::Update) {
            return AdmissionResponse::from(&req);
        }

        let object = match encode(req.object.as_ref()) {
            Ok(Some(object)) => object,
            Ok(None) => {
                return AdmissionResponse::invalid("admission request missing 'object'");
            }
            Err(error) => return AdmissionResponse::invalid(error),
        };
        let old_object = match encode(req.old_object.as_ref()) {
            Ok(old) => old,
            Err(error) => return AdmissionResponse::invalid(error),
        };

        // Uniqueness is only checked when resources are created.
        let siblings = if operation == Operation::Create {
            match self.siblings.list(resource).await {
                Ok(siblings) => siblings,
                Err(error) => {
                    warn!(%error, kind = %resource.kind, "Failed to list existing resources");
                    return AdmissionResponse::from(&req)
                        .deny(format!("failed to list {}: {error}", resource.plural));
                }
            }
        } else {
            Vec::new()
        };

        let write = Write {
            operation,
            object: &object,
            old_object: old_object.as_ref(),
        };
        admit_write(&req, kind, &write, &siblings, &self.caps)
    }
}

fn admit_write(
    req: &AdmissionRequest,
    kind: &dyn Admit,
    write: &Write<'_>,
    siblings: &[serde_json::Value],
    caps: &Capabilities,
) -> AdmissionResponse {
    let ns = req.namespace.as_deref().unwrap_or_default();
    let rsp = AdmissionResponse::from(req);
    match kind.admit(write, siblings, caps) {
        Ok(patch) if patch.0.is_empty() => {
            debug!(%ns, name = %req.name, "Allowed");
            rsp
        }
        Ok(patch) => {
            debug!(%ns, name = %req.name, patches = patch.0.len(), "Allowed with defaults");
            match rsp.with_patch(patch) {
                Ok(rsp) => rsp,
                Err(error) => {
                    warn!(%error, %ns, name = %req.name, "Failed to encode patch");
                    AdmissionResponse::from(req).deny(error)
                }
            }
        }
        Err(error @ Rejection::Decode { .. }) => {
            info!(%error, %ns, name = %req.name, kind = %req.kind.kind, "Undecodable object");
            let mut rsp = AdmissionResponse::invalid(error);
            rsp.uid = req.uid.clone();
            rsp
        }
        Err(error) => {
            if error.is_client_error() {
                info!(%error, %ns, name = %req.name, kind = %req.kind.kind, "Denied");
            } else {
                warn!(%error, %ns, name = %req.name, kind = %req.kind.kind, "Denied");
            }
            deny(rsp, req, error)
        }
    }
}

/// Denies a write. Invalid objects are reported the way the API server
/// reports them, with one cause per field violation.
fn deny(rsp: AdmissionResponse, req: &AdmissionRequest, error: Rejection) -> AdmissionResponse {
    let details = match &error {
        Rejection::Invalid(invalid) => Some(StatusDetails {
            name: invalid.name.clone(),
            group: req.kind.group.clone(),
            kind: invalid.kind.clone(),
            causes: error
                .causes()
                .into_iter()
                .map(|cause| StatusCause {
                    reason: cause.kind.reason().to_string(),
                    message: cause.body(),
                    field: cause.field.to_string(),
                })
                .collect(),
            uid: String::new(),
            retry_after_seconds: 0,
        }),
        _ => None,
    };

    let mut rsp = rsp.deny(error);
    if let Some(details) = details {
        rsp.result.code = 422;
        rsp.result.reason = "Invalid".to_string();
        rsp.result.details = Some(details);
    }
    rsp
}

fn encode(obj: Option<&DynamicObject>) -> serde_json::Result<Option<serde_json::Value>> {
    obj.map(serde_json::to_value).transpose()
}

fn json_response(rsp: AdmissionReview) -> Result<Response<Body>, Error> {
    let bytes = serde_json::to_vec(&rsp)?;
    Ok(Response::builder()
        .status(http::StatusCode::OK)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(Body::from(bytes))
        .expect("admission review response must be valid"))
}

// === impl Siblings ===

#[async_trait::async_trait]
impl Siblings for kube::Client {
    async fn list(&self, resource: &ApiResource) -> Result<Vec<serde_json::Value>> {
        let api = Api::<DynamicObject>::all_with(self.clone(), resource);
        let list = api.list(&ListParams::default()).await?;
        list.items
            .into_iter()
            .map(|obj| serde_json::to_value(obj).map_err(Into::into))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    struct Fixed(Vec<serde_json::Value>);

    struct Unavailable;

    #[async_trait::async_trait]
    impl Siblings for Fixed {
        async fn list(&self, _: &ApiResource) -> Result<Vec<serde_json::Value>> {
            Ok(self.0.clone())
        }
    }

    #[async_trait::async_trait]
    impl Siblings for Unavailable {
        async fn list(&self, _: &ApiResource) -> Result<Vec<serde_json::Value>> {
            bail!("connection refused")
        }
    }

    fn admission(caps: Capabilities, siblings: impl Siblings + 'static) -> Admission {
        Admission::new(Arc::new(Registry::new()), Arc::new(caps), Arc::new(siblings))
    }

    fn mirrored() -> Capabilities {
        Capabilities {
            namespaces: true,
            destination_namespace: "default".to_string(),
            mirroring: true,
            ..Capabilities::default()
        }
    }

    fn service_defaults(ns: &str, name: &str, protocol: &str) -> serde_json::Value {
        json!({
            "apiVersion": "consul.hashicorp.com/v1alpha1",
            "kind": "ServiceDefaults",
            "metadata": { "name": name, "namespace": ns },
            "spec": { "protocol": protocol },
        })
    }

    fn intentions(ns: &str, name: &str) -> serde_json::Value {
        json!({
            "apiVersion": "consul.hashicorp.com/v1alpha1",
            "kind": "ServiceIntentions",
            "metadata": { "name": name, "namespace": ns },
            "spec": {
                "destination": { "name": name },
                "sources": [{ "name": "web", "action": "allow" }],
            },
        })
    }

    fn request(operation: &str, object: serde_json::Value) -> AdmissionRequest {
        let kind = object["kind"].as_str().unwrap_or_default().to_string();
        let review = json!({
            "apiVersion": "admission.k8s.io/v1",
            "kind": "AdmissionReview",
            "request": {
                "uid": "0df28fbd-5f5f-11e8-bc74-36e6bb280816",
                "kind": { "group": "consul.hashicorp.com", "version": "v1alpha1", "kind": kind },
                "resource": {
                    "group": "consul.hashicorp.com",
                    "version": "v1alpha1",
                    "resource": kind.to_ascii_lowercase(),
                },
                "name": object["metadata"]["name"],
                "namespace": object["metadata"]["namespace"],
                "operation": operation,
                "userInfo": {},
                "object": object,
                "dryRun": false,
            },
        });
        serde_json::from_value::<Review>(review)
            .expect("review must decode")
            .try_into()
            .expect("review must carry a request")
    }

    #[tokio::test]
    async fn allows_valid_resources() {
        let rsp = admission(Capabilities::default(), Fixed(vec![]))
            .admit(request("CREATE", service_defaults("default", "web", "http")))
            .await;
        assert!(rsp.allowed);
        assert!(rsp.patch.is_none());
    }

    #[tokio::test]
    async fn denies_invalid_resources() {
        let rsp = admission(Capabilities::default(), Fixed(vec![]))
            .admit(request("CREATE", service_defaults("default", "web", "smtp")))
            .await;
        assert!(!rsp.allowed);
        assert!(
            rsp.result
                .message
                .starts_with(r#"servicedefaults.consul.hashicorp.com "web" is invalid"#),
            "{}",
            rsp.result.message
        );
    }

    #[tokio::test]
    async fn lists_a_cause_per_invalid_field() {
        let obj = json!({
            "apiVersion": "consul.hashicorp.com/v1alpha1",
            "kind": "ServiceSplitter",
            "metadata": { "name": "web", "namespace": "default" },
            "spec": { "splits": [{ "weight": 101 }, { "weight": 0.001 }] },
        });
        let rsp = admission(Capabilities::default(), Fixed(vec![]))
            .admit(request("CREATE", obj))
            .await;
        assert!(!rsp.allowed);
        assert_eq!(rsp.result.code, 422);
        assert_eq!(rsp.result.reason, "Invalid");

        let details = rsp.result.details.expect("invalid objects must carry details");
        assert_eq!(details.name, "web");
        assert_eq!(details.group, "consul.hashicorp.com");
        assert_eq!(details.kind, "servicesplitter");
        let causes = details
            .causes
            .iter()
            .map(|c| (c.field.as_str(), c.reason.as_str()))
            .collect::<Vec<_>>();
        assert_eq!(
            causes,
            vec![
                ("spec.splits[0].weight", "FieldValueInvalid"),
                ("spec.splits[1].weight", "FieldValueInvalid"),
                ("spec.splits", "FieldValueInvalid"),
            ]
        );
        assert_eq!(
            details.causes[0].message,
            "Invalid value: 101: weight must be a percentage between 0.01 and 100"
        );
    }

    #[tokio::test]
    async fn conflicts_carry_no_field_causes() {
        let existing = service_defaults("other", "web", "http");
        let rsp = admission(Capabilities::default(), Fixed(vec![existing]))
            .admit(request("CREATE", service_defaults("default", "web", "http")))
            .await;
        assert!(!rsp.allowed);
        assert!(rsp.result.details.is_none());
    }

    #[tokio::test]
    async fn undecodable_objects_are_invalid_requests() {
        let obj = json!({
            "apiVersion": "consul.hashicorp.com/v1alpha1",
            "kind": "ServiceIntentions",
            "metadata": { "name": "foo", "namespace": "bar" },
            "spec": { "sources": "web" },
        });
        let req = request("CREATE", obj);
        let uid = req.uid.clone();
        let rsp = admission(Capabilities::default(), Fixed(vec![]))
            .admit(req)
            .await;
        assert!(!rsp.allowed);
        assert_eq!(rsp.uid, uid);
        assert_eq!(rsp.result.reason, "InvalidRequest");
        assert!(
            rsp.result
                .message
                .starts_with("failed to decode ServiceIntentions: "),
            "{}",
            rsp.result.message
        );
        assert!(rsp.result.details.is_none());
    }

    #[tokio::test]
    async fn denies_names_taken_in_other_namespaces() {
        let existing = service_defaults("other", "web", "http");
        let obj = service_defaults("default", "web", "http");

        let rsp = admission(Capabilities::default(), Fixed(vec![existing.clone()]))
            .admit(request("CREATE", obj.clone()))
            .await;
        assert!(!rsp.allowed);
        assert!(rsp.result.message.contains("is already defined"));

        // Updates are not compared with their siblings.
        let rsp = admission(Capabilities::default(), Fixed(vec![existing.clone()]))
            .admit(request("UPDATE", obj.clone()))
            .await;
        assert!(rsp.allowed);

        let rsp = admission(mirrored(), Fixed(vec![existing]))
            .admit(request("CREATE", obj))
            .await;
        assert!(rsp.allowed);
    }

    #[tokio::test]
    async fn returns_defaulting_patches() {
        let rsp = admission(mirrored(), Fixed(vec![]))
            .admit(request("CREATE", intentions("bar", "foo")))
            .await;
        assert!(rsp.allowed);
        let patch = rsp.patch.expect("defaults must be patched");
        assert_eq!(
            serde_json::from_slice::<serde_json::Value>(&patch).expect("patch must be json"),
            json!([{ "op": "add", "path": "/spec/destination/namespace", "value": "bar" }]),
        );
    }

    #[tokio::test]
    async fn denies_when_siblings_cannot_be_listed() {
        let rsp = admission(Capabilities::default(), Unavailable)
            .admit(request("CREATE", service_defaults("default", "web", "http")))
            .await;
        assert!(!rsp.allowed);
        assert_eq!(
            rsp.result.message,
            "failed to list servicedefaults: connection refused"
        );
    }

    #[tokio::test]
    async fn rejects_unknown_kinds() {
        let mut obj = service_defaults("default", "web", "http");
        obj["kind"] = json!("Widget");
        let rsp = admission(Capabilities::default(), Fixed(vec![]))
            .admit(request("CREATE", obj))
            .await;
        assert!(!rsp.allowed);
        assert_eq!(
            rsp.result.message,
            "unsupported resource type: consul.hashicorp.com.v1alpha1.Widget"
        );
    }
}
