use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview, Operation};
use kube::core::{DynamicObject, Status};
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::cluster::ClusterReader;
use crate::config::AdmissionPolicy;
use crate::crd::{CHAOS_ENGINE_KIND, ChaosEngine};
use crate::engine::{ChaosEngineValidator, Evaluation};
use crate::metrics::{
    AdmissionMetrics, CheckEvalLabels, CheckLabels, RejectionLabels, RequestLabels,
    ResponseLabels,
};

const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

pub struct AppState {
    pub validator: ChaosEngineValidator,
    pub cluster: Arc<dyn ClusterReader>,
    pub policy: AdmissionPolicy,
    pub metrics: AdmissionMetrics,
}

pub type SharedState = Arc<AppState>;

pub fn webhook_router(state: SharedState) -> Router {
    Router::new()
        .route("/validate", post(handle_validate))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

pub async fn handle_validate(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if body.is_empty() {
        error!("empty body");
        record_rejection(&state, "empty_body");
        return (StatusCode::BAD_REQUEST, "empty body").into_response();
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !is_json(content_type) {
        error!(content_type, "unexpected Content-Type, expect application/json");
        record_rejection(&state, "content_type");
        return (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "invalid Content-Type, expect `application/json`",
        )
            .into_response();
    }

    let response = match decode_request(&body) {
        Ok(request) => admit(&state, &request).await,
        Err(message) => {
            warn!("can't decode body: {message}");
            let response = undecodable(&body, message);
            if !response.allowed {
                record_rejection(&state, "decode");
            }
            response
        }
    };

    state
        .metrics
        .admission_responses_total
        .get_or_create(&ResponseLabels {
            allowed: if response.allowed { "true" } else { "false" },
        })
        .inc();

    encode_review(response.into_review())
}

#[derive(Deserialize)]
struct ReviewHeader {
    request: Option<RequestHeader>,
}

#[derive(Deserialize)]
struct RequestHeader {
    #[serde(default)]
    uid: String,
    #[serde(default)]
    kind: KindHeader,
}

#[derive(Default, Deserialize)]
struct KindHeader {
    #[serde(default)]
    kind: String,
}

// Objects of kinds other than ChaosEngine need not decode as a DynamicObject.
fn undecodable(body: &[u8], message: String) -> AdmissionResponse {
    let mut response = AdmissionResponse::invalid(&message);
    let Some(header) = serde_json::from_slice::<ReviewHeader>(body)
        .ok()
        .and_then(|review| review.request)
    else {
        return bad_request(response, message);
    };

    response.uid = header.uid;
    if header.kind.kind == CHAOS_ENGINE_KIND {
        return bad_request(response, message);
    }

    debug!(uid = %response.uid, kind = %header.kind.kind, "kind not handled, allowing");
    response.allowed = true;
    response.result = Status::default();
    response
}

fn is_json(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .is_some_and(|media| media.trim().eq_ignore_ascii_case("application/json"))
}

fn decode_request(body: &[u8]) -> Result<AdmissionRequest<DynamicObject>, String> {
    let review: AdmissionReview<DynamicObject> =
        serde_json::from_slice(body).map_err(|e| format!("failed to decode AdmissionReview: {e}"))?;
    review
        .try_into()
        .map_err(|_| "missing request field in AdmissionReview".to_string())
}

fn encode_review(review: AdmissionReview<DynamicObject>) -> Response {
    match serde_json::to_vec(&review) {
        Ok(body) => ([(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Err(e) => {
            error!("can't encode response: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("could not encode response: {e}"),
            )
                .into_response()
        }
    }
}

fn bad_request(mut response: AdmissionResponse, message: String) -> AdmissionResponse {
    let mut status = Status::failure(&message, "BadRequest");
    status.code = 400;
    response.allowed = false;
    response.result = status;
    response
}

async fn admit(state: &AppState, req: &AdmissionRequest<DynamicObject>) -> AdmissionResponse {
    info!(
        uid = %req.uid,
        kind = %req.kind.kind,
        namespace = ?req.namespace,
        name = %req.name,
        operation = ?req.operation,
        "admission review"
    );

    state
        .metrics
        .admission_requests_total
        .get_or_create(&RequestLabels {
            kind: req.kind.kind.clone(),
            operation: format!("{:?}", req.operation).to_uppercase(),
        })
        .inc();

    if req.kind.kind != CHAOS_ENGINE_KIND {
        debug!(uid = %req.uid, kind = %req.kind.kind, "kind not handled, allowing");
        return AdmissionResponse::from(req);
    }

    validate_chaos_engine(state, req).await
}

async fn validate_chaos_engine(
    state: &AppState,
    req: &AdmissionRequest<DynamicObject>,
) -> AdmissionResponse {
    let validated = match req.operation {
        Operation::Create => true,
        Operation::Update => state.policy.validate_updates,
        _ => false,
    };
    if !validated {
        debug!(uid = %req.uid, operation = ?req.operation, "operation not validated, allowing");
        return AdmissionResponse::from(req);
    }

    let namespace = req
        .object
        .as_ref()
        .and_then(|o| o.metadata.namespace.as_deref())
        .or(req.namespace.as_deref())
        .unwrap_or_default();
    if state.policy.is_ignored(namespace) {
        debug!(uid = %req.uid, namespace, name = %req.name, "skipping validation in ignored namespace");
        return AdmissionResponse::from(req);
    }

    let Some(object) = &req.object else {
        return bad_request(
            AdmissionResponse::from(req),
            "missing object in admission request".to_string(),
        );
    };

    let engine: ChaosEngine = match serde_json::to_value(object).and_then(serde_json::from_value)
    {
        Ok(engine) => engine,
        Err(e) => {
            error!(uid = %req.uid, "could not decode ChaosEngine: {e}");
            return bad_request(AdmissionResponse::from(req), e.to_string());
        }
    };

    let start = Instant::now();
    let evaluation = state
        .validator
        .validate(state.cluster.as_ref(), &engine.spec)
        .await;
    state
        .metrics
        .admission_request_duration_seconds
        .observe(start.elapsed().as_secs_f64());
    record_check_metrics(state, &evaluation);

    let report = evaluation.report();
    if report.allowed {
        info!(uid = %req.uid, name = %req.name, "validation successful for ChaosEngine");
        AdmissionResponse::from(req)
    } else {
        let message = report.message();
        warn!(uid = %req.uid, name = %req.name, %message, "validation failed for ChaosEngine");
        bad_request(AdmissionResponse::from(req), message)
    }
}

fn record_rejection(state: &AppState, reason: &'static str) {
    state
        .metrics
        .transport_rejections_total
        .get_or_create(&RejectionLabels { reason })
        .inc();
}

fn record_check_metrics(state: &AppState, evaluation: &Evaluation) {
    for result in &evaluation.results {
        state
            .metrics
            .check_evaluations_total
            .get_or_create(&CheckEvalLabels {
                check: result.check.as_str(),
                result: if result.report.allowed { "passed" } else { "failed" },
            })
            .inc();

        state
            .metrics
            .check_duration_seconds
            .get_or_create(&CheckLabels {
                check: result.check.as_str(),
            })
            .observe(result.duration.as_secs_f64());
    }
}
