use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::Histogram;
use prometheus_client::registry::Registry;

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct RequestLabels {
    pub kind: String,
    pub operation: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ResponseLabels {
    pub allowed: &'static str,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct RejectionLabels {
    pub reason: &'static str,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct CheckEvalLabels {
    pub check: &'static str,
    pub result: &'static str,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct CheckLabels {
    pub check: &'static str,
}

pub struct AdmissionMetrics {
    pub admission_requests_total: Family<RequestLabels, Counter>,
    pub admission_responses_total: Family<ResponseLabels, Counter>,
    pub transport_rejections_total: Family<RejectionLabels, Counter>,
    pub check_evaluations_total: Family<CheckEvalLabels, Counter>,
    pub admission_request_duration_seconds: Histogram,
    pub check_duration_seconds: Family<CheckLabels, Histogram>,
}

const DURATION_BUCKETS: [f64; 14] = [
    0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

fn new_duration_histogram() -> Histogram {
    Histogram::new(DURATION_BUCKETS.iter().copied())
}

impl AdmissionMetrics {
    pub fn new(registry: &mut Registry) -> Self {
        let admission_requests_total = Family::<RequestLabels, Counter>::default();
        registry.register(
            "chaos_admission_requests",
            "Total number of decoded admission requests",
            admission_requests_total.clone(),
        );

        let admission_responses_total = Family::<ResponseLabels, Counter>::default();
        registry.register(
            "chaos_admission_responses",
            "Total number of admission responses sent",
            admission_responses_total.clone(),
        );

        let transport_rejections_total = Family::<RejectionLabels, Counter>::default();
        registry.register(
            "chaos_admission_transport_rejections",
            "Requests rejected before an admission decision could be made",
            transport_rejections_total.clone(),
        );

        let check_evaluations_total = Family::<CheckEvalLabels, Counter>::default();
        registry.register(
            "chaos_admission_check_evaluations",
            "Total number of ChaosEngine check evaluations",
            check_evaluations_total.clone(),
        );

        let admission_request_duration_seconds = new_duration_histogram();
        registry.register(
            "chaos_admission_request_duration_seconds",
            "Duration of ChaosEngine validation in seconds",
            admission_request_duration_seconds.clone(),
        );

        let check_duration_seconds =
            Family::<CheckLabels, Histogram>::new_with_constructor(new_duration_histogram);
        registry.register(
            "chaos_admission_check_duration_seconds",
            "Duration of individual ChaosEngine checks in seconds",
            check_duration_seconds.clone(),
        );

        Self {
            admission_requests_total,
            admission_responses_total,
            transport_rejections_total,
            check_evaluations_total,
            admission_request_duration_seconds,
            check_duration_seconds,
        }
    }
}
