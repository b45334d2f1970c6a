//! Workload-type classification.
//!
//! Picks the performance signal for a workload: batch jobs report a
//! completion time, microservices a latency quantile. Classification is
//! best-effort; anything ambiguous is treated as a microservice.

use crate::cluster::kube::KubeApi;
use serde::Serialize;
use tracing::{debug, info};

/// Workload type, driving which performance signal the loop observes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AppType {
    Batch,
    Microservice,
}

/// Capability interface over the workload classifier.
pub trait WorkloadClassifier {
    fn identify_app_type(&self, app_name: &str) -> AppType;
}

/// Classifier probing the Kubernetes API for workload shapes.
///
/// A Job or CronJob bearing the app's name marks it batch; a Service or
/// Ingress marks it microservice; a Deployment carrying service-ish
/// labels marks it microservice. Probe failures are skipped.
pub struct KubeWorkloadClassifier {
    api: KubeApi,
}

const MICROSERVICE_LABELS: [&str; 3] = ["app.kubernetes.io/component", "service", "microservice"];

impl KubeWorkloadClassifier {
    pub fn new(api: KubeApi) -> Self {
        KubeWorkloadClassifier { api }
    }

    fn exists(&self, path: &str) -> bool {
        match self.api.get(path) {
            Ok(found) => found.is_some(),
            Err(e) => {
                debug!(error = %e, path, "classification probe failed");
                false
            }
        }
    }
}

impl WorkloadClassifier for KubeWorkloadClassifier {
    fn identify_app_type(&self, app_name: &str) -> AppType {
        let ns = self.api.namespace().to_string();

        if self.exists(&format!("/apis/batch/v1/namespaces/{ns}/jobs/{app_name}"))
            || self.exists(&format!("/apis/batch/v1/namespaces/{ns}/cronjobs/{app_name}"))
        {
            return AppType::Batch;
        }

        if self.exists(&format!("/api/v1/namespaces/{ns}/services/{app_name}"))
            || self.exists(&format!(
                "/apis/networking.k8s.io/v1/namespaces/{ns}/ingresses/{app_name}"
            ))
        {
            return AppType::Microservice;
        }

        if let Ok(Some(deployment)) = self
            .api
            .get(&format!("/apis/apps/v1/namespaces/{ns}/deployments/{app_name}"))
        {
            if let Some(labels) = deployment["metadata"]["labels"].as_object() {
                if MICROSERVICE_LABELS.iter().any(|k| labels.contains_key(*k)) {
                    return AppType::Microservice;
                }
            }
        }

        info!(
            app = app_name,
            "could not definitively identify app type, defaulting to microservice"
        );
        AppType::Microservice
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_type_serialises_lowercase() {
        assert_eq!(serde_json::to_string(&AppType::Batch).unwrap(), "\"batch\"");
        assert_eq!(
            serde_json::to_string(&AppType::Microservice).unwrap(),
            "\"microservice\""
        );
    }
}
