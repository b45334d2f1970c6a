//! Kubernetes REST adapter for the cluster-mutation capability.
//!
//! Talks to the API server with plain HTTP (`ureq`), matching the
//! synchronous, single-threaded execution model of the control loop. In
//! cluster, the service-account token and the `KUBERNETES_SERVICE_*`
//! environment are used; outside, the client targets `KUBE_API_URL` or a
//! local `kubectl proxy` endpoint.

use crate::cluster::{ClusterError, ClusterMutator, NodeInfo, ResourceParameters};
use ro_common::quantity;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

const SERVICE_ACCOUNT_TOKEN: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";
const DEFAULT_PROXY_URL: &str = "http://127.0.0.1:8001";
const HOSTNAME_LABEL: &str = "kubernetes.io/hostname";

/// Thin authenticated HTTP client for API-server paths.
#[derive(Clone)]
pub struct KubeApi {
    agent: ureq::Agent,
    base_url: String,
    token: Option<String>,
    namespace: String,
}

impl KubeApi {
    pub fn new(base_url: String, token: Option<String>, namespace: String) -> Self {
        KubeApi {
            agent: ureq::AgentBuilder::new()
                .timeout(Duration::from_secs(10))
                .build(),
            base_url,
            token,
            namespace,
        }
    }

    /// Build a client from the CLI flags.
    pub fn from_flags(namespace: &str, in_cluster: bool) -> Result<Self, ClusterError> {
        if in_cluster {
            let host = std::env::var("KUBERNETES_SERVICE_HOST").map_err(|_| {
                ClusterError::Environment("KUBERNETES_SERVICE_HOST is not set".to_string())
            })?;
            let port = std::env::var("KUBERNETES_SERVICE_PORT")
                .unwrap_or_else(|_| "443".to_string());
            let token = std::fs::read_to_string(SERVICE_ACCOUNT_TOKEN)
                .map(|t| t.trim().to_string())
                .ok();
            Ok(KubeApi::new(
                format!("https://{host}:{port}"),
                token,
                namespace.to_string(),
            ))
        } else {
            let base = std::env::var("KUBE_API_URL")
                .unwrap_or_else(|_| DEFAULT_PROXY_URL.to_string());
            Ok(KubeApi::new(base, None, namespace.to_string()))
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// GET a path; `Ok(None)` on 404.
    pub fn get(&self, path: &str) -> Result<Option<Value>, ClusterError> {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.agent.get(&url);
        if let Some(token) = &self.token {
            req = req.set("Authorization", &format!("Bearer {token}"));
        }
        match req.call() {
            Ok(resp) => resp
                .into_json::<Value>()
                .map(Some)
                .map_err(|e| ClusterError::Malformed(e.to_string())),
            Err(ureq::Error::Status(404, _)) => Ok(None),
            Err(e) => Err(ClusterError::Request(e.to_string())),
        }
    }

    /// PUT a JSON body back to a path.
    pub fn put(&self, path: &str, body: &Value) -> Result<(), ClusterError> {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.agent.put(&url).set("Content-Type", "application/json");
        if let Some(token) = &self.token {
            req = req.set("Authorization", &format!("Bearer {token}"));
        }
        req.send_json(body.clone())
            .map(|_| ())
            .map_err(|e| ClusterError::Request(e.to_string()))
    }
}

/// Default [`ClusterMutator`] over the Kubernetes API.
pub struct KubeClusterClient {
    api: KubeApi,
}

impl KubeClusterClient {
    pub fn new(api: KubeApi) -> Self {
        KubeClusterClient { api }
    }

    fn deployment_path(&self, name: &str) -> String {
        format!(
            "/apis/apps/v1/namespaces/{}/deployments/{}",
            self.api.namespace(),
            name
        )
    }

    fn statefulset_path(&self, name: &str) -> String {
        format!(
            "/apis/apps/v1/namespaces/{}/statefulsets/{}",
            self.api.namespace(),
            name
        )
    }

    /// Find the workload object for a name: Deployment first, StatefulSet
    /// second. Returns the API path alongside the object so callers can
    /// write it back.
    fn fetch_workload(&self, name: &str) -> Result<Option<(String, Value)>, ClusterError> {
        let path = self.deployment_path(name);
        if let Some(obj) = self.api.get(&path)? {
            return Ok(Some((path, obj)));
        }
        let path = self.statefulset_path(name);
        if let Some(obj) = self.api.get(&path)? {
            return Ok(Some((path, obj)));
        }
        Ok(None)
    }
}

impl ClusterMutator for KubeClusterClient {
    fn get_nodes(&self) -> Result<Vec<NodeInfo>, ClusterError> {
        let body = self
            .api
            .get("/api/v1/nodes")?
            .ok_or_else(|| ClusterError::Malformed("node list endpoint missing".to_string()))?;
        let items = body["items"]
            .as_array()
            .ok_or_else(|| ClusterError::Malformed("node list has no items".to_string()))?;
        Ok(items.iter().map(parse_node).collect())
    }

    fn get_current_resources(
        &self,
        app_name: &str,
    ) -> Result<Option<ResourceParameters>, ClusterError> {
        match self.fetch_workload(app_name)? {
            Some((_, obj)) => Ok(Some(extract_resources(&obj))),
            None => {
                debug!(app = app_name, "no Deployment or StatefulSet found");
                Ok(None)
            }
        }
    }

    fn apply_resource_action(
        &self,
        app_name: &str,
        params: &ResourceParameters,
    ) -> Result<bool, ClusterError> {
        let Some((path, mut obj)) = self.fetch_workload(app_name)? else {
            warn!(app = app_name, "no Deployment or StatefulSet to update");
            return Ok(false);
        };
        mutate_workload(&mut obj, params);
        self.api.put(&path, &obj)?;
        Ok(true)
    }
}

fn string_map(v: &Value) -> BTreeMap<String, String> {
    v.as_object()
        .map(|m| {
            m.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

fn parse_node(item: &Value) -> NodeInfo {
    NodeInfo {
        name: item["metadata"]["name"].as_str().unwrap_or_default().to_string(),
        labels: string_map(&item["metadata"]["labels"]),
        allocatable: string_map(&item["status"]["allocatable"]),
        capacity: string_map(&item["status"]["capacity"]),
    }
}

/// Aggregate the live resource spec of a workload object.
///
/// CPU and memory requests are summed across containers, with defaults of
/// 0.5 cores and 512Mi when no container declares them. Zones are
/// recovered from preferred node-affinity terms in positional order.
pub fn extract_resources(obj: &Value) -> ResourceParameters {
    let replicas = obj["spec"]["replicas"].as_u64().unwrap_or(1) as u32;

    let mut total_cpu = 0.0;
    let mut total_memory_mib = 0.0;
    if let Some(containers) = obj["spec"]["template"]["spec"]["containers"].as_array() {
        for container in containers {
            let requests = &container["resources"]["requests"];
            if let Some(cpu) = requests["cpu"].as_str() {
                total_cpu += quantity::parse_cpu_cores(cpu).unwrap_or(0.0);
            }
            if let Some(mem) = requests["memory"].as_str() {
                total_memory_mib += memory_to_mib(mem).unwrap_or(0.0);
            }
        }
    }

    let mut node_affinities = BTreeMap::new();
    if let Some(terms) = obj["spec"]["template"]["spec"]["affinity"]["nodeAffinity"]
        ["preferredDuringSchedulingIgnoredDuringExecution"]
        .as_array()
    {
        for term in terms {
            if let Some(exprs) = term["preference"]["matchExpressions"].as_array() {
                for expr in exprs {
                    if expr["key"].as_str() == Some(HOSTNAME_LABEL) {
                        let values: Vec<String> = expr["values"]
                            .as_array()
                            .map(|a| {
                                a.iter()
                                    .filter_map(|v| v.as_str().map(str::to_string))
                                    .collect()
                            })
                            .unwrap_or_default();
                        let zone = format!("zone_{}", node_affinities.len() + 1);
                        node_affinities.insert(zone, values);
                    }
                }
            }
        }
    }

    ResourceParameters {
        cpu: if total_cpu > 0.0 { total_cpu } else { 0.5 },
        memory: if total_memory_mib > 0.0 {
            quantity::format_memory_mib(total_memory_mib)
        } else {
            "512Mi".to_string()
        },
        replicas,
        node_affinities,
    }
}

/// Memory quantity to MiB for spec aggregation; bare numbers are bytes.
fn memory_to_mib(s: &str) -> Option<f64> {
    if let Some(mib) = quantity::parse_memory_mib(s) {
        return Some(mib);
    }
    if let Some(kib) = s.strip_suffix("Ki") {
        return kib.parse::<f64>().ok().map(|v| v / 1024.0);
    }
    s.parse::<f64>().ok().map(|v| v / (1024.0 * 1024.0))
}

/// Rewrite a workload object in place with new resources, replicas, and a
/// preferred node-affinity block.
pub fn mutate_workload(obj: &mut Value, params: &ResourceParameters) {
    obj["spec"]["replicas"] = json!(params.replicas);

    if let Some(containers) = obj["spec"]["template"]["spec"]["containers"].as_array_mut() {
        for container in containers {
            let resources = ensure_object(container, "resources");
            let requests = ensure_object(resources, "requests");
            requests["cpu"] = json!(params.cpu.to_string());
            requests["memory"] = json!(params.memory);
            let limits = ensure_object(resources, "limits");
            limits["cpu"] = json!((params.cpu * 1.2).to_string());
            limits["memory"] = json!(params.memory);
        }
    }

    if !params.node_affinities.is_empty() {
        let terms: Vec<Value> = params
            .node_affinities
            .values()
            .map(|nodes| {
                json!({
                    "weight": 10,
                    "preference": {
                        "matchExpressions": [{
                            "key": HOSTNAME_LABEL,
                            "operator": "In",
                            "values": nodes,
                        }]
                    }
                })
            })
            .collect();
        let pod_spec = &mut obj["spec"]["template"]["spec"];
        let affinity = ensure_object(pod_spec, "affinity");
        let node_affinity = ensure_object(affinity, "nodeAffinity");
        node_affinity["preferredDuringSchedulingIgnoredDuringExecution"] = json!(terms);
    }
}

fn ensure_object<'a>(parent: &'a mut Value, key: &str) -> &'a mut Value {
    if !parent[key].is_object() {
        parent[key] = Value::Object(Map::new());
    }
    &mut parent[key]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deployment_fixture() -> Value {
        json!({
            "metadata": {"name": "web"},
            "spec": {
                "replicas": 3,
                "template": {"spec": {"containers": [
                    {"name": "app", "resources": {"requests": {"cpu": "500m", "memory": "1Gi"}}},
                    {"name": "sidecar", "resources": {"requests": {"cpu": "1", "memory": "256Mi"}}}
                ]}}
            }
        })
    }

    #[test]
    fn extract_sums_container_requests() {
        let params = extract_resources(&deployment_fixture());
        assert_eq!(params.replicas, 3);
        assert!((params.cpu - 1.5).abs() < 1e-12);
        assert_eq!(params.memory, "1280Mi");
        assert!(params.node_affinities.is_empty());
    }

    #[test]
    fn extract_defaults_when_requests_absent() {
        let obj = json!({
            "spec": {"template": {"spec": {"containers": [{"name": "app"}]}}}
        });
        let params = extract_resources(&obj);
        assert_eq!(params.replicas, 1);
        assert_eq!(params.cpu, 0.5);
        assert_eq!(params.memory, "512Mi");
    }

    #[test]
    fn extract_recovers_affinity_zones() {
        let mut obj = deployment_fixture();
        obj["spec"]["template"]["spec"]["affinity"] = json!({
            "nodeAffinity": {"preferredDuringSchedulingIgnoredDuringExecution": [
                {"weight": 10, "preference": {"matchExpressions": [
                    {"key": "kubernetes.io/hostname", "operator": "In", "values": ["n1", "n2"]}
                ]}},
                {"weight": 10, "preference": {"matchExpressions": [
                    {"key": "kubernetes.io/hostname", "operator": "In", "values": ["n3"]}
                ]}}
            ]}
        });
        let params = extract_resources(&obj);
        assert_eq!(params.node_affinities.len(), 2);
        assert_eq!(params.node_affinities["zone_1"], vec!["n1", "n2"]);
        assert_eq!(params.node_affinities["zone_2"], vec!["n3"]);
    }

    #[test]
    fn mutate_sets_requests_limits_and_affinity() {
        let mut obj = deployment_fixture();
        let mut affinities = BTreeMap::new();
        affinities.insert("zone-a".to_string(), vec!["n1".to_string()]);
        let params = ResourceParameters {
            cpu: 2.0,
            memory: "2048Mi".to_string(),
            replicas: 4,
            node_affinities: affinities,
        };
        mutate_workload(&mut obj, &params);

        assert_eq!(obj["spec"]["replicas"], json!(4));
        let first = &obj["spec"]["template"]["spec"]["containers"][0];
        assert_eq!(first["resources"]["requests"]["cpu"], json!("2"));
        assert_eq!(first["resources"]["requests"]["memory"], json!("2048Mi"));
        assert_eq!(first["resources"]["limits"]["cpu"], json!("2.4"));
        assert_eq!(first["resources"]["limits"]["memory"], json!("2048Mi"));

        let term = &obj["spec"]["template"]["spec"]["affinity"]["nodeAffinity"]
            ["preferredDuringSchedulingIgnoredDuringExecution"][0];
        assert_eq!(term["weight"], json!(10));
        assert_eq!(
            term["preference"]["matchExpressions"][0]["key"],
            json!("kubernetes.io/hostname")
        );
        assert_eq!(
            term["preference"]["matchExpressions"][0]["values"],
            json!(["n1"])
        );
    }

    #[test]
    fn mutate_roundtrips_through_extract() {
        let mut obj = deployment_fixture();
        let params = ResourceParameters {
            cpu: 1.0,
            memory: "1024Mi".to_string(),
            replicas: 2,
            node_affinities: BTreeMap::new(),
        };
        mutate_workload(&mut obj, &params);
        let back = extract_resources(&obj);
        // Two containers each receive the full request; the sum doubles.
        assert_eq!(back.replicas, 2);
        assert!((back.cpu - 2.0).abs() < 1e-12);
        assert_eq!(back.memory, "2048Mi");
    }

    #[test]
    fn parse_node_reads_maps() {
        let node = json!({
            "metadata": {"name": "n1", "labels": {"zone": "a"}},
            "status": {"allocatable": {"cpu": "8", "memory": "16Gi"}, "capacity": {"cpu": "8"}}
        });
        let info = parse_node(&node);
        assert_eq!(info.name, "n1");
        assert_eq!(info.labels["zone"], "a");
        assert_eq!(info.allocatable["memory"], "16Gi");
    }
}
