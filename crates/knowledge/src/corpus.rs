//! Built-in Kubernetes troubleshooting corpus

use crate::{LocalStore, Metadata, Result, VectorStore};
use tracing::info;

/// One entry of the built-in corpus
#[derive(Debug, Clone, Copy)]
pub struct CorpusDocument {
    pub id: &'static str,
    pub topic: &'static str,
    pub source: &'static str,
    pub content: &'static str,
}

impl CorpusDocument {
    pub fn metadata(&self) -> Metadata {
        let mut metadata = Metadata::new();
        metadata.insert("topic".to_string(), self.topic.to_string());
        metadata.insert("source".to_string(), self.source.to_string());
        metadata
    }
}

const TROUBLESHOOTING: &str = "kubernetes-troubleshooting";
const BEST_PRACTICES: &str = "kubernetes-best-practices";

const DOCUMENTS: &[CorpusDocument] = &[
    CorpusDocument {
        id: "k8s-image-pull-backoff",
        topic: "ImagePullBackOff",
        source: TROUBLESHOOTING,
        content: "ImagePullBackOff: the kubelet cannot pull the container image and is backing off.\n\
Causes: misspelled image name or tag, tag no longer in the registry, private registry without \
imagePullSecrets, registry unreachable from the node, registry rate limits.\n\
Diagnose: kubectl describe pod <pod> and read the Events section for the pull error; \
kubectl get pod <pod> -o yaml to check the image field; kubectl get secrets for pull secrets.\n\
Fix: correct the image reference, push the missing tag, create a docker-registry secret and \
reference it in imagePullSecrets, check node egress to the registry.",
    },
    CorpusDocument {
        id: "k8s-crash-loop-backoff",
        topic: "CrashLoopBackOff",
        source: TROUBLESHOOTING,
        content: "CrashLoopBackOff: the container starts, exits, and is restarted with growing delays.\n\
Causes: application error on startup, missing environment variables or config files, \
failing liveness probe, OOMKilled, wrong command or entrypoint, unavailable dependencies.\n\
Diagnose: kubectl logs <pod> --previous for the crashed container output; \
kubectl describe pod <pod> for the last state, exit code and restart count; exit code 137 means \
the process was killed, usually for memory.\n\
Fix: fix the startup error, supply the missing configuration, relax or correct the liveness \
probe, raise memory limits, verify the container command.",
    },
    CorpusDocument {
        id: "k8s-pending-pods",
        topic: "Pending Pods",
        source: TROUBLESHOOTING,
        content: "Pending pods have not been scheduled onto any node.\n\
Causes: not enough CPU or memory on any node, node selector matching no node, taints without \
tolerations, unbound PersistentVolumeClaims, affinity rules that cannot be met, exhausted \
resource quotas.\n\
Diagnose: kubectl describe pod <pod> and look for FailedScheduling events; kubectl get nodes; \
kubectl top nodes; kubectl describe nodes for taints and allocatable resources.\n\
Fix: add capacity, lower resource requests, correct node selectors, add tolerations, provision \
volumes or a StorageClass, adjust quotas or affinity rules.",
    },
    CorpusDocument {
        id: "k8s-oom-killed",
        topic: "OOMKilled",
        source: TROUBLESHOOTING,
        content: "OOMKilled: the container was terminated for exceeding its memory limit.\n\
Causes: memory leak, limit set too low for the workload, traffic spikes, large data sets, \
no limit at all so the container competes for node memory.\n\
Diagnose: kubectl describe pod <pod> shows OOMKilled as the last state reason; \
kubectl top pod <pod> for current usage; application logs and memory trends over time.\n\
Fix: raise the memory limit, set requests equal to limits for Guaranteed QoS, fix leaks, \
scale horizontally for load spikes, move to larger nodes.",
    },
    CorpusDocument {
        id: "k8s-service-not-accessible",
        topic: "Service Not Accessible",
        source: TROUBLESHOOTING,
        content: "A Service cannot be reached from inside or outside the cluster.\n\
Causes: selector matches no pods so there are no endpoints, pods failing readiness, wrong \
Service type, port or targetPort mismatch, NetworkPolicy blocking traffic, misconfigured \
Ingress.\n\
Diagnose: kubectl get endpoints <service>; kubectl get pods -l <selector>; \
kubectl describe service <service>; kubectl get networkpolicies; curl the service from a \
temporary pod inside the cluster.\n\
Fix: align the selector with pod labels, make pods ready, pick the right Service type, match \
ports, update NetworkPolicies, correct the Ingress rules.",
    },
    CorpusDocument {
        id: "k8s-readiness-probe-failures",
        topic: "Readiness Probe Failures",
        source: TROUBLESHOOTING,
        content: "Readiness probe failures keep a pod out of Service endpoints.\n\
Causes: application still starting, wrong probe path or port, dependencies such as a database \
unavailable, timeout too short, health endpoint returning errors.\n\
Diagnose: kubectl describe pod <pod> for probe failure events; kubectl logs <pod>; query the \
health endpoint from inside the container; review the probe settings in the deployment.\n\
Fix: raise initialDelaySeconds or timeoutSeconds, fix the health endpoint, wait for \
dependencies before reporting ready, keep liveness and readiness probes separate.",
    },
    CorpusDocument {
        id: "k8s-configmap-secret-issues",
        topic: "ConfigMap and Secret Issues",
        source: TROUBLESHOOTING,
        content: "Missing or wrong ConfigMaps and Secrets stop pods from starting.\n\
Causes: referenced object does not exist, object lives in another namespace, referenced key \
missing, conflicting volume mount paths, immutable ConfigMap that cannot be updated.\n\
Diagnose: kubectl get configmap <name>; kubectl get secret <name>; kubectl describe pod <pod> \
for mount failures; compare names and keys in the pod spec.\n\
Fix: create the missing object in the pod's namespace, correct key names, resolve mount path \
conflicts, recreate immutable ConfigMaps, check RBAC for the ServiceAccount.",
    },
    CorpusDocument {
        id: "k8s-persistent-volume-issues",
        topic: "Persistent Volume Issues",
        source: TROUBLESHOOTING,
        content: "PersistentVolumeClaims stuck in Pending or volumes that cannot attach.\n\
Causes: no PersistentVolume satisfies the claim, StorageClass missing, access mode mismatch, \
volume smaller than the request, node affinity preventing attachment.\n\
Diagnose: kubectl get pvc; kubectl describe pvc <name> for binding events; kubectl get pv; \
kubectl get storageclass.\n\
Fix: create a matching volume or enable dynamic provisioning, correct the access mode, size \
the volume to the claim, make sure the StorageClass has a provisioner.",
    },
    CorpusDocument {
        id: "k8s-resource-limits-requests",
        topic: "Resource Limits and Requests",
        source: BEST_PRACTICES,
        content: "Setting CPU and memory requests and limits.\n\
Requests are the guaranteed minimum used for scheduling; limits are the enforced maximum. \
QoS classes are Guaranteed, Burstable and BestEffort. ResourceQuotas cap a namespace and \
LimitRanges supply defaults.\n\
Practice: always set both, use requests equal to limits for critical workloads, size from \
observed usage with kubectl top pod, keep memory limits around 1.5x typical usage. \
Limits that are too low cause CPU throttling or OOMKilled; requests that are too high leave pods \
unschedulable. A reasonable start is 100m/500m CPU and 128Mi/256Mi memory.",
    },
    CorpusDocument {
        id: "k8s-node-issues",
        topic: "Node Issues",
        source: TROUBLESHOOTING,
        content: "Node-level problems that affect every pod on the node.\n\
Conditions: NotReady when the kubelet loses the control plane, DiskPressure, MemoryPressure, \
PIDPressure, network partitions.\n\
Diagnose: kubectl get nodes; kubectl describe node <node> for conditions and events; \
kubectl top node <node>; kubelet logs on the host.\n\
Fix: restore the kubelet or network, prune images to free disk, add nodes for memory pressure, \
cordon the node to stop new scheduling and drain it to move workloads.",
    },
];

/// The built-in troubleshooting documents
pub fn builtin_documents() -> &'static [CorpusDocument] {
    DOCUMENTS
}

/// Load the built-in corpus into `store`, skipping ids already present.
/// Returns the number of documents added.
pub async fn ingest(store: &LocalStore, reset: bool) -> Result<usize> {
    if reset {
        store.reset().await?;
    }

    let mut documents = Vec::new();
    let mut metadatas = Vec::new();
    let mut ids = Vec::new();

    for doc in DOCUMENTS {
        if store.contains(doc.id).await {
            continue;
        }
        documents.push(format!("{}\n\n{}", doc.topic, doc.content));
        metadatas.push(doc.metadata());
        ids.push(doc.id.to_string());
    }

    if ids.is_empty() {
        info!("◆ CORPUS ALREADY INGESTED");
        return Ok(0);
    }

    let added = ids.len();
    store.add(documents, metadatas, ids).await?;
    info!("◆ INGESTED {} DOCUMENTS", added);
    Ok(added)
}
