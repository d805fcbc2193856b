use kube_derive::CustomResource;
use serde_json::Value;
use std::collections::BTreeMap;

use super::{ErrorKind, Result};
use crate::cluster::{cluster_list, ClusterSpec};

/// Declarative state of a clustered middleware domain
///
/// Serializable from the `domains.weblogic.oracle` CRD.
/// Only the replica related fields are modelled; the rest of the spec
/// is carried in `other` so that replacing a domain never loses fields.
#[derive(CustomResource, Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[kube(
    group = "weblogic.oracle",
    kind = "Domain",
    version = "v2",
    namespaced,
    shortname = "dom",
    status = "DomainStatus",
    printcolumn = r#"{"name":"UID", "jsonPath": ".spec.domainUID", "type": "string", "description": "The unique identifier of the domain"}"#,
    printcolumn = r#"{"name":"Replicas", "jsonPath": ".spec.replicas", "type": "integer", "description": "Default replica count for clusters"}"#
)]
#[kube(apiextensions = "v1beta1")] // kubernetes < 1.16
#[serde(rename_all = "camelCase")]
pub struct DomainSpec {
    /// Unique identifier of the domain
    ///
    /// Defaults to the name of the resource when unset.
    #[serde(rename = "domainUID", default, skip_serializing_if = "Option::is_none")]
    pub domain_uid: Option<String>,

    /// Default replica count for every cluster without its own setting
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,

    /// Per cluster settings keyed by cluster name
    #[serde(default, with = "cluster_list", skip_serializing_if = "BTreeMap::is_empty")]
    pub clusters: BTreeMap<String, ClusterSpec>,

    /// Fields we do not model
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

/// Status object for domains
///
/// Written by the operator's reconciler, never by the scaling path.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct DomainStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

impl DomainSpec {
    pub fn with_uid(uid: &str) -> Self {
        DomainSpec {
            domain_uid: Some(uid.to_string()),
            ..DomainSpec::default()
        }
    }

    /// Builder for the domain wide default
    pub fn default_replicas(mut self, count: i32) -> Self {
        self.replicas = Some(count);
        self
    }

    /// Builder for a per cluster setting
    pub fn cluster(mut self, cluster: ClusterSpec) -> Self {
        self.clusters.insert(cluster.cluster_name.clone(), cluster);
        self
    }

    /// The explicit setting for a cluster, if any
    pub fn cluster_replicas(&self, cluster: &str) -> Option<i32> {
        self.clusters.get(cluster).and_then(|c| c.replicas)
    }

    /// Effective replica count for a cluster
    ///
    /// The cluster's own setting wins, then the domain default, then zero.
    pub fn replica_count(&self, cluster: &str) -> i32 {
        self.cluster_replicas(cluster).or(self.replicas).unwrap_or(0)
    }

    /// Pin a cluster's replica count, creating the cluster entry if needed
    pub fn set_cluster_replicas(&mut self, cluster: &str, count: i32) {
        self.clusters
            .entry(cluster.to_string())
            .or_insert_with(|| ClusterSpec::new(cluster))
            .replicas = Some(count);
    }

    /// Sanity check values read from the cluster
    pub fn verify(&self, name: &str) -> Result<()> {
        if let Some(r) = self.replicas {
            if r < 0 {
                warn!("{} has a negative default replica count {}", name, r);
                bail!(ErrorKind::InvalidDomain(name.into()));
            }
        }
        for (k, c) in &self.clusters {
            if k != &c.cluster_name {
                bail!(ErrorKind::InvalidDomain(name.into()));
            }
            if c.replicas.map(|r| r < 0).unwrap_or(false) {
                warn!("{} has a negative replica count for {}", name, k);
                bail!(ErrorKind::InvalidDomain(name.into()));
            }
        }
        Ok(())
    }
}

impl Domain {
    /// A namespaced domain ready to be stored
    pub fn within(namespace: &str, name: &str, spec: DomainSpec) -> Self {
        let mut d = Domain::new(name, spec);
        d.metadata.namespace = Some(namespace.to_string());
        d
    }

    pub fn name(&self) -> String {
        self.metadata.name.clone().unwrap_or_default()
    }

    /// Unique identifier: `spec.domainUID` or the resource name
    pub fn uid(&self) -> String {
        self.spec.domain_uid.clone().unwrap_or_else(|| self.name())
    }

    pub fn resource_version(&self) -> Option<&str> {
        self.metadata.resource_version.as_ref().map(String::as_str)
    }
}
