use serde_json::Value;
use std::collections::BTreeMap;

/// Settings for a single cluster within a domain
///
/// Only the replica count is interpreted here.
/// Everything else the resource carries for the cluster is kept verbatim in `other`
/// so that a read-modify-write cycle hands it back to kube untouched.
///
/// ```yaml
/// clusters:
/// - clusterName: cluster1
///   replicas: 3
///   serverStartPolicy: IF_NEEDED
/// ```
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    /// Name of the cluster as configured in the domain
    pub cluster_name: String,

    /// Desired number of running managed servers
    ///
    /// Absence means the domain wide `replicas` applies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,

    /// Fields we do not model
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

impl ClusterSpec {
    pub fn new(name: &str) -> Self {
        ClusterSpec {
            cluster_name: name.to_string(),
            ..ClusterSpec::default()
        }
    }

    pub fn replicas(mut self, count: i32) -> Self {
        self.replicas = Some(count);
        self
    }
}

/// Serde glue between the CRD's `clusters` list and a map keyed by cluster name
///
/// Duplicate cluster names are refused rather than silently merged.
pub(crate) mod cluster_list {
    use super::ClusterSpec;
    use crate::ErrorKind;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S>(clusters: &BTreeMap<String, ClusterSpec>, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        s.collect_seq(clusters.values())
    }

    pub fn deserialize<'de, D>(d: D) -> Result<BTreeMap<String, ClusterSpec>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let xs: Vec<ClusterSpec> = Vec::deserialize(d)?;
        let mut res = BTreeMap::new();
        for c in xs {
            if res.contains_key(&c.cluster_name) {
                let kind = ErrorKind::DuplicateCluster(c.cluster_name);
                return Err(D::Error::custom(kind.to_string()));
            }
            res.insert(c.cluster_name.clone(), c);
        }
        Ok(res)
    }
}
