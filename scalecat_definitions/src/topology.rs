use std::collections::BTreeMap;

/// Observed membership of one cluster
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterTopology {
    pub cluster_name: String,
    /// Names of the member servers found by the last scan
    #[serde(default)]
    pub servers: Vec<String>,
}

impl ClusterTopology {
    pub fn new(name: &str, servers: &[&str]) -> Self {
        ClusterTopology {
            cluster_name: name.to_string(),
            servers: servers.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// The most replicas this cluster can run
    pub fn max_cluster_size(&self) -> usize {
        self.servers.len()
    }
}

/// Result of scanning a running domain
///
/// An empty snapshot is the stand-in for "no scan yet", and is a valid value to plan against.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TopologySnapshot {
    /// Domain name reported by the scan
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub clusters: BTreeMap<String, ClusterTopology>,
}

impl TopologySnapshot {
    pub fn empty() -> Self {
        TopologySnapshot::default()
    }

    pub fn new(name: &str) -> Self {
        TopologySnapshot {
            name: name.to_string(),
            ..TopologySnapshot::default()
        }
    }

    /// Builder for a scanned cluster
    pub fn with_cluster(mut self, name: &str, servers: &[&str]) -> Self {
        self.clusters.insert(name.to_string(), ClusterTopology::new(name, servers));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn cluster(&self, name: &str) -> Option<&ClusterTopology> {
        self.clusters.get(name)
    }

    pub fn cluster_names(&self) -> Vec<String> {
        self.clusters.keys().cloned().collect()
    }

    /// Member count of a scanned cluster, `None` when the scan does not know it
    pub fn max_cluster_size(&self, name: &str) -> Option<usize> {
        self.cluster(name).map(ClusterTopology::max_cluster_size)
    }
}

#[cfg(test)]
mod tests {
    use super::TopologySnapshot;

    #[test]
    fn cluster_sizes() {
        let t = TopologySnapshot::new("domain")
            .with_cluster("cluster1", &["ms1", "ms2", "ms3"])
            .with_cluster("cluster2", &[]);
        assert_eq!(t.max_cluster_size("cluster1"), Some(3));
        assert_eq!(t.max_cluster_size("cluster2"), Some(0));
        assert_eq!(t.max_cluster_size("cluster3"), None);
        assert_eq!(t.cluster_names(), vec!["cluster1".to_string(), "cluster2".to_string()]);
        assert!(!t.is_empty());
        assert!(TopologySnapshot::empty().is_empty());
    }

    #[test]
    fn parse_scan() {
        let raw = r#"{"name":"domain","clusters":{"cluster1":{"clusterName":"cluster1","servers":["ms1","ms2"]}}}"#;
        let t: TopologySnapshot = serde_json::from_str(raw).unwrap();
        assert_eq!(t.max_cluster_size("cluster1"), Some(2));
        let t: TopologySnapshot = serde_json::from_str("{}").unwrap();
        assert_eq!(t, TopologySnapshot::empty());
    }
}
