use super::{DomainSpec, ErrorKind, Result, TopologySnapshot};

/// Whether scanned cluster sizes bound a scale request
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CapacityCheck {
    /// Refuse counts above the member count of a scanned cluster
    Enforce,
    /// Leave out of range counts for the runtime to deal with
    Skip,
}

impl Default for CapacityCheck {
    fn default() -> Self {
        CapacityCheck::Enforce
    }
}

/// The change needed to realise a scale request
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScalePlan {
    /// The cluster already runs the requested count
    Unchanged,
    /// Pin the cluster's own replica setting
    SetClusterReplicas { cluster: String, replicas: i32 },
}

impl ScalePlan {
    pub fn is_change(&self) -> bool {
        *self != ScalePlan::Unchanged
    }

    pub fn apply(&self, spec: &mut DomainSpec) {
        if let ScalePlan::SetClusterReplicas { cluster, replicas } = self {
            spec.set_cluster_replicas(cluster, *replicas);
        }
    }
}

/// Refuse counts that can never be valid
pub fn validate_replicas(requested: i32) -> Result<()> {
    if requested < 0 {
        bail!(ErrorKind::InvalidReplicaCount(requested));
    }
    Ok(())
}

/// Refuse counts above the scanned size of the cluster
///
/// Clusters missing from the scan (and empty scans) are not checked.
fn check_capacity(topology: &TopologySnapshot, cluster: &str, requested: i32) -> Result<()> {
    match topology.max_cluster_size(cluster) {
        Some(max) if requested as usize > max => {
            bail!(ErrorKind::ReplicaCountAboveCapacity(cluster.into(), requested, max))
        }
        Some(_) => Ok(()),
        None => {
            debug!("No scanned size for {}, not bounding {} replicas", cluster, requested);
            Ok(())
        }
    }
}

/// Work out what has to change for `cluster` to run `requested` replicas
///
/// The effective count is the cluster's own setting, falling back to the domain default.
/// A change always pins the cluster's setting, never the domain default,
/// so the written value does not depend on what the default becomes later.
/// Capacity only bounds plans that would write; asking for the current count is never refused.
pub fn plan(
    spec: &DomainSpec,
    topology: &TopologySnapshot,
    cluster: &str,
    requested: i32,
    check: CapacityCheck,
) -> Result<ScalePlan> {
    validate_replicas(requested)?;
    let current = spec.replica_count(cluster);
    if current == requested {
        return Ok(ScalePlan::Unchanged);
    }
    if check == CapacityCheck::Enforce {
        check_capacity(topology, cluster, requested)?;
    }
    Ok(ScalePlan::SetClusterReplicas {
        cluster: cluster.to_string(),
        replicas: requested,
    })
}
