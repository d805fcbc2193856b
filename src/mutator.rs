use super::{Domain, ErrorKind, Result, TopologySnapshot};
use crate::{
    planner::{self, CapacityCheck},
    store::{DomainIdentity, DomainStore, ReplaceOutcome, Versioned},
};

/// Applies scale plans to the store with optimistic concurrency
///
/// Every attempt re-reads the domain and re-plans against it,
/// so a writer that lost a race recomputes its intent instead of overwriting.
pub struct Mutator<'a> {
    store: &'a dyn DomainStore,
    conflict_retries: u32,
    capacity_check: CapacityCheck,
}

impl<'a> Mutator<'a> {
    pub fn new(store: &'a dyn DomainStore, conflict_retries: u32, capacity_check: CapacityCheck) -> Self {
        Mutator {
            store,
            conflict_retries,
            capacity_check,
        }
    }

    /// Read the domain fresh and plan the scale request against it
    ///
    /// Returns the domain with the change applied, still carrying the version it was read at,
    /// or `None` when the cluster already runs the requested count.
    pub async fn prepare(
        &self,
        id: &DomainIdentity,
        cluster: &str,
        replicas: i32,
        topology: &TopologySnapshot,
    ) -> Result<Option<Versioned<Domain>>> {
        let mut current = self.store.get(&id.namespace, &id.uid).await?;
        current.object.spec.verify(&id.uid)?;
        let plan = planner::plan(&current.object.spec, topology, cluster, replicas, self.capacity_check)?;
        debug!("Planned {:?} for {} at version {}", plan, id, current.version);
        if !plan.is_change() {
            return Ok(None);
        }
        plan.apply(&mut current.object.spec);
        Ok(Some(current))
    }

    /// Scale `cluster` of a domain to `replicas`
    ///
    /// Returns whether anything was written.
    /// Gives up with `Conflict` once `conflict_retries` re-plans have also lost their race.
    pub async fn apply(
        &self,
        id: &DomainIdentity,
        cluster: &str,
        replicas: i32,
        topology: &TopologySnapshot,
    ) -> Result<bool> {
        let mut retries = 0;
        loop {
            let desired = match self.prepare(id, cluster, replicas, topology).await? {
                Some(d) => d,
                None => {
                    debug!("{} of {} already at {} replicas", cluster, id, replicas);
                    return Ok(false);
                }
            };
            match self.store.replace(&id.namespace, &desired.object, &desired.version).await? {
                ReplaceOutcome::Replaced(stored) => {
                    info!(
                        "Scaled {} of {} to {} replicas (version {})",
                        cluster, id, replicas, stored.version
                    );
                    return Ok(true);
                }
                ReplaceOutcome::Conflict if retries < self.conflict_retries => {
                    retries += 1;
                    warn!(
                        "Conflict writing {} at version {}, re-planning ({}/{})",
                        id, desired.version, retries, self.conflict_retries
                    );
                }
                ReplaceOutcome::Conflict => {
                    warn!("Giving up scaling {} of {} after {} conflicts", cluster, id, retries + 1);
                    bail!(ErrorKind::Conflict(id.uid.clone(), retries + 1));
                }
            }
        }
    }
}
