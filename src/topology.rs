use std::{
    collections::BTreeMap,
    sync::{Arc, PoisonError, RwLock},
};

use super::TopologySnapshot;

/// Source of topology scans
///
/// Implemented by whatever discovers the running domains.
/// Returning `None` means there is no usable scan for that domain.
pub trait TopologyRetriever: Send + Sync {
    fn get_topology(&self, namespace: &str, uid: &str) -> Option<TopologySnapshot>;
}

/// Topology lookups that never fail
///
/// Wraps a retriever and hands out an empty snapshot whenever it has nothing,
/// so scale requests stay decidable before the first scan has completed.
pub struct TopologyCache {
    retriever: RwLock<Arc<dyn TopologyRetriever>>,
}

impl TopologyCache {
    pub fn new(retriever: Arc<dyn TopologyRetriever>) -> Self {
        TopologyCache {
            retriever: RwLock::new(retriever),
        }
    }

    /// Swap the retriever; lookups in flight finish against the old one
    pub fn replace_retriever(&self, retriever: Arc<dyn TopologyRetriever>) {
        *self.retriever.write().unwrap_or_else(PoisonError::into_inner) = retriever;
    }

    pub fn get(&self, namespace: &str, uid: &str) -> TopologySnapshot {
        let retriever = self.retriever.read().unwrap_or_else(PoisonError::into_inner).clone();
        match retriever.get_topology(namespace, uid) {
            Some(t) => t,
            None => {
                debug!("No topology scan for {}/{}, using an empty one", namespace, uid);
                TopologySnapshot::empty()
            }
        }
    }
}

/// In-process home for published scans
///
/// The scanner publishes here and the cache reads from here.
#[derive(Default)]
pub struct ScanRepository {
    scans: RwLock<BTreeMap<(String, String), TopologySnapshot>>,
}

impl ScanRepository {
    pub fn new() -> Self {
        ScanRepository::default()
    }

    /// Record the latest scan of a domain, replacing any earlier one
    pub fn publish(&self, namespace: &str, uid: &str, scan: TopologySnapshot) {
        debug!("Publishing scan of {}/{} with {} clusters", namespace, uid, scan.clusters.len());
        self.scans
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((namespace.to_string(), uid.to_string()), scan);
    }

    /// Drop the scan of a domain that went away
    pub fn forget(&self, namespace: &str, uid: &str) -> Option<TopologySnapshot> {
        self.scans
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&(namespace.to_string(), uid.to_string()))
    }

    pub fn len(&self) -> usize {
        self.scans.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TopologyRetriever for ScanRepository {
    fn get_topology(&self, namespace: &str, uid: &str) -> Option<TopologySnapshot> {
        self.scans
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(namespace.to_string(), uid.to_string()))
            .cloned()
    }
}
