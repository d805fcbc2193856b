use async_trait::async_trait;
use std::{
    collections::BTreeMap,
    fmt,
    sync::{Mutex, MutexGuard, PoisonError},
};

use super::{Domain, DomainSpec, ErrorKind, Result};

/// Address of exactly one domain
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DomainIdentity {
    pub namespace: String,
    /// The domain's uid (`spec.domainUID`, or the resource name)
    pub uid: String,
}

impl DomainIdentity {
    pub fn new(namespace: &str, uid: &str) -> Self {
        DomainIdentity {
            namespace: namespace.to_string(),
            uid: uid.to_string(),
        }
    }
}

impl fmt::Display for DomainIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.uid)
    }
}

/// Opaque optimistic concurrency token handed out by a store
///
/// Only ever compared for equality; its contents mean nothing to us.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceVersion(String);

impl ResourceVersion {
    pub fn new(token: impl Into<String>) -> Self {
        ResourceVersion(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An object together with the version it was read at
#[derive(Clone, Debug)]
pub struct Versioned<T> {
    pub object: T,
    pub version: ResourceVersion,
}

impl Versioned<Domain> {
    /// Pair a domain read from a store with the token it carries
    ///
    /// A domain without a resourceVersion cannot be written safely, so it is refused.
    pub fn read(domain: Domain) -> Result<Self> {
        let version = match domain.resource_version() {
            Some(v) if !v.is_empty() => ResourceVersion::new(v),
            _ => bail!(ErrorKind::StoreFailure(format!(
                "domain {} was read without a resourceVersion",
                domain.uid()
            ))),
        };
        Ok(Versioned { object: domain, version })
    }
}

/// How a conditional replace went
#[derive(Clone, Debug)]
pub enum ReplaceOutcome {
    /// Written; carries the stored domain at its new version
    Replaced(Versioned<Domain>),
    /// Someone else wrote first, the held version is stale
    Conflict,
}

/// The external store holding domain resources
///
/// Failures other than a version conflict are returned as errors;
/// `DomainNotFound` when the domain does not exist.
#[async_trait]
pub trait DomainStore: Send + Sync {
    /// All domains in a namespace
    async fn list(&self, namespace: &str) -> Result<Vec<Domain>>;

    /// A single domain by uid with its current version
    async fn get(&self, namespace: &str, uid: &str) -> Result<Versioned<Domain>>;

    /// Replace a domain, provided it is still at `version`
    async fn replace(&self, namespace: &str, domain: &Domain, version: &ResourceVersion) -> Result<ReplaceOutcome>;
}

#[derive(Default)]
struct MemoryState {
    /// Domains keyed by (namespace, resource name)
    domains: BTreeMap<(String, String), Domain>,
    revision: u64,
    reads: usize,
    writes: usize,
    conflicts: usize,
}

impl MemoryState {
    fn bump(&mut self) -> String {
        self.revision += 1;
        self.revision.to_string()
    }

    fn find_mut(&mut self, namespace: &str, uid: &str) -> Option<&mut Domain> {
        self.domains
            .iter_mut()
            .find(|((ns, _), d)| ns == namespace && d.uid() == uid)
            .map(|(_, d)| d)
    }
}

/// A `DomainStore` kept in process memory
///
/// Behaves like the kube api for the operations we need:
/// every write bumps a store wide revision and stale writes are refused.
/// The counters only track traffic through the `DomainStore` trait.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create or overwrite a domain regardless of its version
    pub fn insert(&self, mut domain: Domain) {
        let mut state = self.lock();
        let key = (domain.metadata.namespace.clone().unwrap_or_default(), domain.name());
        domain.metadata.resource_version = Some(state.bump());
        state.domains.insert(key, domain);
    }

    /// Modify a domain as an outside writer would, bumping its version
    ///
    /// Returns false if the domain does not exist.
    pub fn update<F>(&self, namespace: &str, uid: &str, f: F) -> bool
    where
        F: FnOnce(&mut DomainSpec),
    {
        let mut state = self.lock();
        let version = state.bump();
        match state.find_mut(namespace, uid) {
            Some(d) => {
                f(&mut d.spec);
                d.metadata.resource_version = Some(version);
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, namespace: &str, uid: &str) -> Option<Domain> {
        let mut state = self.lock();
        let key = state
            .domains
            .iter()
            .find(|((ns, _), d)| ns == namespace && d.uid() == uid)
            .map(|(k, _)| k.clone())?;
        state.domains.remove(&key)
    }

    /// Peek at a stored domain without counting it as a read
    pub fn domain(&self, namespace: &str, uid: &str) -> Option<Domain> {
        self.lock().find_mut(namespace, uid).map(|d| d.clone())
    }

    pub fn reads(&self) -> usize {
        self.lock().reads
    }

    pub fn writes(&self) -> usize {
        self.lock().writes
    }

    pub fn conflicts(&self) -> usize {
        self.lock().conflicts
    }
}

#[async_trait]
impl DomainStore for MemoryStore {
    async fn list(&self, namespace: &str) -> Result<Vec<Domain>> {
        let mut state = self.lock();
        state.reads += 1;
        let res = state
            .domains
            .iter()
            .filter(|((ns, _), _)| ns == namespace)
            .map(|(_, d)| d.clone())
            .collect();
        Ok(res)
    }

    async fn get(&self, namespace: &str, uid: &str) -> Result<Versioned<Domain>> {
        let mut state = self.lock();
        state.reads += 1;
        match state.find_mut(namespace, uid) {
            Some(d) => Versioned::read(d.clone()),
            None => bail!(ErrorKind::DomainNotFound(uid.into())),
        }
    }

    async fn replace(&self, namespace: &str, domain: &Domain, version: &ResourceVersion) -> Result<ReplaceOutcome> {
        let mut state = self.lock();
        let key = (namespace.to_string(), domain.name());
        let current = match state.domains.get(&key) {
            Some(d) => d.resource_version().map(String::from),
            None => bail!(ErrorKind::DomainNotFound(domain.uid())),
        };
        if current.as_ref().map(String::as_str) != Some(version.as_str()) {
            state.conflicts += 1;
            debug!(
                "Refusing write of {} at {} (store has {:?})",
                domain.uid(),
                version,
                current
            );
            return Ok(ReplaceOutcome::Conflict);
        }
        let mut stored = domain.clone();
        stored.metadata.namespace = Some(namespace.to_string());
        stored.metadata.resource_version = Some(state.bump());
        state.writes += 1;
        state.domains.insert(key, stored.clone());
        Ok(ReplaceOutcome::Replaced(Versioned::read(stored)?))
    }
}
